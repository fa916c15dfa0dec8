//! Build script for detecting system dependencies and providing installation guidance.
//!
//! This script checks for required system libraries (OpenCV, GTK3, pkg-config) and
//! provides helpful error messages if they are missing.

use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    check_pkg_config();
    check_opencv();

    // The native file chooser uses GTK3 on Linux
    check_gtk();

    println!(
        "cargo:rustc-env=BUILD_TARGET={}",
        env::var("TARGET").unwrap_or_default()
    );
}

fn pkg_config_version(package: &str) -> Option<String> {
    let output = Command::new("pkg-config").args(["--modversion", package]).output().ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn check_opencv() {
    println!("cargo:rerun-if-env-changed=PKG_CONFIG_PATH");
    println!("cargo:rerun-if-env-changed=OPENCV_LINK_PATHS");
    println!("cargo:rerun-if-env-changed=OPENCV_INCLUDE_PATHS");

    match pkg_config_version("opencv4").or_else(|| pkg_config_version("opencv")) {
        Some(version) => println!("cargo:warning=Found OpenCV version: {version}"),
        None => {
            println!("cargo:warning=OpenCV not found via pkg-config. Make sure OpenCV is installed.");
            println!("cargo:warning=On Ubuntu: sudo apt-get install libopencv-dev");
            println!("cargo:warning=On macOS: brew install opencv");
        }
    }
}

fn check_gtk() {
    if !env::var("TARGET").unwrap_or_default().contains("linux") {
        return;
    }

    match pkg_config_version("gtk+-3.0") {
        Some(version) => println!("cargo:warning=Found GTK3 version: {version}"),
        None => {
            println!("cargo:warning=GTK3 not found. The video file chooser will not build.");
            println!("cargo:warning=On Ubuntu: sudo apt-get install libgtk-3-dev");
        }
    }
}

fn check_pkg_config() {
    match Command::new("pkg-config").arg("--version").output() {
        Ok(output) if output.status.success() => {}
        _ => {
            println!("cargo:warning=pkg-config not found. This is required to find system libraries.");
            println!("cargo:warning=On Ubuntu: sudo apt-get install pkg-config");
            println!("cargo:warning=On macOS: brew install pkg-config");
        }
    }
}
