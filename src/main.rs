//! Attention meter: measures how long a viewer looks at a screen region.

use anyhow::{Context, Result};
use clap::Parser;
use gaze_attention::{
    app::AttentionApp,
    attention::Roi,
    config::{Config, EXAMPLE_CONFIG},
};
use log::{info, warn};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Camera index to use (overrides the config file)
    #[arg(long)]
    cam: Option<i32>,

    /// Reference video to play from the start
    #[arg(short, long)]
    video: Option<PathBuf>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Attention region as x1,y1,x2,y2 in camera pixels
    #[arg(long, value_parser = parse_roi)]
    roi: Option<Roi>,

    /// Refresh interval in milliseconds
    #[arg(long)]
    interval: Option<u64>,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Print an example configuration file and exit
    #[arg(long)]
    print_config: bool,
}

fn parse_roi(s: &str) -> std::result::Result<Roi, String> {
    s.parse::<Roi>().map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    info!("Attention Meter");

    let mut config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path.display());
        match Config::from_file(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("Failed to load config file: {}. Using defaults.", e);
                Config::default()
            }
        }
    } else {
        Config::default()
    };

    if let Some(cam) = args.cam {
        config.camera.index = cam;
    }
    if let Some(roi) = args.roi {
        config.roi = roi;
    }
    if let Some(interval) = args.interval {
        config.timer.interval_ms = interval;
    }

    config.validate().context("Invalid configuration")?;
    config.check_model_files().context("Missing model files")?;

    let mut app = AttentionApp::new(&config, args.video.as_deref())?;
    app.run()?;

    Ok(())
}
