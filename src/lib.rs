//! Gaze-based attention measurement for a webcam viewer.
//!
//! This library estimates where a viewer is looking from webcam frames and
//! counts how many frames land inside a screen region of interest:
//! - ONNX Runtime for face detection and face mesh inference
//! - `OpenCV` for capture, drawing and the application window
//!
//! The per-frame pipeline consists of:
//! 1. Face mesh detection with iris refinement (478 landmarks)
//! 2. Gaze vector from the iris midpoint to the nose tip
//! 3. Gaze point: frame center displaced by the gaze vector
//! 4. Inclusive ROI test and attention counters
//!
//! # Examples
//!
//! ## Gaze from a single camera frame
//!
//! ```no_run
//! use gaze_attention::{
//!     attention::{gaze_point, Roi},
//!     face_mesh::{FaceMesh, FaceMeshConfig},
//!     gaze::estimate_gaze,
//!     video::{open_camera, FrameSource},
//! };
//! use opencv::{core::Mat, prelude::*};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut mesh = FaceMesh::new(
//!     "assets/face_detector.onnx",
//!     "assets/face_mesh_iris.onnx",
//!     FaceMeshConfig::default(),
//! )?;
//!
//! let mut camera = open_camera(0)?;
//! let mut image = Mat::default();
//! if !camera.read_frame(&mut image)? {
//!     return Ok(());
//! }
//!
//! let (gaze, _annotated) = estimate_gaze(&image, &mut mesh)?;
//!
//! if let Some(vector) = gaze {
//!     let point = gaze_point(image.cols(), image.rows(), vector)?;
//!     println!("Looking at ({}, {}), inside ROI: {}", point.x, point.y, Roi::default().contains(point));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Tracking over a camera and a looping video
//!
//! ```no_run
//! use gaze_attention::{
//!     attention::Roi,
//!     face_mesh::{FaceMesh, FaceMeshConfig},
//!     tracker::AttentionTracker,
//!     video::{open_camera, open_video_file},
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mesh = FaceMesh::new(
//!     "assets/face_detector.onnx",
//!     "assets/face_mesh_iris.onnx",
//!     FaceMeshConfig::default(),
//! )?;
//! let camera = open_camera(0)?;
//!
//! let mut tracker = AttentionTracker::new(mesh, camera, Roi::default(), 0.03);
//! tracker.replace_video("lecture.mp4", || open_video_file("lecture.mp4"))?;
//!
//! for _ in 0..100 {
//!     let output = tracker.tick()?;
//!     if let Some(summary) = output.summary {
//!         println!("{summary}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

/// Region of interest and attention statistics
pub mod attention;

/// Main application module
pub mod app;

/// Configuration management
pub mod config;

/// Constants used throughout the application
pub mod constants;

/// Application window rendering
pub mod display;

/// Error types and result handling
pub mod error;

/// Face detection module for finding faces in images
pub mod face_detection;

/// Face mesh landmark detection with iris refinement
pub mod face_mesh;

/// Native video file chooser
pub mod file_dialog;

/// Gaze vector estimation from face landmarks
pub mod gaze;

/// Normalized landmark types and the detector trait
pub mod landmarks;

/// Per-tick attention tracking
pub mod tracker;

/// Utility functions for image processing and safe numeric casts
pub mod utils;

/// Camera and video file sources
pub mod video;

pub use error::{Error, Result};
