//! Configuration management for the attention meter

use crate::{
    attention::Roi, constants::DEFAULT_TICK_INTERVAL_MS, display::WindowLayout, face_mesh::FaceMeshConfig, Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model configuration
    pub models: ModelConfig,

    /// Face mesh detector configuration
    pub face_mesh: FaceMeshConfig,

    /// Camera configuration
    pub camera: CameraConfig,

    /// Region of interest in camera frame pixels
    pub roi: Roi,

    /// Refresh timer configuration
    pub timer: TimerConfig,

    /// Window layout configuration
    pub display: DisplayConfig,
}

/// Model file paths configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Path to face detection ONNX model
    pub face_detector: PathBuf,

    /// Path to face mesh (with iris) ONNX model
    pub face_landmarks: PathBuf,
}

/// Camera configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Webcam index
    pub index: i32,
}

/// Refresh timer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Tick period in milliseconds; also the duration credited per frame
    pub interval_ms: u64,
}

/// Window layout configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Window title
    pub window_title: String,

    /// Window width
    pub window_width: i32,

    /// Window height
    pub window_height: i32,

    /// Width of each image pane
    pub pane_width: i32,

    /// Height of each image pane
    pub pane_height: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            models: ModelConfig::default(),
            face_mesh: FaceMeshConfig::default(),
            camera: CameraConfig::default(),
            roi: Roi::default(),
            timer: TimerConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            face_detector: PathBuf::from("assets/face_detector.onnx"),
            face_landmarks: PathBuf::from("assets/face_mesh_iris.onnx"),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self { index: 0 }
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_TICK_INTERVAL_MS,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            window_title: "Attention Meter".to_string(),
            window_width: 1000,
            window_height: 500,
            pane_width: 480,
            pane_height: 360,
        }
    }
}

impl TimerConfig {
    /// Seconds credited to each counted frame
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn seconds_per_frame(&self) -> f64 {
        self.interval_ms as f64 / 1000.0
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::IoError(e.to_string()))?;

        serde_yaml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| Error::IoError(e.to_string()))?;

        Ok(())
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting
    pub fn validate(&self) -> Result<()> {
        self.face_mesh.validate()?;
        if !self.face_mesh.refine_landmarks {
            return Err(Error::ConfigError(
                "refine_landmarks must be enabled: gaze estimation needs iris landmarks".to_string(),
            ));
        }

        self.roi.validate()?;

        if self.timer.interval_ms == 0 {
            return Err(Error::ConfigError("Timer interval must be greater than 0".to_string()));
        }

        if self.display.pane_width <= 0 || self.display.pane_height <= 0 {
            return Err(Error::ConfigError("Pane dimensions must be positive".to_string()));
        }
        WindowLayout::new(&self.display).validate()?;

        Ok(())
    }

    /// Check that the model files exist
    ///
    /// # Errors
    ///
    /// Returns an error naming the first missing model
    pub fn check_model_files(&self) -> Result<()> {
        if !self.models.face_detector.exists() {
            return Err(Error::ConfigError(format!(
                "Face detector model not found: {}",
                self.models.face_detector.display()
            )));
        }
        if !self.models.face_landmarks.exists() {
            return Err(Error::ConfigError(format!(
                "Face mesh model not found: {}",
                self.models.face_landmarks.display()
            )));
        }
        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Attention Meter Configuration

# Model paths
models:
  face_detector: "assets/face_detector.onnx"
  face_landmarks: "assets/face_mesh_iris.onnx"

# Face mesh detector
face_mesh:
  max_num_faces: 1
  refine_landmarks: true
  min_detection_confidence: 0.5
  min_tracking_confidence: 0.5
  nms_threshold: 0.4

# Webcam
camera:
  index: 0

# Region counted as attentive, in camera frame pixels (inclusive)
roi:
  x1: 100
  y1: 50
  x2: 380
  y2: 310

# Refresh timer
timer:
  interval_ms: 30

# Window layout
display:
  window_title: "Attention Meter"
  window_width: 1000
  window_height: 500
  pane_width: 480
  pane_height: 360
"#;
