//! Constants used throughout the application

/// Number of face mesh landmarks with iris refinement enabled
pub const NUM_REFINED_LANDMARKS: usize = 478;

/// Number of face mesh landmarks without iris refinement
pub const NUM_BASE_LANDMARKS: usize = 468;

/// Nose tip landmark index
pub const NOSE_TIP_INDEX: usize = 1;

/// Left iris contour landmark indices
pub const LEFT_IRIS_INDICES: [usize; 4] = [474, 475, 476, 477];

/// Right iris contour landmark indices
pub const RIGHT_IRIS_INDICES: [usize; 4] = [469, 470, 471, 472];

/// Default refresh timer period in milliseconds
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 30;

/// Default region of interest in camera frame pixels (x1, y1, x2, y2)
pub const DEFAULT_ROI: (i32, i32, i32, i32) = (100, 50, 380, 310);

/// Face mesh model input resolution
pub const FACE_MESH_INPUT_SIZE: i32 = 256;

/// Face detector box expansion before landmark detection
pub const FACE_CROP_SCALE: f32 = 1.5;

/// Image normalization constants for face detection
pub const IMAGE_NORMALIZATION_OFFSET: f32 = 127.5;
pub const IMAGE_NORMALIZATION_SCALE: f32 = 128.0;

/// Default face detector input size when the model reports dynamic dimensions
pub const DEFAULT_DETECTOR_INPUT_SIZE: i32 = 640;

/// Default detector IoU threshold for non-maximum suppression
pub const DEFAULT_NMS_THRESHOLD: f32 = 0.4;

/// Key codes handled by the main loop
pub const KEY_ESCAPE: i32 = 27;
pub const KEY_QUIT: i32 = b'q' as i32;
pub const KEY_LOAD_VIDEO: i32 = b'l' as i32;
