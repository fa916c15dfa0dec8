//! Face mesh landmark detection with iris refinement.
//!
//! Two ONNX models run in sequence: the face detector locates a face box,
//! and the face mesh model regresses 478 landmarks (468 mesh points plus 10
//! iris points) on a square crop around it. Once a face is found the crop for
//! the next frame is derived from the landmarks themselves, so the detector
//! only runs again after the face-presence score drops below the tracking
//! threshold.

use crate::{
    constants::{FACE_CROP_SCALE, FACE_MESH_INPUT_SIZE, NUM_BASE_LANDMARKS, NUM_REFINED_LANDMARKS},
    error::Error,
    face_detection::{FaceDetection, FaceDetector},
    landmarks::{FaceLandmarks, LandmarkDetector, NormalizedLandmark},
    utils::{
        image_conversion::{bgr_to_tensor, TensorLayout},
        safe_cast::f32_to_i32_clamp,
        square_crop,
    },
    Result,
};
use log::debug;
use ndarray::CowArray;
use opencv::{
    core::{Mat, Rect},
    prelude::*,
};
use ort::{Environment, Session, Value};
use serde::{Deserialize, Serialize};
use std::{path::Path, sync::Arc};

/// Face mesh detector settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceMeshConfig {
    /// Maximum number of faces returned per frame
    pub max_num_faces: usize,

    /// Produce the 10 iris landmarks (indices 468-477)
    pub refine_landmarks: bool,

    /// Minimum face detector score (0.0-1.0)
    pub min_detection_confidence: f32,

    /// Minimum face-presence score to keep tracking (0.0-1.0)
    pub min_tracking_confidence: f32,

    /// IoU threshold for non-maximum suppression of detector boxes
    pub nms_threshold: f32,
}

impl Default for FaceMeshConfig {
    fn default() -> Self {
        Self {
            max_num_faces: 1,
            refine_landmarks: true,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
            nms_threshold: crate::constants::DEFAULT_NMS_THRESHOLD,
        }
    }
}

impl FaceMeshConfig {
    /// Validate thresholds and face count
    ///
    /// # Errors
    ///
    /// Returns an error if a threshold is outside `[0, 1]` or no face is
    /// allowed
    pub fn validate(&self) -> Result<()> {
        if self.max_num_faces == 0 {
            return Err(Error::ConfigError("max_num_faces must be at least 1".to_string()));
        }
        for (name, value) in [
            ("min_detection_confidence", self.min_detection_confidence),
            ("min_tracking_confidence", self.min_tracking_confidence),
            ("nms_threshold", self.nms_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::ConfigError(format!("{name} must be between 0.0 and 1.0")));
            }
        }
        Ok(())
    }
}

/// Stateful face mesh detector
pub struct FaceMesh {
    config: FaceMeshConfig,
    face_detector: FaceDetector,
    session: Session,
    input_size: (i32, i32),
    layout: TensorLayout,
    tracked: Vec<Rect>,
}

impl FaceMesh {
    /// Load the face detector and face mesh models
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or a model cannot be
    /// loaded
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        detector_model: P,
        landmark_model: Q,
        config: FaceMeshConfig,
    ) -> Result<Self> {
        config.validate()?;

        let face_detector = FaceDetector::new(detector_model, config.min_detection_confidence, config.nms_threshold)?;

        log::info!("Loading face mesh model: {}", landmark_model.as_ref().display());
        let environment = Arc::new(
            Environment::builder()
                .with_name("face_mesh")
                .with_log_level(ort::LoggingLevel::Warning)
                .build()?,
        );
        let session = ort::SessionBuilder::new(&environment)?
            .with_optimization_level(ort::GraphOptimizationLevel::Level3)?
            .with_model_from_file(landmark_model)?;

        let input_meta = session
            .inputs
            .first()
            .ok_or_else(|| Error::ModelInputError("Face mesh model has no inputs".to_string()))?;
        let layout = TensorLayout::from_dimensions(&input_meta.dimensions);
        let (h_idx, w_idx) = match layout {
            TensorLayout::Nchw => (2, 3),
            TensorLayout::Nhwc => (1, 2),
        };
        let dim = |idx: usize| {
            input_meta
                .dimensions
                .get(idx)
                .copied()
                .flatten()
                .and_then(|d| i32::try_from(d).ok())
                .unwrap_or(FACE_MESH_INPUT_SIZE)
        };
        let input_size = (dim(w_idx), dim(h_idx));

        if session.outputs.is_empty() {
            return Err(Error::ModelOutputError("Face mesh model has no outputs".to_string()));
        }

        Ok(Self {
            config,
            face_detector,
            session,
            input_size,
            layout,
            tracked: Vec::new(),
        })
    }

    /// Whether the next frame will reuse crops from the previous landmarks
    #[must_use]
    pub fn is_tracking(&self) -> bool {
        !self.tracked.is_empty()
    }

    /// Crops to run the mesh model on: tracked crops, or fresh detections
    fn regions(&mut self, frame: &Mat) -> Result<Vec<Rect>> {
        if !self.tracked.is_empty() {
            return Ok(std::mem::take(&mut self.tracked));
        }

        // The detector already drops boxes below min_detection_confidence
        let faces = self.face_detector.detect(frame)?;
        Ok(face_regions(faces, self.config.max_num_faces, frame.cols(), frame.rows()))
    }

    /// Run the mesh model on one crop
    ///
    /// Returns crop-normalized landmarks and the face-presence score.
    fn infer(&self, crop: &Mat) -> Result<(Vec<NormalizedLandmark>, f32)> {
        let (width, height) = self.input_size;
        let input = bgr_to_tensor(crop, width, height, 0.0, 255.0, self.layout)?;
        let cow_array = CowArray::from(input.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;
        let outputs = self.session.run(vec![input_tensor])?;

        let landmarks_output = outputs
            .first()
            .ok_or_else(|| Error::ModelOutputError("No landmark output from model".to_string()))?
            .try_extract::<f32>()?;
        let landmarks_view = landmarks_output.view();
        let raw = landmarks_view
            .as_slice()
            .ok_or_else(|| Error::ModelOutputError("Non-contiguous landmark output".to_string()))?;
        let points = parse_landmarks(raw, self.input_size, self.config.refine_landmarks)?;

        // Second output, when present, is the face-presence logit
        let presence = match outputs.get(1) {
            Some(value) => {
                let flag = value.try_extract::<f32>()?;
                let flag_view = flag.view();
                flag_view.iter().next().copied().map_or(1.0, sigmoid)
            }
            None => 1.0,
        };

        Ok((points, presence))
    }
}

impl LandmarkDetector for FaceMesh {
    fn process(&mut self, frame: &Mat) -> Result<Vec<FaceLandmarks>> {
        let (width, height) = (frame.cols(), frame.rows());
        if width <= 0 || height <= 0 {
            self.tracked.clear();
            return Ok(Vec::new());
        }

        let regions = self.regions(frame)?;
        let mut faces = Vec::with_capacity(regions.len());
        let mut next_regions = Vec::with_capacity(regions.len());

        for roi in regions {
            let crop = Mat::roi(frame, roi)?.try_clone()?;
            let (points, presence) = self.infer(&crop)?;
            if presence < self.config.min_tracking_confidence {
                debug!("Face presence {:.2} below tracking threshold, dropping track", presence);
                continue;
            }

            let landmarks = crop_to_frame(&points, roi, width, height);
            let bounds = landmark_bounds(&landmarks, width, height);
            let next = square_crop(bounds, FACE_CROP_SCALE, width, height);
            if next.width > 0 && next.height > 0 {
                next_regions.push(next);
            }
            faces.push(landmarks);
        }

        self.tracked = next_regions;
        Ok(faces)
    }
}

/// Square crops for the best `max_faces` detections, best first
pub(crate) fn face_regions(faces: Vec<FaceDetection>, max_faces: usize, width: i32, height: i32) -> Vec<Rect> {
    faces
        .into_iter()
        .take(max_faces)
        .map(|face| square_crop(face.bbox, FACE_CROP_SCALE, width, height))
        .filter(|roi| roi.width > 0 && roi.height > 0)
        .collect()
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Parse a flat `[x, y, z]*` landmark tensor in model input pixels
///
/// Returns crop-normalized landmarks: 478 with refinement, 468 without.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn parse_landmarks(raw: &[f32], input_size: (i32, i32), refine: bool) -> Result<Vec<NormalizedLandmark>> {
    if raw.len() % 3 != 0 {
        return Err(Error::ModelDataFormatError(format!(
            "Landmark output length {} is not a multiple of 3",
            raw.len()
        )));
    }

    let available = raw.len() / 3;
    let wanted = if refine { NUM_REFINED_LANDMARKS } else { NUM_BASE_LANDMARKS };
    if available < wanted {
        return Err(Error::ModelValidationError(format!(
            "Face mesh model produced {available} landmarks, {wanted} required{}",
            if refine { " for iris refinement" } else { "" }
        )));
    }

    let (w, h) = (input_size.0 as f32, input_size.1 as f32);
    Ok(raw
        .chunks_exact(3)
        .take(wanted)
        .map(|p| NormalizedLandmark {
            x: p[0] / w,
            y: p[1] / h,
            z: p[2] / w,
        })
        .collect())
}

/// Map crop-normalized landmarks to frame-normalized landmarks
#[allow(clippy::cast_precision_loss)]
pub(crate) fn crop_to_frame(points: &[NormalizedLandmark], roi: Rect, width: i32, height: i32) -> FaceLandmarks {
    let (w, h) = (width as f32, height as f32);
    FaceLandmarks::new(
        points
            .iter()
            .map(|p| NormalizedLandmark {
                x: (roi.x as f32 + p.x * roi.width as f32) / w,
                y: (roi.y as f32 + p.y * roi.height as f32) / h,
                z: p.z * roi.width as f32 / w,
            })
            .collect(),
    )
}

/// Pixel bounding box of a landmark set, clipped to the frame
#[allow(clippy::cast_precision_loss)]
pub(crate) fn landmark_bounds(landmarks: &FaceLandmarks, width: i32, height: i32) -> Rect {
    let (mut min_x, mut min_y) = (f32::MAX, f32::MAX);
    let (mut max_x, mut max_y) = (f32::MIN, f32::MIN);
    for p in landmarks.points() {
        min_x = min_x.min(p.x * width as f32);
        min_y = min_y.min(p.y * height as f32);
        max_x = max_x.max(p.x * width as f32);
        max_y = max_y.max(p.y * height as f32);
    }
    if landmarks.is_empty() {
        return Rect::default();
    }

    let x1 = f32_to_i32_clamp(min_x, 0, width);
    let y1 = f32_to_i32_clamp(min_y, 0, height);
    let x2 = f32_to_i32_clamp(max_x, 0, width);
    let y2 = f32_to_i32_clamp(max_y, 0, height);
    Rect::new(x1, y1, x2 - x1, y2 - y1)
}
