use crate::{
    constants::{DEFAULT_DETECTOR_INPUT_SIZE, IMAGE_NORMALIZATION_OFFSET, IMAGE_NORMALIZATION_SCALE},
    error::Error,
    utils::image_conversion::{bgr_to_tensor, TensorLayout},
    Result,
};
use ndarray::CowArray;
use opencv::core::{Mat, Rect, Scalar, Size, CV_8UC3};
use opencv::imgproc::{self, InterpolationFlags};
use opencv::prelude::*;
use ort::{Environment, Session, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Face detection result in frame pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceDetection {
    /// Bounding box of the detected face
    pub bbox: Rect,
    /// Confidence score of the detection
    pub score: f32,
}

/// Candidate box in detector input coordinates `[x1, y1, x2, y2]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Candidate {
    pub(crate) bbox: [f32; 4],
    pub(crate) score: f32,
}

/// SCRFD face detector using ONNX Runtime
///
/// Only the highest scoring faces matter to the attention meter, so key
/// points are ignored and results are returned best first.
pub struct FaceDetector {
    session: Session,
    input_size: (i32, i32),
    layout: TensorLayout,
    conf_threshold: f32,
    nms_threshold: f32,
    num_anchors: usize,
    strides: Vec<i32>,
    offset: usize,
    center_cache: HashMap<(i32, i32, i32), Arc<Vec<(f32, f32)>>>,
}

impl FaceDetector {
    /// Load a detector from an ONNX model file
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be loaded or has no inputs
    pub fn new<P: AsRef<Path>>(model_path: P, conf_threshold: f32, nms_threshold: f32) -> Result<Self> {
        log::info!("Loading face detector: {}", model_path.as_ref().display());
        let environment = Arc::new(
            Environment::builder()
                .with_name("face_detector")
                .with_log_level(ort::LoggingLevel::Warning)
                .build()?,
        );

        let session = ort::SessionBuilder::new(&environment)?
            .with_optimization_level(ort::GraphOptimizationLevel::Level3)?
            .with_model_from_file(model_path)?;

        let input_meta = session
            .inputs
            .first()
            .ok_or_else(|| Error::ModelInputError("Face detector has no inputs".to_string()))?;
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
                .unwrap_or(DEFAULT_DETECTOR_INPUT_SIZE)
        };
        let input_size = (dim(w_idx), dim(h_idx));

        // Output count identifies the SCRFD variant
        let (offset, strides, num_anchors) = match session.outputs.len() {
            6 | 9 => (3, vec![8, 16, 32], 2),
            10 | 15 => (5, vec![8, 16, 32, 64, 128], 1),
            n => {
                return Err(Error::ModelValidationError(format!(
                    "Unsupported face detector with {n} outputs"
                )))
            }
        };

        Ok(Self {
            session,
            input_size,
            layout,
            conf_threshold,
            nms_threshold,
            num_anchors,
            strides,
            offset,
            center_cache: HashMap::new(),
        })
    }

    /// Detect faces, best score first
    ///
    /// # Errors
    ///
    /// Returns an error if preprocessing or inference fails
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn detect(&mut self, image: &Mat) -> Result<Vec<FaceDetection>> {
        let (input_width, input_height) = self.input_size;
        let img_width = image.cols();
        let img_height = image.rows();
        if img_width <= 0 || img_height <= 0 {
            return Ok(Vec::new());
        }

        // Letterbox into the model input, keeping aspect ratio
        let ratio_img = img_height as f32 / img_width as f32;
        let ratio_model = input_height as f32 / input_width as f32;
        let (new_width, new_height) = if ratio_img > ratio_model {
            ((input_height as f32 / ratio_img) as i32, input_height)
        } else {
            (input_width, (input_width as f32 * ratio_img) as i32)
        };
        let det_scale = new_height as f32 / img_height as f32;

        let mut resized = Mat::default();
        imgproc::resize(
            image,
            &mut resized,
            Size::new(new_width, new_height),
            0.0,
            0.0,
            InterpolationFlags::INTER_LINEAR as i32,
        )?;
        let mut det_img = Mat::new_rows_cols_with_default(input_height, input_width, CV_8UC3, Scalar::all(0.0))?;
        let mut roi = det_img.roi_mut(Rect::new(0, 0, new_width, new_height))?;
        resized.copy_to(&mut roi)?;

        let inputs = bgr_to_tensor(
            &det_img,
            input_width,
            input_height,
            IMAGE_NORMALIZATION_OFFSET,
            IMAGE_NORMALIZATION_SCALE,
            self.layout,
        )?;
        let candidates = self.forward(inputs.into_dyn())?;

        Ok(nms(candidates, self.nms_threshold)
            .into_iter()
            .map(|c| FaceDetection {
                bbox: Rect::new(
                    (c.bbox[0] / det_scale) as i32,
                    (c.bbox[1] / det_scale) as i32,
                    ((c.bbox[2] - c.bbox[0]) / det_scale) as i32,
                    ((c.bbox[3] - c.bbox[1]) / det_scale) as i32,
                ),
                score: c.score,
            })
            .collect())
    }

    /// Run inference and decode candidates above the confidence threshold
    #[allow(clippy::cast_precision_loss)]
    fn forward(&mut self, inputs: ndarray::ArrayD<f32>) -> Result<Vec<Candidate>> {
        let (input_width, input_height) = self.input_size;
        let cow_array = CowArray::from(inputs);
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;
        let outputs = self.session.run(vec![input_tensor])?;

        let mut candidates = Vec::new();
        for (idx, &stride) in self.strides.iter().enumerate() {
            let scores_output = outputs
                .get(idx)
                .ok_or_else(|| Error::ModelOutputError(format!("Missing score output {idx}")))?
                .try_extract::<f32>()?;
            let scores_view = scores_output.view();
            let scores = scores_view
                .as_slice()
                .ok_or_else(|| Error::ModelOutputError("Non-contiguous score output".to_string()))?;

            let bbox_output = outputs
                .get(idx + self.offset)
                .ok_or_else(|| Error::ModelOutputError(format!("Missing bbox output {idx}")))?
                .try_extract::<f32>()?;
            let bbox_view = bbox_output.view();
            let distances = bbox_view
                .as_slice()
                .ok_or_else(|| Error::ModelOutputError("Non-contiguous bbox output".to_string()))?;

            let key = (input_height / stride, input_width / stride, stride);
            let num_anchors = self.num_anchors;
            let centers = Arc::clone(
                self.center_cache
                    .entry(key)
                    .or_insert_with(|| Arc::new(anchor_centers(key.0, key.1, stride, num_anchors))),
            );

            if distances.len() < centers.len() * 4 || scores.len() < centers.len() {
                return Err(Error::ModelDataFormatError(format!(
                    "Stride {stride}: expected {} anchors, got {} scores and {} distances",
                    centers.len(),
                    scores.len(),
                    distances.len()
                )));
            }

            let stride_f = stride as f32;
            for (i, &center) in centers.iter().enumerate() {
                if scores[i] < self.conf_threshold {
                    continue;
                }
                let d = &distances[i * 4..i * 4 + 4];
                candidates.push(Candidate {
                    bbox: distance_to_bbox(center, [d[0] * stride_f, d[1] * stride_f, d[2] * stride_f, d[3] * stride_f]),
                    score: scores[i],
                });
            }
        }

        Ok(candidates)
    }
}

/// Anchor centers for one feature map, repeated `num_anchors` times each
#[allow(clippy::cast_precision_loss)]
pub(crate) fn anchor_centers(height: i32, width: i32, stride: i32, num_anchors: usize) -> Vec<(f32, f32)> {
    let mut centers = Vec::new();
    for y in 0..height {
        for x in 0..width {
            let center = ((x * stride) as f32, (y * stride) as f32);
            centers.extend(std::iter::repeat(center).take(num_anchors.max(1)));
        }
    }
    centers
}

/// Decode left/top/right/bottom distances around an anchor center
pub(crate) fn distance_to_bbox(center: (f32, f32), distances: [f32; 4]) -> [f32; 4] {
    let (cx, cy) = center;
    [
        cx - distances[0],
        cy - distances[1],
        cx + distances[2],
        cy + distances[3],
    ]
}

/// Intersection over union with the +1 pixel convention
pub(crate) fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let area = |r: &[f32; 4]| (r[2] - r[0] + 1.0) * (r[3] - r[1] + 1.0);
    let w = (a[2].min(b[2]) - a[0].max(b[0]) + 1.0).max(0.0);
    let h = (a[3].min(b[3]) - a[1].max(b[1]) + 1.0).max(0.0);
    let inter = w * h;
    inter / (area(a) + area(b) - inter)
}

/// Non-maximum suppression, returning kept candidates best first
pub(crate) fn nms(mut candidates: Vec<Candidate>, threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    let mut keep: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if keep.iter().all(|k| iou(&k.bbox, &candidate.bbox) <= threshold) {
            keep.push(candidate);
        }
    }
    keep
}
