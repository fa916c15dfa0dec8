//! Face landmark types and the detector boundary.

use crate::{Error, Result};
use opencv::core::Mat;

/// A single landmark in normalized image coordinates
///
/// `x` and `y` are fractions of the frame width and height. `z` is the
/// relative depth reported by the face mesh model and is kept for
/// completeness only.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NormalizedLandmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl NormalizedLandmark {
    /// Create a landmark with zero depth
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }

    /// Scale to pixel coordinates of a `width` x `height` frame
    #[must_use]
    pub fn to_pixel(&self, width: i32, height: i32) -> (f64, f64) {
        (
            f64::from(self.x) * f64::from(width),
            f64::from(self.y) * f64::from(height),
        )
    }
}

/// Landmarks of one detected face, indexed by the face mesh topology
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaceLandmarks {
    points: Vec<NormalizedLandmark>,
}

impl FaceLandmarks {
    #[must_use]
    pub fn new(points: Vec<NormalizedLandmark>) -> Self {
        Self { points }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn points(&self) -> &[NormalizedLandmark] {
        &self.points
    }

    /// Get a landmark by index
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is outside the landmark set, e.g. when
    /// iris landmarks are requested from a mesh without refinement
    pub fn get(&self, index: usize) -> Result<&NormalizedLandmark> {
        self.points.get(index).ok_or_else(|| {
            Error::InvalidInput(format!(
                "Landmark index {index} out of range for {} landmarks",
                self.points.len()
            ))
        })
    }
}

/// Boundary to a face landmark detector
///
/// Implementations may keep state between calls (e.g. tracking the face
/// region from the previous frame). Each call returns one entry per detected
/// face; an empty vector means no face was found.
pub trait LandmarkDetector {
    /// Detect face landmarks in a BGR frame
    ///
    /// # Errors
    ///
    /// Returns an error if preprocessing or inference fails
    fn process(&mut self, frame: &Mat) -> Result<Vec<FaceLandmarks>>;
}

impl<D: LandmarkDetector + ?Sized> LandmarkDetector for Box<D> {
    fn process(&mut self, frame: &Mat) -> Result<Vec<FaceLandmarks>> {
        (**self).process(frame)
    }
}
