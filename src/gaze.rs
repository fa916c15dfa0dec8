//! Gaze direction estimation from face mesh landmarks.
//!
//! The gaze proxy is the displacement from the nose tip to the midpoint of the
//! two iris centroids, measured in camera pixels. It is a single-frame
//! geometric heuristic: no smoothing, no calibration.

use crate::{
    constants::{LEFT_IRIS_INDICES, NOSE_TIP_INDEX, RIGHT_IRIS_INDICES},
    landmarks::{FaceLandmarks, LandmarkDetector},
    utils::safe_cast::f64_to_i32,
    Error, Result,
};
use opencv::{
    core::{Mat, Point, Scalar},
    imgproc::{self, LINE_8},
    prelude::*,
};

/// Integer displacement from the nose tip to the iris midpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GazeVector {
    pub dx: i32,
    pub dy: i32,
}

impl GazeVector {
    #[must_use]
    pub const fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }
}

/// Intermediate points of a gaze estimate, in frame pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GazeEstimate {
    pub left_iris: Point,
    pub right_iris: Point,
    pub center: Point,
    pub nose: Point,
    pub vector: GazeVector,
}

/// Mean pixel position of a group of landmarks, truncated toward zero
///
/// # Errors
///
/// Returns an error if an index is missing from the landmark set or the
/// mean is not representable as a pixel coordinate
#[allow(clippy::cast_precision_loss)] // Group sizes are tiny
pub fn iris_center(landmarks: &FaceLandmarks, indices: &[usize], width: i32, height: i32) -> Result<Point> {
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    for &idx in indices {
        let (x, y) = landmarks.get(idx)?.to_pixel(width, height);
        sum_x += x;
        sum_y += y;
    }
    let n = indices.len() as f64;
    Ok(Point::new(f64_to_i32(sum_x / n)?, f64_to_i32(sum_y / n)?))
}

/// Compute the gaze vector and its construction points
///
/// # Errors
///
/// Returns an error if the landmark set lacks iris landmarks
pub fn compute_gaze(landmarks: &FaceLandmarks, width: i32, height: i32) -> Result<GazeEstimate> {
    let left_iris = iris_center(landmarks, &LEFT_IRIS_INDICES, width, height)?;
    let right_iris = iris_center(landmarks, &RIGHT_IRIS_INDICES, width, height)?;

    // Summed in i64; the floored mean of two i32 values always fits back
    let midpoint = |a: i32, b: i32| {
        i32::try_from((i64::from(a) + i64::from(b)).div_euclid(2))
            .map_err(|_| Error::InvalidInput(format!("Iris midpoint of {a} and {b} out of range")))
    };
    let center = Point::new(
        midpoint(left_iris.x, right_iris.x)?,
        midpoint(left_iris.y, right_iris.y)?,
    );

    let (nose_x, nose_y) = landmarks.get(NOSE_TIP_INDEX)?.to_pixel(width, height);
    let nose = Point::new(f64_to_i32(nose_x)?, f64_to_i32(nose_y)?);

    let offset = |a: i32, b: i32| {
        a.checked_sub(b)
            .ok_or_else(|| Error::InvalidInput(format!("Gaze offset {a} - {b} overflows")))
    };
    let vector = GazeVector::new(offset(center.x, nose.x)?, offset(center.y, nose.y)?);

    Ok(GazeEstimate {
        left_iris,
        right_iris,
        center,
        nose,
        vector,
    })
}

/// Draw iris markers and the nose-to-gaze arrow
///
/// # Errors
///
/// Returns an error if an `OpenCV` drawing call fails
pub fn draw_gaze(frame: &mut Mat, estimate: &GazeEstimate) -> Result<()> {
    let green = Scalar::new(0.0, 255.0, 0.0, 0.0);
    for iris in [estimate.left_iris, estimate.right_iris] {
        imgproc::circle(frame, iris, 2, green, -1, LINE_8, 0)?;
    }

    imgproc::arrowed_line(
        frame,
        estimate.nose,
        estimate.center,
        Scalar::new(0.0, 0.0, 255.0, 0.0),
        2,
        LINE_8,
        0,
        0.2,
    )?;

    Ok(())
}

/// Estimate gaze on one frame
///
/// Returns the gaze vector of the first detected face together with an
/// annotated copy of the frame. When no face is found the vector is `None`
/// and the copy carries no overlay.
///
/// # Errors
///
/// Returns an error if detection, landmark lookup or drawing fails
pub fn estimate_gaze<D>(frame: &Mat, detector: &mut D) -> Result<(Option<GazeVector>, Mat)>
where
    D: LandmarkDetector + ?Sized,
{
    let faces = detector.process(frame)?;
    let mut annotated = frame.try_clone()?;

    let Some(face) = faces.first() else {
        return Ok((None, annotated));
    };

    let estimate = compute_gaze(face, frame.cols(), frame.rows())?;
    draw_gaze(&mut annotated, &estimate)?;

    Ok((Some(estimate.vector), annotated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{constants::NUM_REFINED_LANDMARKS, landmarks::NormalizedLandmark};

    fn mesh_with(points: &[(usize, f32, f32)]) -> FaceLandmarks {
        let mut all = vec![NormalizedLandmark::default(); NUM_REFINED_LANDMARKS];
        for &(idx, x, y) in points {
            all[idx] = NormalizedLandmark::new(x, y);
        }
        FaceLandmarks::new(all)
    }

    #[test]
    fn test_iris_center_truncates_mean() {
        // x: (1 + 2 + 2 + 2) / 4 = 1.75 -> 1
        let mesh = mesh_with(&[(469, 0.015_625, 0.0), (470, 0.031_25, 0.0), (471, 0.031_25, 0.0), (472, 0.031_25, 0.0)]);
        let c = iris_center(&mesh, &RIGHT_IRIS_INDICES, 64, 64).unwrap();
        assert_eq!(c, Point::new(1, 0));
    }

    #[test]
    fn test_midpoint_uses_floor_division() {
        // left iris at x=0, right iris at x=3 -> midpoint 1
        let mut points = Vec::new();
        for idx in LEFT_IRIS_INDICES {
            points.push((idx, 0.0, 0.0));
        }
        for idx in RIGHT_IRIS_INDICES {
            points.push((idx, 0.046_875, 0.0));
        }
        let mesh = mesh_with(&points);
        let est = compute_gaze(&mesh, 64, 64).unwrap();
        assert_eq!(est.center.x, 1);
    }

    #[test]
    fn test_extreme_landmarks_do_not_overflow() {
        // Both centroids near i32::MAX: the midpoint stays representable
        let mut points = Vec::new();
        for idx in LEFT_IRIS_INDICES.into_iter().chain(RIGHT_IRIS_INDICES) {
            points.push((idx, 1.0e6, 0.0));
        }
        let mesh = mesh_with(&points);
        let est = compute_gaze(&mesh, 2000, 64).unwrap();
        assert_eq!(est.center.x, est.left_iris.x);

        // Nose far negative: the offset leaves the i32 range
        points.push((NOSE_TIP_INDEX, -1.0e6, 0.0));
        let mesh = mesh_with(&points);
        assert!(matches!(compute_gaze(&mesh, 2000, 64), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_missing_iris_landmarks() {
        let mesh = FaceLandmarks::new(vec![NormalizedLandmark::default(); 468]);
        assert!(compute_gaze(&mesh, 640, 480).is_err());
    }
}
