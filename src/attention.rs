//! Region-of-interest hit testing and attention statistics.

use crate::{constants::DEFAULT_ROI, gaze::GazeVector, Error, Result};
use opencv::core::Point;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Axis-aligned region of interest in camera frame pixels
///
/// Both corners are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roi {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Default for Roi {
    fn default() -> Self {
        let (x1, y1, x2, y2) = DEFAULT_ROI;
        Self { x1, y1, x2, y2 }
    }
}

impl Roi {
    #[must_use]
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Inclusive point-in-rectangle test
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        (self.x1..=self.x2).contains(&point.x) && (self.y1..=self.y2).contains(&point.y)
    }

    /// Check that the corners are ordered
    ///
    /// # Errors
    ///
    /// Returns an error if `x1 > x2` or `y1 > y2`
    pub fn validate(&self) -> Result<()> {
        if self.x1 > self.x2 || self.y1 > self.y2 {
            return Err(Error::ConfigError(format!(
                "ROI corners out of order: ({}, {}) - ({}, {})",
                self.x1, self.y1, self.x2, self.y2
            )));
        }
        Ok(())
    }

    /// Top-left corner
    #[must_use]
    pub fn top_left(&self) -> Point {
        Point::new(self.x1, self.y1)
    }

    /// Bottom-right corner
    #[must_use]
    pub fn bottom_right(&self) -> Point {
        Point::new(self.x2, self.y2)
    }
}

impl FromStr for Roi {
    type Err = Error;

    /// Parse `x1,y1,x2,y2`
    fn from_str(s: &str) -> Result<Self> {
        let values = s
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<i32>()
                    .map_err(|e| Error::InvalidInput(format!("Invalid ROI value '{part}': {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        match values.as_slice() {
            &[x1, y1, x2, y2] => {
                let roi = Self::new(x1, y1, x2, y2);
                roi.validate()?;
                Ok(roi)
            }
            _ => Err(Error::InvalidInput(format!(
                "ROI must have 4 comma-separated values, got {}",
                values.len()
            ))),
        }
    }
}

/// Gaze point on the camera frame: frame center displaced by the gaze vector
///
/// # Errors
///
/// Returns an error if the displaced point leaves the `i32` range
pub fn gaze_point(frame_width: i32, frame_height: i32, vector: GazeVector) -> Result<Point> {
    let x = frame_width.div_euclid(2).checked_add(vector.dx);
    let y = frame_height.div_euclid(2).checked_add(vector.dy);
    match (x, y) {
        (Some(x), Some(y)) => Ok(Point::new(x, y)),
        _ => Err(Error::InvalidInput(format!(
            "Gaze vector ({}, {}) overflows pixel coordinates",
            vector.dx, vector.dy
        ))),
    }
}

/// Frame counters for the running attention estimate
///
/// `attentive_frames` never exceeds `total_frames`: both are only advanced
/// through [`AttentionCounters::record`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttentionCounters {
    total_frames: u64,
    attentive_frames: u64,
}

impl AttentionCounters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one scored frame
    pub fn record(&mut self, attentive: bool) {
        self.total_frames += 1;
        if attentive {
            self.attentive_frames += 1;
        }
    }

    #[must_use]
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    #[must_use]
    pub fn attentive_frames(&self) -> u64 {
        self.attentive_frames
    }

    /// Summary for display, `None` until a frame has been scored
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Frame counts stay far below 2^52
    pub fn summary(&self, seconds_per_frame: f64) -> Option<AttentionSummary> {
        if self.total_frames == 0 {
            return None;
        }
        let total = self.total_frames as f64;
        let attentive = self.attentive_frames as f64;
        Some(AttentionSummary {
            total_frames: self.total_frames,
            attentive_frames: self.attentive_frames,
            attentive_percent: attentive / total * 100.0,
            total_seconds: total * seconds_per_frame,
            attentive_seconds: attentive * seconds_per_frame,
        })
    }
}

/// Derived attention statistics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttentionSummary {
    pub total_frames: u64,
    pub attentive_frames: u64,
    pub attentive_percent: f64,
    pub total_seconds: f64,
    pub attentive_seconds: f64,
}

impl fmt::Display for AttentionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Frames: {}, Attention inside ROI: {} ({:.1}%)",
            self.total_frames, self.attentive_frames, self.attentive_percent
        )?;
        write!(
            f,
            "Total time: {:.1}s, Attentive: {:.1}s",
            self.total_seconds, self.attentive_seconds
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_roi_boundaries_are_inclusive() {
        let roi = Roi::new(100, 50, 380, 310);
        assert!(roi.contains(Point::new(100, 200)));
        assert!(roi.contains(Point::new(380, 200)));
        assert!(roi.contains(Point::new(200, 50)));
        assert!(roi.contains(Point::new(200, 310)));
        assert!(roi.contains(Point::new(100, 50)));
        assert!(roi.contains(Point::new(380, 310)));

        assert!(!roi.contains(Point::new(99, 200)));
        assert!(!roi.contains(Point::new(381, 200)));
        assert!(!roi.contains(Point::new(200, 49)));
        assert!(!roi.contains(Point::new(200, 311)));
    }

    #[test]
    fn test_roi_parse() {
        assert_eq!("100,50,380,310".parse::<Roi>().unwrap(), Roi::default());
        assert_eq!(" 1, 2 ,3,4".parse::<Roi>().unwrap(), Roi::new(1, 2, 3, 4));
        assert!("1,2,3".parse::<Roi>().is_err());
        assert!("1,2,3,x".parse::<Roi>().is_err());
        assert!("10,10,5,20".parse::<Roi>().is_err());
    }

    #[test]
    fn test_gaze_point_from_frame_center() {
        assert_eq!(gaze_point(480, 360, GazeVector::new(10, -5)).unwrap(), Point::new(250, 175));
        assert_eq!(gaze_point(641, 481, GazeVector::default()).unwrap(), Point::new(320, 240));
    }

    #[test]
    fn test_gaze_point_overflow_is_an_error() {
        assert!(matches!(
            gaze_point(3840, 2160, GazeVector::new(i32::MAX, 0)),
            Err(Error::InvalidInput(_))
        ));
        assert!(gaze_point(3840, 2160, GazeVector::new(0, i32::MIN)).is_ok());
    }

    #[test]
    fn test_summary_absent_before_first_frame() {
        assert!(AttentionCounters::new().summary(0.03).is_none());
    }

    #[test]
    fn test_summary_text() {
        let mut counters = AttentionCounters::new();
        counters.record(true);
        counters.record(true);
        counters.record(true);
        counters.record(false);

        let summary = counters.summary(0.03).unwrap();
        assert_eq!(
            summary.to_string(),
            "Frames: 4, Attention inside ROI: 3 (75.0%)\nTotal time: 0.1s, Attentive: 0.1s"
        );
    }

    proptest! {
        #[test]
        fn prop_attentive_never_exceeds_total(hits in proptest::collection::vec(any::<bool>(), 0..200)) {
            let mut counters = AttentionCounters::new();
            for hit in &hits {
                counters.record(*hit);
                prop_assert!(counters.attentive_frames() <= counters.total_frames());
            }
            prop_assert_eq!(counters.total_frames(), hits.len() as u64);
        }
    }
}
