//! Per-tick attention tracking over a camera and an optional video.
//!
//! [`AttentionTracker`] owns the detector, the frame sources and the
//! counters. Each [`AttentionTracker::tick`] reads at most one camera frame
//! and one video frame; sources that fail are skipped for that tick.

use crate::{
    attention::{gaze_point, AttentionCounters, AttentionSummary, Roi},
    error::Error,
    gaze::{estimate_gaze, GazeVector},
    landmarks::LandmarkDetector,
    video::{FrameSource, LoopingPlayback},
    Result,
};
use log::{debug, info, warn};
use opencv::{
    core::{Mat, Point, Scalar},
    imgproc::{self, LINE_8},
    prelude::*,
    videoio::VideoCapture,
};

/// Which sources are active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    /// Only the webcam is read
    CameraOnly,
    /// The webcam and a looping reference video are read
    CameraAndVideo,
}

/// Everything produced by one tick
#[derive(Debug, Default)]
pub struct TickOutput {
    /// Annotated camera image, if a camera frame was read
    pub camera_frame: Option<Mat>,
    /// Reference video frame, if one was read
    pub video_frame: Option<Mat>,
    /// Gaze vector, if a face was detected
    pub gaze: Option<GazeVector>,
    /// Gaze point on the camera frame, if a face was detected
    pub gaze_point: Option<Point>,
    /// Whether the gaze point fell inside the ROI
    pub attentive: Option<bool>,
    /// Running statistics, once at least one frame was scored
    pub summary: Option<AttentionSummary>,
}

/// Attention tracking state machine
pub struct AttentionTracker<D, C, V = VideoCapture>
where
    D: LandmarkDetector,
    C: FrameSource,
    V: FrameSource,
{
    detector: D,
    camera: C,
    video: Option<LoopingPlayback<V>>,
    roi: Roi,
    counters: AttentionCounters,
    seconds_per_frame: f64,
}

impl<D, C, V> AttentionTracker<D, C, V>
where
    D: LandmarkDetector,
    C: FrameSource,
    V: FrameSource,
{
    /// Create a tracker in camera-only mode
    pub fn new(detector: D, camera: C, roi: Roi, seconds_per_frame: f64) -> Self {
        Self {
            detector,
            camera,
            video: None,
            roi,
            counters: AttentionCounters::new(),
            seconds_per_frame,
        }
    }

    #[must_use]
    pub fn mode(&self) -> PlaybackMode {
        if self.video.is_some() {
            PlaybackMode::CameraAndVideo
        } else {
            PlaybackMode::CameraOnly
        }
    }

    #[must_use]
    pub fn counters(&self) -> &AttentionCounters {
        &self.counters
    }

    #[must_use]
    pub fn roi(&self) -> &Roi {
        &self.roi
    }

    /// Active video playback, if any
    #[must_use]
    pub fn video(&self) -> Option<&LoopingPlayback<V>> {
        self.video.as_ref()
    }

    /// Release the active video source, if any
    pub fn release_video(&mut self) {
        if let Some(video) = self.video.take() {
            let name = video.name().to_string();
            if let Err(e) = video.release() {
                warn!("Failed to release video '{}': {}", name, e);
            }
        }
    }

    /// Release the current video, then open and play a new one
    ///
    /// `open` runs only after the previous source has been released, so two
    /// video handles are never held at once. If it fails the tracker stays
    /// in [`PlaybackMode::CameraOnly`].
    ///
    /// # Errors
    ///
    /// Returns the error from `open`
    pub fn replace_video<F>(&mut self, name: impl Into<String>, open: F) -> Result<()>
    where
        F: FnOnce() -> Result<V>,
    {
        self.release_video();
        let source = open()?;
        let playback = LoopingPlayback::new(source, name);
        info!("Playing video '{}'", playback.name());
        self.video = Some(playback);
        Ok(())
    }

    /// Run one refresh tick
    ///
    /// # Errors
    ///
    /// Returns an error only if drawing the overlays fails; read and
    /// detection failures are logged and skipped
    pub fn tick(&mut self) -> Result<TickOutput> {
        let mut output = TickOutput::default();
        self.process_camera(&mut output)?;
        self.process_video(&mut output);
        output.summary = self.counters.summary(self.seconds_per_frame);
        Ok(output)
    }

    fn process_camera(&mut self, output: &mut TickOutput) -> Result<()> {
        let mut frame = Mat::default();
        match self.camera.read_frame(&mut frame) {
            Ok(true) => {}
            Ok(false) => {
                debug!("No camera frame this tick");
                return Ok(());
            }
            Err(e) => {
                debug!("Camera read failed: {}", e);
                return Ok(());
            }
        }

        let (gaze, mut annotated) = match estimate_gaze(&frame, &mut self.detector) {
            Ok(result) => result,
            Err(e) => {
                warn!("Gaze estimation failed: {}", e);
                return Ok(());
            }
        };

        let scored = gaze.and_then(|vector| match gaze_point(frame.cols(), frame.rows(), vector) {
            Ok(point) => Some((vector, point)),
            Err(e) => {
                warn!("Discarding gaze: {}", e);
                None
            }
        });

        if let Some((vector, point)) = scored {
            let attentive = self.roi.contains(point);
            self.counters.record(attentive);

            imgproc::circle(
                &mut annotated,
                point,
                4,
                Scalar::new(0.0, 255.0, 255.0, 0.0),
                -1,
                LINE_8,
                0,
            )?;

            output.gaze = Some(vector);
            output.gaze_point = Some(point);
            output.attentive = Some(attentive);
        }

        imgproc::rectangle_points(
            &mut annotated,
            self.roi.top_left(),
            self.roi.bottom_right(),
            Scalar::new(255.0, 0.0, 0.0, 0.0),
            2,
            LINE_8,
            0,
        )?;

        output.camera_frame = Some(annotated);
        Ok(())
    }

    fn process_video(&mut self, output: &mut TickOutput) {
        let Some(video) = self.video.as_mut() else {
            return;
        };

        let mut frame = Mat::default();
        match video.read_next(&mut frame) {
            Ok(true) => output.video_frame = Some(frame),
            Ok(false) => debug!("No video frame after rewind"),
            Err(Error::EmptyVideo(name)) => {
                warn!("Video '{}' has no frames, returning to camera only", name);
                self.release_video();
            }
            Err(e) => debug!("Video read failed: {}", e),
        }
    }
}
