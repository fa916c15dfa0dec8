//! Main application module for the attention meter.

use crate::{
    config::Config,
    constants::{KEY_ESCAPE, KEY_LOAD_VIDEO, KEY_QUIT},
    display::Renderer,
    error::Result,
    face_mesh::FaceMesh,
    file_dialog::{NativeVideoPicker, VideoPicker},
    tracker::{AttentionTracker, TickOutput},
    video::{open_camera, open_video_file},
};
use log::{debug, info, warn};
use opencv::{highgui, videoio::VideoCapture};
use std::{
    path::Path,
    time::{Duration, Instant},
};

/// Main application struct
pub struct AttentionApp {
    tracker: AttentionTracker<FaceMesh, VideoCapture, VideoCapture>,
    renderer: Renderer,
    picker: Box<dyn VideoPicker>,
    interval: Duration,
}

impl AttentionApp {
    /// Open the camera, load the models and create the window
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the camera cannot
    /// be opened, a model fails to load or the window cannot be created
    pub fn new(config: &Config, initial_video: Option<&Path>) -> Result<Self> {
        info!("Initializing attention meter");
        config.validate()?;

        let camera = open_camera(config.camera.index)?;
        let detector = FaceMesh::new(
            &config.models.face_detector,
            &config.models.face_landmarks,
            config.face_mesh.clone(),
        )?;

        let mut tracker = AttentionTracker::new(detector, camera, config.roi, config.timer.seconds_per_frame());
        if let Some(path) = initial_video {
            load_into(&mut tracker, path);
        }

        let renderer = Renderer::new(&config.display);
        renderer.open_window()?;

        Ok(Self {
            tracker,
            renderer,
            picker: Box::new(NativeVideoPicker::default()),
            interval: Duration::from_millis(config.timer.interval_ms),
        })
    }

    /// Run the main application loop until the user quits
    ///
    /// # Errors
    ///
    /// Returns an error if drawing or the window system fails
    pub fn run(&mut self) -> Result<()> {
        info!("Starting main loop with {} ms tick", self.interval.as_millis());

        loop {
            let started = Instant::now();

            if self.renderer.take_load_request() {
                self.load_video();
            }

            let output = self.tracker.tick()?;
            self.present(&output)?;

            // Wait out the rest of the tick so the period stays fixed
            let remaining = self.interval.saturating_sub(started.elapsed()).as_millis().max(1);
            let key = highgui::wait_key(i32::try_from(remaining).unwrap_or(i32::MAX))?;
            if key == KEY_ESCAPE || key == KEY_QUIT {
                info!("Exit requested by user");
                break;
            }
            if key == KEY_LOAD_VIDEO {
                self.renderer.request_load();
            }

            if !self.renderer.is_open()? {
                info!("Window closed");
                break;
            }
        }

        self.tracker.release_video();
        let counters = self.tracker.counters();
        info!(
            "Application shutting down: {} of {} frames attentive",
            counters.attentive_frames(),
            counters.total_frames()
        );
        Ok(())
    }

    /// Ask the user for a video and swap it in
    fn load_video(&mut self) {
        let Some(path) = self.picker.pick_video() else {
            debug!("Video selection cancelled");
            return;
        };
        load_into(&mut self.tracker, &path);
    }

    /// Push one tick's output to the window
    fn present(&mut self, output: &TickOutput) -> Result<()> {
        if let Some(frame) = &output.camera_frame {
            self.renderer.set_camera(frame)?;
        }
        if let Some(frame) = &output.video_frame {
            self.renderer.set_video(frame)?;
        }
        if let Some(summary) = &output.summary {
            self.renderer.set_stats(summary.to_string());
        }
        if let (Some(gaze), Some(attentive)) = (output.gaze, output.attentive) {
            debug!("Gaze ({}, {}) attentive: {}", gaze.dx, gaze.dy, attentive);
        }
        self.renderer.show()
    }
}

/// Swap the tracker's video for `path`, logging a failed open
fn load_into(tracker: &mut AttentionTracker<FaceMesh, VideoCapture, VideoCapture>, path: &Path) {
    if let Err(e) = tracker.replace_video(path.display().to_string(), || open_video_file(path)) {
        warn!("Could not open video {}: {}", path.display(), e);
    }
}
