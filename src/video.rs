//! Camera and video file sources.

use crate::{Error, Result};
use log::{debug, info};
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture, CAP_PROP_BUFFERSIZE, CAP_PROP_POS_FRAMES},
};
use std::path::Path;

/// A source of BGR frames
pub trait FrameSource {
    /// Read the next frame into `frame`
    ///
    /// Returns `Ok(false)` when no frame is available (end of stream or a
    /// failed grab).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails
    fn read_frame(&mut self, frame: &mut Mat) -> Result<bool>;

    /// Seek back to the first frame
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot seek
    fn rewind(&mut self) -> Result<()>;

    /// Release the underlying device or file handle
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to close
    fn release(&mut self) -> Result<()> {
        Ok(())
    }
}

impl FrameSource for VideoCapture {
    fn read_frame(&mut self, frame: &mut Mat) -> Result<bool> {
        Ok(self.read(frame)? && !frame.empty())
    }

    fn rewind(&mut self) -> Result<()> {
        self.set(CAP_PROP_POS_FRAMES, 0.0)?;
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        VideoCaptureTrait::release(self)?;
        Ok(())
    }
}

/// Open a webcam by index
///
/// # Errors
///
/// Returns an error if the device cannot be opened
pub fn open_camera(index: i32) -> Result<VideoCapture> {
    info!("Opening camera {}", index);
    let mut cap = VideoCapture::new(index, videoio::CAP_ANY)?;
    if !cap.is_opened()? {
        return Err(Error::VideoOpen(format!("camera {index}")));
    }

    // Reduce buffer size for lower latency
    cap.set(CAP_PROP_BUFFERSIZE, 1.0)?;
    Ok(cap)
}

/// Open a video file
///
/// # Errors
///
/// Returns an error if the path is not valid UTF-8 or the file cannot be
/// opened by any backend
pub fn open_video_file<P: AsRef<Path>>(path: P) -> Result<VideoCapture> {
    let path = path.as_ref();
    info!("Opening video file: {}", path.display());
    let path_str = path
        .to_str()
        .ok_or_else(|| Error::InvalidInput(format!("Non UTF-8 video path: {}", path.display())))?;

    let cap = VideoCapture::from_file(path_str, videoio::CAP_ANY)?;
    if !cap.is_opened()? {
        return Err(Error::VideoOpen(path.display().to_string()));
    }
    Ok(cap)
}

/// Looping playback over a frame source
///
/// On end of stream the source is rewound to frame 0 and read once more.
/// There is no further retry: if that read also fails the tick simply has no
/// video frame. A source that never delivered a frame is reported as
/// [`Error::EmptyVideo`].
pub struct LoopingPlayback<S: FrameSource> {
    source: S,
    name: String,
    frames_delivered: u64,
    rewinds: u64,
}

impl<S: FrameSource> LoopingPlayback<S> {
    pub fn new(source: S, name: impl Into<String>) -> Self {
        Self {
            source,
            name: name.into(),
            frames_delivered: 0,
            rewinds: 0,
        }
    }

    /// Read the next frame, rewinding once on end of stream
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyVideo`] if the source has no frames at all, or
    /// any backend error from reading or seeking
    pub fn read_next(&mut self, frame: &mut Mat) -> Result<bool> {
        if self.source.read_frame(frame)? {
            self.frames_delivered += 1;
            return Ok(true);
        }

        debug!("End of '{}' reached, rewinding", self.name);
        self.source.rewind()?;
        self.rewinds += 1;

        if self.source.read_frame(frame)? {
            self.frames_delivered += 1;
            return Ok(true);
        }

        if self.frames_delivered == 0 {
            return Err(Error::EmptyVideo(self.name.clone()));
        }
        Ok(false)
    }

    /// Source name used in log messages
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn frames_delivered(&self) -> u64 {
        self.frames_delivered
    }

    #[must_use]
    pub fn rewinds(&self) -> u64 {
        self.rewinds
    }

    /// Release the source and consume the playback
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to close
    pub fn release(mut self) -> Result<()> {
        info!("Releasing video source '{}'", self.name);
        self.source.release()
    }
}
