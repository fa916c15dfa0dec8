//! Main window: camera pane, video pane, statistics text and a load button.

use crate::{config::DisplayConfig, Error, Result};
use opencv::{
    core::{Mat, Point, Rect, Scalar, Size, CV_8UC3},
    highgui::{self, WINDOW_AUTOSIZE},
    imgproc::{self, FONT_HERSHEY_SIMPLEX, LINE_8},
    prelude::*,
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

const MARGIN: i32 = 10;
const BUTTON_SIZE: (i32, i32) = (120, 30);
const BUTTON_LABEL: &str = "Load video";
const STATS_LINE_HEIGHT: i32 = 25;

/// Pixel layout of the window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowLayout {
    pub width: i32,
    pub height: i32,
    pub camera: Rect,
    pub video: Rect,
    pub stats: Rect,
    pub button: Rect,
}

impl WindowLayout {
    #[must_use]
    pub fn new(config: &DisplayConfig) -> Self {
        let (pw, ph) = (config.pane_width, config.pane_height);
        let stats_y = ph + 2 * MARGIN;
        Self {
            width: config.window_width,
            height: config.window_height,
            camera: Rect::new(MARGIN, MARGIN, pw, ph),
            video: Rect::new(pw + 2 * MARGIN, MARGIN, pw, ph),
            stats: Rect::new(
                MARGIN,
                stats_y,
                (config.window_width - 3 * MARGIN).max(0),
                (config.window_height - stats_y - 2 * MARGIN).max(0),
            ),
            // Overlays the bottom-left corner of the camera pane
            button: Rect::new(MARGIN, ph - 4 * MARGIN, BUTTON_SIZE.0, BUTTON_SIZE.1),
        }
    }

    /// Check that every pane, the stats area and the button lie inside the window
    ///
    /// # Errors
    ///
    /// Returns an error naming the first region that does not fit
    pub fn validate(&self) -> Result<()> {
        let window = Rect::new(0, 0, self.width, self.height);
        for (name, region) in [
            ("camera pane", self.camera),
            ("video pane", self.video),
            ("stats area", self.stats),
            ("load button", self.button),
        ] {
            let inside = region.width > 0
                && region.height > 0
                && region.x >= window.x
                && region.y >= window.y
                && region.x + region.width <= window.width
                && region.y + region.height <= window.height;
            if !inside {
                return Err(Error::ConfigError(format!(
                    "{name} {}x{} at ({}, {}) does not fit a {}x{} window",
                    region.width, region.height, region.x, region.y, self.width, self.height
                )));
            }
        }
        Ok(())
    }

    /// Whether a click at `(x, y)` lands on the load button
    #[must_use]
    pub fn button_hit(&self, x: i32, y: i32) -> bool {
        let b = self.button;
        x >= b.x && x < b.x + b.width && y >= b.y && y < b.y + b.height
    }
}

/// Window renderer
///
/// Panes keep their last image and the statistics keep their last text until
/// replaced, so a tick without new data leaves the window unchanged.
pub struct Renderer {
    title: String,
    layout: WindowLayout,
    camera: Option<Mat>,
    video: Option<Mat>,
    stats: Option<String>,
    load_requested: Arc<AtomicBool>,
}

impl Renderer {
    /// Create a renderer without opening a window
    #[must_use]
    pub fn new(config: &DisplayConfig) -> Self {
        Self {
            title: config.window_title.clone(),
            layout: WindowLayout::new(config),
            camera: None,
            video: None,
            stats: None,
            load_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn layout(&self) -> &WindowLayout {
        &self.layout
    }

    /// Create the window and hook up the load button
    ///
    /// # Errors
    ///
    /// Returns an error if highgui cannot create the window
    pub fn open_window(&self) -> Result<()> {
        highgui::named_window(&self.title, WINDOW_AUTOSIZE)?;

        let flag = Arc::clone(&self.load_requested);
        let layout = self.layout;
        highgui::set_mouse_callback(
            &self.title,
            Some(Box::new(move |event, x, y, _flags| {
                if event == highgui::EVENT_LBUTTONDOWN && layout.button_hit(x, y) {
                    flag.store(true, Ordering::SeqCst);
                }
            })),
        )?;
        Ok(())
    }

    /// Whether the window is still visible
    ///
    /// # Errors
    ///
    /// Returns an error if highgui cannot query the window
    pub fn is_open(&self) -> Result<bool> {
        Ok(highgui::get_window_property(&self.title, highgui::WND_PROP_VISIBLE)? >= 1.0)
    }

    /// Ask for the video chooser to open on the next tick
    pub fn request_load(&self) {
        self.load_requested.store(true, Ordering::SeqCst);
    }

    /// Consume a pending load request
    pub fn take_load_request(&self) -> bool {
        self.load_requested.swap(false, Ordering::SeqCst)
    }

    /// Replace the camera pane image
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be scaled
    pub fn set_camera(&mut self, frame: &Mat) -> Result<()> {
        self.camera = Some(scale_to(frame, self.layout.camera)?);
        Ok(())
    }

    /// Replace the video pane image
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be scaled
    pub fn set_video(&mut self, frame: &Mat) -> Result<()> {
        self.video = Some(scale_to(frame, self.layout.video)?);
        Ok(())
    }

    pub fn set_stats(&mut self, text: impl Into<String>) {
        self.stats = Some(text.into());
    }

    #[must_use]
    pub fn stats(&self) -> Option<&str> {
        self.stats.as_deref()
    }

    /// Paint the whole window into one image
    ///
    /// # Errors
    ///
    /// Returns an error if an `OpenCV` drawing call fails
    pub fn compose(&self) -> Result<Mat> {
        let mut canvas = Mat::new_rows_cols_with_default(
            self.layout.height,
            self.layout.width,
            CV_8UC3,
            Scalar::all(240.0),
        )?;

        for (image, pane) in [(&self.camera, self.layout.camera), (&self.video, self.layout.video)] {
            if let Some(image) = image {
                let mut roi = canvas.roi_mut(pane)?;
                image.copy_to(&mut roi)?;
            }
        }

        self.draw_button(&mut canvas)?;

        if let Some(text) = &self.stats {
            let stats = self.layout.stats;
            for (i, line) in (1..).zip(text.lines()) {
                imgproc::put_text(
                    &mut canvas,
                    line,
                    Point::new(stats.x, stats.y + i * STATS_LINE_HEIGHT),
                    FONT_HERSHEY_SIMPLEX,
                    0.6,
                    Scalar::all(0.0),
                    1,
                    LINE_8,
                    false,
                )?;
            }
        }

        Ok(canvas)
    }

    /// Show the composed window
    ///
    /// # Errors
    ///
    /// Returns an error if composing or `imshow` fails
    pub fn show(&self) -> Result<()> {
        let canvas = self.compose()?;
        highgui::imshow(&self.title, &canvas)?;
        Ok(())
    }

    fn draw_button(&self, canvas: &mut Mat) -> Result<()> {
        let button = self.layout.button;
        imgproc::rectangle(canvas, button, Scalar::all(225.0), -1, LINE_8, 0)?;
        imgproc::rectangle(canvas, button, Scalar::all(120.0), 1, LINE_8, 0)?;
        imgproc::put_text(
            canvas,
            BUTTON_LABEL,
            Point::new(button.x + 12, button.y + 20),
            FONT_HERSHEY_SIMPLEX,
            0.5,
            Scalar::all(0.0),
            1,
            LINE_8,
            false,
        )?;
        Ok(())
    }
}

/// Scale an image to exactly fill a pane, ignoring aspect ratio
fn scale_to(frame: &Mat, pane: Rect) -> Result<Mat> {
    let mut scaled = Mat::default();
    imgproc::resize(
        frame,
        &mut scaled,
        Size::new(pane.width, pane.height),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )?;
    Ok(scaled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::Vec3b;

    #[test]
    fn test_default_layout() {
        let layout = WindowLayout::new(&DisplayConfig::default());
        assert_eq!(layout.camera, Rect::new(10, 10, 480, 360));
        assert_eq!(layout.video, Rect::new(500, 10, 480, 360));
        assert_eq!(layout.stats, Rect::new(10, 380, 970, 100));
        assert_eq!(layout.button, Rect::new(10, 320, 120, 30));
    }

    #[test]
    fn test_layout_must_fit_window() {
        assert!(WindowLayout::new(&DisplayConfig::default()).validate().is_ok());

        let narrow = DisplayConfig {
            window_width: 960,
            window_height: 360,
            ..DisplayConfig::default()
        };
        assert!(matches!(WindowLayout::new(&narrow).validate(), Err(Error::ConfigError(_))));

        let short_panes = DisplayConfig {
            pane_height: 30,
            ..DisplayConfig::default()
        };
        assert!(WindowLayout::new(&short_panes).validate().is_err());
    }

    #[test]
    fn test_button_hit() {
        let layout = WindowLayout::new(&DisplayConfig::default());
        assert!(layout.button_hit(10, 320));
        assert!(layout.button_hit(129, 349));
        assert!(!layout.button_hit(130, 330));
        assert!(!layout.button_hit(50, 319));
    }

    #[test]
    fn test_load_request_is_consumed_once() {
        let renderer = Renderer::new(&DisplayConfig::default());
        assert!(!renderer.take_load_request());
        renderer.request_load();
        assert!(renderer.take_load_request());
        assert!(!renderer.take_load_request());
    }

    #[test]
    fn test_compose_places_scaled_video() {
        let mut renderer = Renderer::new(&DisplayConfig::default());
        let frame = Mat::new_rows_cols_with_default(120, 160, CV_8UC3, Scalar::new(0.0, 0.0, 255.0, 0.0)).unwrap();
        renderer.set_video(&frame).unwrap();

        let canvas = renderer.compose().unwrap();
        assert_eq!(canvas.cols(), 1000);
        assert_eq!(canvas.rows(), 500);
        assert_eq!(*canvas.at_2d::<Vec3b>(100, 700).unwrap(), Vec3b::from([0, 0, 255]));
        // Camera pane untouched
        assert_eq!(*canvas.at_2d::<Vec3b>(100, 200).unwrap(), Vec3b::from([240, 240, 240]));
    }

    #[test]
    fn test_stats_persist_until_replaced() {
        let mut renderer = Renderer::new(&DisplayConfig::default());
        assert!(renderer.stats().is_none());
        renderer.set_stats("Frames: 1");
        renderer.set_stats("Frames: 2");
        assert_eq!(renderer.stats(), Some("Frames: 2"));
    }
}
