//! Video file chooser.

use std::path::PathBuf;

/// Something that lets the user choose a video file
pub trait VideoPicker {
    /// Ask for a video; `None` means the user cancelled
    fn pick_video(&mut self) -> Option<PathBuf>;
}

/// Native file chooser backed by `rfd`
#[derive(Debug, Clone)]
pub struct NativeVideoPicker {
    title: String,
}

impl NativeVideoPicker {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into() }
    }
}

impl Default for NativeVideoPicker {
    fn default() -> Self {
        Self::new("Select video")
    }
}

impl VideoPicker for NativeVideoPicker {
    fn pick_video(&mut self) -> Option<PathBuf> {
        rfd::FileDialog::new()
            .set_title(&self.title)
            .add_filter("Video", &["mp4", "avi", "mov", "mkv", "webm", "m4v", "mpg", "mpeg", "wmv"])
            .add_filter("All files", &["*"])
            .pick_file()
    }
}
