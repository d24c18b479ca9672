mod capturer;
mod local_store;
mod session;

pub use capturer::{screenshot_file_name, BrowserCapturer};
pub use local_store::LocalObjectStore;

use crate::scraper::ScraperError;
use std::path::PathBuf;
use std::time::Duration;

/// Renders a listing and returns a public reference to the image.
pub trait ScreenshotCapture {
    fn capture(&self, url: &str) -> Result<String, ScraperError>;
}

#[derive(Debug, Clone)]
pub struct ScreenshotConfig {
    pub root_folder: String,
    pub subfolder: String,
    /// Where the JPEG is written before upload.
    pub local_dir: PathBuf,
    pub chrome_path: Option<PathBuf>,
    pub quality: i64,
    pub window_width: u32,
    pub window_height: u32,
    pub navigation_timeout: Duration,
    pub settle_delay: Duration,
    /// Extra time allowed for the capture itself on top of navigation + settle.
    pub capture_slack: Duration,
}

impl Default for ScreenshotConfig {
    fn default() -> Self {
        Self {
            root_folder: "Imot Screenshots".into(),
            subfolder: "listings".into(),
            local_dir: PathBuf::from("screenshots"),
            chrome_path: None,
            quality: 60,
            window_width: 1366,
            window_height: 900,
            navigation_timeout: Duration::from_secs(30),
            settle_delay: Duration::from_secs(2),
            capture_slack: Duration::from_secs(20),
        }
    }
}
