// capturer.rs
use crate::scraper::ScraperError;
use crate::screenshots::session::BrowserSession;
use crate::screenshots::{ScreenshotCapture, ScreenshotConfig};
use crate::store::ObjectStore;
use sha2::{Digest, Sha256};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;
use tracing::{info, warn};

/// Local screenshot file, removed when dropped.
struct LocalArtifact(PathBuf);

impl Drop for LocalArtifact {
    fn drop(&mut self) {
        if self.0.exists() {
            if let Err(e) = std::fs::remove_file(&self.0) {
                warn!(path = %self.0.display(), error = %e, "could not remove local screenshot");
            }
        }
    }
}

/// Headless-browser screenshots uploaded to an object store.
///
/// Browser work runs on a private current-thread runtime; everything else in
/// the pipeline stays blocking.
pub struct BrowserCapturer {
    runtime: Runtime,
    store: Box<dyn ObjectStore>,
    config: ScreenshotConfig,
    folder_id: RefCell<Option<String>>,
}

impl BrowserCapturer {
    pub fn new(store: Box<dyn ObjectStore>, config: ScreenshotConfig) -> Result<Self, ScraperError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ScraperError::Config(format!("screenshot runtime: {e}")))?;

        std::fs::create_dir_all(&config.local_dir)?;

        Ok(Self {
            runtime,
            store,
            config,
            folder_id: RefCell::new(None),
        })
    }

    /// `<root>/<subfolder>`, created on first use and remembered afterwards.
    fn destination_folder(&self) -> Result<String, ScraperError> {
        if let Some(id) = self.folder_id.borrow().as_ref() {
            return Ok(id.clone());
        }

        let root = self.store.ensure_folder(&self.config.root_folder, None)?;
        let sub = self
            .store
            .ensure_folder(&self.config.subfolder, Some(&root))?;
        info!(folder = %self.config.subfolder, id = %sub, "screenshot folder resolved");

        *self.folder_id.borrow_mut() = Some(sub.clone());
        Ok(sub)
    }

    fn render(&self, url: &str, path: &Path) -> Result<(), ScraperError> {
        let config = &self.config;
        self.runtime.block_on(async {
            let session = BrowserSession::launch(config).await?;
            let outcome = tokio::time::timeout(
                config.navigation_timeout + config.settle_delay + config.capture_slack,
                session.capture(url, path, config),
            )
            .await
            .unwrap_or_else(|_| Err(ScraperError::Capture("capture timed out".into())));
            session.shutdown().await;
            outcome
        })
    }
}

impl ScreenshotCapture for BrowserCapturer {
    fn capture(&self, url: &str) -> Result<String, ScraperError> {
        let name = screenshot_file_name(url);
        let artifact = LocalArtifact(self.config.local_dir.join(&name));

        let uploaded = self.render(url, &artifact.0).and_then(|_| {
            let bytes = std::fs::read(&artifact.0)?;
            let folder = self.destination_folder()?;
            let object_id = self
                .store
                .upload(&folder, &name, bytes, mime::IMAGE_JPEG.as_ref())?;
            self.store.share_public(&object_id)
        });

        match uploaded {
            Ok(link) => {
                info!(%url, %link, "screenshot uploaded");
                Ok(link)
            }
            Err(e @ ScraperError::Capture(_)) => Err(e),
            Err(other) => Err(ScraperError::Capture(other.to_string())),
        }
    }
}

/// Stable per-listing file name: `listing_<first 16 hex of sha256(url)>.jpg`.
pub fn screenshot_file_name(url: &str) -> String {
    let digest = Sha256::digest(url.trim().as_bytes());
    let hex = hex::encode(digest);
    format!("listing_{}.jpg", &hex[..16])
}
