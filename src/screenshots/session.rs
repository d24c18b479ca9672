// session.rs
use crate::scraper::ScraperError;
use crate::screenshots::ScreenshotConfig;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::path::Path;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Resolves once no new resource entries have appeared for 500 ms and the document is complete.
const NETWORK_IDLE_SCRIPT: &str = r#"
    new Promise((resolve) => {
        let last = performance.getEntriesByType('resource').length;
        let quiet = 0;
        const timer = setInterval(() => {
            const now = performance.getEntriesByType('resource').length;
            if (now === last && document.readyState === 'complete') {
                quiet += 1;
            } else {
                quiet = 0;
                last = now;
            }
            if (quiet >= 5) {
                clearInterval(timer);
                resolve(true);
            }
        }, 100);
    })
"#;

/// One isolated headless browser. Call `shutdown` on every path; `Drop` only
/// stops the CDP handler task.
pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    pub async fn launch(config: &ScreenshotConfig) -> Result<Self, ScraperError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(config.window_width, config.window_height)
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--no-first-run")
            .arg("--hide-scrollbars");

        if let Some(path) = &config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        let browser_config = builder
            .build()
            .map_err(|e| ScraperError::Capture(format!("browser config: {e}")))?;

        let (browser, mut events) = Browser::launch(browser_config)
            .await
            .map_err(|e| ScraperError::Capture(format!("launch: {e}")))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Self { browser, handler })
    }

    /// Navigate to `url`, wait for the network to go quiet, settle, and write a
    /// full-page JPEG to `path`.
    pub async fn capture(
        &self,
        url: &str,
        path: &Path,
        config: &ScreenshotConfig,
    ) -> Result<(), ScraperError> {
        let page = self
            .browser
            .new_page(url)
            .await
            .map_err(|e| ScraperError::Capture(format!("navigate: {e}")))?;

        wait_for_network_idle(&page, config).await;
        tokio::time::sleep(config.settle_delay).await;

        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Jpeg)
            .quality(config.quality)
            .full_page(true)
            .build();

        page.save_screenshot(params, path)
            .await
            .map_err(|e| ScraperError::Capture(format!("screenshot: {e}")))?;

        debug!(%url, path = %path.display(), "screenshot written");
        Ok(())
    }

    /// Close the browser and reap the process.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "browser close failed, killing");
            let _ = self.browser.kill().await;
        }
        let _ = self.browser.wait().await;
        self.handler.abort();
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

async fn wait_for_network_idle(page: &Page, config: &ScreenshotConfig) {
    if let Err(e) = page.wait_for_navigation().await {
        debug!(error = %e, "wait_for_navigation failed");
    }

    match tokio::time::timeout(config.navigation_timeout, page.evaluate(NETWORK_IDLE_SCRIPT.to_string())).await {
        Ok(Ok(_)) => debug!("network idle"),
        Ok(Err(e)) => debug!(error = %e, "network idle probe failed"),
        Err(_) => warn!("timed out waiting for network idle"),
    }
}
