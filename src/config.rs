// config.rs
use crate::scraper::batch::DEFAULT_BATCH_SIZE;
use crate::scraper::catalog::DEFAULT_MAX_PAGES;
use crate::scraper::retry::RetryPolicy;
use crate::scraper::ScraperError;
use crate::screenshots::ScreenshotConfig;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "imot_scraper", version, about = "Crawls imot.bg catalogs into a listing sheet")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one scrape cycle and exit.
    Run(AppConfig),
    /// Serve the status dashboard and run cycles on a schedule.
    Serve {
        #[command(flatten)]
        config: AppConfig,
        #[arg(long, env = "PORT", default_value_t = 3000)]
        port: u16,
        #[arg(long, env = "SCHEDULE_HOURS", default_value_t = 6)]
        schedule_hours: u64,
        /// Don't start the periodic scheduler.
        #[arg(long)]
        no_schedule: bool,
    },
    /// Write the local SQLite store to an .xlsx workbook.
    Export {
        #[arg(long, env = "DATABASE_PATH", default_value = "imot_scraper.sqlite3")]
        database_path: String,
        #[arg(long, short, default_value = "listings.xlsx")]
        output: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    Sqlite,
    Sheets,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScreenshotBackend {
    None,
    Drive,
    Local,
}

/// Settings shared by every cycle.
#[derive(Debug, Clone, Args)]
pub struct AppConfig {
    #[arg(long, env = "STORE_BACKEND", value_enum, default_value_t = StoreBackend::Sqlite)]
    pub store: StoreBackend,

    #[arg(long, env = "GOOGLE_SHEET_NAME", default_value = "Imot Data Extractor")]
    pub sheet_name: String,

    #[arg(long, env = "GOOGLE_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    #[arg(long, env = "DATABASE_PATH", default_value = "imot_scraper.sqlite3")]
    pub database_path: String,

    #[arg(long, env = "BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    #[arg(long, env = "MAX_PAGES", default_value_t = DEFAULT_MAX_PAGES)]
    pub max_pages: usize,

    #[arg(long, env = "RETRY_ATTEMPTS", default_value_t = 3)]
    pub retry_attempts: u32,

    #[arg(long, env = "SCREENSHOT_BACKEND", value_enum, default_value_t = ScreenshotBackend::None)]
    pub screenshots: ScreenshotBackend,

    #[arg(long, env = "SCREENSHOTS_ROOT", default_value = "Imot Screenshots")]
    pub screenshots_root: String,

    #[arg(long, env = "SCREENSHOTS_SUBFOLDER", default_value = "listings")]
    pub screenshots_subfolder: String,

    #[arg(long, env = "SCREENSHOTS_DIR", default_value = "screenshots")]
    pub screenshots_dir: PathBuf,

    #[arg(long, env = "CHROME_PATH")]
    pub chrome_path: Option<PathBuf>,

    /// Skip the politeness delays.
    #[arg(long)]
    pub no_delay: bool,
}

impl AppConfig {
    /// Reject settings no cycle could run with.
    pub fn validate(&self) -> Result<(), ScraperError> {
        if self.batch_size == 0 {
            return Err(ScraperError::Config("BATCH_SIZE must be at least 1".into()));
        }
        if self.max_pages == 0 {
            return Err(ScraperError::Config("MAX_PAGES must be at least 1".into()));
        }
        if self.retry_attempts == 0 {
            return Err(ScraperError::Config("RETRY_ATTEMPTS must be at least 1".into()));
        }
        Ok(())
    }

    pub fn retry(&self) -> RetryPolicy {
        RetryPolicy::with_attempts(self.retry_attempts)
    }

    /// The bearer token, required by every Google backend.
    pub fn token(&self) -> Result<&str, ScraperError> {
        self.access_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ScraperError::Bootstrap("GOOGLE_ACCESS_TOKEN is not set".into()))
    }

    pub fn screenshot_config(&self) -> ScreenshotConfig {
        ScreenshotConfig {
            root_folder: self.screenshots_root.clone(),
            subfolder: self.screenshots_subfolder.clone(),
            local_dir: self.screenshots_dir.clone(),
            chrome_path: self.chrome_path.clone(),
            ..ScreenshotConfig::default()
        }
    }
}
