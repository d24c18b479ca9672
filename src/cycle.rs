// cycle.rs
use crate::config::{AppConfig, ScreenshotBackend, StoreBackend};
use crate::db::connection::{init_db, Database};
use crate::db::listings::SqliteStore;
use crate::db::scrapes::{end_scrape_run, start_scrape_run};
use crate::google::{DriveClient, GoogleApi, SheetsStore};
use crate::scraper::dedup::KnownUrls;
use crate::scraper::fetcher::HttpFetcher;
use crate::scraper::models::{default_catalogs, SOURCE_URL_COLUMN};
use crate::scraper::pacer::Pacer;
use crate::scraper::{Orchestrator, RunStats, ScraperError};
use crate::screenshots::{BrowserCapturer, LocalObjectStore};
use crate::status::StatusHandle;
use crate::store::{ListingStore, ObjectStore};
use chrono::Utc;
use std::thread::JoinHandle;
use tracing::{error, info, warn};

/// One full cycle, unless another one is already running (`None`).
pub fn run_cycle(
    config: &AppConfig,
    status: &StatusHandle,
) -> Option<Result<RunStats, ScraperError>> {
    if !status.try_begin(Utc::now()) {
        return None;
    }
    Some(execute_cycle(config, status))
}

/// Start a cycle on its own thread. `None` if one is already running.
pub fn spawn_cycle(
    config: AppConfig,
    status: StatusHandle,
) -> Option<Result<JoinHandle<()>, ScraperError>> {
    if !status.try_begin(Utc::now()) {
        return None;
    }

    let spawned = std::thread::Builder::new()
        .name("scrape-cycle".into())
        .spawn({
            let status = status.clone();
            move || {
                if let Err(e) = execute_cycle(&config, &status) {
                    error!(error = %e, "scrape cycle failed");
                }
            }
        })
        .map_err(|e| {
            let err = ScraperError::Io(e);
            status.finish(Utc::now(), &Err(ScraperError::Bootstrap(err.to_string())));
            err
        });

    Some(spawned)
}

/// Body of a cycle already marked as running on `status`. Always calls `finish`.
pub fn execute_cycle(config: &AppConfig, status: &StatusHandle) -> Result<RunStats, ScraperError> {
    let history = Database::new(config.database_path.clone());
    let run_id = init_db(&history)
        .and_then(|_| start_scrape_run(&history, Utc::now().timestamp()))
        .map_err(|e| warn!(error = %e, "run history unavailable"))
        .ok();

    let result = crawl(config, status);

    match &result {
        Ok(stats) => info!(
            new = stats.new_listings,
            skipped = stats.skipped_duplicates,
            pages = stats.pages_visited,
            persisted = stats.rows_persisted,
            "cycle complete"
        ),
        Err(e) => error!(error = %e, "cycle aborted"),
    }

    if let Some(id) = run_id {
        let error = result.as_ref().err().map(|e| e.to_string());
        if let Err(e) = end_scrape_run(&history, id, Utc::now().timestamp(), result.as_ref().ok(), error) {
            warn!(error = %e, "could not record run history");
        }
    }

    status.finish(Utc::now(), &result);
    result
}

fn crawl(config: &AppConfig, status: &StatusHandle) -> Result<RunStats, ScraperError> {
    config.validate()?;

    let store = open_store(config).map_err(bootstrap)?;
    let column = store
        .column_values(SOURCE_URL_COLUMN)
        .map_err(|e| ScraperError::Bootstrap(format!("reading known URLs: {e}")))?;
    let mut known = KnownUrls::from_column(&column);
    if known.is_empty() {
        info!("store holds no listing URLs yet, every listing is new");
    } else {
        info!(known = known.len(), "known URLs loaded");
    }

    let fetcher = HttpFetcher::new(config.retry()).map_err(bootstrap)?;
    let capturer = build_capturer(config).map_err(bootstrap)?;
    let pacer = if config.no_delay {
        Pacer::disabled()
    } else {
        Pacer::default()
    };

    let mut orchestrator = Orchestrator::new(&fetcher, store.as_ref())
        .with_pacer(pacer)
        .with_retry(config.retry())
        .with_batch_size(config.batch_size)
        .with_max_pages(config.max_pages);
    if let Some(capturer) = &capturer {
        orchestrator = orchestrator.with_capturer(capturer);
    }

    Ok(orchestrator.run(&default_catalogs(), &mut known, status))
}

pub fn open_store(config: &AppConfig) -> Result<Box<dyn ListingStore>, ScraperError> {
    match config.store {
        StoreBackend::Sqlite => {
            let db = Database::new(config.database_path.clone());
            Ok(Box::new(SqliteStore::open(db)?))
        }
        StoreBackend::Sheets => {
            let api = GoogleApi::new(config.token()?)?;
            let spreadsheet_id = DriveClient::new(api.clone()).find_spreadsheet(&config.sheet_name)?;
            info!(sheet = %config.sheet_name, "spreadsheet opened");
            Ok(Box::new(SheetsStore::new(api, spreadsheet_id)))
        }
    }
}

fn build_capturer(config: &AppConfig) -> Result<Option<BrowserCapturer>, ScraperError> {
    let store: Box<dyn ObjectStore> = match config.screenshots {
        ScreenshotBackend::None => return Ok(None),
        ScreenshotBackend::Drive => Box::new(DriveClient::new(GoogleApi::new(config.token()?)?)),
        ScreenshotBackend::Local => Box::new(LocalObjectStore::new(config.screenshots_dir.clone())),
    };
    BrowserCapturer::new(store, config.screenshot_config()).map(Some)
}

fn bootstrap(e: ScraperError) -> ScraperError {
    match e {
        ScraperError::Bootstrap(_) => e,
        other => ScraperError::Bootstrap(other.to_string()),
    }
}
