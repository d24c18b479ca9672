// status.rs
use crate::scraper::{RunStats, ScraperError};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock};

/// Older successes than this make the service unhealthy.
pub const STALE_AFTER_HOURS: i64 = 25;
/// Without any success yet, uptime past this is unhealthy.
pub const FIRST_SUCCESS_GRACE_HOURS: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Starting,
    Scraping,
    Idle,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunStatus {
    pub started_at: DateTime<Utc>,
    pub last_scrape_start: Option<DateTime<Utc>>,
    pub last_scrape_end: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub total_ads_processed: usize,
    pub total_errors: usize,
    pub phase: Phase,
    pub is_running: bool,
    pub stop_requested: bool,
    pub last_run: Option<RunStats>,
    pub last_error: Option<String>,
}

impl RunStatus {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            started_at: now,
            last_scrape_start: None,
            last_scrape_end: None,
            last_success: None,
            total_ads_processed: 0,
            total_errors: 0,
            phase: Phase::Starting,
            is_running: false,
            stop_requested: false,
            last_run: None,
            last_error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Health {
    pub healthy: bool,
    pub message: String,
}

/// Shared run status. Clones point at the same record.
#[derive(Debug, Clone)]
pub struct StatusHandle {
    inner: Arc<RwLock<RunStatus>>,
}

impl StatusHandle {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(RunStatus::new(now))),
        }
    }

    pub fn snapshot(&self) -> RunStatus {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Apply `f` under the write lock.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut RunStatus),
    {
        let mut status = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut *status);
    }

    /// Mark a cycle as running. Returns false if one already is.
    pub fn try_begin(&self, now: DateTime<Utc>) -> bool {
        let mut status = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if status.is_running {
            return false;
        }
        status.is_running = true;
        status.stop_requested = false;
        status.phase = Phase::Scraping;
        status.last_scrape_start = Some(now);
        true
    }

    /// Record the end of the cycle started by `try_begin`.
    pub fn finish(&self, now: DateTime<Utc>, result: &Result<RunStats, ScraperError>) {
        self.update(|status| {
            status.is_running = false;
            status.stop_requested = false;
            status.last_scrape_end = Some(now);

            match result {
                Ok(stats) => {
                    status.phase = Phase::Idle;
                    status.last_success = Some(now);
                    status.total_ads_processed += stats.new_listings;
                    status.total_errors += stats.catalogs_failed;
                    status.last_run = Some(stats.clone());
                    status.last_error = None;
                }
                Err(e) => {
                    status.phase = Phase::Error;
                    status.total_errors += 1;
                    status.last_error = Some(e.to_string());
                }
            }
        });
    }

    /// Ask the running cycle to stop. Returns false when nothing is running.
    pub fn request_stop(&self) -> bool {
        let mut status = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if !status.is_running {
            return false;
        }
        status.stop_requested = true;
        true
    }

    pub fn stop_requested(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .stop_requested
    }

    pub fn uptime(&self, now: DateTime<Utc>) -> Duration {
        now - self.snapshot().started_at
    }

    pub fn health(&self, now: DateTime<Utc>) -> Health {
        let status = self.snapshot();

        match status.last_success {
            Some(last) if now - last > Duration::hours(STALE_AFTER_HOURS) => Health {
                healthy: false,
                message: format!(
                    "last successful scrape was {} hours ago",
                    (now - last).num_hours()
                ),
            },
            Some(_) => Health {
                healthy: true,
                message: "scraper is running normally".to_string(),
            },
            None if now - status.started_at > Duration::hours(FIRST_SUCCESS_GRACE_HOURS) => {
                Health {
                    healthy: false,
                    message: format!(
                        "no successful scrape in {} hours of uptime",
                        (now - status.started_at).num_hours()
                    ),
                }
            }
            None => Health {
                healthy: true,
                message: "waiting for the first scrape".to_string(),
            },
        }
    }
}
