//! Thin blocking clients for the Google Sheets and Drive REST APIs.
//!
//! Authentication is a ready-made OAuth bearer token; minting one from a
//! service-account key happens outside this process.

mod drive;
mod sheets;

pub use drive::DriveClient;
pub use sheets::{column_letter, SheetsStore};

use crate::scraper::ScraperError;
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com";
pub const DRIVE_BASE_URL: &str = "https://www.googleapis.com";

#[derive(Clone)]
pub struct GoogleApi {
    client: Client,
    token: String,
    sheets_base: String,
    drive_base: String,
}

impl GoogleApi {
    pub fn new(token: impl Into<String>) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ScraperError::Config(format!("Google API client: {e}")))?;

        Ok(Self {
            client,
            token: token.into(),
            sheets_base: SHEETS_BASE_URL.to_string(),
            drive_base: DRIVE_BASE_URL.to_string(),
        })
    }

    /// Point both APIs at another host. Used by tests.
    pub fn with_base_url(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        self.sheets_base = base.clone();
        self.drive_base = base;
        self
    }

    fn sheets_url(&self, path: &str) -> String {
        format!("{}{}", self.sheets_base, path)
    }

    fn drive_url(&self, path: &str) -> String {
        format!("{}{}", self.drive_base, path)
    }

    /// Send with the bearer token and decode a JSON body.
    fn send<T: DeserializeOwned>(&self, what: &str, req: RequestBuilder) -> Result<T, ScraperError> {
        let resp = req
            .bearer_auth(&self.token)
            .send()
            .map_err(|e| ScraperError::Persistence(format!("{what}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_else(|_| "(no body)".to_string());
            return Err(ScraperError::Persistence(format!(
                "{what}: HTTP {status} - {body}"
            )));
        }

        resp.json::<T>()
            .map_err(|e| ScraperError::Persistence(format!("{what}: bad response body: {e}")))
    }
}
