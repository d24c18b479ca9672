use crate::google::GoogleApi;
use crate::scraper::ScraperError;
use crate::store::ListingStore;
use serde::Deserialize;
use serde_json::json;

/// Last column written by the pipeline (R).
const LAST_COLUMN: usize = 18;

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendResponse {
    #[serde(default)]
    updates: Option<AppendUpdates>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendUpdates {
    #[serde(default)]
    updated_rows: usize,
}

/// First worksheet of one spreadsheet.
pub struct SheetsStore {
    api: GoogleApi,
    spreadsheet_id: String,
}

impl SheetsStore {
    pub fn new(api: GoogleApi, spreadsheet_id: impl Into<String>) -> Self {
        Self {
            api,
            spreadsheet_id: spreadsheet_id.into(),
        }
    }

    fn values_url(&self, range: &str) -> String {
        self.api.sheets_url(&format!(
            "/v4/spreadsheets/{}/values/{}",
            self.spreadsheet_id, range
        ))
    }

    fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>, ScraperError> {
        let req = self.api.client.get(self.values_url(range));
        let body: ValueRange = self.api.send("sheets values.get", req)?;
        Ok(body.values)
    }
}

/// 1-based column index → A1 column letters (1 → A, 18 → R, 27 → AA).
pub fn column_letter(mut col: usize) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        col = (col - 1) / 26;
    }
    letters.iter().rev().collect()
}

impl ListingStore for SheetsStore {
    fn column_values(&self, col: usize) -> Result<Vec<String>, ScraperError> {
        let letter = column_letter(col);
        let rows = self.read_range(&format!("{letter}:{letter}"))?;
        Ok(rows
            .into_iter()
            .map(|row| row.into_iter().next().unwrap_or_default())
            .collect())
    }

    fn row_count(&self) -> Result<usize, ScraperError> {
        let range = format!("A:{}", column_letter(LAST_COLUMN));
        Ok(self.read_range(&range)?.len())
    }

    fn append_rows(&self, rows: &[Vec<String>]) -> Result<(), ScraperError> {
        let req = self
            .api
            .client
            .post(format!("{}:append", self.values_url("A1")))
            .query(&[
                ("valueInputOption", "USER_ENTERED"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&json!({ "majorDimension": "ROWS", "values": rows }));

        let resp: AppendResponse = self.api.send("sheets values.append", req)?;
        let updated = resp.updates.map(|u| u.updated_rows).unwrap_or(rows.len());
        if updated != rows.len() {
            return Err(ScraperError::Persistence(format!(
                "append wrote {updated} of {} rows",
                rows.len()
            )));
        }
        Ok(())
    }
}
