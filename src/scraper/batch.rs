// batch.rs
use crate::scraper::models::{ListingRecord, NOT_FOUND};
use crate::scraper::retry::RetryPolicy;
use crate::scraper::ScraperError;
use crate::store::ListingStore;
use tracing::{error, info, warn};

pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Buffers records and appends them to the store in order.
///
/// The buffer is only cleared after the store confirms the append, so a failed
/// flush leaves every record in place for the next attempt. Rows an earlier
/// attempt already landed are detected from the store's row count and never
/// written twice.
pub struct BatchSink<'a> {
    store: &'a dyn ListingStore,
    buffer: Vec<ListingRecord>,
    max_size: usize,
    retry: RetryPolicy,
    persisted: usize,
    /// Store row count before the buffered records were first sent.
    baseline: Option<usize>,
}

impl<'a> BatchSink<'a> {
    pub fn new(store: &'a dyn ListingStore, max_size: usize, retry: RetryPolicy) -> Self {
        Self {
            store,
            buffer: Vec::new(),
            max_size: max_size.max(1),
            retry,
            persisted: 0,
            baseline: None,
        }
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn persisted(&self) -> usize {
        self.persisted
    }

    /// Buffer `record`, flushing once the batch is full.
    pub fn push(&mut self, record: ListingRecord) -> Result<usize, ScraperError> {
        self.buffer.push(record);
        if self.buffer.len() >= self.max_size {
            return self.flush();
        }
        Ok(0)
    }

    /// Append everything buffered. Returns the number of rows written.
    pub fn flush(&mut self) -> Result<usize, ScraperError> {
        if self.buffer.is_empty() {
            return Ok(0);
        }

        let result = self.write_buffer();
        match &result {
            Ok(n) => {
                self.persisted += n;
                info!(rows = n, "batch flushed");
            }
            Err(e) => error!(pending = self.buffer.len(), error = %e, "batch flush failed, keeping records"),
        }
        result
    }

    fn write_buffer(&mut self) -> Result<usize, ScraperError> {
        let baseline = match self.baseline {
            Some(rows) => rows,
            None => {
                let rows = self.retry.run("row count", || self.store.row_count())?;
                self.baseline = Some(rows);
                rows
            }
        };

        let (store, buffer) = (self.store, &self.buffer);
        self.retry.run("append rows", || {
            let current = store.row_count()?;
            let landed = current.saturating_sub(baseline).min(buffer.len());
            if landed == buffer.len() {
                return Ok(());
            }
            if landed > 0 {
                warn!(landed, pending = buffer.len() - landed, "resuming partially applied append");
            }
            store.append_rows(&rows_for_append(&buffer[landed..], current))
        })?;

        let written = self.buffer.len();
        self.buffer.clear();
        self.baseline = None;
        Ok(written)
    }
}

/// Price-per-area formula for a record landing on store row `row`.
pub fn price_per_area_formula(row: usize) -> String {
    format!("=C{row}/D{row}")
}

/// Rows for `records` appended to a store that holds `current_rows` rows.
/// The record at position `i` lands on row `current_rows + i + 1`.
pub fn rows_for_append(records: &[ListingRecord], current_rows: usize) -> Vec<Vec<String>> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let row = current_rows + i + 1;
            let mut record = record.clone();
            record.price_per_area = match record.numeric_price_and_area() {
                Some(_) => price_per_area_formula(row),
                None => NOT_FOUND.to_string(),
            };
            record.to_row()
        })
        .collect()
}
