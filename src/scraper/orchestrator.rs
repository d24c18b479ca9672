// orchestrator.rs
use crate::scraper::batch::{BatchSink, DEFAULT_BATCH_SIZE};
use crate::scraper::catalog::{CatalogWalker, DEFAULT_MAX_PAGES};
use crate::scraper::dedup::KnownUrls;
use crate::scraper::extractor::extract_listing;
use crate::scraper::fetcher::PageFetcher;
use crate::scraper::models::{CatalogSpec, ListingRecord, SCREENSHOT_FAILED};
use crate::scraper::pacer::{Pacer, Pause};
use crate::scraper::retry::RetryPolicy;
use crate::scraper::ScraperError;
use crate::screenshots::ScreenshotCapture;
use crate::status::StatusHandle;
use crate::store::ListingStore;
use serde::Serialize;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{error, info, warn};
use url::Url;

/// Totals for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub catalogs_processed: usize,
    pub catalogs_failed: usize,
    pub new_listings: usize,
    pub skipped_duplicates: usize,
    pub pages_visited: usize,
    pub extraction_failures: usize,
    pub screenshot_failures: usize,
    pub rows_persisted: usize,
    pub rows_unflushed: usize,
}

/// Sequential crawl over a list of catalogs.
///
/// Each catalog is isolated: an error or a panic while walking it is logged as
/// `CatalogFatal` and the run moves on to the next one.
pub struct Orchestrator<'a> {
    fetcher: &'a dyn PageFetcher,
    store: &'a dyn ListingStore,
    capturer: Option<&'a dyn ScreenshotCapture>,
    pacer: Pacer,
    retry: RetryPolicy,
    batch_size: usize,
    max_pages: usize,
}

impl<'a> Orchestrator<'a> {
    pub fn new(fetcher: &'a dyn PageFetcher, store: &'a dyn ListingStore) -> Self {
        Self {
            fetcher,
            store,
            capturer: None,
            pacer: Pacer::default(),
            retry: RetryPolicy::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    pub fn with_capturer(mut self, capturer: &'a dyn ScreenshotCapture) -> Self {
        self.capturer = Some(capturer);
        self
    }

    pub fn with_pacer(mut self, pacer: Pacer) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Crawl `catalogs` in order. `known` is extended in place with every URL handled.
    pub fn run(
        &self,
        catalogs: &[CatalogSpec],
        known: &mut KnownUrls,
        status: &StatusHandle,
    ) -> RunStats {
        let mut stats = RunStats::default();
        let mut sink = BatchSink::new(self.store, self.batch_size, self.retry);

        for (i, catalog) in catalogs.iter().enumerate() {
            if status.stop_requested() {
                info!("stop requested, ending run before next catalog");
                break;
            }
            if i > 0 {
                self.pacer.pause(Pause::BetweenCatalogs);
            }

            info!(catalog = %catalog.district, n = i + 1, of = catalogs.len(), "starting catalog");

            let outcome = catch_unwind(AssertUnwindSafe(|| {
                self.process_catalog(catalog, known, &mut sink, &mut stats, status)
            }))
            .unwrap_or_else(|panic| {
                Err(ScraperError::CatalogFatal {
                    catalog: catalog.district.clone(),
                    reason: panic_message(panic.as_ref()),
                })
            });

            match outcome {
                Ok(()) => stats.catalogs_processed += 1,
                Err(e) => {
                    stats.catalogs_failed += 1;
                    error!(catalog = %catalog.district, error = %e, "catalog abandoned");
                }
            }
        }

        if let Err(e) = sink.flush() {
            error!(error = %e, "final flush failed");
        }
        stats.rows_persisted = sink.persisted();
        stats.rows_unflushed = sink.pending();

        info!(
            new = stats.new_listings,
            skipped = stats.skipped_duplicates,
            pages = stats.pages_visited,
            failed_catalogs = stats.catalogs_failed,
            unflushed = stats.rows_unflushed,
            "run finished"
        );
        stats
    }

    fn process_catalog(
        &self,
        catalog: &CatalogSpec,
        known: &mut KnownUrls,
        sink: &mut BatchSink<'_>,
        stats: &mut RunStats,
        status: &StatusHandle,
    ) -> Result<(), ScraperError> {
        Url::parse(&catalog.url).map_err(|e| ScraperError::CatalogFatal {
            catalog: catalog.district.clone(),
            reason: ScraperError::InvalidUrl {
                url: catalog.url.clone(),
                reason: e.to_string(),
            }
            .to_string(),
        })?;

        let mut walker = CatalogWalker::new(catalog, self.fetcher, &self.pacer, self.max_pages);
        let mut handled = 0usize;
        let (mut pages_counted, mut skipped_counted) = (0, 0);

        'pages: loop {
            if status.stop_requested() {
                info!(catalog = %catalog.district, "stop requested, leaving catalog");
                break;
            }
            let batch = walker.next_links(known);

            // Folded in per page so a later panic keeps them.
            stats.pages_visited += walker.pages_visited() - pages_counted;
            stats.skipped_duplicates += walker.skipped_duplicates() - skipped_counted;
            pages_counted = walker.pages_visited();
            skipped_counted = walker.skipped_duplicates();

            let Some(links) = batch else {
                break;
            };

            for url in links {
                if status.stop_requested() {
                    info!(catalog = %catalog.district, "stop requested, leaving catalog");
                    break 'pages;
                }
                if handled > 0 {
                    self.pacer.pause(Pause::BetweenListings);
                }
                handled += 1;

                let record = self.process_listing(&url, stats);
                known.insert(&url);
                stats.new_listings += 1;

                if let Err(e) = sink.push(record) {
                    warn!(catalog = %catalog.district, error = %e, "batch write failed, records kept for next flush");
                }
            }
        }

        if let Err(e) = sink.flush() {
            warn!(catalog = %catalog.district, error = %e, "end-of-catalog flush failed, records kept");
        }

        info!(
            catalog = %catalog.district,
            listings = handled,
            pages = walker.pages_visited(),
            skipped = walker.skipped_duplicates(),
            "catalog done"
        );
        Ok(())
    }

    /// Fetch, extract and screenshot one listing. Always yields a record.
    fn process_listing(&self, url: &str, stats: &mut RunStats) -> ListingRecord {
        let html = match self.fetcher.fetch(url) {
            Ok(html) => html,
            Err(e) => {
                warn!(%url, error = %e, "listing fetch failed, keeping URL only");
                stats.extraction_failures += 1;
                return ListingRecord::for_url(url);
            }
        };

        let extraction = extract_listing(url, &html);
        if !extraction.success {
            stats.extraction_failures += 1;
            warn!(%url, reason = extraction.error.as_deref().unwrap_or("unknown"), "extraction found no listing anchors");
        }
        let mut record = extraction.record;

        if let Some(capturer) = self.capturer {
            record.screenshot_ref = match capturer.capture(url) {
                Ok(reference) => reference,
                Err(e) => {
                    stats.screenshot_failures += 1;
                    warn!(%url, error = %e, "screenshot failed");
                    SCREENSHOT_FAILED.to_string()
                }
            };
        }

        record
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic".to_string()
    }
}
