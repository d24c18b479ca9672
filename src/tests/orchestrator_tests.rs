use crate::scraper::dedup::KnownUrls;
use crate::scraper::fetcher::PageFetcher;
use crate::scraper::models::{CatalogSpec, SCREENSHOT_FAILED, SOURCE_URL_COLUMN};
use crate::scraper::pacer::Pacer;
use crate::scraper::retry::RetryPolicy;
use crate::scraper::{Orchestrator, ScraperError};
use crate::status::StatusHandle;
use crate::store::ListingStore;
use crate::tests::utils::{
    catalog_page, listing_page, listing_url, page_url, FakeCapturer, FakeFetcher, MemoryStore,
    CATALOG,
};
use chrono::Utc;

const SECOND_CATALOG: &str = "https://www.imot.bg/obiavi/prodazhbi/grad-varna/avtogara/ednostaen";

fn links(ids: &[u32]) -> Vec<String> {
    ids.iter().map(|&id| listing_url(id)).collect()
}

fn with_listings(mut fetcher: FakeFetcher, ids: &[u32]) -> FakeFetcher {
    for &id in ids {
        fetcher = fetcher.with_page(&listing_url(id), listing_page());
    }
    fetcher
}

/// Catalog of two pages: 1, 2, 3 then 4, 5.
fn two_page_catalog() -> FakeFetcher {
    let fetcher = FakeFetcher::new()
        .with_page(&page_url(1), catalog_page(&links(&[1, 2, 3]), Some(&page_url(2))))
        .with_page(&page_url(2), catalog_page(&links(&[4, 5]), None));
    with_listings(fetcher, &[1, 2, 3, 4, 5])
}

fn orchestrator<'a>(fetcher: &'a dyn PageFetcher, store: &'a dyn ListingStore) -> Orchestrator<'a> {
    Orchestrator::new(fetcher, store)
        .with_pacer(Pacer::disabled())
        .with_retry(RetryPolicy::immediate(1))
        .with_batch_size(20)
}

fn seeded_known(store: &MemoryStore) -> KnownUrls {
    KnownUrls::from_column(&store.column_values(SOURCE_URL_COLUMN).unwrap())
}

fn status() -> StatusHandle {
    StatusHandle::new(Utc::now())
}

#[test]
fn two_page_catalog_with_one_duplicate() {
    let fetcher = two_page_catalog();
    let store = MemoryStore::with_urls(&[listing_url(5)]);
    let mut known = seeded_known(&store);

    let stats = orchestrator(&fetcher, &store).run(&[CatalogSpec::new(CATALOG)], &mut known, &status());

    assert_eq!(stats.new_listings, 4);
    assert_eq!(stats.skipped_duplicates, 1);
    assert_eq!(stats.pages_visited, 2);
    assert_eq!(stats.catalogs_processed, 1);
    assert_eq!(stats.rows_persisted, 4);
    assert_eq!(stats.rows_unflushed, 0);
    assert_eq!(stats.extraction_failures, 0);

    let rows = store.data_rows();
    assert_eq!(rows.len(), 5);
    // Header on row 1, the pre-existing listing on row 2, new ones from row 3.
    assert_eq!(rows[1][17], listing_url(1));
    assert_eq!(rows[1][4], "=C3/D3");
    assert_eq!(rows[4][17], listing_url(4));
    assert_eq!(rows[4][4], "=C6/D6");
    assert_eq!(rows[1][0], "1-СТАЕН");

    for id in 1..=5 {
        assert!(known.is_known(&listing_url(id)));
    }
}

#[test]
fn rerun_over_unchanged_catalog_adds_nothing() {
    let fetcher = two_page_catalog();
    let store = MemoryStore::new();
    let catalogs = [CatalogSpec::new(CATALOG)];

    let mut known = seeded_known(&store);
    let first = orchestrator(&fetcher, &store).run(&catalogs, &mut known, &status());
    assert_eq!(first.new_listings, 5);

    let mut known = seeded_known(&store);
    let second = orchestrator(&fetcher, &store).run(&catalogs, &mut known, &status());

    assert_eq!(second.new_listings, 0);
    assert_eq!(second.skipped_duplicates, 5);
    assert_eq!(second.rows_persisted, 0);
    assert_eq!(store.data_rows().len(), 5);
}

#[test]
fn overlapping_catalogs_process_a_listing_once() {
    let fetcher = FakeFetcher::new()
        .with_page(CATALOG, catalog_page(&links(&[1, 2]), None))
        .with_page(SECOND_CATALOG, catalog_page(&links(&[2, 3]), None));
    let fetcher = with_listings(fetcher, &[1, 2, 3]);
    let store = MemoryStore::new();
    let mut known = KnownUrls::new();

    let stats = orchestrator(&fetcher, &store).run(
        &[CatalogSpec::new(CATALOG), CatalogSpec::new(SECOND_CATALOG)],
        &mut known,
        &status(),
    );

    assert_eq!(stats.new_listings, 3);
    assert_eq!(stats.skipped_duplicates, 1);
    assert_eq!(stats.catalogs_processed, 2);
    assert_eq!(fetcher.calls_to(&listing_url(2)), 1);
}

#[test]
fn failed_listing_fetch_keeps_url_only_record() {
    let fetcher = FakeFetcher::new().with_page(CATALOG, catalog_page(&links(&[1, 2]), None));
    let fetcher = with_listings(fetcher, &[1]);
    let store = MemoryStore::new();
    let mut known = KnownUrls::new();

    let stats = orchestrator(&fetcher, &store).run(&[CatalogSpec::new(CATALOG)], &mut known, &status());

    assert_eq!(stats.new_listings, 2);
    assert_eq!(stats.extraction_failures, 1);
    assert!(known.is_known(&listing_url(2)));

    let rows = store.data_rows();
    let failed = &rows[1];
    assert_eq!(failed[17], listing_url(2));
    assert!(failed[..17].iter().all(|c| c == "N/A"));
}

#[test]
fn screenshot_failure_sets_placeholder() {
    let fetcher = FakeFetcher::new().with_page(CATALOG, catalog_page(&links(&[1, 2]), None));
    let fetcher = with_listings(fetcher, &[1, 2]);
    let store = MemoryStore::new();
    let capturer = FakeCapturer {
        failing: vec![listing_url(2)],
    };
    let mut known = KnownUrls::new();

    let stats = orchestrator(&fetcher, &store)
        .with_capturer(&capturer)
        .run(&[CatalogSpec::new(CATALOG)], &mut known, &status());

    assert_eq!(stats.screenshot_failures, 1);
    let rows = store.data_rows();
    assert!(rows[0][14].starts_with("https://drive.example/listing_"));
    assert_eq!(rows[1][14], SCREENSHOT_FAILED);
    // Rest of the record is unaffected.
    assert_eq!(rows[1][2], "85000");
}

#[test]
fn bad_catalog_is_isolated() {
    let fetcher = FakeFetcher::new().with_page(SECOND_CATALOG, catalog_page(&links(&[1]), None));
    let fetcher = with_listings(fetcher, &[1]);
    let store = MemoryStore::new();
    let mut known = KnownUrls::new();
    let broken = CatalogSpec {
        url: "not a url".into(),
        district: "broken".into(),
    };

    let stats = orchestrator(&fetcher, &store).run(
        &[broken, CatalogSpec::new(SECOND_CATALOG)],
        &mut known,
        &status(),
    );

    assert_eq!(stats.catalogs_failed, 1);
    assert_eq!(stats.catalogs_processed, 1);
    assert_eq!(stats.new_listings, 1);
}

/// Panics on one URL, otherwise delegates.
struct PanickingFetcher {
    inner: FakeFetcher,
    poison: String,
}

impl PageFetcher for PanickingFetcher {
    fn fetch(&self, url: &str) -> Result<String, ScraperError> {
        if url == self.poison {
            panic!("parser blew up on {url}");
        }
        self.inner.fetch(url)
    }
}

#[test]
fn panic_in_catalog_is_isolated() {
    let inner = FakeFetcher::new()
        .with_page(CATALOG, catalog_page(&links(&[1, 2]), None))
        .with_page(SECOND_CATALOG, catalog_page(&links(&[3]), None));
    let fetcher = PanickingFetcher {
        inner: with_listings(inner, &[1, 2, 3]),
        poison: listing_url(2),
    };
    let store = MemoryStore::new();
    let mut known = KnownUrls::new();

    let stats = orchestrator(&fetcher, &store).run(
        &[CatalogSpec::new(CATALOG), CatalogSpec::new(SECOND_CATALOG)],
        &mut known,
        &status(),
    );

    assert_eq!(stats.catalogs_failed, 1);
    assert_eq!(stats.catalogs_processed, 1);
    // Listing 1 was buffered before the panic and still gets written.
    let urls: Vec<_> = store.data_rows().iter().map(|r| r[17].clone()).collect();
    assert_eq!(urls, vec![listing_url(1), listing_url(3)]);
}

#[test]
fn panicking_catalog_keeps_its_page_and_duplicate_counts() {
    let inner = FakeFetcher::new()
        .with_page(&page_url(1), catalog_page(&links(&[9, 1, 2]), Some(&page_url(2))))
        .with_page(&page_url(2), catalog_page(&links(&[3]), None))
        .with_page(SECOND_CATALOG, catalog_page(&links(&[4]), None));
    let fetcher = PanickingFetcher {
        inner: with_listings(inner, &[1, 2, 3, 4]),
        poison: listing_url(2),
    };
    let store = MemoryStore::with_urls(&[listing_url(9)]);
    let mut known = seeded_known(&store);

    let stats = orchestrator(&fetcher, &store).run(
        &[CatalogSpec::new(CATALOG), CatalogSpec::new(SECOND_CATALOG)],
        &mut known,
        &status(),
    );

    assert_eq!(stats.catalogs_failed, 1);
    assert_eq!(stats.new_listings, 2);
    // Page 1 of the panicking catalog plus the second catalog's only page.
    assert_eq!(stats.pages_visited, 2);
    assert_eq!(stats.skipped_duplicates, 1);
}

/// Requests a stop on the first listing fetch.
struct StoppingFetcher {
    inner: FakeFetcher,
    status: StatusHandle,
}

impl PageFetcher for StoppingFetcher {
    fn fetch(&self, url: &str) -> Result<String, ScraperError> {
        if url.contains("/obiava-") {
            self.status.request_stop();
        }
        self.inner.fetch(url)
    }
}

#[test]
fn stop_request_ends_run_early_and_flushes() {
    let status = status();
    assert!(status.try_begin(Utc::now()));
    let fetcher = StoppingFetcher {
        inner: two_page_catalog(),
        status: status.clone(),
    };
    let store = MemoryStore::new();
    let mut known = KnownUrls::new();

    let stats = orchestrator(&fetcher, &store).run(
        &[CatalogSpec::new(CATALOG), CatalogSpec::new(SECOND_CATALOG)],
        &mut known,
        &status,
    );

    assert_eq!(stats.new_listings, 1);
    assert_eq!(stats.pages_visited, 1);
    assert_eq!(stats.rows_persisted, 1);
    assert_eq!(fetcher.inner.calls_to(SECOND_CATALOG), 0);
}

#[test]
fn unflushed_rows_are_reported() {
    let fetcher = two_page_catalog();
    let store = MemoryStore::new();
    store.fail_appends.set(usize::MAX);
    let mut known = KnownUrls::new();

    let stats = orchestrator(&fetcher, &store)
        .with_batch_size(2)
        .run(&[CatalogSpec::new(CATALOG)], &mut known, &status());

    assert_eq!(stats.new_listings, 5);
    assert_eq!(stats.rows_persisted, 0);
    assert_eq!(stats.rows_unflushed, 5);
    assert_eq!(stats.catalogs_processed, 1);
}
