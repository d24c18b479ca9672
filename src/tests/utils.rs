use crate::db::connection::{init_db, Database};
use crate::scraper::fetcher::PageFetcher;
use crate::scraper::ScraperError;
use crate::screenshots::ScreenshotCapture;
use crate::store::ListingStore;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use tempfile::TempDir;

pub const CATALOG: &str = "https://www.imot.bg/obiavi/prodazhbi/grad-varna/briz/ednostaen";

/// Fresh database file in its own temp dir. Keep the `TempDir` alive for the test.
pub fn init_test_db() -> (TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.sqlite3");
    let db = Database::new(path.to_string_lossy().into_owned());
    init_db(&db).unwrap_or_else(|e| panic!("Database initialization failed: {e}"));
    (dir, db)
}

pub fn listing_url(id: u32) -> String {
    format!("https://www.imot.bg/obiava-1a{id}-prodava-ednostaen-apartament-grad-varna-briz")
}

pub fn page_url(n: usize) -> String {
    if n == 1 {
        CATALOG.to_string()
    } else {
        format!("{CATALOG}/p-{n}")
    }
}

/// A catalog page with `links` in the results block and an optional next link.
pub fn catalog_page(links: &[String], next: Option<&str>) -> String {
    let items: String = links
        .iter()
        .map(|l| format!(r#"<div class="item"><a href="{l}" class="title">Продава 1-СТАЕН</a></div>"#))
        .collect();
    let pager = next
        .map(|n| format!(r#"<div class="pager"><a class="next" href="{n}">Следваща</a></div>"#))
        .unwrap_or_default();
    format!(
        r#"<html><head><title>Обяви</title></head><body>
        <div class="listResults">{items}</div>{pager}
        </body></html>"#
    )
}

/// A listing page rich enough for every field.
pub fn listing_page() -> String {
    r#"<html>
<head>
  <title>Продава 1-СТАЕН, гр. Варна, Бриз, 85 000 EUR</title>
  <meta name="description" content="Светъл апартамент близо до морето.">
</head>
<body>
  <div class="advHeader">
    <h1>Продава 1-СТАЕН</h1>
    <div class="location">гр. Варна, Бриз</div>
  </div>
  <div id="cena">85 000 EUR</div>
  <div class="adParams">
    <div>Площ: 45 кв.м</div>
    <div>Етаж: 3-ти от 6</div>
    <div>Строителство: Тухла, 2008 г.</div>
    <div>Обзавеждане: Обзаведен</div>
  </div>
  <div class="phone">0888 123 456</div>
  <div id="description_div">Слънчев апартамент, обзаведен, на 5 минути от морската градина.</div>
  <div class="carExtri"><div>Асансьор</div><div>Южно изложение</div></div>
  <div class="AG"><strong>Имоти Варна ООД</strong></div>
  <div class="info">Публикувана в 14:30 ч. на 12 март, 2024 год.</div>
</body>
</html>"#
        .to_string()
}

/// Serves canned pages; any other URL fails like an HTTP 500.
#[derive(Default)]
pub struct FakeFetcher {
    pages: HashMap<String, String>,
    pub calls: RefCell<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: String) -> Self {
        self.pages.insert(url.to_string(), html);
        self
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.borrow().iter().filter(|u| *u == url).count()
    }
}

impl PageFetcher for FakeFetcher {
    fn fetch(&self, url: &str) -> Result<String, ScraperError> {
        self.calls.borrow_mut().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| ScraperError::transport(url, "HTTP 500 Internal Server Error"))
    }
}

/// In-memory store starting with a header row. `fail_appends` failures are
/// returned before appends start succeeding. `short_write` makes the next
/// append keep only that many rows and then report an error.
pub struct MemoryStore {
    pub rows: RefCell<Vec<Vec<String>>>,
    pub fail_appends: Cell<usize>,
    pub short_write: Cell<Option<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let header = crate::scraper::models::COLUMN_HEADERS
            .iter()
            .map(|h| h.to_string())
            .collect();
        Self {
            rows: RefCell::new(vec![header]),
            fail_appends: Cell::new(0),
            short_write: Cell::new(None),
        }
    }

    pub fn with_urls(urls: &[String]) -> Self {
        let store = Self::new();
        for url in urls {
            let mut row = vec!["N/A".to_string(); 18];
            row[17] = url.clone();
            store.rows.borrow_mut().push(row);
        }
        store
    }

    pub fn data_rows(&self) -> Vec<Vec<String>> {
        self.rows.borrow().iter().skip(1).cloned().collect()
    }
}

impl ListingStore for MemoryStore {
    fn column_values(&self, col: usize) -> Result<Vec<String>, ScraperError> {
        Ok(self
            .rows
            .borrow()
            .iter()
            .map(|r| r.get(col - 1).cloned().unwrap_or_default())
            .collect())
    }

    fn row_count(&self) -> Result<usize, ScraperError> {
        Ok(self.rows.borrow().len())
    }

    fn append_rows(&self, rows: &[Vec<String>]) -> Result<(), ScraperError> {
        let failures = self.fail_appends.get();
        if failures > 0 {
            self.fail_appends.set(failures - 1);
            return Err(ScraperError::Persistence("quota exceeded".into()));
        }
        if let Some(kept) = self.short_write.take() {
            let kept = kept.min(rows.len());
            self.rows.borrow_mut().extend(rows[..kept].iter().cloned());
            return Err(ScraperError::Persistence(format!(
                "appended {kept} of {} rows",
                rows.len()
            )));
        }
        self.rows.borrow_mut().extend(rows.iter().cloned());
        Ok(())
    }
}

/// Screenshot stub: fails for URLs in `failing`, otherwise returns a fake link.
#[derive(Default)]
pub struct FakeCapturer {
    pub failing: Vec<String>,
}

impl ScreenshotCapture for FakeCapturer {
    fn capture(&self, url: &str) -> Result<String, ScraperError> {
        if self.failing.iter().any(|f| f == url) {
            return Err(ScraperError::Capture("navigation timeout".into()));
        }
        Ok(format!("https://drive.example/{}", crate::screenshots::screenshot_file_name(url)))
    }
}
