// catalog.rs
use crate::scraper::dedup::{filter_new, KnownUrls};
use crate::scraper::fetcher::PageFetcher;
use crate::scraper::models::CatalogSpec;
use crate::scraper::pacer::{Pacer, Pause};
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::{debug, info, warn};
use url::Url;

pub const DEFAULT_MAX_PAGES: usize = 50;

/// Containers that hold the search results on a catalog page.
const RESULTS_CONTAINERS: &[&str] = &[
    "div.listResults",
    "div#listResults",
    "div.ads2023",
    "table.tblList",
];

/// Path fragments that mark a link as a single listing.
const LISTING_LINK_MARKERS: &[&str] = &["/obiava-", "act=5"];

const NEXT_PAGE_SELECTORS: &[&str] = &["a[rel='next']", "link[rel='next']", "a.next", "a.saveSlink.next"];

const NEXT_PAGE_LABELS: &[&str] = &["следваща", "напред"];

enum WalkState {
    /// Page to fetch next.
    Fetch(String),
    /// Page handed out; the pagination lookup still has to run on it.
    Advance { url: String, html: Option<String> },
    Done,
}

/// Pagination driver for one catalog. Hands out batches of listing URLs not yet known.
pub struct CatalogWalker<'a> {
    fetcher: &'a dyn PageFetcher,
    pacer: &'a Pacer,
    catalog: &'a CatalogSpec,
    max_pages: usize,
    state: WalkState,
    visited: HashSet<String>,
    pages_visited: usize,
    skipped_duplicates: usize,
}

impl<'a> CatalogWalker<'a> {
    pub fn new(
        catalog: &'a CatalogSpec,
        fetcher: &'a dyn PageFetcher,
        pacer: &'a Pacer,
        max_pages: usize,
    ) -> Self {
        Self {
            fetcher,
            pacer,
            catalog,
            max_pages,
            state: WalkState::Fetch(catalog.url.clone()),
            visited: HashSet::new(),
            pages_visited: 0,
            skipped_duplicates: 0,
        }
    }

    pub fn pages_visited(&self) -> usize {
        self.pages_visited
    }

    pub fn skipped_duplicates(&self) -> usize {
        self.skipped_duplicates
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, WalkState::Done)
    }

    /// Next non-empty batch of new listing URLs, or `None` once the walk has ended.
    ///
    /// Empty pages and pages whose links are all known are stepped over without
    /// returning. A revisited page URL or the page cap ends the walk.
    pub fn next_links(&mut self, known: &KnownUrls) -> Option<Vec<String>> {
        loop {
            match std::mem::replace(&mut self.state, WalkState::Done) {
                WalkState::Done => return None,

                WalkState::Advance { url, html } => {
                    self.state = self.lookup_next_page(&url, html);
                }

                WalkState::Fetch(url) => {
                    if self.pages_visited >= self.max_pages {
                        info!(catalog = %self.catalog.district, max = self.max_pages, "page cap reached, stopping");
                        return None;
                    }
                    if !self.visited.insert(url.clone()) {
                        info!(catalog = %self.catalog.district, %url, "page already visited, stopping");
                        return None;
                    }

                    if self.pages_visited > 0 {
                        self.pacer.pause(Pause::BetweenPages);
                    }
                    self.pages_visited += 1;
                    let page = self.pages_visited;

                    info!(catalog = %self.catalog.district, page, %url, "scraping catalog page");

                    let html = match self.fetcher.fetch(&url) {
                        Ok(html) => Some(html),
                        Err(e) => {
                            warn!(catalog = %self.catalog.district, page, error = %e, "catalog page failed, treating as empty");
                            None
                        }
                    };

                    let links = html
                        .as_deref()
                        .map(|h| extract_listing_links(h, &url))
                        .unwrap_or_default();

                    self.state = WalkState::Advance { url, html };

                    if links.is_empty() {
                        debug!(page, "no listing links on page");
                        continue;
                    }

                    let fresh = filter_new(&links, known);
                    self.skipped_duplicates += links.len() - fresh.len();
                    info!(page, found = links.len(), new = fresh.len(), "catalog page parsed");

                    if fresh.is_empty() {
                        continue;
                    }
                    return Some(fresh);
                }
            }
        }
    }

    /// Find the next page from `url`. Reuses the already fetched HTML when there is some.
    fn lookup_next_page(&self, url: &str, html: Option<String>) -> WalkState {
        let html = match html {
            Some(html) => html,
            None => match self.fetcher.fetch(url) {
                Ok(html) => html,
                Err(e) => {
                    debug!(%url, error = %e, "pagination lookup failed, ending walk");
                    return WalkState::Done;
                }
            },
        };

        match find_next_page(&html, url) {
            Some(next) => WalkState::Fetch(next),
            None => {
                info!(catalog = %self.catalog.district, "no next page, catalog finished");
                WalkState::Done
            }
        }
    }
}

/// Resolve `href` against `base`, keeping only http(s) and dropping the fragment.
fn resolve(base: &Url, href: &str) -> Option<String> {
    let mut resolved = base.join(href.trim()).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }
    resolved.set_fragment(None);
    Some(resolved.to_string())
}

/// Listing links from the results container, resolved and de-duplicated in page order.
pub fn extract_listing_links(html: &str, page_url: &str) -> Vec<String> {
    let Ok(base) = Url::parse(page_url) else {
        return Vec::new();
    };
    let Ok(anchor) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let doc = Html::parse_document(html);

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for css in RESULTS_CONTAINERS {
        let Ok(container) = Selector::parse(css) else {
            continue;
        };
        for block in doc.select(&container) {
            for a in block.select(&anchor) {
                let Some(href) = a.value().attr("href") else {
                    continue;
                };
                if !LISTING_LINK_MARKERS.iter().any(|m| href.contains(m)) {
                    continue;
                }
                if let Some(link) = resolve(&base, href) {
                    if seen.insert(link.clone()) {
                        links.push(link);
                    }
                }
            }
        }
    }

    links
}

/// The "next page" link on a catalog page, resolved against `page_url`.
pub fn find_next_page(html: &str, page_url: &str) -> Option<String> {
    let base = Url::parse(page_url).ok()?;
    let doc = Html::parse_document(html);

    for css in NEXT_PAGE_SELECTORS {
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };
        if let Some(href) = doc.select(&selector).find_map(|el| el.value().attr("href")) {
            return resolve(&base, href);
        }
    }

    let anchor = Selector::parse("a[href]").ok()?;
    doc.select(&anchor)
        .find(|a| {
            let label = a.text().collect::<String>().trim().to_lowercase();
            NEXT_PAGE_LABELS.iter().any(|l| label.starts_with(l))
        })
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| resolve(&base, href))
}
