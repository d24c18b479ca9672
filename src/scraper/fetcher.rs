// fetcher.rs
use crate::scraper::retry::RetryPolicy;
use crate::scraper::ScraperError;
use encoding_rs::Encoding;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER};
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0 Safari/537.36";

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Encodings tried in order when decoding a page body.
pub const ENCODING_PRIORITY: &[&str] = &["utf-8", "windows-1251", "iso-8859-5", "koi8-r"];

/// Used when no candidate decoding contains a marker word.
pub const FALLBACK_ENCODING: &str = "windows-1251";

/// Words that show up on any real imot.bg page. Lowercase.
pub const MARKER_WORDS: &[&str] = &["имот", "обява", "продава", "цена"];

/// Anything that can turn a URL into page text.
pub trait PageFetcher {
    fn fetch(&self, url: &str) -> Result<String, ScraperError>;
}

pub struct HttpFetcher {
    client: Client,
    retry: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(retry: RetryPolicy) -> Result<Self, ScraperError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("bg-BG,bg;q=0.9,en-US;q=0.8,en;q=0.7"),
        );
        headers.insert(REFERER, HeaderValue::from_static("https://www.imot.bg/"));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(FETCH_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| ScraperError::Config(format!("HTTP client: {e}")))?;

        Ok(Self { client, retry })
    }

    /// One GET, no retry.
    pub fn try_fetch(&self, url: &str) -> Result<String, ScraperError> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| ScraperError::transport(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ScraperError::transport(url, format!("HTTP {status}")));
        }

        let bytes = resp.bytes().map_err(|e| ScraperError::transport(url, e))?;
        Ok(decode_page(&bytes))
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String, ScraperError> {
        let result = self.retry.run("fetch", || self.try_fetch(url));
        if let Err(e) = &result {
            warn!(url, error = %e, "fetch failed");
        }
        result
    }
}

/// Decode with the first encoding whose output contains a marker word.
pub fn decode_page(bytes: &[u8]) -> String {
    for label in ENCODING_PRIORITY {
        let Some(encoding) = Encoding::for_label(label.as_bytes()) else {
            continue;
        };
        let (text, _, _) = encoding.decode(bytes);
        if contains_marker(&text) {
            debug!(encoding = encoding.name(), "decoded page");
            return text.into_owned();
        }
    }

    let fallback = Encoding::for_label(FALLBACK_ENCODING.as_bytes()).unwrap_or(encoding_rs::UTF_8);
    fallback.decode(bytes).0.into_owned()
}

fn contains_marker(text: &str) -> bool {
    let lower = text.to_lowercase();
    MARKER_WORDS.iter().any(|w| lower.contains(w))
}
