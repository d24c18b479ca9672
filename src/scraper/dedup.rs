use std::collections::HashSet;

/// Source URLs already persisted or already handled during this run.
#[derive(Debug, Default, Clone)]
pub struct KnownUrls {
    urls: HashSet<String>,
}

impl KnownUrls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from the store's URL column. Skips the header row and anything that is not a URL.
    pub fn from_column(values: &[String]) -> Self {
        let urls = values
            .iter()
            .skip(1)
            .map(|v| v.trim())
            .filter(|v| v.starts_with("http"))
            .map(str::to_string)
            .collect();
        Self { urls }
    }

    pub fn is_known(&self, url: &str) -> bool {
        self.urls.contains(url.trim())
    }

    /// Returns true if the URL was not known before.
    pub fn insert(&mut self, url: &str) -> bool {
        self.urls.insert(url.trim().to_string())
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// Links from `links` that are not in `known`, in their original order.
pub fn filter_new(links: &[String], known: &KnownUrls) -> Vec<String> {
    links
        .iter()
        .filter(|l| !known.is_known(l))
        .cloned()
        .collect()
}
