// store.rs
use crate::scraper::ScraperError;

/// Tabular destination for listing rows.
///
/// Row 1 is a header. Cells are plain strings; a cell starting with `=` is a
/// formula and is evaluated by the store, not by us.
pub trait ListingStore {
    /// Every value in the 1-based column `col`, header included.
    fn column_values(&self, col: usize) -> Result<Vec<String>, ScraperError>;

    /// Number of rows currently in the store, header included.
    fn row_count(&self) -> Result<usize, ScraperError>;

    /// Append `rows` after the last row, in order.
    fn append_rows(&self, rows: &[Vec<String>]) -> Result<(), ScraperError>;
}

/// Remote folder tree holding screenshots.
pub trait ObjectStore {
    /// Id of the folder called `name` under `parent` (root when `None`), created if missing.
    fn ensure_folder(&self, name: &str, parent: Option<&str>) -> Result<String, ScraperError>;

    /// Upload `bytes` as `name` into `folder_id`. Returns the new object's id.
    fn upload(
        &self,
        folder_id: &str,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, ScraperError>;

    /// Make the object publicly readable and return a link to it.
    fn share_public(&self, object_id: &str) -> Result<String, ScraperError>;
}
