use crate::scraper::ScraperError;
use crate::store::ObjectStore;
use std::path::{Path, PathBuf};
use url::Url;

/// Object store backed by a directory tree. Folder and object ids are paths.
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

fn persistence(e: std::io::Error) -> ScraperError {
    ScraperError::Persistence(e.to_string())
}

impl ObjectStore for LocalObjectStore {
    fn ensure_folder(&self, name: &str, parent: Option<&str>) -> Result<String, ScraperError> {
        let base = parent.map(PathBuf::from).unwrap_or_else(|| self.root.clone());
        let dir = base.join(name);
        std::fs::create_dir_all(&dir).map_err(persistence)?;
        Ok(dir.to_string_lossy().into_owned())
    }

    fn upload(
        &self,
        folder_id: &str,
        name: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, ScraperError> {
        let path = Path::new(folder_id).join(name);
        std::fs::write(&path, bytes).map_err(persistence)?;
        Ok(path.to_string_lossy().into_owned())
    }

    fn share_public(&self, object_id: &str) -> Result<String, ScraperError> {
        let absolute = std::fs::canonicalize(object_id).map_err(persistence)?;
        Url::from_file_path(&absolute)
            .map(|u| u.to_string())
            .map_err(|_| ScraperError::Persistence(format!("not a file path: {}", absolute.display())))
    }
}
