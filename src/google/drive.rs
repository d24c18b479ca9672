use crate::google::GoogleApi;
use crate::scraper::ScraperError;
use crate::store::ObjectStore;
use serde::Deserialize;
use serde_json::json;

const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    web_view_link: Option<String>,
}

pub struct DriveClient {
    api: GoogleApi,
}

/// Quote a value for a Drive `q` expression.
fn quoted(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

impl DriveClient {
    pub fn new(api: GoogleApi) -> Self {
        Self { api }
    }

    fn search(&self, q: &str) -> Result<Vec<DriveFile>, ScraperError> {
        let req = self
            .api
            .client
            .get(self.api.drive_url("/drive/v3/files"))
            .query(&[("q", q), ("fields", "files(id,name)"), ("spaces", "drive")]);
        let list: FileList = self.api.send("drive files.list", req)?;
        Ok(list.files)
    }

    /// Id of the spreadsheet called `name`.
    pub fn find_spreadsheet(&self, name: &str) -> Result<String, ScraperError> {
        let q = format!(
            "name = {} and mimeType = '{SPREADSHEET_MIME}' and trashed = false",
            quoted(name)
        );
        self.search(&q)?
            .into_iter()
            .next()
            .map(|f| f.id)
            .ok_or_else(|| ScraperError::Bootstrap(format!("spreadsheet '{name}' not found")))
    }
}

impl ObjectStore for DriveClient {
    fn ensure_folder(&self, name: &str, parent: Option<&str>) -> Result<String, ScraperError> {
        let mut q = format!(
            "name = {} and mimeType = '{FOLDER_MIME}' and trashed = false",
            quoted(name)
        );
        if let Some(parent) = parent {
            q.push_str(&format!(" and {} in parents", quoted(parent)));
        }

        if let Some(existing) = self.search(&q)?.into_iter().next() {
            return Ok(existing.id);
        }

        let mut metadata = json!({ "name": name, "mimeType": FOLDER_MIME });
        if let Some(parent) = parent {
            metadata["parents"] = json!([parent]);
        }

        let req = self
            .api
            .client
            .post(self.api.drive_url("/drive/v3/files"))
            .query(&[("fields", "id")])
            .json(&metadata);
        let created: DriveFile = self.api.send("drive create folder", req)?;
        Ok(created.id)
    }

    fn upload(
        &self,
        folder_id: &str,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, ScraperError> {
        let req = self
            .api
            .client
            .post(self.api.drive_url("/upload/drive/v3/files"))
            .query(&[("uploadType", "media"), ("fields", "id")])
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes);
        let uploaded: DriveFile = self.api.send("drive upload", req)?;

        // Media uploads land untitled in the root; name and move in one PATCH.
        let req = self
            .api
            .client
            .patch(self.api.drive_url(&format!("/drive/v3/files/{}", uploaded.id)))
            .query(&[
                ("addParents", folder_id),
                ("removeParents", "root"),
                ("fields", "id"),
            ])
            .json(&json!({ "name": name }));
        let moved: DriveFile = self.api.send("drive move upload", req)?;
        Ok(moved.id)
    }

    fn share_public(&self, object_id: &str) -> Result<String, ScraperError> {
        let req = self
            .api
            .client
            .post(self.api.drive_url(&format!("/drive/v3/files/{object_id}/permissions")))
            .json(&json!({ "role": "reader", "type": "anyone" }));
        let _: serde_json::Value = self.api.send("drive share", req)?;

        let req = self
            .api
            .client
            .get(self.api.drive_url(&format!("/drive/v3/files/{object_id}")))
            .query(&[("fields", "id,webViewLink")]);
        let file: DriveFile = self.api.send("drive get link", req)?;

        Ok(file
            .web_view_link
            .unwrap_or_else(|| format!("https://drive.google.com/file/d/{object_id}/view")))
    }
}
