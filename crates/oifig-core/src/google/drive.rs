//! Google Drive API v3 Client
//!
//! Search and fetch files, download/export content, create folders,
//! delete files.

use serde_json::{json, Value};
use tracing::{debug, info};

use super::client::GoogleClient;

const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// OAuth scopes required for Drive operations.
pub const SCOPES: &[&str] = &["https://www.googleapis.com/auth/drive"];

/// Google-native documents cannot be downloaded directly; they are exported
/// to a conventional format instead.
const EXPORT_MIMES: &[(&str, &str)] = &[
    ("application/vnd.google-apps.document", "text/markdown"),
    ("application/vnd.google-apps.spreadsheet", "text/csv"),
    ("application/vnd.google-apps.presentation", "text/plain"),
];

pub struct DriveApi {
    client: GoogleClient,
}

super::google_api_wrapper!(DriveApi);

impl DriveApi {
    /// Search files with a Drive query expression
    ///
    /// # Arguments
    /// * `query` - e.g. `name contains 'report' and trashed = false`
    /// * `max_results` - Maximum number of files to return
    pub async fn search_files(
        &self,
        query: Option<&str>,
        max_results: Option<usize>,
    ) -> Result<Vec<Value>, String> {
        info!("Searching Drive files");

        let mut query_params = vec![(
            "fields",
            "nextPageToken, files(id, name, mimeType, modifiedTime, size, parents)".to_string(),
        )];

        if let Some(q) = query {
            query_params.push(("q", q.to_string()));
        }

        if let Some(max) = max_results {
            query_params.push(("pageSize", max.min(1000).to_string()));
        }

        let url = format!("{}/files", DRIVE_API_BASE);
        let files = self
            .client
            .get_paginated(&url, &query_params, "files", max_results)
            .await?;

        debug!("Found {} files", files.len());
        Ok(files)
    }

    /// Get file metadata
    pub async fn get_file(&self, file_id: &str) -> Result<Value, String> {
        info!("Fetching Drive file metadata: {}", file_id);

        let url = format!("{}/files/{}", DRIVE_API_BASE, file_id);
        self.client
            .get(
                &url,
                &[(
                    "fields",
                    "id, name, mimeType, modifiedTime, size, parents, webViewLink".to_string(),
                )],
            )
            .await
    }

    /// Download a file's content as text.
    ///
    /// Google-native files (Docs, Sheets, Slides) are exported to a text
    /// format; everything else is fetched verbatim with `alt=media`.
    pub async fn download_file(&self, file_id: &str) -> Result<String, String> {
        let metadata = self.get_file(file_id).await?;
        let mime_type = metadata
            .get("mimeType")
            .and_then(|v| v.as_str())
            .unwrap_or_default();

        if let Some((_, export_mime)) = EXPORT_MIMES.iter().find(|(m, _)| *m == mime_type) {
            info!("Exporting Drive file {} as {}", file_id, export_mime);
            let url = format!("{}/files/{}/export", DRIVE_API_BASE, file_id);
            return self
                .client
                .get_text(&url, &[("mimeType", export_mime.to_string())])
                .await;
        }

        info!("Downloading Drive file: {}", file_id);
        let url = format!("{}/files/{}", DRIVE_API_BASE, file_id);
        self.client
            .get_text(&url, &[("alt", "media".to_string())])
            .await
    }

    /// Create a folder
    pub async fn create_folder(
        &self,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<Value, String> {
        info!("Creating Drive folder: {}", name);

        let mut body = json!({
            "name": name,
            "mimeType": "application/vnd.google-apps.folder",
        });
        if let Some(parent) = parent_id {
            body["parents"] = json!([parent]);
        }

        let url = format!("{}/files", DRIVE_API_BASE);
        self.client.post(&url, &body).await
    }

    /// Delete a file or folder (bypasses trash)
    pub async fn delete_file(&self, file_id: &str) -> Result<Value, String> {
        info!("Deleting Drive file: {}", file_id);

        let url = format!("{}/files/{}", DRIVE_API_BASE, file_id);
        self.client.delete(&url).await
    }
}
