//! Google Docs API v1 Client

use serde_json::{json, Value};
use tracing::info;

use super::client::GoogleClient;

const DOCS_API_BASE: &str = "https://docs.googleapis.com/v1";

/// OAuth scopes required for Docs operations.
pub const SCOPES: &[&str] = &["https://www.googleapis.com/auth/documents"];

pub struct DocsApi {
    client: GoogleClient,
}

super::google_api_wrapper!(DocsApi);

impl DocsApi {
    /// Get a document's full structured content
    pub async fn get_document(&self, document_id: &str) -> Result<Value, String> {
        info!("Fetching Google Doc: {}", document_id);

        let url = format!("{}/documents/{}", DOCS_API_BASE, document_id);
        self.client.get(&url, &[]).await
    }

    /// Create an empty document
    pub async fn create_document(&self, title: &str) -> Result<Value, String> {
        info!("Creating Google Doc: {}", title);

        let url = format!("{}/documents", DOCS_API_BASE);
        self.client.post(&url, &json!({ "title": title })).await
    }

    /// Append text to the end of the document body
    pub async fn append_text(&self, document_id: &str, text: &str) -> Result<Value, String> {
        info!("Appending text to Google Doc: {}", document_id);

        self.batch_update(
            document_id,
            json!([{
                "insertText": {
                    "endOfSegmentLocation": {},
                    "text": text,
                }
            }]),
        )
        .await
    }

    /// Apply a raw batchUpdate request list
    pub async fn batch_update(&self, document_id: &str, requests: Value) -> Result<Value, String> {
        info!("Batch-updating Google Doc: {}", document_id);

        let url = format!("{}/documents/{}:batchUpdate", DOCS_API_BASE, document_id);
        self.client
            .post(&url, &json!({ "requests": requests }))
            .await
    }
}
