//! Google Slides API v1 Client

use serde_json::{json, Value};
use tracing::info;

use super::client::GoogleClient;

const SLIDES_API_BASE: &str = "https://slides.googleapis.com/v1";

/// OAuth scopes required for Slides operations.
pub const SCOPES: &[&str] = &["https://www.googleapis.com/auth/presentations"];

pub struct SlidesApi {
    client: GoogleClient,
}

super::google_api_wrapper!(SlidesApi);

impl SlidesApi {
    /// Get a presentation's full structured content
    pub async fn get_presentation(&self, presentation_id: &str) -> Result<Value, String> {
        info!("Fetching presentation: {}", presentation_id);

        let url = format!("{}/presentations/{}", SLIDES_API_BASE, presentation_id);
        self.client.get(&url, &[]).await
    }

    /// Get a single page (slide) of a presentation
    pub async fn get_page(
        &self,
        presentation_id: &str,
        page_object_id: &str,
    ) -> Result<Value, String> {
        info!(
            "Fetching page {} of presentation {}",
            page_object_id, presentation_id
        );

        let url = format!(
            "{}/presentations/{}/pages/{}",
            SLIDES_API_BASE, presentation_id, page_object_id
        );
        self.client.get(&url, &[]).await
    }

    /// Create an empty presentation
    pub async fn create_presentation(&self, title: &str) -> Result<Value, String> {
        info!("Creating presentation: {}", title);

        let url = format!("{}/presentations", SLIDES_API_BASE);
        self.client.post(&url, &json!({ "title": title })).await
    }

    /// Apply a raw batchUpdate request list
    pub async fn batch_update(
        &self,
        presentation_id: &str,
        requests: Value,
    ) -> Result<Value, String> {
        info!("Batch-updating presentation: {}", presentation_id);

        let url = format!(
            "{}/presentations/{}:batchUpdate",
            SLIDES_API_BASE, presentation_id
        );
        self.client
            .post(&url, &json!({ "requests": requests }))
            .await
    }
}
