//! Google API Authenticated HTTP Client
//!
//! Injects the OAuth bearer token, decodes Google's error envelope, and
//! handles `nextPageToken` pagination. One instance per credential; nothing
//! is shared across accounts.

use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::common::create_http_client;
use crate::google::common::extract_array;

/// Google API HTTP client with OAuth token injection
pub struct GoogleClient {
    client: Client,
    access_token: String,
}

impl GoogleClient {
    /// Create a new Google API client with an OAuth access token
    pub fn new(access_token: String) -> Result<Self, String> {
        Ok(Self {
            client: create_http_client()?,
            access_token,
        })
    }

    /// Make an authenticated GET request
    pub async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<Value, String> {
        let builder = self
            .client
            .get(url)
            .query(query)
            .bearer_auth(&self.access_token);

        self.execute_request(builder).await
    }

    /// Make an authenticated GET request and return the raw body
    /// (media downloads and exports are not JSON).
    pub async fn get_text(&self, url: &str, query: &[(&str, String)]) -> Result<String, String> {
        let response = self
            .client
            .get(url)
            .query(query)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| format!("HTTP request failed: {}", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("Failed to read response body: {}", e))?;

        if !status.is_success() {
            // Error bodies are JSON even on media endpoints
            let parsed: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
            return Err(extract_error_message(&parsed, status));
        }

        Ok(body)
    }

    /// Make an authenticated POST request with JSON body
    pub async fn post(&self, url: &str, body: &Value) -> Result<Value, String> {
        let builder = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(body);

        self.execute_request(builder).await
    }

    /// Make an authenticated PUT request with JSON body
    pub async fn put(&self, url: &str, body: &Value) -> Result<Value, String> {
        let builder = self
            .client
            .put(url)
            .bearer_auth(&self.access_token)
            .json(body);

        self.execute_request(builder).await
    }

    /// Make an authenticated PATCH request with JSON body
    pub async fn patch(&self, url: &str, body: &Value) -> Result<Value, String> {
        let builder = self
            .client
            .patch(url)
            .bearer_auth(&self.access_token)
            .json(body);

        self.execute_request(builder).await
    }

    /// Make an authenticated DELETE request
    pub async fn delete(&self, url: &str) -> Result<Value, String> {
        let builder = self.client.delete(url).bearer_auth(&self.access_token);

        self.execute_request(builder).await
    }

    /// Execute a request and handle Google API response patterns
    async fn execute_request(&self, builder: RequestBuilder) -> Result<Value, String> {
        let response = builder
            .send()
            .await
            .map_err(|e| format!("HTTP request failed: {}", e))?;

        let status = response.status();
        debug!("Response status: {}", status);

        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("Rate limited by Google API");
            return Err("Rate limited by Google API. Please try again later.".to_string());
        }

        let body = response
            .text()
            .await
            .map_err(|e| format!("Failed to read response body: {}", e))?;

        // Empty successful responses (e.g., DELETE)
        if status.is_success() && body.is_empty() {
            return Ok(Value::Object(serde_json::Map::new()));
        }

        let parsed: Value = serde_json::from_str(&body)
            .map_err(|e| format!("Failed to parse JSON response: {} (body: {})", e, body))?;

        if !status.is_success() {
            let error_msg = extract_error_message(&parsed, status);
            error!("Google API error: {}", error_msg);
            return Err(error_msg);
        }

        Ok(parsed)
    }

    /// Follow `nextPageToken` pagination, collecting items from `items_field`.
    ///
    /// Page-size parameters differ per API ("maxResults", "pageSize") so the
    /// caller supplies its own in `base_query`; `max_results` only bounds the
    /// total collected here.
    pub async fn get_paginated(
        &self,
        url: &str,
        base_query: &[(&str, String)],
        items_field: &str,
        max_results: Option<usize>,
    ) -> Result<Vec<Value>, String> {
        let mut all_items = Vec::new();
        let mut page_token: Option<String> = None;
        let limit = max_results.unwrap_or(usize::MAX);

        loop {
            let mut query = base_query.to_vec();
            if let Some(ref token) = page_token {
                query.push(("pageToken", token.clone()));
            }

            let response = self.get(url, &query).await?;

            all_items.extend(extract_array(&response, items_field));
            if all_items.len() >= limit {
                all_items.truncate(limit);
                break;
            }

            match response.get("nextPageToken").and_then(|v| v.as_str()) {
                Some(next) => page_token = Some(next.to_string()),
                None => break,
            }
        }

        Ok(all_items)
    }
}

/// Extract error message from a Google API error response
///
/// Google APIs report errors as:
/// `{"error": {"code": 400, "message": "...", "errors": [...]}}`
fn extract_error_message(response: &Value, status: StatusCode) -> String {
    if let Some(error_obj) = response.get("error") {
        if let Some(message) = error_obj.get("message").and_then(|v| v.as_str()) {
            let code = error_obj
                .get("code")
                .and_then(|v| v.as_i64())
                .unwrap_or(status.as_u16() as i64);

            return format!("Google API error {}: {}", code, message);
        }
    }

    format!("HTTP {} error", status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_error_message() {
        let error_response = serde_json::json!({
            "error": {
                "code": 403,
                "message": "Insufficient Permission"
            }
        });

        let msg = extract_error_message(&error_response, StatusCode::FORBIDDEN);
        assert!(msg.contains("403"));
        assert!(msg.contains("Insufficient Permission"));
    }

    #[test]
    fn test_extract_error_message_fallback() {
        let msg = extract_error_message(&Value::Null, StatusCode::BAD_GATEWAY);
        assert_eq!(msg, "HTTP 502 Bad Gateway error");
    }
}
