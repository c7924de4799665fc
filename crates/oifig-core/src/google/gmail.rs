//! Gmail API v1 Client
//!
//! Provides methods for interacting with Gmail API:
//! - List/search messages, fetch single or many by id
//! - Send emails, manage drafts and replies
//! - Manage labels, trash/delete messages
//! - Fetch attachments

use futures::future::try_join_all;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::client::GoogleClient;
use super::common::extract_array;

const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

/// OAuth scopes required for Gmail operations.
pub const SCOPES: &[&str] = &["https://www.googleapis.com/auth/gmail.modify"];

pub struct GmailApi {
    client: GoogleClient,
}

super::google_api_wrapper!(GmailApi);

impl GmailApi {
    /// List messages matching a query
    ///
    /// # Arguments
    /// * `query` - Gmail search query (same syntax as the web UI)
    /// * `max_results` - Maximum number of messages to return
    /// * `label_ids` - Filter by label IDs (e.g., ["INBOX", "UNREAD"])
    ///
    /// # Returns
    /// Array of message stubs with id and threadId
    pub async fn list_messages(
        &self,
        query: Option<&str>,
        max_results: Option<usize>,
        label_ids: Option<Vec<String>>,
    ) -> Result<Vec<Value>, String> {
        info!("Listing Gmail messages");

        let mut query_params = vec![];

        if let Some(q) = query {
            query_params.push(("q", q.to_string()));
        }

        if let Some(labels) = label_ids {
            for label in labels {
                query_params.push(("labelIds", label));
            }
        }

        if let Some(max) = max_results {
            query_params.push(("maxResults", max.to_string()));
        }

        let url = format!("{}/users/me/messages", GMAIL_API_BASE);
        let messages = self
            .client
            .get_paginated(&url, &query_params, "messages", max_results)
            .await?;

        debug!("Retrieved {} messages", messages.len());
        Ok(messages)
    }

    /// Get a message by ID
    ///
    /// # Arguments
    /// * `id` - Message ID
    /// * `format` - "full" (default), "metadata", "minimal", "raw"
    pub async fn get_message(&self, id: &str, format: Option<&str>) -> Result<Value, String> {
        info!("Fetching Gmail message: {}", id);

        let mut query_params = vec![];
        if let Some(fmt) = format {
            query_params.push(("format", fmt.to_string()));
        }

        let url = format!("{}/users/me/messages/{}", GMAIL_API_BASE, id);
        self.client.get(&url, &query_params).await
    }

    /// Fetch many messages by ID in parallel.
    ///
    /// The fetches are independent, so they are issued together and awaited
    /// as a batch; one failing fetch fails the whole batch.
    pub async fn get_messages(
        &self,
        ids: &[String],
        format: Option<&str>,
    ) -> Result<Vec<Value>, String> {
        info!("Fetching {} Gmail messages", ids.len());

        try_join_all(ids.iter().map(|id| self.get_message(id, format))).await
    }

    /// Fetch a message attachment. The payload is base64url-encoded data.
    pub async fn get_attachment(
        &self,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<Value, String> {
        info!("Fetching attachment {} of message {}", attachment_id, message_id);

        let url = format!(
            "{}/users/me/messages/{}/attachments/{}",
            GMAIL_API_BASE, message_id, attachment_id
        );
        self.client.get(&url, &[]).await
    }

    /// Send an email
    ///
    /// # Returns
    /// Sent message object with id and threadId
    pub async fn send_message(
        &self,
        to: Vec<String>,
        subject: &str,
        body: &str,
        cc: Option<Vec<String>>,
        bcc: Option<Vec<String>>,
    ) -> Result<Value, String> {
        info!("Sending Gmail message to: {:?}", to);

        let raw = build_raw_message(&to, subject, body, cc.as_deref(), bcc.as_deref(), &[]);
        let request_body = json!({ "raw": base64_url_encode(raw.as_bytes()) });

        let url = format!("{}/users/me/messages/send", GMAIL_API_BASE);
        let response = self.client.post(&url, &request_body).await?;

        info!("Message sent successfully");
        Ok(response)
    }

    /// Create a draft without sending it
    pub async fn create_draft(
        &self,
        to: Vec<String>,
        subject: &str,
        body: &str,
        cc: Option<Vec<String>>,
        bcc: Option<Vec<String>>,
    ) -> Result<Value, String> {
        info!("Creating Gmail draft");

        let raw = build_raw_message(&to, subject, body, cc.as_deref(), bcc.as_deref(), &[]);
        let request_body = json!({
            "message": { "raw": base64_url_encode(raw.as_bytes()) }
        });

        let url = format!("{}/users/me/drafts", GMAIL_API_BASE);
        self.client.post(&url, &request_body).await
    }

    /// Delete a draft
    pub async fn delete_draft(&self, draft_id: &str) -> Result<Value, String> {
        info!("Deleting Gmail draft: {}", draft_id);

        let url = format!("{}/users/me/drafts/{}", GMAIL_API_BASE, draft_id);
        self.client.delete(&url).await
    }

    /// Reply to an existing message, threading the reply correctly.
    ///
    /// With `send` false the reply is stored as a draft instead of sent.
    pub async fn reply_message(
        &self,
        message_id: &str,
        body: &str,
        send: bool,
    ) -> Result<Value, String> {
        info!("Replying to Gmail message: {} (send: {})", message_id, send);

        let original = self.get_message(message_id, Some("metadata")).await?;
        let thread_id = original
            .get("threadId")
            .and_then(|v| v.as_str())
            .ok_or("Original message has no threadId")?
            .to_string();

        let to = header_value(&original, "Reply-To")
            .or_else(|| header_value(&original, "From"))
            .ok_or("Original message has no sender address")?;
        let subject = reply_subject(header_value(&original, "Subject").unwrap_or_default());

        let mut extra_headers = vec![];
        if let Some(mid) = header_value(&original, "Message-ID") {
            extra_headers.push(("In-Reply-To".to_string(), mid.clone()));
            extra_headers.push(("References".to_string(), mid));
        }

        let raw = build_raw_message(&[to], &subject, body, None, None, &extra_headers);
        let encoded = base64_url_encode(raw.as_bytes());

        if send {
            let url = format!("{}/users/me/messages/send", GMAIL_API_BASE);
            self.client
                .post(&url, &json!({ "raw": encoded, "threadId": thread_id }))
                .await
        } else {
            let url = format!("{}/users/me/drafts", GMAIL_API_BASE);
            self.client
                .post(
                    &url,
                    &json!({ "message": { "raw": encoded, "threadId": thread_id } }),
                )
                .await
        }
    }

    /// List all labels
    pub async fn list_labels(&self) -> Result<Vec<Value>, String> {
        info!("Listing Gmail labels");

        let url = format!("{}/users/me/labels", GMAIL_API_BASE);
        let response = self.client.get(&url, &[]).await?;
        Ok(extract_array(&response, "labels"))
    }

    /// Add and/or remove labels on a message
    pub async fn modify_message(
        &self,
        id: &str,
        add_label_ids: Option<Vec<String>>,
        remove_label_ids: Option<Vec<String>>,
    ) -> Result<Value, String> {
        info!("Modifying labels on Gmail message: {}", id);

        let mut body = serde_json::Map::new();
        if let Some(add) = add_label_ids {
            body.insert("addLabelIds".to_string(), json!(add));
        }
        if let Some(remove) = remove_label_ids {
            body.insert("removeLabelIds".to_string(), json!(remove));
        }

        let url = format!("{}/users/me/messages/{}/modify", GMAIL_API_BASE, id);
        self.client.post(&url, &Value::Object(body)).await
    }

    /// Move a message to trash
    pub async fn trash_message(&self, id: &str) -> Result<Value, String> {
        info!("Trashing Gmail message: {}", id);

        let url = format!("{}/users/me/messages/{}/trash", GMAIL_API_BASE, id);
        self.client.post(&url, &json!({})).await
    }

    /// Permanently delete a message (bypasses trash)
    pub async fn delete_message(&self, id: &str) -> Result<Value, String> {
        info!("Deleting Gmail message: {}", id);

        let url = format!("{}/users/me/messages/{}", GMAIL_API_BASE, id);
        self.client.delete(&url).await
    }
}

// ── Message construction helpers ────────────────────────────────────────────

/// Build an RFC 2822 plain-text message.
fn build_raw_message(
    to: &[String],
    subject: &str,
    body: &str,
    cc: Option<&[String]>,
    bcc: Option<&[String]>,
    extra_headers: &[(String, String)],
) -> String {
    let mut parts = vec![
        format!("To: {}", to.join(", ")),
        format!("Subject: {}", subject),
    ];

    if let Some(cc_addrs) = cc {
        if !cc_addrs.is_empty() {
            parts.push(format!("Cc: {}", cc_addrs.join(", ")));
        }
    }

    if let Some(bcc_addrs) = bcc {
        if !bcc_addrs.is_empty() {
            parts.push(format!("Bcc: {}", bcc_addrs.join(", ")));
        }
    }

    for (name, value) in extra_headers {
        parts.push(format!("{}: {}", name, value));
    }

    parts.push("Content-Type: text/plain; charset=UTF-8".to_string());
    parts.push(String::new()); // blank line separates headers from body
    parts.push(body.to_string());

    parts.join("\r\n")
}

/// Prefix "Re: " unless the subject already carries it.
fn reply_subject(subject: String) -> String {
    if subject.to_lowercase().starts_with("re:") {
        subject
    } else {
        format!("Re: {}", subject)
    }
}

/// Extract a header value from a message's payload.
fn header_value(message: &Value, name: &str) -> Option<String> {
    message
        .get("payload")?
        .get("headers")?
        .as_array()?
        .iter()
        .find(|h| {
            h.get("name")
                .and_then(|n| n.as_str())
                .is_some_and(|n| n.eq_ignore_ascii_case(name))
        })
        .and_then(|h| h.get("value").and_then(|v| v.as_str()))
        .map(String::from)
}

/// Base64url encoding (no padding) as Gmail's `raw` field expects.
fn base64_url_encode(data: &[u8]) -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    URL_SAFE_NO_PAD.encode(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_raw_message() {
        let raw = build_raw_message(
            &["a@example.com".to_string(), "b@example.com".to_string()],
            "Hello",
            "Body text",
            Some(&["c@example.com".to_string()]),
            None,
            &[],
        );

        assert!(raw.starts_with("To: a@example.com, b@example.com\r\n"));
        assert!(raw.contains("Subject: Hello\r\n"));
        assert!(raw.contains("Cc: c@example.com\r\n"));
        assert!(!raw.contains("Bcc:"));
        assert!(raw.ends_with("\r\n\r\nBody text"));
    }

    #[test]
    fn test_build_raw_message_extra_headers() {
        let raw = build_raw_message(
            &["a@example.com".to_string()],
            "Re: Hello",
            "ack",
            None,
            None,
            &[("In-Reply-To".to_string(), "<m1@mail>".to_string())],
        );
        assert!(raw.contains("In-Reply-To: <m1@mail>\r\n"));
    }

    #[test]
    fn test_reply_subject() {
        assert_eq!(reply_subject("Hello".to_string()), "Re: Hello");
        assert_eq!(reply_subject("Re: Hello".to_string()), "Re: Hello");
        assert_eq!(reply_subject("RE: Hello".to_string()), "RE: Hello");
    }

    #[test]
    fn test_header_value() {
        let message = json!({
            "payload": {
                "headers": [
                    {"name": "From", "value": "sender@example.com"},
                    {"name": "subject", "value": "case test"}
                ]
            }
        });

        assert_eq!(header_value(&message, "From").as_deref(), Some("sender@example.com"));
        assert_eq!(header_value(&message, "Subject").as_deref(), Some("case test"));
        assert!(header_value(&message, "Message-ID").is_none());
        assert!(header_value(&json!({}), "From").is_none());
    }
}
