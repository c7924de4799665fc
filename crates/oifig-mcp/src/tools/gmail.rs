//! Gmail tool router
//!
//! Catalog definitions and dispatch for Gmail tools. Each call resolves a
//! ready credential for the requested account before touching the API.

use serde_json::{json, Value};

use oifig_core::auth::CredentialManager;
use oifig_core::google::{gmail, GmailApi};

use super::{
    bool_with_default, mutating_tool, optional_str, optional_string_array, optional_usize,
    read_only_tool, require_str, require_string_array, scope_vec, ToolError, ToolSpec,
};

const USER_ID_DESC: &str = "Email address of the configured Google account to act as";

pub(super) fn tools() -> Vec<ToolSpec> {
    vec![
        read_only_tool(
            "gmail_list_messages",
            "List or search Gmail messages. Supports the same query syntax as the Gmail web UI (e.g. 'from:x is:unread newer_than:7d').",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "description": USER_ID_DESC},
                    "query": {"type": "string", "description": "Gmail search query"},
                    "label_ids": {"type": "array", "items": {"type": "string"}, "description": "Filter by label IDs, e.g. [\"INBOX\", \"UNREAD\"]"},
                    "max_results": {"type": "integer", "description": "Maximum number of messages to return"}
                },
                "required": ["user_id"]
            }),
        ),
        read_only_tool(
            "gmail_get_message",
            "Fetch a single Gmail message by ID, including headers and body.",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "description": USER_ID_DESC},
                    "message_id": {"type": "string"},
                    "format": {"type": "string", "enum": ["full", "metadata", "minimal", "raw"]}
                },
                "required": ["user_id", "message_id"]
            }),
        ),
        read_only_tool(
            "gmail_get_messages",
            "Fetch several Gmail messages by ID in one call.",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "description": USER_ID_DESC},
                    "message_ids": {"type": "array", "items": {"type": "string"}},
                    "format": {"type": "string", "enum": ["full", "metadata", "minimal", "raw"]}
                },
                "required": ["user_id", "message_ids"]
            }),
        ),
        read_only_tool(
            "gmail_get_attachment",
            "Fetch a message attachment. Returns base64url-encoded data.",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "description": USER_ID_DESC},
                    "message_id": {"type": "string"},
                    "attachment_id": {"type": "string"}
                },
                "required": ["user_id", "message_id", "attachment_id"]
            }),
        ),
        read_only_tool(
            "gmail_list_labels",
            "List all Gmail labels for the account.",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "description": USER_ID_DESC}
                },
                "required": ["user_id"]
            }),
        ),
        mutating_tool(
            "gmail_send_message",
            "Send a plain-text email.",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "description": USER_ID_DESC},
                    "to": {"type": "array", "items": {"type": "string"}},
                    "subject": {"type": "string"},
                    "body": {"type": "string"},
                    "cc": {"type": "array", "items": {"type": "string"}},
                    "bcc": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["user_id", "to", "subject", "body"]
            }),
            false,
        ),
        mutating_tool(
            "gmail_create_draft",
            "Create a draft email without sending it.",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "description": USER_ID_DESC},
                    "to": {"type": "array", "items": {"type": "string"}},
                    "subject": {"type": "string"},
                    "body": {"type": "string"},
                    "cc": {"type": "array", "items": {"type": "string"}},
                    "bcc": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["user_id", "to", "subject", "body"]
            }),
            false,
        ),
        mutating_tool(
            "gmail_delete_draft",
            "Delete a draft by ID.",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "description": USER_ID_DESC},
                    "draft_id": {"type": "string"}
                },
                "required": ["user_id", "draft_id"]
            }),
            true,
        ),
        mutating_tool(
            "gmail_reply_message",
            "Reply to an existing message in its thread. With send=false the reply is saved as a draft.",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "description": USER_ID_DESC},
                    "message_id": {"type": "string", "description": "ID of the message being replied to"},
                    "body": {"type": "string"},
                    "send": {"type": "boolean", "description": "Send immediately (true) or save as draft (false, default)"}
                },
                "required": ["user_id", "message_id", "body"]
            }),
            false,
        ),
        mutating_tool(
            "gmail_modify_message",
            "Add or remove labels on a message (archive, mark read, etc.).",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "description": USER_ID_DESC},
                    "message_id": {"type": "string"},
                    "add_label_ids": {"type": "array", "items": {"type": "string"}},
                    "remove_label_ids": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["user_id", "message_id"]
            }),
            false,
        ),
        mutating_tool(
            "gmail_trash_message",
            "Move a message to trash.",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "description": USER_ID_DESC},
                    "message_id": {"type": "string"}
                },
                "required": ["user_id", "message_id"]
            }),
            true,
        ),
        mutating_tool(
            "gmail_delete_message",
            "Permanently delete a message, bypassing trash.",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "description": USER_ID_DESC},
                    "message_id": {"type": "string"}
                },
                "required": ["user_id", "message_id"]
            }),
            true,
        ),
    ]
}

pub(super) async fn call(
    manager: &CredentialManager,
    action: &str,
    params: &Value,
) -> Result<Value, ToolError> {
    let account = require_str(params, "user_id")?;
    let cred = manager
        .ensure_ready(account, &scope_vec(gmail::SCOPES))
        .await?;
    let api = GmailApi::new(cred.access_token)?;

    match action {
        "list_messages" => {
            let messages = api
                .list_messages(
                    optional_str(params, "query"),
                    optional_usize(params, "max_results"),
                    optional_string_array(params, "label_ids"),
                )
                .await?;
            let count = messages.len();
            Ok(json!({ "count": count, "messages": messages }))
        }
        "get_message" => {
            let message = api
                .get_message(require_str(params, "message_id")?, optional_str(params, "format"))
                .await?;
            Ok(message)
        }
        "get_messages" => {
            let ids = require_string_array(params, "message_ids")?;
            let messages = api
                .get_messages(&ids, optional_str(params, "format"))
                .await?;
            let count = messages.len();
            Ok(json!({ "count": count, "messages": messages }))
        }
        "get_attachment" => {
            let attachment = api
                .get_attachment(
                    require_str(params, "message_id")?,
                    require_str(params, "attachment_id")?,
                )
                .await?;
            Ok(attachment)
        }
        "list_labels" => {
            let labels = api.list_labels().await?;
            Ok(json!({ "labels": labels }))
        }
        "send_message" => {
            let sent = api
                .send_message(
                    require_string_array(params, "to")?,
                    require_str(params, "subject")?,
                    require_str(params, "body")?,
                    optional_string_array(params, "cc"),
                    optional_string_array(params, "bcc"),
                )
                .await?;
            Ok(sent)
        }
        "create_draft" => {
            let draft = api
                .create_draft(
                    require_string_array(params, "to")?,
                    require_str(params, "subject")?,
                    require_str(params, "body")?,
                    optional_string_array(params, "cc"),
                    optional_string_array(params, "bcc"),
                )
                .await?;
            Ok(draft)
        }
        "delete_draft" => {
            api.delete_draft(require_str(params, "draft_id")?).await?;
            Ok(json!({ "success": true }))
        }
        "reply_message" => {
            let reply = api
                .reply_message(
                    require_str(params, "message_id")?,
                    require_str(params, "body")?,
                    bool_with_default(params, "send", false),
                )
                .await?;
            Ok(reply)
        }
        "modify_message" => {
            let modified = api
                .modify_message(
                    require_str(params, "message_id")?,
                    optional_string_array(params, "add_label_ids"),
                    optional_string_array(params, "remove_label_ids"),
                )
                .await?;
            Ok(modified)
        }
        "trash_message" => {
            let trashed = api.trash_message(require_str(params, "message_id")?).await?;
            Ok(trashed)
        }
        "delete_message" => {
            api.delete_message(require_str(params, "message_id")?).await?;
            Ok(json!({ "success": true }))
        }
        _ => Err(ToolError::InvalidParams(format!(
            "unknown gmail action: {}",
            action
        ))),
    }
}
