//! Docs tool router

use serde_json::{json, Value};

use oifig_core::auth::CredentialManager;
use oifig_core::google::{docs, DocsApi};

use super::{mutating_tool, read_only_tool, require_str, scope_vec, ToolError, ToolSpec};

const USER_ID_DESC: &str = "Email address of the configured Google account to act as";

pub(super) fn tools() -> Vec<ToolSpec> {
    vec![
        read_only_tool(
            "docs_get_document",
            "Fetch a Google Doc's full structured content.",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "description": USER_ID_DESC},
                    "document_id": {"type": "string"}
                },
                "required": ["user_id", "document_id"]
            }),
        ),
        mutating_tool(
            "docs_create_document",
            "Create an empty Google Doc.",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "description": USER_ID_DESC},
                    "title": {"type": "string"}
                },
                "required": ["user_id", "title"]
            }),
            false,
        ),
        mutating_tool(
            "docs_append_text",
            "Append text to the end of a Google Doc.",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "description": USER_ID_DESC},
                    "document_id": {"type": "string"},
                    "text": {"type": "string"}
                },
                "required": ["user_id", "document_id", "text"]
            }),
            false,
        ),
        mutating_tool(
            "docs_batch_update",
            "Apply raw Docs API batchUpdate requests for edits the other tools do not cover.",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "description": USER_ID_DESC},
                    "document_id": {"type": "string"},
                    "requests": {"type": "array", "description": "Docs API request objects"}
                },
                "required": ["user_id", "document_id", "requests"]
            }),
            false,
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
        .ensure_ready(account, &scope_vec(docs::SCOPES))
        .await?;
    let api = DocsApi::new(cred.access_token)?;

    match action {
        "get_document" => {
            let document = api.get_document(require_str(params, "document_id")?).await?;
            Ok(document)
        }
        "create_document" => {
            let document = api.create_document(require_str(params, "title")?).await?;
            Ok(document)
        }
        "append_text" => {
            let result = api
                .append_text(
                    require_str(params, "document_id")?,
                    require_str(params, "text")?,
                )
                .await?;
            Ok(result)
        }
        "batch_update" => {
            let requests = params
                .get("requests")
                .cloned()
                .ok_or_else(|| ToolError::InvalidParams("Missing required parameter: requests".to_string()))?;
            let result = api
                .batch_update(require_str(params, "document_id")?, requests)
                .await?;
            Ok(result)
        }
        _ => Err(ToolError::InvalidParams(format!(
            "unknown docs action: {}",
            action
        ))),
    }
}
