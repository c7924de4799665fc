//! Slides tool router

use serde_json::{json, Value};

use oifig_core::auth::CredentialManager;
use oifig_core::google::{slides, SlidesApi};

use super::{mutating_tool, read_only_tool, require_str, scope_vec, ToolError, ToolSpec};

const USER_ID_DESC: &str = "Email address of the configured Google account to act as";

pub(super) fn tools() -> Vec<ToolSpec> {
    vec![
        read_only_tool(
            "slides_get_presentation",
            "Fetch a presentation's full structured content.",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "description": USER_ID_DESC},
                    "presentation_id": {"type": "string"}
                },
                "required": ["user_id", "presentation_id"]
            }),
        ),
        read_only_tool(
            "slides_get_page",
            "Fetch a single slide by its page object ID.",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "description": USER_ID_DESC},
                    "presentation_id": {"type": "string"},
                    "page_object_id": {"type": "string"}
                },
                "required": ["user_id", "presentation_id", "page_object_id"]
            }),
        ),
        mutating_tool(
            "slides_create_presentation",
            "Create an empty presentation.",
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
            "slides_batch_update",
            "Apply raw Slides API batchUpdate requests (add slides, insert text boxes, etc.).",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "description": USER_ID_DESC},
                    "presentation_id": {"type": "string"},
                    "requests": {"type": "array", "description": "Slides API request objects"}
                },
                "required": ["user_id", "presentation_id", "requests"]
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
        .ensure_ready(account, &scope_vec(slides::SCOPES))
        .await?;
    let api = SlidesApi::new(cred.access_token)?;

    match action {
        "get_presentation" => {
            let presentation = api
                .get_presentation(require_str(params, "presentation_id")?)
                .await?;
            Ok(presentation)
        }
        "get_page" => {
            let page = api
                .get_page(
                    require_str(params, "presentation_id")?,
                    require_str(params, "page_object_id")?,
                )
                .await?;
            Ok(page)
        }
        "create_presentation" => {
            let presentation = api
                .create_presentation(require_str(params, "title")?)
                .await?;
            Ok(presentation)
        }
        "batch_update" => {
            let requests = params
                .get("requests")
                .cloned()
                .ok_or_else(|| ToolError::InvalidParams("Missing required parameter: requests".to_string()))?;
            let result = api
                .batch_update(require_str(params, "presentation_id")?, requests)
                .await?;
            Ok(result)
        }
        _ => Err(ToolError::InvalidParams(format!(
            "unknown slides action: {}",
            action
        ))),
    }
}
