//! Sheets tool router

use serde_json::{json, Value};

use oifig_core::auth::CredentialManager;
use oifig_core::google::{sheets, SheetsApi};

use super::{mutating_tool, read_only_tool, require_str, scope_vec, ToolError, ToolSpec};

const USER_ID_DESC: &str = "Email address of the configured Google account to act as";

pub(super) fn tools() -> Vec<ToolSpec> {
    vec![
        read_only_tool(
            "sheets_get_values",
            "Read a range of cell values in A1 notation, e.g. 'Sheet1!A1:C10'.",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "description": USER_ID_DESC},
                    "spreadsheet_id": {"type": "string"},
                    "range": {"type": "string"}
                },
                "required": ["user_id", "spreadsheet_id", "range"]
            }),
        ),
        mutating_tool(
            "sheets_create_spreadsheet",
            "Create an empty spreadsheet.",
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
            "sheets_update_values",
            "Overwrite a range with rows of values (array of arrays).",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "description": USER_ID_DESC},
                    "spreadsheet_id": {"type": "string"},
                    "range": {"type": "string"},
                    "values": {"type": "array", "items": {"type": "array"}}
                },
                "required": ["user_id", "spreadsheet_id", "range", "values"]
            }),
            false,
        ),
        mutating_tool(
            "sheets_append_values",
            "Append rows after the last row of the range's table.",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "description": USER_ID_DESC},
                    "spreadsheet_id": {"type": "string"},
                    "range": {"type": "string"},
                    "values": {"type": "array", "items": {"type": "array"}}
                },
                "required": ["user_id", "spreadsheet_id", "range", "values"]
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
        .ensure_ready(account, &scope_vec(sheets::SCOPES))
        .await?;
    let api = SheetsApi::new(cred.access_token)?;

    match action {
        "get_values" => {
            let values = api
                .get_values(
                    require_str(params, "spreadsheet_id")?,
                    require_str(params, "range")?,
                )
                .await?;
            Ok(values)
        }
        "create_spreadsheet" => {
            let spreadsheet = api.create_spreadsheet(require_str(params, "title")?).await?;
            Ok(spreadsheet)
        }
        "update_values" => {
            let values = require_values(params)?;
            let result = api
                .update_values(
                    require_str(params, "spreadsheet_id")?,
                    require_str(params, "range")?,
                    values,
                )
                .await?;
            Ok(result)
        }
        "append_values" => {
            let values = require_values(params)?;
            let result = api
                .append_values(
                    require_str(params, "spreadsheet_id")?,
                    require_str(params, "range")?,
                    values,
                )
                .await?;
            Ok(result)
        }
        _ => Err(ToolError::InvalidParams(format!(
            "unknown sheets action: {}",
            action
        ))),
    }
}

fn require_values(params: &Value) -> Result<Value, ToolError> {
    params
        .get("values")
        .filter(|v| v.is_array())
        .cloned()
        .ok_or_else(|| ToolError::InvalidParams("Missing required array parameter: values".to_string()))
}
