//! Drive tool router

use serde_json::{json, Value};

use oifig_core::auth::CredentialManager;
use oifig_core::google::{drive, DriveApi};

use super::{
    mutating_tool, optional_str, optional_usize, read_only_tool, require_str, scope_vec,
    ToolError, ToolSpec,
};

const USER_ID_DESC: &str = "Email address of the configured Google account to act as";

pub(super) fn tools() -> Vec<ToolSpec> {
    vec![
        read_only_tool(
            "drive_search_files",
            "Search Drive files with a query expression, e.g. \"name contains 'report' and trashed = false\".",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "description": USER_ID_DESC},
                    "query": {"type": "string", "description": "Drive query expression"},
                    "max_results": {"type": "integer"}
                },
                "required": ["user_id"]
            }),
        ),
        read_only_tool(
            "drive_get_file",
            "Fetch file metadata by ID.",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "description": USER_ID_DESC},
                    "file_id": {"type": "string"}
                },
                "required": ["user_id", "file_id"]
            }),
        ),
        read_only_tool(
            "drive_download_file",
            "Download a file's content as text. Google-native files are exported (Docs to markdown, Sheets to CSV).",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "description": USER_ID_DESC},
                    "file_id": {"type": "string"}
                },
                "required": ["user_id", "file_id"]
            }),
        ),
        mutating_tool(
            "drive_create_folder",
            "Create a folder, optionally inside a parent folder.",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "description": USER_ID_DESC},
                    "name": {"type": "string"},
                    "parent_id": {"type": "string"}
                },
                "required": ["user_id", "name"]
            }),
            false,
        ),
        mutating_tool(
            "drive_delete_file",
            "Permanently delete a file or folder.",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": "string", "description": USER_ID_DESC},
                    "file_id": {"type": "string"}
                },
                "required": ["user_id", "file_id"]
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
        .ensure_ready(account, &scope_vec(drive::SCOPES))
        .await?;
    let api = DriveApi::new(cred.access_token)?;

    match action {
        "search_files" => {
            let files = api
                .search_files(
                    optional_str(params, "query"),
                    optional_usize(params, "max_results"),
                )
                .await?;
            let count = files.len();
            Ok(json!({ "count": count, "files": files }))
        }
        "get_file" => {
            let file = api.get_file(require_str(params, "file_id")?).await?;
            Ok(file)
        }
        "download_file" => {
            let content = api.download_file(require_str(params, "file_id")?).await?;
            Ok(json!({ "content": content }))
        }
        "create_folder" => {
            let folder = api
                .create_folder(require_str(params, "name")?, optional_str(params, "parent_id"))
                .await?;
            Ok(folder)
        }
        "delete_file" => {
            api.delete_file(require_str(params, "file_id")?).await?;
            Ok(json!({ "success": true }))
        }
        _ => Err(ToolError::InvalidParams(format!(
            "unknown drive action: {}",
            action
        ))),
    }
}
