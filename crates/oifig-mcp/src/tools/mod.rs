//! Tool Catalog and Routers
//!
//! Static per-service tool definitions and the dispatch path from a
//! `tools/call` to the matching Google API. Every tool carries a `user_id`
//! (the account email); the router asks the credential manager for a ready
//! credential before any REST call. Auth and API failures cross the MCP
//! boundary as structured `isError` payloads, never as silent empty results.

pub mod calendar;
pub mod docs;
pub mod drive;
pub mod gmail;
pub mod sheets;
pub mod slides;

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{error, info};

use oifig_core::auth::CredentialManager;
use oifig_core::common::{AuthError, ErrorCode};
use oifig_core::config;

use crate::protocol::{
    McpTool, ToolAnnotations, ToolContent, ToolsCallResponse, ToolsListResponse,
};

// ── Catalog types ───────────────────────────────────────────────────────────

/// One catalog entry: the MCP tool definition plus routing metadata.
pub struct ToolSpec {
    pub tool: McpTool,
    /// Mutating tools are gated behind OIFIG_ENABLE_MUTATIONS.
    pub mutating: bool,
}

pub(crate) fn read_only_tool(name: &str, description: &str, input_schema: Value) -> ToolSpec {
    ToolSpec {
        tool: McpTool {
            name: name.to_string(),
            description: description.to_string(),
            input_schema,
            annotations: Some(ToolAnnotations {
                read_only_hint: Some(true),
                destructive_hint: Some(false),
                idempotent_hint: Some(true),
            }),
        },
        mutating: false,
    }
}

pub(crate) fn mutating_tool(
    name: &str,
    description: &str,
    input_schema: Value,
    destructive: bool,
) -> ToolSpec {
    ToolSpec {
        tool: McpTool {
            name: name.to_string(),
            description: description.to_string(),
            input_schema,
            annotations: Some(ToolAnnotations {
                read_only_hint: Some(false),
                destructive_hint: Some(destructive),
                idempotent_hint: None,
            }),
        },
        mutating: true,
    }
}

// ── Errors ──────────────────────────────────────────────────────────────────

/// Failure inside a router, before or after the upstream call.
#[derive(Debug)]
pub enum ToolError {
    InvalidParams(String),
    Auth(AuthError),
    Api(String),
}

impl From<AuthError> for ToolError {
    fn from(e: AuthError) -> Self {
        ToolError::Auth(e)
    }
}

impl From<String> for ToolError {
    fn from(e: String) -> Self {
        ToolError::Api(e)
    }
}

impl ToolError {
    /// Structured failure payload for the tool boundary. Recoverable auth
    /// failures include the authorization URL for an explicit retry.
    fn payload(&self) -> Value {
        match self {
            ToolError::Auth(e) => {
                let mut payload = json!({
                    "code": e.code().code(),
                    "message": e.to_string(),
                });
                if let Some(url) = e.auth_url() {
                    payload["authorizationUrl"] = json!(url);
                }
                payload
            }
            ToolError::Api(message) => json!({
                "code": ErrorCode::GenericError.code(),
                "message": message,
            }),
            ToolError::InvalidParams(message) => json!({
                "code": ErrorCode::InvalidParams.code(),
                "message": message,
            }),
        }
    }
}

/// Failures that surface as JSON-RPC errors rather than tool payloads.
#[derive(Debug)]
pub enum ToolCallError {
    UnknownTool(String),
    InvalidParams(String),
}

// ── Registry ────────────────────────────────────────────────────────────────

pub struct ToolRegistry {
    manager: Arc<CredentialManager>,
    specs: Vec<ToolSpec>,
    mutations_enabled: bool,
}

impl ToolRegistry {
    pub fn new(manager: Arc<CredentialManager>) -> anyhow::Result<Self> {
        let mut specs = Vec::new();
        specs.extend(gmail::tools());
        specs.extend(calendar::tools());
        specs.extend(drive::tools());
        specs.extend(docs::tools());
        specs.extend(sheets::tools());
        specs.extend(slides::tools());

        let mut seen = HashSet::new();
        for spec in &specs {
            if !seen.insert(spec.tool.name.clone()) {
                anyhow::bail!("duplicate tool name in catalog: {}", spec.tool.name);
            }
        }
        specs.sort_by(|a, b| a.tool.name.cmp(&b.tool.name));

        let mutations_enabled = config::mutations_enabled();
        info!(
            "Tool catalog loaded: {} tools (mutations {})",
            specs.len(),
            if mutations_enabled { "enabled" } else { "disabled" }
        );

        Ok(Self {
            manager,
            specs,
            mutations_enabled,
        })
    }

    /// Override the mutation gate (tests).
    pub fn with_mutations(mut self, enabled: bool) -> Self {
        self.mutations_enabled = enabled;
        self
    }

    pub fn list_response(&self) -> ToolsListResponse {
        ToolsListResponse {
            tools: self.specs.iter().map(|s| s.tool.clone()).collect(),
            next_cursor: None,
        }
    }

    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolsCallResponse, ToolCallError> {
        let Some(spec) = self.specs.iter().find(|s| s.tool.name == name) else {
            return Err(ToolCallError::UnknownTool(name.to_string()));
        };

        // The gate sits in front of the credential lifecycle: a disabled
        // mutating tool must not trigger an authorization flow either.
        if spec.mutating && !self.mutations_enabled {
            return Ok(failure_response(json!({
                "code": ErrorCode::MutationsDisabled.code(),
                "message": format!(
                    "Mutating tool '{}' is disabled. Set {}=1 to enable send/create/delete operations.",
                    name,
                    config::ENV_ENABLE_MUTATIONS
                ),
            })));
        }

        let (service, action) = name
            .split_once('_')
            .ok_or_else(|| ToolCallError::UnknownTool(name.to_string()))?;

        let result = match service {
            "gmail" => gmail::call(&self.manager, action, &arguments).await,
            "calendar" => calendar::call(&self.manager, action, &arguments).await,
            "drive" => drive::call(&self.manager, action, &arguments).await,
            "docs" => docs::call(&self.manager, action, &arguments).await,
            "sheets" => sheets::call(&self.manager, action, &arguments).await,
            "slides" => slides::call(&self.manager, action, &arguments).await,
            _ => return Err(ToolCallError::UnknownTool(name.to_string())),
        };

        match result {
            Ok(value) => Ok(success_response(value)),
            Err(ToolError::InvalidParams(message)) => Err(ToolCallError::InvalidParams(message)),
            Err(err) => {
                error!("Tool {} failed: {:?}", name, err);
                Ok(failure_response(err.payload()))
            }
        }
    }
}

fn success_response(value: Value) -> ToolsCallResponse {
    ToolsCallResponse {
        content: vec![ToolContent {
            content_type: "text".to_string(),
            text: serde_json::to_string(&value).unwrap_or_else(|_| "null".to_string()),
        }],
        is_error: false,
    }
}

fn failure_response(payload: Value) -> ToolsCallResponse {
    ToolsCallResponse {
        content: vec![ToolContent {
            content_type: "text".to_string(),
            text: serde_json::to_string(&json!({ "error": payload }))
                .unwrap_or_else(|_| "{}".to_string()),
        }],
        is_error: true,
    }
}

// ── Parameter extraction helpers ────────────────────────────────────────────

pub(crate) fn require_str<'a>(params: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolError::InvalidParams(format!("Missing required parameter: {}", key)))
}

pub(crate) fn optional_str<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}

pub(crate) fn optional_usize(params: &Value, key: &str) -> Option<usize> {
    params.get(key).and_then(|v| v.as_u64()).map(|n| n as usize)
}

pub(crate) fn bool_with_default(params: &Value, key: &str, default: bool) -> bool {
    params.get(key).and_then(|v| v.as_bool()).unwrap_or(default)
}

pub(crate) fn optional_string_array(params: &Value, key: &str) -> Option<Vec<String>> {
    params.get(key).and_then(|v| v.as_array()).map(|arr| {
        arr.iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect()
    })
}

pub(crate) fn require_string_array(params: &Value, key: &str) -> Result<Vec<String>, ToolError> {
    optional_string_array(params, key)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            ToolError::InvalidParams(format!("Missing required array parameter: {}", key))
        })
}

/// Service scope constants as owned strings for `ensure_ready`.
pub(crate) fn scope_vec(scopes: &[&str]) -> Vec<String> {
    scopes.iter().map(|s| s.to_string()).collect()
}
