use tracing::info;

use crate::protocol::{
    InitializeRequest, InitializeResponse, MCP_PROTOCOL_VERSION, ServerCapabilities, ServerInfo,
    ToolsCapabilities,
};

pub fn handle_initialize(request: InitializeRequest) -> InitializeResponse {
    info!(
        "Initializing for client {} {}",
        request.client_info.name, request.client_info.version
    );

    InitializeResponse {
        protocol_version: MCP_PROTOCOL_VERSION.to_string(),
        capabilities: ServerCapabilities {
            tools: ToolsCapabilities { list_changed: false },
        },
        server_info: ServerInfo {
            name: "oifig-mcp".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        instructions: "Oifig exposes Gmail, Calendar, Drive, Docs, Sheets and Slides tools. Every tool takes a user_id: the email of a configured Google account. If a call fails with an authorizationUrl, ask the user to open it, then retry.".to_string(),
    }
}
