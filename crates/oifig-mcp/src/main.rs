mod initialize;
mod protocol;
mod tools;

use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use oifig_core::auth::CredentialManager;
use oifig_core::config::Settings;

use protocol::{error, success, InitializeRequest, JsonRpcRequest, ToolsCallRequest};
use tools::{ToolCallError, ToolRegistry};

#[derive(Parser, Debug)]
#[command(name = "oifig-mcp", about = "Google Workspace MCP server")]
struct Args {
    #[arg(long, default_value = "stdio")]
    transport: String,

    /// Override the local OAuth callback port
    #[arg(long)]
    callback_port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the protocol; all diagnostics go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if args.transport != "stdio" {
        anyhow::bail!("only stdio transport is supported");
    }

    let mut settings = Settings::load()?;
    if let Some(port) = args.callback_port {
        settings.callback_port = port;
    }

    // A missing or unparseable client identity is the one startup error that
    // is fatal to the whole server.
    let manager = Arc::new(CredentialManager::new(settings)?);
    info!("Credential manager ready ({} configured accounts)", manager.accounts().len());

    let registry = ToolRegistry::new(manager)?;

    let stdin = tokio::io::stdin();
    let mut reader = BufReader::new(stdin);
    let mut stdout = tokio::io::stdout();
    let mut line = String::new();

    loop {
        line.clear();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let request = match serde_json::from_str::<JsonRpcRequest>(trimmed) {
            Ok(req) => req,
            Err(e) => {
                let resp = error(serde_json::Value::Null, -32700, format!("parse error: {}", e), None);
                stdout.write_all(serde_json::to_string(&resp)?.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
                continue;
            }
        };

        let Some(id) = request.id.clone() else {
            // JSON-RPC notification: currently only notifications/initialized is expected.
            continue;
        };

        let response = match request.method.as_str() {
            "initialize" => {
                let init: Result<InitializeRequest, _> = serde_json::from_value(request.params);
                match init {
                    Ok(init_req) => {
                        // Accept any client protocol version; the server declares
                        // its own and the client adapts.
                        let result = initialize::handle_initialize(init_req);
                        success(id, serde_json::to_value(result)?)
                    }
                    Err(e) => error(id, -32602, format!("invalid initialize params: {}", e), None),
                }
            }
            "tools/list" => {
                let result = registry.list_response();
                success(id, serde_json::to_value(result)?)
            }
            "tools/call" => {
                let call: Result<ToolsCallRequest, _> = serde_json::from_value(request.params);
                match call {
                    Ok(call_req) => match registry.call_tool(&call_req.name, call_req.arguments).await {
                        Ok(result) => success(id, serde_json::to_value(result)?),
                        Err(ToolCallError::UnknownTool(name)) => {
                            error(id, -32601, format!("unknown tool: {}", name), None)
                        }
                        Err(ToolCallError::InvalidParams(msg)) => error(id, -32602, msg, None),
                    },
                    Err(e) => error(id, -32602, format!("invalid tools/call params: {}", e), None),
                }
            }
            "notifications/initialized" => success(id, serde_json::json!({})),
            _ => error(id, -32601, format!("method not found: {}", request.method), None),
        };

        stdout.write_all(serde_json::to_string(&response)?.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    Ok(())
}
