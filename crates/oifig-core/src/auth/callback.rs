//! OAuth Callback Listener
//!
//! Short-lived local HTTP listener that receives the authorization-code
//! redirect from the system browser. Accepts exactly one successful request
//! on the fixed callback path; malformed probes (wrong path, missing `code`,
//! state mismatch) are answered with a client error and do NOT consume the
//! one-shot lifecycle — the real redirect may still be on its way. The
//! socket is torn down when the listener is dropped.

use std::collections::HashMap;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::common::AuthError;
use crate::config::CALLBACK_PATH;

pub struct CallbackListener {
    listener: TcpListener,
    expected_state: String,
    port: u16,
}

enum Received {
    /// Authorization code delivered; respond 200 and stop listening.
    Code(String),
    /// Probe or malformed request; answered, keep listening.
    Probe,
    /// The provider redirected with an error parameter; flow is over.
    Denied(String),
}

impl CallbackListener {
    /// Bind the local listener. A bind failure usually means another
    /// authorization flow is already waiting on this port.
    pub async fn bind(port: u16, expected_state: String) -> Result<Self, AuthError> {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .map_err(|e| AuthError::CallbackBind {
                port,
                reason: e.to_string(),
            })?;

        let port = listener
            .local_addr()
            .map_err(|e| AuthError::CallbackBind {
                port,
                reason: e.to_string(),
            })?
            .port();

        info!("OAuth callback listener bound on 127.0.0.1:{}", port);
        Ok(Self {
            listener,
            expected_state,
            port,
        })
    }

    /// Actual bound port (differs from the requested one when binding port 0).
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until one authorization code arrives, then tear down.
    ///
    /// Consumes the listener: the socket closes when this returns or when
    /// the future is dropped (timeout/cancellation included).
    pub async fn recv_code(self) -> Result<String, String> {
        loop {
            let (mut socket, addr) = self
                .listener
                .accept()
                .await
                .map_err(|e| format!("callback accept failed: {}", e))?;
            debug!("Callback connection from {}", addr);

            match handle_connection(&mut socket, &self.expected_state).await {
                Ok(Received::Code(code)) => return Ok(code),
                Ok(Received::Probe) => continue,
                Ok(Received::Denied(reason)) => return Err(reason),
                Err(e) => {
                    // Broken connection; the redirect may still arrive.
                    warn!("Callback connection error: {}", e);
                    continue;
                }
            }
        }
    }
}

async fn handle_connection(
    socket: &mut TcpStream,
    expected_state: &str,
) -> std::io::Result<Received> {
    let mut reader = BufReader::new(&mut *socket);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    // "GET /code?code=...&state=... HTTP/1.1"
    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() < 2 {
        send_response(socket, "400 Bad Request", page("Malformed request.")).await?;
        return Ok(Received::Probe);
    }

    let path_and_query = parts[1];
    let (path, query) = match path_and_query.find('?') {
        Some(idx) => (&path_and_query[..idx], &path_and_query[idx + 1..]),
        None => (path_and_query, ""),
    };

    if path != CALLBACK_PATH {
        send_response(socket, "404 Not Found", page("Not found.")).await?;
        return Ok(Received::Probe);
    }

    let params = parse_query_params(query);

    if let Some(error) = params.get("error") {
        let desc = params
            .get("error_description")
            .map(|s| s.as_str())
            .unwrap_or("Unknown error");
        send_response(
            socket,
            "400 Bad Request",
            page(&format!("Authorization failed: {} - {}", error, desc)),
        )
        .await?;
        return Ok(Received::Denied(format!("{}: {}", error, desc)));
    }

    // State echo, when present, must match the pending flow. A mismatch is
    // treated like any other probe: answered, not consumed.
    if let Some(state) = params.get("state") {
        if state != expected_state {
            warn!("Callback state mismatch; ignoring request");
            send_response(socket, "400 Bad Request", page("Invalid state parameter.")).await?;
            return Ok(Received::Probe);
        }
    }

    match params.get("code") {
        Some(code) => {
            send_response(
                socket,
                "200 OK",
                page("Authorization complete. You can close this tab."),
            )
            .await?;
            Ok(Received::Code(code.clone()))
        }
        None => {
            send_response(socket, "400 Bad Request", page("Missing authorization code.")).await?;
            Ok(Received::Probe)
        }
    }
}

/// Parse URL query parameters into a HashMap
pub(crate) fn parse_query_params(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter_map(|part| {
            let mut split = part.splitn(2, '=');
            match (split.next(), split.next()) {
                (Some(key), Some(value)) => {
                    let decoded = urlencoding::decode(value).ok()?;
                    Some((key.to_string(), decoded.into_owned()))
                }
                _ => None,
            }
        })
        .collect()
}

/// Send an HTTP response to the browser
async fn send_response(socket: &mut TcpStream, status: &str, html: String) -> std::io::Result<()> {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        html.len(),
        html
    );
    socket.write_all(response.as_bytes()).await?;
    socket.flush().await?;
    Ok(())
}

/// Minimal human-readable confirmation page
fn page(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Oifig</title>
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            display: flex;
            justify-content: center;
            align-items: center;
            height: 100vh;
            margin: 0;
            background: #f4f2ee;
        }}
        .card {{
            background: white;
            padding: 2rem 3rem;
            border-radius: 12px;
            box-shadow: 0 4px 24px rgba(0,0,0,0.12);
            text-align: center;
        }}
    </style>
</head>
<body>
    <div class="card">
        <h1>Oifig</h1>
        <p>{}</p>
    </div>
</body>
</html>"#,
        message
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    async fn send_raw(port: u16, request: &str) -> String {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[test]
    fn test_parse_query_params() {
        let params = parse_query_params("code=4%2F0abc&state=s1");
        assert_eq!(params.get("code").unwrap(), "4/0abc");
        assert_eq!(params.get("state").unwrap(), "s1");
        assert!(parse_query_params("").is_empty());
    }

    #[tokio::test]
    async fn test_delivers_code_then_becomes_unreachable() {
        let listener = CallbackListener::bind(0, "s1".to_string()).await.unwrap();
        let port = listener.port();
        let task = tokio::spawn(listener.recv_code());

        let response = send_raw(port, "GET /code?code=ok HTTP/1.1\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.contains("Authorization complete"));

        assert_eq!(task.await.unwrap().unwrap(), "ok");

        // One-shot: the socket is gone after the exchange.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(TcpStream::connect(("127.0.0.1", port)).await.is_err());
    }

    #[tokio::test]
    async fn test_foreign_path_does_not_consume_listener() {
        let listener = CallbackListener::bind(0, "s1".to_string()).await.unwrap();
        let port = listener.port();
        let task = tokio::spawn(listener.recv_code());

        let response = send_raw(port, "GET /favicon.ico HTTP/1.1\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 404"));

        let response = send_raw(port, "GET /code?code=late HTTP/1.1\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 200"));
        assert_eq!(task.await.unwrap().unwrap(), "late");
    }

    #[tokio::test]
    async fn test_missing_code_does_not_consume_listener() {
        let listener = CallbackListener::bind(0, "s1".to_string()).await.unwrap();
        let port = listener.port();
        let task = tokio::spawn(listener.recv_code());

        let response = send_raw(port, "GET /code HTTP/1.1\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 400"));

        let response = send_raw(port, "GET /code?code=ok HTTP/1.1\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 200"));
        assert_eq!(task.await.unwrap().unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_state_mismatch_does_not_consume_listener() {
        let listener = CallbackListener::bind(0, "expected".to_string()).await.unwrap();
        let port = listener.port();
        let task = tokio::spawn(listener.recv_code());

        let response = send_raw(port, "GET /code?code=evil&state=wrong HTTP/1.1\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 400"));

        let response = send_raw(port, "GET /code?code=good&state=expected HTTP/1.1\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 200"));
        assert_eq!(task.await.unwrap().unwrap(), "good");
    }

    #[tokio::test]
    async fn test_provider_error_terminates_wait() {
        let listener = CallbackListener::bind(0, "s1".to_string()).await.unwrap();
        let port = listener.port();
        let task = tokio::spawn(listener.recv_code());

        let response = send_raw(
            port,
            "GET /code?error=access_denied&error_description=user+declined HTTP/1.1\r\n\r\n",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 400"));

        let err = task.await.unwrap().unwrap_err();
        assert!(err.contains("access_denied"));
    }
}
