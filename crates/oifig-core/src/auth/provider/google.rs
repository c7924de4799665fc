//! Google OAuth2 Provider
//!
//! Authorization Code flow with PKCE against Google's endpoints. The client
//! identity comes from the loaded client-secret file; endpoints are struct
//! fields so tests can point them at a local mock server.

use std::collections::HashMap;
use tracing::{error, info};

use super::{OAuthProvider, OAuthTokens, UserInfo};
use crate::common::create_http_client;
use crate::config::ClientIdentity;

// ── Google OAuth endpoints ──────────────────────────────────────────────────

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const USERINFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Google OAuth2 provider.
pub struct GoogleProvider {
    identity: ClientIdentity,
    auth_endpoint: String,
    token_endpoint: String,
    userinfo_endpoint: String,
}

impl GoogleProvider {
    pub fn new(identity: ClientIdentity) -> Self {
        Self {
            identity,
            auth_endpoint: AUTH_ENDPOINT.to_string(),
            token_endpoint: TOKEN_ENDPOINT.to_string(),
            userinfo_endpoint: USERINFO_ENDPOINT.to_string(),
        }
    }

    /// Provider talking to non-default endpoints (mock servers in tests).
    pub fn with_endpoints(
        identity: ClientIdentity,
        auth_endpoint: impl Into<String>,
        token_endpoint: impl Into<String>,
        userinfo_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            identity,
            auth_endpoint: auth_endpoint.into(),
            token_endpoint: token_endpoint.into(),
            userinfo_endpoint: userinfo_endpoint.into(),
        }
    }
}

impl OAuthProvider for GoogleProvider {
    fn name(&self) -> &str {
        "google"
    }

    fn authorize_url(
        &self,
        scopes: &[String],
        state: &str,
        code_challenge: &str,
        login_hint: Option<&str>,
        redirect_uri: &str,
    ) -> String {
        let scope_str = scopes.join(" ");
        let mut url = format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&code_challenge={}&code_challenge_method=S256&access_type=offline&prompt=consent",
            self.auth_endpoint,
            urlencoding::encode(&self.identity.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scope_str),
            urlencoding::encode(state),
            urlencoding::encode(code_challenge),
        );
        if let Some(hint) = login_hint {
            url.push_str("&login_hint=");
            url.push_str(&urlencoding::encode(hint));
        }
        url
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> Result<OAuthTokens, String> {
        info!("Exchanging authorization code for tokens");

        let mut params = HashMap::new();
        params.insert("client_id", self.identity.client_id.as_str());
        params.insert("client_secret", self.identity.client_secret.as_str());
        params.insert("code", code);
        params.insert("code_verifier", code_verifier);
        params.insert("grant_type", "authorization_code");
        params.insert("redirect_uri", redirect_uri);

        let response = post_form(&self.token_endpoint, &params).await?;
        parse_token_response(&response)
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<OAuthTokens, String> {
        info!("Refreshing access token");

        let mut params = HashMap::new();
        params.insert("client_id", self.identity.client_id.as_str());
        params.insert("client_secret", self.identity.client_secret.as_str());
        params.insert("refresh_token", refresh_token);
        params.insert("grant_type", "refresh_token");

        let response = post_form(&self.token_endpoint, &params).await?;
        parse_token_response(&response)
    }

    async fn fetch_identity(&self, access_token: &str) -> Result<UserInfo, String> {
        let client = create_http_client()?;

        let response = client
            .get(&self.userinfo_endpoint)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| format!("Failed to fetch user info: {}", e))?;

        if !response.status().is_success() {
            return Err(format!(
                "Failed to fetch user info: HTTP {}",
                response.status()
            ));
        }

        response
            .json::<UserInfo>()
            .await
            .map_err(|e| format!("Failed to parse user info: {}", e))
    }
}

// ── HTTP utilities ──────────────────────────────────────────────────────────

/// POST a form-encoded request and return the response body.
///
/// Secrets are passed in the request body, never in process arguments.
async fn post_form(url: &str, params: &HashMap<&str, &str>) -> Result<String, String> {
    let client = create_http_client()?;

    let response = client
        .post(url)
        .form(params)
        .send()
        .await
        .map_err(|e| format!("HTTP request failed: {}", e))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error response".to_string());
        error!("HTTP error {}: {}", status, body);
        // Surface the provider's error payload; the token endpoint reports
        // rejected codes ("invalid_grant") in the body with a 4xx status.
        if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(&body) {
            if let Some(err) = parsed.get("error").and_then(|v| v.as_str()) {
                let desc = parsed
                    .get("error_description")
                    .and_then(|v| v.as_str())
                    .unwrap_or("Unknown error");
                return Err(format!("{}: {}", err, desc));
            }
        }
        return Err(format!("HTTP {} error: {}", status, body));
    }

    response
        .text()
        .await
        .map_err(|e| format!("Failed to read response body: {}", e))
}

/// Parse a Google OAuth2 token response.
fn parse_token_response(body: &str) -> Result<OAuthTokens, String> {
    let parsed: serde_json::Value =
        serde_json::from_str(body).map_err(|e| format!("Invalid JSON response: {}", e))?;

    if let Some(err) = parsed.get("error").and_then(|v| v.as_str()) {
        let desc = parsed
            .get("error_description")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown error");
        return Err(format!("{}: {}", err, desc));
    }

    let access_token = parsed
        .get("access_token")
        .and_then(|v| v.as_str())
        .ok_or("Missing access_token in response")?
        .to_string();

    let refresh_token = parsed
        .get("refresh_token")
        .and_then(|v| v.as_str())
        .map(String::from);

    let token_type = parsed
        .get("token_type")
        .and_then(|v| v.as_str())
        .unwrap_or("Bearer")
        .to_string();

    let expires_in = parsed
        .get("expires_in")
        .and_then(|v| v.as_u64())
        .unwrap_or(3600);

    let expiry = (chrono::Utc::now() + chrono::Duration::seconds(expires_in as i64)).to_rfc3339();

    let scopes = parsed
        .get("scope")
        .and_then(|v| v.as_str())
        .map(|s| s.split(' ').map(String::from).collect())
        .unwrap_or_default();

    Ok(OAuthTokens {
        access_token,
        refresh_token,
        token_type,
        expiry,
        scopes,
    })
}

// ── PKCE Utilities ──────────────────────────────────────────────────────────

/// Generate a PKCE code verifier (43-128 characters of unreserved URI characters).
pub fn generate_code_verifier() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    base64_url_encode(&bytes)
}

/// Derive the PKCE code challenge from a code verifier using S256.
pub fn generate_code_challenge(verifier: &str) -> String {
    use sha2::{Digest, Sha256};
    let hash = Sha256::digest(verifier.as_bytes());
    base64_url_encode(&hash)
}

/// Base64url encoding (no padding) per RFC 4648 §5.
fn base64_url_encode(data: &[u8]) -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    URL_SAFE_NO_PAD.encode(data)
}
