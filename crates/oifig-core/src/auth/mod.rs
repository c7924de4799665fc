//! Credential Lifecycle
//!
//! Guarantees that a valid, correctly-scoped token is available for a
//! requested account before any tool call proceeds, triggering the
//! interactive authorization flow when it is not. Token material is stored
//! per account as plain JSON under the credentials directory.
//!
//! The central invariant: a stored record is usable iff it carries a refresh
//! token AND its granted scopes cover the required set. Access-token expiry
//! alone never forces re-consent — a refresh token allows silent renewal.

pub mod callback;
pub mod provider;
pub mod registry;
pub mod store;

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

pub use callback::CallbackListener;
pub use registry::{Account, AccountRegistry};
pub use store::TokenStore;

use crate::common::AuthError;
use crate::config::{self, Settings};
use provider::google::{generate_code_challenge, generate_code_verifier, GoogleProvider};
use provider::OAuthProvider;

/// Refresh the access token when it expires within this margin.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Default bound on the interactive authorization wait.
const DEFAULT_AUTHORIZATION_TIMEOUT: Duration = Duration::from_secs(300);

/// Scopes the manager adds to every consent request so the identity of the
/// authorizing user can be resolved afterwards.
const IDENTITY_SCOPES: &[&str] = &["openid", "https://www.googleapis.com/auth/userinfo.email"];

// ── Public types ────────────────────────────────────────────────────────────

/// Stored token record for one account.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct TokenRecord {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[zeroize(skip)]
    pub token_type: String,
    #[zeroize(skip)]
    pub expiry: String,
    #[zeroize(skip)]
    pub scopes: Vec<String>,
    #[serde(default)]
    #[zeroize(skip)]
    pub last_refreshed: String,
}

// Custom Debug implementation that redacts sensitive fields
impl fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRecord")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("token_type", &self.token_type)
            .field("expiry", &self.expiry)
            .field("scopes", &self.scopes)
            .field("last_refreshed", &self.last_refreshed)
            .finish()
    }
}

impl TokenRecord {
    /// Whether the granted scopes cover the required set.
    pub fn covers(&self, required: &[String]) -> bool {
        required
            .iter()
            .all(|s| self.scopes.iter().any(|granted| granted == s))
    }

    /// Whether the access token expires within `margin_secs` of now.
    /// An unparseable expiry is treated as already expired.
    pub fn is_expiring(&self, margin_secs: i64) -> bool {
        match chrono::DateTime::parse_from_rfc3339(&self.expiry) {
            Ok(exp) => {
                let remaining = exp.signed_duration_since(chrono::Utc::now()).num_seconds();
                remaining < margin_secs
            }
            Err(_) => true,
        }
    }
}

/// Why a stored record cannot be used without fresh user consent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsentReason {
    NoStoredCredential,
    NoRefreshToken,
    UnderScoped { missing: Vec<String> },
}

/// Outcome of inspecting the store for an account.
#[derive(Debug)]
pub enum CredentialState {
    Valid(TokenRecord),
    NeedsConsent(ConsentReason),
}

/// Decide whether a stored record authorizes the required scope set.
///
/// Scope under-coverage dominates everything else: even a record with a
/// refresh token goes back through consent when the tool surface needs
/// scopes the user has not yet granted.
pub fn credential_state(stored: Option<TokenRecord>, required: &[String]) -> CredentialState {
    let Some(record) = stored else {
        return CredentialState::NeedsConsent(ConsentReason::NoStoredCredential);
    };

    if !record.covers(required) {
        let missing = required
            .iter()
            .filter(|s| !record.scopes.contains(s))
            .cloned()
            .collect();
        return CredentialState::NeedsConsent(ConsentReason::UnderScoped { missing });
    }

    if record.refresh_token.is_none() {
        return CredentialState::NeedsConsent(ConsentReason::NoRefreshToken);
    }

    CredentialState::Valid(record)
}

/// A ready-to-use credential, returned per call. Nothing account-shaped is
/// kept as mutable shared state between calls.
#[derive(Debug, Clone)]
pub struct Credential {
    /// Identity-resolved account email. May differ from the requested email
    /// when the user completed consent as a different Google account.
    pub email: String,
    pub access_token: String,
    pub scopes: Vec<String>,
}

// ── Credential Manager ──────────────────────────────────────────────────────

/// Orchestrates registry, token store and OAuth provider so that a tool call
/// only proceeds once its account has a usable, correctly-scoped token.
pub struct CredentialManager {
    registry: Result<AccountRegistry, (PathBuf, String)>,
    store: TokenStore,
    provider: GoogleProvider,
    settings: Settings,
    /// One gate per account email: interactive flows are serialized so
    /// concurrent calls cannot race two browser windows onto one port.
    flows: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    authorization_timeout: Duration,
}

impl CredentialManager {
    /// Build the manager from settings. Failure to load the client identity
    /// is the one startup error that is fatal to the whole server.
    pub fn new(settings: Settings) -> Result<Self, AuthError> {
        let identity = config::load_client_identity(&settings.client_identity_path())?;

        let redirect_uri = settings.redirect_uri();
        if !identity.redirect_uris.is_empty() && !identity.authorizes_redirect(&redirect_uri) {
            warn!(
                "Redirect URI {} is not listed on the OAuth client; consent redirects will be rejected upstream",
                redirect_uri
            );
        }

        Ok(Self::with_provider(settings, GoogleProvider::new(identity)))
    }

    /// Build the manager around an explicit provider (tests aim this at a
    /// mock server). Registry problems are held and reported per operation,
    /// not at startup.
    pub fn with_provider(settings: Settings, provider: GoogleProvider) -> Self {
        let registry = AccountRegistry::load(&settings.accounts_path()).map_err(|e| {
            warn!("Account registry unavailable: {}", e);
            match e {
                AuthError::RegistryUnavailable { path, reason } => (path, reason),
                other => (settings.accounts_path(), other.to_string()),
            }
        });

        let store = TokenStore::new(settings.credentials_dir());

        Self {
            registry,
            store,
            provider,
            settings,
            flows: Mutex::new(HashMap::new()),
            authorization_timeout: DEFAULT_AUTHORIZATION_TIMEOUT,
        }
    }

    pub fn with_authorization_timeout(mut self, timeout: Duration) -> Self {
        self.authorization_timeout = timeout;
        self
    }

    /// Configured accounts (empty when the registry failed to load).
    pub fn accounts(&self) -> &[Account] {
        match &self.registry {
            Ok(registry) => registry.list(),
            Err(_) => &[],
        }
    }

    /// Ensure the account has a usable, correctly-scoped token, running the
    /// interactive authorization flow if needed. Returns a credential bound
    /// to the identity-resolved account.
    pub async fn ensure_ready(
        &self,
        email: &str,
        required_scopes: &[String],
    ) -> Result<Credential, AuthError> {
        // Unknown accounts fail fast; no browser flow is ever started.
        self.lookup_account(email)?;

        match credential_state(self.store.load(email), required_scopes) {
            CredentialState::Valid(record) => self.use_stored(email, record).await,
            CredentialState::NeedsConsent(reason) => {
                info!("Interactive authorization needed for {}: {:?}", email, reason);
                self.interactive_flow(email, required_scopes).await
            }
        }
    }

    // ── Internal ────────────────────────────────────────────────────────────

    fn lookup_account(&self, email: &str) -> Result<&Account, AuthError> {
        match &self.registry {
            Ok(registry) => registry.get(email).ok_or_else(|| AuthError::AccountNotConfigured {
                email: email.to_string(),
            }),
            Err((path, reason)) => Err(AuthError::RegistryUnavailable {
                path: path.clone(),
                reason: reason.clone(),
            }),
        }
    }

    /// Use a stored usable record, silently refreshing the access token when
    /// it is stale and re-persisting whatever the refresh returns.
    async fn use_stored(&self, email: &str, mut record: TokenRecord) -> Result<Credential, AuthError> {
        if record.is_expiring(EXPIRY_MARGIN_SECS) {
            if let Some(refresh) = record.refresh_token.clone() {
                match self.provider.refresh_token(&refresh).await {
                    Ok(tokens) => {
                        record.access_token = tokens.access_token;
                        if let Some(rt) = tokens.refresh_token {
                            record.refresh_token = Some(rt);
                        }
                        record.expiry = tokens.expiry;
                        record.last_refreshed = chrono::Utc::now().to_rfc3339();
                        self.store.save(email, &record)?;
                    }
                    Err(e) => {
                        // Not yet hard-expired: hand out the current token and
                        // let the next call retry the refresh.
                        if record.is_expiring(0) {
                            return Err(AuthError::Provider(format!("token refresh failed: {}", e)));
                        }
                        warn!("Token refresh failed but token not yet expired: {}", e);
                    }
                }
            }
        }

        Ok(Credential {
            email: email.to_string(),
            access_token: record.access_token.clone(),
            scopes: record.scopes.clone(),
        })
    }

    async fn interactive_flow(
        &self,
        email: &str,
        required_scopes: &[String],
    ) -> Result<Credential, AuthError> {
        let gate = self.flow_gate(email).await;
        let _guard = gate.lock().await;

        // A concurrent call may have completed consent while we waited.
        if let CredentialState::Valid(record) = credential_state(self.store.load(email), required_scopes)
        {
            return self.use_stored(email, record).await;
        }

        let state = generate_state();
        let verifier = generate_code_verifier();
        let challenge = generate_code_challenge(&verifier);

        let listener = CallbackListener::bind(self.settings.callback_port, state.clone()).await?;
        let redirect_uri = self.settings.redirect_uri();

        let mut request_scopes: Vec<String> =
            IDENTITY_SCOPES.iter().map(|s| s.to_string()).collect();
        for scope in required_scopes {
            if !request_scopes.contains(scope) {
                request_scopes.push(scope.clone());
            }
        }

        let auth_url =
            self.provider
                .authorize_url(&request_scopes, &state, &challenge, Some(email), &redirect_uri);

        launch_browser(&auth_url);
        info!(
            "Waiting for authorization redirect; open manually if no browser appeared: {}",
            auth_url
        );

        let code = match tokio::time::timeout(self.authorization_timeout, listener.recv_code()).await
        {
            // Timeout drops the listener future, which tears the socket down.
            Err(_) => {
                return Err(AuthError::AuthorizationTimeout {
                    seconds: self.authorization_timeout.as_secs(),
                    auth_url,
                })
            }
            Ok(Err(reason)) => return Err(AuthError::Callback(reason)),
            Ok(Ok(code)) => code,
        };

        let tokens = self
            .provider
            .exchange_code(&code, &verifier, &redirect_uri)
            .await
            .map_err(|reason| AuthError::CodeExchange {
                reason,
                auth_url: auth_url.clone(),
            })?;

        let who = self
            .provider
            .fetch_identity(&tokens.access_token)
            .await
            .map_err(AuthError::Provider)?;

        // The storage key comes from identity resolution, never from the
        // caller: the user may have completed consent as another account.
        let (Some(subject), Some(resolved)) = (who.id, who.email) else {
            return Err(AuthError::NoUserId { auth_url });
        };
        debug!("Consent completed by subject {}", subject);
        if resolved != email {
            warn!(
                "Requested authorization for {} but consent was completed as {}",
                email, resolved
            );
        }

        let refresh_token = match tokens.refresh_token {
            Some(rt) => Some(rt),
            // Re-consent sometimes yields no refresh token; fall back to one
            // already on file for the resolved account.
            None => self.store.load(&resolved).and_then(|r| r.refresh_token.clone()),
        };
        let Some(refresh_token) = refresh_token else {
            return Err(AuthError::NoRefreshToken {
                email: resolved,
                auth_url,
            });
        };

        let record = TokenRecord {
            access_token: tokens.access_token,
            refresh_token: Some(refresh_token),
            token_type: tokens.token_type,
            expiry: tokens.expiry,
            scopes: tokens.scopes,
            last_refreshed: chrono::Utc::now().to_rfc3339(),
        };
        self.store.save(&resolved, &record)?;

        Ok(Credential {
            email: resolved,
            access_token: record.access_token.clone(),
            scopes: record.scopes.clone(),
        })
    }

    async fn flow_gate(&self, email: &str) -> Arc<Mutex<()>> {
        let mut flows = self.flows.lock().await;
        flows.entry(email.to_string()).or_default().clone()
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────────

/// Generate a random state string for CSRF protection
fn generate_state() -> String {
    use rand::Rng;
    let bytes: [u8; 16] = rand::rngs::OsRng.gen();
    hex::encode(bytes)
}

/// Open the authorization URL in the user's browser. Launch failure is
/// logged, never fatal: the URL is always surfaced for manual use.
fn launch_browser(url: &str) {
    if let Some(cmd) = config::browser_override() {
        match std::process::Command::new(&cmd).arg(url).spawn() {
            Ok(_) => info!("Launched browser via {} override", config::ENV_BROWSER),
            Err(e) => warn!("Browser override '{}' failed: {}. Open manually: {}", cmd, e, url),
        }
        return;
    }

    if let Err(e) = open::that(url) {
        warn!("Failed to open browser automatically: {}. Open manually: {}", e, url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const GMAIL_SCOPE: &str = "https://www.googleapis.com/auth/gmail.modify";
    const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

    fn scopes(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn record(refresh: Option<&str>, granted: &[&str], expiry: &str) -> TokenRecord {
        TokenRecord {
            access_token: "ya29.stored".to_string(),
            refresh_token: refresh.map(String::from),
            token_type: "Bearer".to_string(),
            expiry: expiry.to_string(),
            scopes: scopes(granted),
            last_refreshed: String::new(),
        }
    }

    /// Workspace fixture: registry with a@example.com, a client identity,
    /// and a settings object bound to a per-test callback port.
    fn setup(port: u16) -> (tempfile::TempDir, Settings) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("accounts.json"),
            r#"{"accounts": [{"email": "a@example.com", "account_type": "work", "extra_info": "primary"}]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("gauth.json"),
            format!(
                r#"{{"installed": {{"client_id": "test.apps.googleusercontent.com",
                    "client_secret": "shhh",
                    "redirect_uris": ["http://localhost:{}/code"]}}}}"#,
                port
            ),
        )
        .unwrap();

        let mut settings = Settings::with_base_dir(dir.path());
        settings.callback_port = port;
        (dir, settings)
    }

    fn mock_provider(settings: &Settings, server: &MockServer) -> GoogleProvider {
        let identity =
            crate::config::load_client_identity(&settings.client_identity_path()).unwrap();
        GoogleProvider::with_endpoints(
            identity,
            format!("{}/auth", server.uri()),
            format!("{}/token", server.uri()),
            format!("{}/userinfo", server.uri()),
        )
    }

    /// Provider whose endpoints are unreachable: any network use is a bug.
    fn offline_provider(settings: &Settings) -> GoogleProvider {
        let identity =
            crate::config::load_client_identity(&settings.client_identity_path()).unwrap();
        GoogleProvider::with_endpoints(
            identity,
            "http://127.0.0.1:1/auth",
            "http://127.0.0.1:1/token",
            "http://127.0.0.1:1/userinfo",
        )
    }

    /// Deliver an authorization code to the flow's callback listener once it
    /// appears on `port`.
    async fn drive_redirect(port: u16, code: &str) {
        for _ in 0..100 {
            if let Ok(mut stream) = TcpStream::connect(("127.0.0.1", port)).await {
                stream
                    .write_all(format!("GET /code?code={} HTTP/1.1\r\n\r\n", code).as_bytes())
                    .await
                    .unwrap();
                let mut response = String::new();
                stream.read_to_string(&mut response).await.unwrap();
                assert!(response.starts_with("HTTP/1.1 200"), "unexpected: {}", response);
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("callback listener never appeared on port {}", port);
    }

    async fn mount_token(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    async fn mount_userinfo(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    // ── credential_state decision table ─────────────────────────────────────

    #[test]
    fn test_state_nothing_stored() {
        let state = credential_state(None, &scopes(&[GMAIL_SCOPE]));
        assert!(matches!(
            state,
            CredentialState::NeedsConsent(ConsentReason::NoStoredCredential)
        ));
    }

    #[test]
    fn test_state_expired_but_refreshable_is_valid() {
        // Expiry in the past must NOT force re-consent while a refresh token
        // and sufficient scopes are present.
        let stored = record(Some("1//r"), &[GMAIL_SCOPE], "2020-01-01T00:00:00Z");
        let state = credential_state(Some(stored), &scopes(&[GMAIL_SCOPE]));
        assert!(matches!(state, CredentialState::Valid(_)));
    }

    #[test]
    fn test_state_underscoped_dominates_refresh_token() {
        let stored = record(Some("1//r"), &[GMAIL_SCOPE], "2099-01-01T00:00:00Z");
        let state = credential_state(Some(stored), &scopes(&[GMAIL_SCOPE, CALENDAR_SCOPE]));
        match state {
            CredentialState::NeedsConsent(ConsentReason::UnderScoped { missing }) => {
                assert_eq!(missing, scopes(&[CALENDAR_SCOPE]));
            }
            other => panic!("expected UnderScoped, got {:?}", other),
        }
    }

    #[test]
    fn test_state_missing_refresh_token_needs_consent() {
        let stored = record(None, &[GMAIL_SCOPE], "2099-01-01T00:00:00Z");
        let state = credential_state(Some(stored), &scopes(&[GMAIL_SCOPE]));
        assert!(matches!(
            state,
            CredentialState::NeedsConsent(ConsentReason::NoRefreshToken)
        ));
    }

    // ── lifecycle ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_unknown_account_fails_fast_without_flow() {
        let (_dir, settings) = setup(4191);
        let provider = offline_provider(&settings);
        let manager = CredentialManager::with_provider(settings, provider);

        let err = manager
            .ensure_ready("nobody@example.com", &scopes(&[GMAIL_SCOPE]))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AccountNotConfigured { .. }));
        // Fail-fast: nothing bound the callback port.
        assert!(CallbackListener::bind(4191, String::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_registry_reported_per_operation() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("gauth.json"),
            r#"{"installed": {"client_id": "c", "client_secret": "s"}}"#,
        )
        .unwrap();
        let settings = Settings::with_base_dir(dir.path());
        let provider = offline_provider(&settings);
        let manager = CredentialManager::with_provider(settings, provider);

        let err = manager
            .ensure_ready("a@example.com", &scopes(&[GMAIL_SCOPE]))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::RegistryUnavailable { .. }));
        assert!(manager.accounts().is_empty());
    }

    #[tokio::test]
    async fn test_valid_record_used_without_authorization_url() {
        let (_dir, settings) = setup(4192);
        let provider = offline_provider(&settings);
        let manager = CredentialManager::with_provider(settings, provider);

        let stored = record(Some("1//r"), &[GMAIL_SCOPE], "2099-01-01T00:00:00Z");
        TokenStore::new(manager.settings.credentials_dir())
            .save("a@example.com", &stored)
            .unwrap();

        // Offline provider: any URL construction or network call would fail.
        let cred = manager
            .ensure_ready("a@example.com", &scopes(&[GMAIL_SCOPE]))
            .await
            .unwrap();
        assert_eq!(cred.email, "a@example.com");
        assert_eq!(cred.access_token, "ya29.stored");
    }

    #[tokio::test]
    async fn test_record_stored_under_resolved_email() {
        let (_dir, settings) = setup(4193);
        let server = MockServer::start().await;
        mount_token(
            &server,
            serde_json::json!({
                "access_token": "ya29.new",
                "refresh_token": "1//new",
                "token_type": "Bearer",
                "expires_in": 3600,
                "scope": format!("openid {}", GMAIL_SCOPE)
            }),
        )
        .await;
        // Consent completed as b@example.com, not the requested a@example.com.
        mount_userinfo(
            &server,
            serde_json::json!({"id": "108", "email": "b@example.com"}),
        )
        .await;

        let provider = mock_provider(&settings, &server);
        let creds_dir = settings.credentials_dir();
        let manager = CredentialManager::with_provider(settings, provider);

        let driver = tokio::spawn(drive_redirect(4193, "onetime"));
        let cred = manager
            .ensure_ready("a@example.com", &scopes(&[GMAIL_SCOPE]))
            .await
            .unwrap();
        driver.await.unwrap();

        assert_eq!(cred.email, "b@example.com");
        let store = TokenStore::new(creds_dir);
        assert!(store.load("b@example.com").is_some());
        // The requested account remains unauthorized.
        assert!(store.load("a@example.com").is_none());
    }

    #[tokio::test]
    async fn test_underscoped_record_forces_reconsent() {
        let (_dir, settings) = setup(4194);
        let server = MockServer::start().await;
        mount_token(
            &server,
            serde_json::json!({
                "access_token": "ya29.wide",
                "refresh_token": "1//wide",
                "token_type": "Bearer",
                "expires_in": 3600,
                "scope": format!("openid {} {}", GMAIL_SCOPE, CALENDAR_SCOPE)
            }),
        )
        .await;
        mount_userinfo(
            &server,
            serde_json::json!({"id": "108", "email": "a@example.com"}),
        )
        .await;

        let provider = mock_provider(&settings, &server);
        let creds_dir = settings.credentials_dir();
        let manager = CredentialManager::with_provider(settings, provider);

        // Stored record has a refresh token but lacks the calendar scope.
        TokenStore::new(creds_dir.clone())
            .save(
                "a@example.com",
                &record(Some("1//narrow"), &[GMAIL_SCOPE], "2099-01-01T00:00:00Z"),
            )
            .unwrap();

        let driver = tokio::spawn(drive_redirect(4194, "onetime"));
        let cred = manager
            .ensure_ready("a@example.com", &scopes(&[GMAIL_SCOPE, CALENDAR_SCOPE]))
            .await
            .unwrap();
        driver.await.unwrap();

        assert_eq!(cred.access_token, "ya29.wide");
        let reloaded = TokenStore::new(creds_dir).load("a@example.com").unwrap();
        assert!(reloaded.covers(&scopes(&[GMAIL_SCOPE, CALENDAR_SCOPE])));
    }

    #[tokio::test]
    async fn test_no_refresh_token_and_none_stored_fails_with_reusable_url() {
        let (_dir, settings) = setup(4195);
        let server = MockServer::start().await;
        mount_token(
            &server,
            serde_json::json!({
                "access_token": "ya29.short",
                "token_type": "Bearer",
                "expires_in": 3600,
                "scope": format!("openid {}", GMAIL_SCOPE)
            }),
        )
        .await;
        mount_userinfo(
            &server,
            serde_json::json!({"id": "108", "email": "a@example.com"}),
        )
        .await;

        let provider = mock_provider(&settings, &server);
        let manager = CredentialManager::with_provider(settings, provider);

        let driver = tokio::spawn(drive_redirect(4195, "onetime"));
        let err = manager
            .ensure_ready("a@example.com", &scopes(&[GMAIL_SCOPE]))
            .await
            .unwrap_err();
        driver.await.unwrap();

        match &err {
            AuthError::NoRefreshToken { email, auth_url } => {
                assert_eq!(email, "a@example.com");
                // The attached URL is a complete, re-usable consent URL.
                assert!(auth_url.contains("access_type=offline"));
                assert!(auth_url.contains("prompt=consent"));
                assert!(auth_url.contains("state="));
            }
            other => panic!("expected NoRefreshToken, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_refresh_token_falls_back_to_stored_one() {
        let (_dir, settings) = setup(4196);
        let server = MockServer::start().await;
        mount_token(
            &server,
            serde_json::json!({
                "access_token": "ya29.renewed",
                "token_type": "Bearer",
                "expires_in": 3600,
                "scope": format!("openid {} {}", GMAIL_SCOPE, CALENDAR_SCOPE)
            }),
        )
        .await;
        mount_userinfo(
            &server,
            serde_json::json!({"id": "108", "email": "a@example.com"}),
        )
        .await;

        let provider = mock_provider(&settings, &server);
        let creds_dir = settings.credentials_dir();
        let manager = CredentialManager::with_provider(settings, provider);

        TokenStore::new(creds_dir.clone())
            .save(
                "a@example.com",
                &record(Some("1//durable"), &[GMAIL_SCOPE], "2099-01-01T00:00:00Z"),
            )
            .unwrap();

        let driver = tokio::spawn(drive_redirect(4196, "onetime"));
        let cred = manager
            .ensure_ready("a@example.com", &scopes(&[GMAIL_SCOPE, CALENDAR_SCOPE]))
            .await
            .unwrap();
        driver.await.unwrap();

        assert_eq!(cred.access_token, "ya29.renewed");
        let reloaded = TokenStore::new(creds_dir).load("a@example.com").unwrap();
        assert_eq!(reloaded.refresh_token.as_deref(), Some("1//durable"));
    }

    #[tokio::test]
    async fn test_rejected_code_carries_fresh_authorization_url() {
        let (_dir, settings) = setup(4197);
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Code was already redeemed."
            })))
            .mount(&server)
            .await;

        let provider = mock_provider(&settings, &server);
        let manager = CredentialManager::with_provider(settings, provider);

        let driver = tokio::spawn(drive_redirect(4197, "used-twice"));
        let err = manager
            .ensure_ready("a@example.com", &scopes(&[GMAIL_SCOPE]))
            .await
            .unwrap_err();
        driver.await.unwrap();

        match &err {
            AuthError::CodeExchange { reason, auth_url } => {
                assert!(reason.contains("invalid_grant"));
                assert!(auth_url.contains("access_type=offline"));
            }
            other => panic!("expected CodeExchange, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_identity_without_subject_id_is_rejected() {
        let (_dir, settings) = setup(4198);
        let server = MockServer::start().await;
        mount_token(
            &server,
            serde_json::json!({
                "access_token": "ya29.odd",
                "refresh_token": "1//odd",
                "token_type": "Bearer",
                "expires_in": 3600,
                "scope": "openid"
            }),
        )
        .await;
        // Email but no stable subject id: must not be treated as success.
        mount_userinfo(&server, serde_json::json!({"email": "a@example.com"})).await;

        let provider = mock_provider(&settings, &server);
        let creds_dir = settings.credentials_dir();
        let manager = CredentialManager::with_provider(settings, provider);

        let driver = tokio::spawn(drive_redirect(4198, "onetime"));
        let err = manager
            .ensure_ready("a@example.com", &scopes(&[GMAIL_SCOPE]))
            .await
            .unwrap_err();
        driver.await.unwrap();

        assert!(matches!(err, AuthError::NoUserId { .. }));
        assert!(TokenStore::new(creds_dir).load("a@example.com").is_none());
    }

    #[tokio::test]
    async fn test_interactive_wait_times_out_and_releases_port() {
        let (_dir, settings) = setup(4199);
        let provider = offline_provider(&settings);
        let manager = CredentialManager::with_provider(settings, provider)
            .with_authorization_timeout(Duration::from_millis(150));

        let err = manager
            .ensure_ready("a@example.com", &scopes(&[GMAIL_SCOPE]))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AuthorizationTimeout { .. }));
        assert!(err.auth_url().is_some());

        // The listener was torn down with the abandoned flow.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(CallbackListener::bind(4199, String::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_calls_for_one_account_share_one_consent() {
        let (_dir, settings) = setup(4200);
        let server = MockServer::start().await;
        mount_token(
            &server,
            serde_json::json!({
                "access_token": "ya29.shared",
                "refresh_token": "1//shared",
                "token_type": "Bearer",
                "expires_in": 3600,
                "scope": format!("openid {}", GMAIL_SCOPE)
            }),
        )
        .await;
        mount_userinfo(
            &server,
            serde_json::json!({"id": "108", "email": "a@example.com"}),
        )
        .await;

        let provider = mock_provider(&settings, &server);
        let manager = Arc::new(CredentialManager::with_provider(settings, provider));

        let driver = tokio::spawn(drive_redirect(4200, "onetime"));
        let m1 = Arc::clone(&manager);
        let m2 = Arc::clone(&manager);
        let s1 = scopes(&[GMAIL_SCOPE]);
        let s2 = scopes(&[GMAIL_SCOPE]);
        let (r1, r2) = tokio::join!(
            m1.ensure_ready("a@example.com", &s1),
            m2.ensure_ready("a@example.com", &s2),
        );
        driver.await.unwrap();

        // One consent satisfied both callers: the second re-checked the
        // store behind the per-account gate instead of racing a second
        // listener onto the same port.
        assert_eq!(r1.unwrap().access_token, "ya29.shared");
        assert_eq!(r2.unwrap().access_token, "ya29.shared");
    }

    #[test]
    fn test_token_record_debug_redacts_secrets() {
        let rec = record(Some("1//secret"), &[GMAIL_SCOPE], "2099-01-01T00:00:00Z");
        let debug = format!("{:?}", rec);
        assert!(!debug.contains("ya29.stored"));
        assert!(!debug.contains("1//secret"));
    }
}
