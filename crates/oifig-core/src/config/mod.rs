//! Configuration
//!
//! Resolves the Oifig base directory (`~/.oifig/` unless overridden) and
//! loads the two startup configuration files: the account registry and the
//! Google OAuth client identity.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::common::AuthError;

/// Base directory override
pub const ENV_DIR: &str = "OIFIG_DIR";
/// Callback port override
pub const ENV_CALLBACK_PORT: &str = "OIFIG_CALLBACK_PORT";
/// Browser launch command override (receives the authorization URL as argv[1])
pub const ENV_BROWSER: &str = "OIFIG_BROWSER";
/// Gates send/mutate-style tools; unset or "0"/"false" disables them
pub const ENV_ENABLE_MUTATIONS: &str = "OIFIG_ENABLE_MUTATIONS";

pub const DEFAULT_CALLBACK_PORT: u16 = 4100;
/// Fixed path the authorization redirect must hit.
pub const CALLBACK_PATH: &str = "/code";

/// Get the Oifig base directory (`~/.oifig/`, or `$OIFIG_DIR`)
pub fn oifig_dir() -> Result<PathBuf, AuthError> {
    if let Ok(dir) = std::env::var(ENV_DIR) {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().ok_or_else(|| {
        AuthError::Storage("could not determine home directory".to_string())
    })?;
    Ok(home.join(".oifig"))
}

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_dir: PathBuf,
    pub callback_port: u16,
}

impl Settings {
    /// Load settings from the environment.
    pub fn load() -> Result<Self, AuthError> {
        let callback_port = std::env::var(ENV_CALLBACK_PORT)
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_CALLBACK_PORT);

        Ok(Self {
            base_dir: oifig_dir()?,
            callback_port,
        })
    }

    /// Settings rooted at an explicit directory (used by tests and CLI overrides).
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            callback_port: DEFAULT_CALLBACK_PORT,
        }
    }

    pub fn accounts_path(&self) -> PathBuf {
        self.base_dir.join("accounts.json")
    }

    pub fn client_identity_path(&self) -> PathBuf {
        self.base_dir.join("gauth.json")
    }

    pub fn credentials_dir(&self) -> PathBuf {
        self.base_dir.join("credentials")
    }

    /// Local redirect endpoint; must be registered verbatim on the OAuth client.
    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}{}", self.callback_port, CALLBACK_PATH)
    }
}

/// Whether send/mutate-style tools are permitted.
pub fn mutations_enabled() -> bool {
    match std::env::var(ENV_ENABLE_MUTATIONS) {
        Ok(v) => !matches!(v.as_str(), "" | "0" | "false" | "no"),
        Err(_) => false,
    }
}

/// Explicit browser-launch command, if configured.
pub fn browser_override() -> Option<String> {
    std::env::var(ENV_BROWSER).ok().filter(|v| !v.is_empty())
}

// ── Client identity ─────────────────────────────────────────────────────────

/// The application's OAuth2 client identity, loaded once at startup.
///
/// Parsed from Google's downloaded client-secret JSON, which nests the
/// credentials under an "installed" or "web" key.
#[derive(Clone, Deserialize)]
pub struct ClientIdentity {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

// Redact the secret in logs
impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uris", &self.redirect_uris)
            .finish()
    }
}

impl ClientIdentity {
    /// Whether the given redirect URI is registered on this client.
    pub fn authorizes_redirect(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|r| r == uri)
    }
}

#[derive(Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientIdentity>,
    web: Option<ClientIdentity>,
}

/// Load the client identity file. Failure here is fatal to the server.
pub fn load_client_identity(path: &Path) -> Result<ClientIdentity, AuthError> {
    let data = std::fs::read_to_string(path).map_err(|e| AuthError::ClientIdentity {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let parsed: ClientSecretFile =
        serde_json::from_str(&data).map_err(|e| AuthError::ClientIdentity {
            path: path.to_path_buf(),
            reason: format!("invalid client secret JSON: {}", e),
        })?;

    parsed
        .installed
        .or(parsed.web)
        .ok_or_else(|| AuthError::ClientIdentity {
            path: path.to_path_buf(),
            reason: "expected an \"installed\" or \"web\" section".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_client_identity_installed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gauth.json");
        std::fs::write(
            &path,
            r#"{"installed": {"client_id": "id.apps.googleusercontent.com",
                "client_secret": "shhh",
                "redirect_uris": ["http://localhost:4100/code"]}}"#,
        )
        .unwrap();

        let identity = load_client_identity(&path).unwrap();
        assert_eq!(identity.client_id, "id.apps.googleusercontent.com");
        assert!(identity.authorizes_redirect("http://localhost:4100/code"));
        assert!(!identity.authorizes_redirect("http://localhost:9/other"));
    }

    #[test]
    fn test_load_client_identity_web() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gauth.json");
        std::fs::write(
            &path,
            r#"{"web": {"client_id": "w", "client_secret": "s"}}"#,
        )
        .unwrap();

        let identity = load_client_identity(&path).unwrap();
        assert_eq!(identity.client_id, "w");
    }

    #[test]
    fn test_load_client_identity_missing_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gauth.json");
        std::fs::write(&path, r#"{"other": {}}"#).unwrap();
        assert!(load_client_identity(&path).is_err());
    }

    #[test]
    fn test_load_client_identity_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_client_identity(&dir.path().join("nope.json")).is_err());
    }

    #[test]
    fn test_client_identity_debug_redacts_secret() {
        let identity = ClientIdentity {
            client_id: "id".to_string(),
            client_secret: "super-secret".to_string(),
            redirect_uris: vec![],
        };
        let debug = format!("{:?}", identity);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_settings_redirect_uri() {
        let settings = Settings::with_base_dir("/tmp/x");
        assert_eq!(settings.redirect_uri(), "http://localhost:4100/code");
    }
}
