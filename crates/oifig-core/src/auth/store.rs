//! Token Store
//!
//! Per-account token files under the credentials directory, keyed by email:
//! `<credentials_dir>/<email>.json`, plain pretty-printed JSON. Writes
//! overwrite unconditionally; there is no locking and no atomic rename.

use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

use super::TokenRecord;
use crate::common::AuthError;

pub struct TokenStore {
    dir: PathBuf,
}

impl TokenStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Load the token record for an account.
    ///
    /// A missing file is the first-use steady state, not an error. An
    /// unreadable or unparseable file is logged and treated as absent.
    pub fn load(&self, email: &str) -> Option<TokenRecord> {
        let path = self.token_path(email);
        if !path.exists() {
            return None;
        }

        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to read token file {:?}: {}", path, e);
                return None;
            }
        };

        match serde_json::from_str(&data) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Failed to parse token file {:?}: {}", path, e);
                None
            }
        }
    }

    /// Save (create or overwrite) the token record for an account.
    pub fn save(&self, email: &str, record: &TokenRecord) -> Result<(), AuthError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| AuthError::Storage(format!("failed to create credentials dir: {}", e)))?;

        let json = serde_json::to_string_pretty(record)
            .map_err(|e| AuthError::Storage(format!("failed to serialize token: {}", e)))?;

        let path = self.token_path(email);
        fs::write(&path, json)
            .map_err(|e| AuthError::Storage(format!("failed to write token file: {}", e)))?;

        info!("Stored token for {} ({} scopes)", email, record.scopes.len());
        Ok(())
    }

    fn token_path(&self, email: &str) -> PathBuf {
        self.dir.join(format!("{}.json", email))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> TokenRecord {
        TokenRecord {
            access_token: "ya29.test".to_string(),
            refresh_token: Some("1//0e.test".to_string()),
            token_type: "Bearer".to_string(),
            expiry: "2026-01-01T00:00:00Z".to_string(),
            scopes: vec!["https://www.googleapis.com/auth/gmail.modify".to_string()],
            last_refreshed: String::new(),
        }
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("credentials"));

        store.save("a@example.com", &sample_record()).unwrap();
        let loaded = store.load("a@example.com").unwrap();
        assert_eq!(loaded.access_token, "ya29.test");
        assert_eq!(loaded.refresh_token.as_deref(), Some("1//0e.test"));
        assert_eq!(loaded.scopes.len(), 1);
    }

    #[test]
    fn test_absent_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().to_path_buf());
        assert!(store.load("nobody@example.com").is_none());
    }

    #[test]
    fn test_corrupt_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().to_path_buf());
        fs::write(dir.path().join("a@example.com.json"), "{truncated").unwrap();
        assert!(store.load("a@example.com").is_none());
    }

    #[test]
    fn test_accounts_stored_independently() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().to_path_buf());

        store.save("a@example.com", &sample_record()).unwrap();
        assert!(store.load("a@example.com").is_some());
        assert!(store.load("b@example.com").is_none());
    }

    #[test]
    fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().to_path_buf());

        store.save("a@example.com", &sample_record()).unwrap();
        let mut updated = sample_record();
        updated.access_token = "ya29.fresh".to_string();
        store.save("a@example.com", &updated).unwrap();

        assert_eq!(store.load("a@example.com").unwrap().access_token, "ya29.fresh");
    }
}
