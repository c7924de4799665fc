//! Account Registry
//!
//! Static list of permitted Google accounts, loaded once at startup from
//! `accounts.json`. Pure data access — accounts are never created or
//! destroyed at runtime.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::common::AuthError;

/// One permitted account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier; also the token storage key.
    pub email: String,
    /// Free-text classification, e.g. "personal" or "work".
    pub account_type: String,
    /// Free-text annotation surfaced to callers. Never used for control flow.
    #[serde(default)]
    pub extra_info: String,
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    accounts: Vec<Account>,
}

#[derive(Debug, Clone)]
pub struct AccountRegistry {
    accounts: Vec<Account>,
}

impl AccountRegistry {
    pub fn load(path: &Path) -> Result<Self, AuthError> {
        let data = std::fs::read_to_string(path).map_err(|e| AuthError::RegistryUnavailable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let parsed: RegistryFile =
            serde_json::from_str(&data).map_err(|e| AuthError::RegistryUnavailable {
                path: path.to_path_buf(),
                reason: format!("invalid registry JSON: {}", e),
            })?;

        info!("Account registry loaded ({} accounts)", parsed.accounts.len());

        Ok(Self {
            accounts: parsed.accounts,
        })
    }

    pub fn get(&self, email: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.email == email)
    }

    pub fn list(&self) -> &[Account] {
        &self.accounts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_registry(json: &str) -> (tempfile::TempDir, AccountRegistry) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        std::fs::write(&path, json).unwrap();
        let registry = AccountRegistry::load(&path).unwrap();
        (dir, registry)
    }

    #[test]
    fn test_load_and_get() {
        let (_dir, registry) = write_registry(
            r#"{"accounts": [
                {"email": "a@example.com", "account_type": "work", "extra_info": "team inbox"},
                {"email": "b@example.com", "account_type": "personal"}
            ]}"#,
        );

        assert_eq!(registry.list().len(), 2);
        let a = registry.get("a@example.com").unwrap();
        assert_eq!(a.account_type, "work");
        assert_eq!(a.extra_info, "team inbox");
        // extra_info is optional in the file
        assert_eq!(registry.get("b@example.com").unwrap().extra_info, "");
    }

    #[test]
    fn test_unknown_account_is_absent() {
        let (_dir, registry) =
            write_registry(r#"{"accounts": [{"email": "a@example.com", "account_type": "work"}]}"#);
        assert!(registry.get("nobody@example.com").is_none());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AccountRegistry::load(&dir.path().join("accounts.json")).unwrap_err();
        assert!(matches!(err, AuthError::RegistryUnavailable { .. }));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(AccountRegistry::load(&path).is_err());
    }
}
