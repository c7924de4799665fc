//! Common Error Types
//!
//! Auth subsystem errors with JSON-RPC error code mapping.

use std::path::PathBuf;
use thiserror::Error;

/// JSON-RPC error codes
///
/// Standard codes: -32768 to -32600
/// Custom codes: -32099 to -32000
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Standard JSON-RPC errors
    ParseError = -32700,
    InvalidRequest = -32600,
    MethodNotFound = -32601,
    InvalidParams = -32602,
    InternalError = -32603,

    // Custom Oifig errors (auth subsystem)
    AccountNotConfigured = -32010,
    CodeExchangeFailed = -32011,
    NoUserId = -32012,
    NoRefreshToken = -32013,
    AuthorizationTimeout = -32014,
    CallbackBindFailed = -32015,
    StorageFailed = -32016,

    // Mutating tools disabled by configuration
    MutationsDisabled = -32001,

    // Generic application error
    GenericError = -32000,
}

impl ErrorCode {
    pub fn code(&self) -> i32 {
        *self as i32
    }
}

/// Credential lifecycle errors.
///
/// Recoverable authorization failures carry the freshly built authorization
/// URL so a caller can restart the interactive flow without reconstructing it.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("account not configured: {email}")]
    AccountNotConfigured { email: String },

    #[error("account registry unavailable at {path:?}: {reason}")]
    RegistryUnavailable { path: PathBuf, reason: String },

    #[error("client identity unavailable at {path:?}: {reason}")]
    ClientIdentity { path: PathBuf, reason: String },

    #[error("authorization code exchange failed: {reason}")]
    CodeExchange { reason: String, auth_url: String },

    #[error("identity endpoint returned no stable subject id")]
    NoUserId { auth_url: String },

    #[error("authorization produced no refresh token and none is stored for {email}")]
    NoRefreshToken { email: String, auth_url: String },

    #[error("interactive authorization timed out after {seconds}s")]
    AuthorizationTimeout { seconds: u64, auth_url: String },

    #[error("callback listener failed to bind port {port}: {reason}")]
    CallbackBind { port: u16, reason: String },

    #[error("authorization callback failed: {0}")]
    Callback(String),

    #[error("token storage error: {0}")]
    Storage(String),

    #[error("provider error: {0}")]
    Provider(String),
}

impl AuthError {
    /// JSON-RPC code for this error at the tool boundary.
    pub fn code(&self) -> ErrorCode {
        match self {
            AuthError::AccountNotConfigured { .. } => ErrorCode::AccountNotConfigured,
            AuthError::RegistryUnavailable { .. } => ErrorCode::AccountNotConfigured,
            AuthError::ClientIdentity { .. } => ErrorCode::GenericError,
            AuthError::CodeExchange { .. } => ErrorCode::CodeExchangeFailed,
            AuthError::NoUserId { .. } => ErrorCode::NoUserId,
            AuthError::NoRefreshToken { .. } => ErrorCode::NoRefreshToken,
            AuthError::AuthorizationTimeout { .. } => ErrorCode::AuthorizationTimeout,
            AuthError::CallbackBind { .. } => ErrorCode::CallbackBindFailed,
            AuthError::Callback(_) => ErrorCode::CodeExchangeFailed,
            AuthError::Storage(_) => ErrorCode::StorageFailed,
            AuthError::Provider(_) => ErrorCode::GenericError,
        }
    }

    /// Authorization URL to resume an interrupted interactive flow, when one exists.
    pub fn auth_url(&self) -> Option<&str> {
        match self {
            AuthError::CodeExchange { auth_url, .. }
            | AuthError::NoUserId { auth_url }
            | AuthError::NoRefreshToken { auth_url, .. }
            | AuthError::AuthorizationTimeout { auth_url, .. } => Some(auth_url),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::AccountNotConfigured.code(), -32010);
        assert_eq!(ErrorCode::MethodNotFound.code(), -32601);
        assert_eq!(ErrorCode::GenericError.code(), -32000);
    }

    #[test]
    fn test_auth_url_attached_to_recoverable_errors() {
        let err = AuthError::NoRefreshToken {
            email: "a@example.com".to_string(),
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth?x=1".to_string(),
        };
        assert!(err.auth_url().unwrap().starts_with("https://accounts.google.com"));

        let err = AuthError::AccountNotConfigured {
            email: "a@example.com".to_string(),
        };
        assert!(err.auth_url().is_none());
    }
}
