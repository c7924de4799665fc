//! Common Utilities
//!
//! Shared error types and HTTP client construction used across the crate.

pub mod error;
pub mod http;

pub use error::{AuthError, ErrorCode};
pub use http::{create_http_client, create_http_client_with_timeout};
