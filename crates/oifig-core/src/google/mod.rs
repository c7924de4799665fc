//! Google API Client Module
//!
//! Authenticated HTTP access to the Google Workspace REST APIs (Gmail,
//! Calendar, Drive, Docs, Sheets, Slides). Each service module wraps the
//! shared `GoogleClient` and declares the OAuth scopes its operations need.

pub mod calendar;
pub mod client;
pub mod common;
pub mod docs;
pub mod drive;
pub mod gmail;
pub mod sheets;
pub mod slides;

pub use calendar::CalendarApi;
pub use client::GoogleClient;
pub use docs::DocsApi;
pub use drive::DriveApi;
pub use gmail::GmailApi;
pub use sheets::SheetsApi;
pub use slides::SlidesApi;

/// Macro to implement the standard Google API wrapper constructor pattern.
/// Each API struct wraps a `GoogleClient` and provides `new(access_token)`.
macro_rules! google_api_wrapper {
    ($name:ident) => {
        impl $name {
            /// Create a new API client with an OAuth access token
            pub fn new(access_token: String) -> Result<Self, String> {
                let client = crate::google::client::GoogleClient::new(access_token)?;
                Ok(Self { client })
            }
        }
    };
}

pub(crate) use google_api_wrapper;
