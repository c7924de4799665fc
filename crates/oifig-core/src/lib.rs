//! Oifig core library
//!
//! Multi-account Google Workspace plumbing: account registry, OAuth2
//! credential lifecycle, and authenticated API clients for Gmail, Calendar,
//! Drive, Docs, Sheets and Slides. The MCP-facing binary lives in
//! `oifig-mcp`; everything credential-shaped lives here.

pub mod auth;
pub mod common;
pub mod config;
pub mod google;
