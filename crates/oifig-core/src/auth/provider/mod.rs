//! OAuth Provider Abstraction
//!
//! Trait-based provider seam. Google is the only implementation today; the
//! trait keeps URL construction, code exchange, refresh and identity
//! resolution behind one surface.

pub mod google;

use serde::{Deserialize, Serialize};

/// Tokens returned from an OAuth token exchange or refresh.
///
/// `refresh_token` is absent on most refresh responses and on re-consents
/// where the provider decides not to reissue one — a significant state the
/// credential manager handles explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expiry: String,
    pub scopes: Vec<String>,
}

/// Raw identity-endpoint payload. Either field may be missing for malformed
/// or revoked tokens; the caller decides what that means.
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    pub id: Option<String>,
    pub email: Option<String>,
}

/// OAuth provider trait.
#[allow(async_fn_in_trait)]
pub trait OAuthProvider {
    /// Provider name (e.g. "google")
    fn name(&self) -> &str;

    /// Build the authorization URL for the code flow.
    ///
    /// Always requests offline access and forces the consent screen so a
    /// refresh token is reliably issued even on re-authorization.
    fn authorize_url(
        &self,
        scopes: &[String],
        state: &str,
        code_challenge: &str,
        login_hint: Option<&str>,
        redirect_uri: &str,
    ) -> String;

    /// Exchange an authorization code for tokens.
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> Result<OAuthTokens, String>;

    /// Refresh an access token using a refresh token.
    async fn refresh_token(&self, refresh_token: &str) -> Result<OAuthTokens, String>;

    /// Resolve which account a token actually belongs to.
    async fn fetch_identity(&self, access_token: &str) -> Result<UserInfo, String>;
}
