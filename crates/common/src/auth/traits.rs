//! Traits for token endpoint operations
//!
//! Lets the token manager run against a mock authorization server in tests.

use async_trait::async_trait;

use super::client::OAuthClientError;
use super::types::TokenSet;

/// Trait for OAuth client operations
#[async_trait]
pub trait OAuthClientTrait: Send + Sync {
    /// Obtain a new token set with the client-credentials grant
    ///
    /// # Errors
    /// Returns error if the token request fails or the client is rejected
    async fn client_credentials(&self) -> Result<TokenSet, OAuthClientError>;

    /// Refresh access token using refresh token
    ///
    /// # Arguments
    /// * `refresh_token` - Refresh token from a previous grant
    ///
    /// # Returns
    /// New `TokenSet` with updated access token and possibly new refresh token
    ///
    /// # Errors
    /// Returns error if refresh fails or token is invalid/revoked
    async fn refresh_access_token(&self, refresh_token: &str)
        -> Result<TokenSet, OAuthClientError>;
}
