//! API authentication with OAuth token management
//!
//! Bridges the [`TokenManager`] from `ofleet-common` to the API client.

use std::sync::Arc;

use async_trait::async_trait;
use ofleet_common::auth::{OAuthClient, OAuthClientTrait, OAuthConfig, TokenManager};
use ofleet_domain::OfleetConfig;
use tracing::debug;

use super::errors::ApiError;

/// Trait for providing access tokens
///
/// This trait allows dependency injection and testing with mock providers.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Get a valid access token, acquiring or refreshing it if needed
    async fn access_token(&self) -> Result<String, ApiError>;

    /// Get a replacement for a token the API just rejected with 401
    async fn refresh_after_rejection(&self, rejected_token: &str) -> Result<String, ApiError>;
}

/// Build the token endpoint configuration for an API client configuration
pub fn create_api_oauth_config(config: &OfleetConfig) -> OAuthConfig {
    OAuthConfig::from_client_config(config)
}

/// API authentication service backed by an in-memory token manager
pub struct ApiAuthService<C: OAuthClientTrait + 'static = OAuthClient> {
    tokens: Arc<TokenManager<C>>,
}

impl ApiAuthService<OAuthClient> {
    /// Create an auth service talking to `{base_url}/oauth/token`
    ///
    /// No token is requested until the first API call.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Config` if the token endpoint client cannot be built
    pub fn new(config: &OfleetConfig) -> Result<Self, ApiError> {
        let oauth_client = OAuthClient::new(create_api_oauth_config(config))
            .map_err(|e| ApiError::Config(format!("Failed to build OAuth client: {e}")))?;

        Ok(Self::from_token_manager(Arc::new(TokenManager::new(
            oauth_client,
            config.refresh_threshold_secs,
        ))))
    }
}

impl<C: OAuthClientTrait + 'static> ApiAuthService<C> {
    /// Wrap an existing token manager
    pub fn from_token_manager(tokens: Arc<TokenManager<C>>) -> Self {
        Self { tokens }
    }

    /// Check whether a token has been acquired
    pub async fn is_authenticated(&self) -> bool {
        self.tokens.is_authenticated().await
    }

    /// Forget the current token; the next call acquires a new one
    pub async fn clear_tokens(&self) {
        self.tokens.clear_tokens().await;
    }

    /// The underlying token manager
    pub fn token_manager(&self) -> &Arc<TokenManager<C>> {
        &self.tokens
    }
}

#[async_trait]
impl<C: OAuthClientTrait + 'static> AccessTokenProvider for ApiAuthService<C> {
    async fn access_token(&self) -> Result<String, ApiError> {
        self.tokens
            .get_access_token()
            .await
            .map_err(|e| ApiError::Auth(format!("Failed to get access token: {e}")))
    }

    async fn refresh_after_rejection(&self, rejected_token: &str) -> Result<String, ApiError> {
        debug!("Renewing access token after rejection");
        self.tokens
            .refresh_after_rejection(rejected_token)
            .await
            .map_err(|e| ApiError::Auth(format!("Failed to refresh access token: {e}")))
    }
}
