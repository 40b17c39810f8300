//! Token manager with automatic acquisition and refresh
//!
//! Manages the OAuth token lifecycle for one API client:
//! - Lazy client-credentials grant on first use
//! - Refresh-token grant once the tracked expiry (minus threshold) passes
//! - Renewal after the API rejected the current token
//! - Single-flight renewals shared by concurrent callers

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::client::OAuthClientError;
use super::traits::OAuthClientTrait;
use super::types::TokenSet;

/// Error type for token manager operations
#[derive(Debug, thiserror::Error)]
pub enum TokenManagerError {
    /// The client-credentials grant failed
    #[error("Token acquisition failed: {0}")]
    Acquire(#[source] OAuthClientError),

    /// The refresh-token grant failed
    #[error("Token refresh failed: {0}")]
    Refresh(#[source] OAuthClientError),
}

impl TokenManagerError {
    /// The underlying token endpoint error
    #[must_use]
    pub fn oauth_error(&self) -> &OAuthClientError {
        match self {
            Self::Acquire(err) | Self::Refresh(err) => err,
        }
    }
}

/// Token manager with auto-refresh capabilities
///
/// Tokens live in memory only. A read lock guards the current token set and
/// a separate async mutex serializes renewals, so a burst of callers hitting
/// an expired token produces exactly one token request.
pub struct TokenManager<C: OAuthClientTrait + 'static> {
    oauth_client: Arc<C>,
    current_tokens: RwLock<Option<TokenSet>>,
    refresh_lock: Mutex<()>,
    refresh_threshold_seconds: i64,
}

impl<C: OAuthClientTrait + 'static> TokenManager<C> {
    /// Create a new token manager
    ///
    /// # Arguments
    /// * `oauth_client` - OAuth client used for grants
    /// * `refresh_threshold_seconds` - Treat tokens as expired this many
    ///   seconds before their announced expiry
    #[must_use]
    pub fn new(oauth_client: C, refresh_threshold_seconds: i64) -> Self {
        Self::with_shared_client(Arc::new(oauth_client), refresh_threshold_seconds)
    }

    /// Create a token manager around an already shared OAuth client
    #[must_use]
    pub fn with_shared_client(oauth_client: Arc<C>, refresh_threshold_seconds: i64) -> Self {
        Self {
            oauth_client,
            current_tokens: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            refresh_threshold_seconds,
        }
    }

    /// Get a usable access token, acquiring or refreshing as needed
    ///
    /// # Errors
    /// Returns `TokenManagerError::Acquire` when the client-credentials grant
    /// fails and `TokenManagerError::Refresh` when a refresh fails.
    pub async fn get_access_token(&self) -> Result<String, TokenManagerError> {
        if let Some(token) = self.valid_access_token().await {
            return Ok(token);
        }

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have renewed while we waited for the lock.
        if let Some(token) = self.valid_access_token().await {
            return Ok(token);
        }

        self.renew_locked().await
    }

    /// Renew the token after the API rejected `rejected_token`
    ///
    /// If another caller already replaced the rejected token, the current
    /// one is returned without contacting the token endpoint.
    ///
    /// # Errors
    /// Same as [`Self::get_access_token`].
    pub async fn refresh_after_rejection(
        &self,
        rejected_token: &str,
    ) -> Result<String, TokenManagerError> {
        let _guard = self.refresh_lock.lock().await;

        {
            let tokens = self.current_tokens.read().await;
            if let Some(current) = tokens.as_ref() {
                if current.access_token != rejected_token {
                    debug!("Rejected token already replaced by a concurrent renewal");
                    return Ok(current.access_token.clone());
                }
            }
        }

        warn!("Access token rejected by API, renewing");
        self.renew_locked().await
    }

    /// Get current token set (without auto-refresh)
    pub async fn get_tokens(&self) -> Option<TokenSet> {
        self.current_tokens.read().await.clone()
    }

    /// Check whether a token has been acquired
    pub async fn is_authenticated(&self) -> bool {
        self.current_tokens.read().await.is_some()
    }

    /// Drop the in-memory tokens; the next call acquires new ones
    pub async fn clear_tokens(&self) {
        *self.current_tokens.write().await = None;
        info!("Tokens cleared");
    }

    /// Get seconds until token expiry
    ///
    /// # Returns
    /// Number of seconds until expiry, or None if no token or no tracked
    /// expiry
    pub async fn seconds_until_expiry(&self) -> Option<i64> {
        let tokens = self.current_tokens.read().await;
        tokens.as_ref().and_then(TokenSet::seconds_until_expiry)
    }

    /// Get the refresh threshold in seconds
    #[must_use]
    pub fn refresh_threshold(&self) -> i64 {
        self.refresh_threshold_seconds
    }

    async fn valid_access_token(&self) -> Option<String> {
        let tokens = self.current_tokens.read().await;
        tokens
            .as_ref()
            .filter(|t| !t.is_expired(self.refresh_threshold_seconds))
            .map(|t| t.access_token.clone())
    }

    /// Must be called with `refresh_lock` held.
    async fn renew_locked(&self) -> Result<String, TokenManagerError> {
        let previous_refresh = {
            let tokens = self.current_tokens.read().await;
            tokens.as_ref().and_then(|t| t.refresh_token.clone())
        };

        let mut new_tokens = match previous_refresh.as_deref() {
            Some(refresh_token) => {
                debug!("Refreshing access token");
                match self.oauth_client.refresh_access_token(refresh_token).await {
                    Ok(tokens) => tokens,
                    Err(err) => {
                        self.forget_refresh_token().await;
                        return Err(TokenManagerError::Refresh(err));
                    }
                }
            }
            None => {
                debug!("Requesting access token with client credentials");
                self.oauth_client.client_credentials().await.map_err(TokenManagerError::Acquire)?
            }
        };

        if new_tokens.refresh_token.is_none() {
            new_tokens.refresh_token = previous_refresh;
        }

        let access_token = new_tokens.access_token.clone();
        *self.current_tokens.write().await = Some(new_tokens);

        info!("Access token renewed");
        Ok(access_token)
    }

    /// A refresh token the server refused once is not offered again; the
    /// next renewal falls back to client credentials.
    async fn forget_refresh_token(&self) {
        if let Some(current) = self.current_tokens.write().await.as_mut() {
            current.refresh_token = None;
        }
        warn!("Refresh grant failed, dropping refresh token");
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::token_manager.
    use std::time::Duration;

    use super::*;
    use crate::testing::MockOAuthClient;

    fn token(access: &str, refresh: Option<&str>, expires_in: Option<i64>) -> TokenSet {
        TokenSet::new(access.to_string(), refresh.map(str::to_string), expires_in, None)
    }

    /// Validates the token manager creation scenario.
    ///
    /// Assertions:
    /// - Ensures `!manager.is_authenticated().await` evaluates to true.
    /// - Confirms `manager.refresh_threshold()` equals `30`.
    #[tokio::test]
    async fn test_token_manager_creation() {
        let manager = TokenManager::new(MockOAuthClient::new(), 30);

        assert!(!manager.is_authenticated().await);
        assert_eq!(manager.refresh_threshold(), 30);
        assert!(manager.seconds_until_expiry().await.is_none());
    }

    /// Validates the lazy acquisition scenario.
    ///
    /// Assertions:
    /// - Confirms the first call performs one client-credentials grant.
    /// - Confirms the second call reuses the cached token.
    #[tokio::test]
    async fn test_first_call_acquires_then_caches() {
        let client = Arc::new(MockOAuthClient::new());
        client.push_client_credentials(Ok(token("a1", Some("r1"), Some(3600))));
        let manager = TokenManager::with_shared_client(client.clone(), 0);

        assert_eq!(manager.get_access_token().await.unwrap(), "a1");
        assert_eq!(manager.get_access_token().await.unwrap(), "a1");

        assert_eq!(client.client_credentials_calls(), 1);
        assert_eq!(client.refresh_calls(), 0);
        assert!(manager.is_authenticated().await);
    }

    /// Validates the expired token refresh scenario.
    ///
    /// Assertions:
    /// - Confirms an expired token triggers one refresh-token grant with the
    ///   stored refresh token.
    #[tokio::test]
    async fn test_expired_token_uses_refresh_grant() {
        let client = Arc::new(MockOAuthClient::new());
        client.push_client_credentials(Ok(token("a1", Some("r1"), Some(60))));
        client.push_refresh(Ok(token("a2", Some("r2"), Some(3600))));
        // A threshold larger than the lifetime makes the first token stale.
        let manager = TokenManager::with_shared_client(client.clone(), 120);

        assert_eq!(manager.get_access_token().await.unwrap(), "a1");
        assert_eq!(manager.get_access_token().await.unwrap(), "a2");

        assert_eq!(client.refresh_calls(), 1);
        assert_eq!(client.refresh_tokens_seen(), vec!["r1".to_string()]);
        let tokens = manager.get_tokens().await.unwrap();
        assert_eq!(tokens.refresh_token.as_deref(), Some("r2"));
    }

    #[tokio::test]
    async fn test_refresh_keeps_previous_refresh_token_when_omitted() {
        let client = Arc::new(MockOAuthClient::new());
        client.push_client_credentials(Ok(token("a1", Some("r1"), Some(60))));
        client.push_refresh(Ok(token("a2", None, Some(3600))));
        let manager = TokenManager::with_shared_client(client.clone(), 120);

        manager.get_access_token().await.unwrap();
        manager.get_access_token().await.unwrap();

        let tokens = manager.get_tokens().await.unwrap();
        assert_eq!(tokens.access_token, "a2");
        assert_eq!(tokens.refresh_token.as_deref(), Some("r1"));
    }

    /// Validates the no refresh token scenario.
    ///
    /// Assertions:
    /// - Confirms renewal falls back to the client-credentials grant.
    #[tokio::test]
    async fn test_renewal_without_refresh_token_uses_client_credentials() {
        let client = Arc::new(MockOAuthClient::new());
        client.push_client_credentials(Ok(token("a1", None, None)));
        client.push_client_credentials(Ok(token("a2", None, None)));
        let manager = TokenManager::with_shared_client(client.clone(), 0);

        assert_eq!(manager.get_access_token().await.unwrap(), "a1");
        assert_eq!(manager.refresh_after_rejection("a1").await.unwrap(), "a2");

        assert_eq!(client.client_credentials_calls(), 2);
        assert_eq!(client.refresh_calls(), 0);
    }

    #[tokio::test]
    async fn test_refresh_after_rejection_skips_replaced_token() {
        let client = Arc::new(MockOAuthClient::new());
        client.push_client_credentials(Ok(token("a1", Some("r1"), None)));
        client.push_refresh(Ok(token("a2", Some("r2"), None)));
        let manager = TokenManager::with_shared_client(client.clone(), 0);

        manager.get_access_token().await.unwrap();
        assert_eq!(manager.refresh_after_rejection("a1").await.unwrap(), "a2");
        // A late caller still holding the old token gets the new one for free.
        assert_eq!(manager.refresh_after_rejection("a1").await.unwrap(), "a2");

        assert_eq!(client.refresh_calls(), 1);
    }

    /// Validates the refresh failure scenario.
    ///
    /// Assertions:
    /// - Ensures `matches!(result, Err(TokenManagerError::Refresh(_)))`
    ///   evaluates to true.
    #[tokio::test]
    async fn test_refresh_failure_is_reported() {
        let client = Arc::new(MockOAuthClient::new());
        client.push_client_credentials(Ok(token("a1", Some("r1"), None)));
        client.push_refresh(Err(OAuthClientError::NoRefreshToken));
        let manager = TokenManager::with_shared_client(client.clone(), 0);

        manager.get_access_token().await.unwrap();
        let result = manager.refresh_after_rejection("a1").await;

        assert!(matches!(result, Err(TokenManagerError::Refresh(_))));
        assert_eq!(client.client_credentials_calls(), 1);
        // The rejected token stays in place until a renewal succeeds.
        let tokens = manager.get_tokens().await.unwrap();
        assert_eq!(tokens.access_token, "a1");
        assert!(tokens.refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_renewal_after_failed_refresh_uses_client_credentials() {
        let client = Arc::new(MockOAuthClient::new());
        client.push_client_credentials(Ok(token("a1", Some("r1"), None)));
        client.push_refresh(Err(OAuthClientError::NoRefreshToken));
        client.push_client_credentials(Ok(token("a2", Some("r2"), None)));
        let manager = TokenManager::with_shared_client(client.clone(), 0);

        manager.get_access_token().await.unwrap();
        assert!(manager.refresh_after_rejection("a1").await.is_err());
        assert_eq!(manager.refresh_after_rejection("a1").await.unwrap(), "a2");

        assert_eq!(client.refresh_calls(), 1);
        assert_eq!(client.client_credentials_calls(), 2);
        assert_eq!(manager.get_tokens().await.unwrap().refresh_token.as_deref(), Some("r2"));
    }

    #[tokio::test]
    async fn test_acquire_failure_is_reported() {
        let client = Arc::new(MockOAuthClient::new());
        client.push_client_credentials(Err(OAuthClientError::ConfigError("down".to_string())));
        let manager = TokenManager::with_shared_client(client, 0);

        let result = manager.get_access_token().await;

        assert!(matches!(result, Err(TokenManagerError::Acquire(_))));
        assert!(!manager.is_authenticated().await);
    }

    /// Validates the concurrent acquisition scenario.
    ///
    /// Assertions:
    /// - Confirms ten concurrent callers share a single token request.
    #[tokio::test]
    async fn test_concurrent_callers_share_one_acquisition() {
        let client = Arc::new(MockOAuthClient::new().with_delay(Duration::from_millis(50)));
        client.push_client_credentials(Ok(token("shared", Some("r1"), Some(3600))));
        let manager = Arc::new(TokenManager::with_shared_client(client.clone(), 0));

        let handles = (0..10).map(|_| {
            let manager = manager.clone();
            tokio::spawn(async move { manager.get_access_token().await })
        });
        let results = futures::future::join_all(handles).await;

        for result in results {
            assert_eq!(result.unwrap().unwrap(), "shared");
        }
        assert_eq!(client.client_credentials_calls(), 1);
    }

    #[tokio::test]
    async fn test_clear_tokens_forces_new_grant() {
        let client = Arc::new(MockOAuthClient::new());
        client.push_client_credentials(Ok(token("a1", Some("r1"), None)));
        client.push_client_credentials(Ok(token("a2", Some("r2"), None)));
        let manager = TokenManager::with_shared_client(client.clone(), 0);

        manager.get_access_token().await.unwrap();
        manager.clear_tokens().await;
        assert!(!manager.is_authenticated().await);

        assert_eq!(manager.get_access_token().await.unwrap(), "a2");
        assert_eq!(client.client_credentials_calls(), 2);
    }
}
