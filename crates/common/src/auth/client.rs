//! OAuth 2.0 token endpoint client
//!
//! Talks to the OFleet authorization server on behalf of a confidential
//! client:
//! - Client-credentials grant for the initial access token
//! - Refresh-token grant for renewals
//! - Client authentication through HTTP Basic or form fields

use async_trait::async_trait;
use ofleet_domain::AuthLocation;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use super::traits::OAuthClientTrait;
use super::types::{OAuthConfig, OAuthError, TokenResponse, TokenSet};

/// Error type for OAuth client operations
#[derive(Debug, thiserror::Error)]
pub enum OAuthClientError {
    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// OAuth server returned a standard error body
    #[error("OAuth error ({status}): {error}")]
    OAuthError { status: u16, error: OAuthError },

    /// OAuth server returned a non-success status without a parseable error
    #[error("Token endpoint returned {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// Failed to parse response
    #[error("Parse error: {0}")]
    ParseError(String),

    /// No refresh token available
    #[error("No refresh token available")]
    NoRefreshToken,

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// OAuth 2.0 client for a confidential OFleet API client
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    config: OAuthConfig,
    client: Client,
}

impl OAuthClient {
    /// Create a new OAuth client with the given configuration
    ///
    /// No request is made until a grant is requested.
    ///
    /// # Errors
    /// Returns `OAuthClientError::ConfigError` if the token URL is empty or
    /// the HTTP client cannot be built.
    ///
    /// # Examples
    /// ```
    /// use ofleet_common::auth::{OAuthClient, OAuthConfig};
    ///
    /// let config = OAuthConfig::new(
    ///     "https://fleet.example.com/oauth/token".to_string(),
    ///     "client_id".to_string(),
    ///     "client_secret".to_string(),
    /// );
    /// let client = OAuthClient::new(config).unwrap();
    /// assert_eq!(client.config().client_id, "client_id");
    /// ```
    pub fn new(config: OAuthConfig) -> Result<Self, OAuthClientError> {
        if config.token_url.trim().is_empty() {
            return Err(OAuthClientError::ConfigError("token_url must not be empty".to_string()));
        }

        let mut builder = Client::builder().timeout(config.timeout);

        if config.accept_invalid_certs {
            warn!(
                token_url = %config.token_url,
                "TLS certificate verification disabled for token endpoint"
            );
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        let client = builder.build().map_err(|e| {
            OAuthClientError::ConfigError(format!("Failed to build HTTP client: {e}"))
        })?;

        Ok(Self { config, client })
    }

    /// Obtain a fresh access token with the client-credentials grant
    ///
    /// # Errors
    /// Returns error if the request fails, the server rejects the client, or
    /// the response cannot be parsed.
    pub async fn client_credentials(&self) -> Result<TokenSet, OAuthClientError> {
        let mut params = vec![("grant_type".to_string(), "client_credentials".to_string())];

        if !self.config.scopes.is_empty() {
            params.push(("scope".to_string(), self.config.scope_string()));
        }

        self.request_token(params).await
    }

    /// Refresh access token using refresh token
    ///
    /// # Arguments
    /// * `refresh_token` - Refresh token from a previous grant
    ///
    /// # Returns
    /// New `TokenSet` with updated access token and possibly new refresh token
    ///
    /// # Errors
    /// Returns error if:
    /// - No refresh token provided
    /// - Refresh fails
    /// - Token is invalid/revoked
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenSet, OAuthClientError> {
        if refresh_token.is_empty() {
            return Err(OAuthClientError::NoRefreshToken);
        }

        let params = vec![
            ("grant_type".to_string(), "refresh_token".to_string()),
            ("refresh_token".to_string(), refresh_token.to_string()),
        ];

        self.request_token(params).await
    }

    /// Get a reference to the OAuth configuration
    #[must_use]
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    async fn request_token(
        &self,
        mut params: Vec<(String, String)>,
    ) -> Result<TokenSet, OAuthClientError> {
        let grant_type = params.first().map(|(_, v)| v.clone()).unwrap_or_default();

        let mut request = self.client.post(&self.config.token_url);
        match self.config.auth_location {
            AuthLocation::Header => {
                request =
                    request.basic_auth(&self.config.client_id, Some(self.config.client_secret()));
            }
            AuthLocation::Body => {
                params.push(("client_id".to_string(), self.config.client_id.clone()));
                params.push(("client_secret".to_string(), self.config.client_secret().to_string()));
            }
        }

        debug!(token_url = %self.config.token_url, grant_type = %grant_type, "Requesting token");

        let response = request.form(&params).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_body(status, body));
        }

        let token_response: TokenResponse =
            response.json().await.map_err(|e| OAuthClientError::ParseError(e.to_string()))?;

        if token_response.access_token.is_empty() {
            return Err(OAuthClientError::ParseError(
                "Token response contained an empty access_token".to_string(),
            ));
        }

        Ok(token_response.into())
    }
}

fn error_from_body(status: StatusCode, body: String) -> OAuthClientError {
    match serde_json::from_str::<OAuthError>(&body) {
        Ok(error) => OAuthClientError::OAuthError { status: status.as_u16(), error },
        Err(_) => OAuthClientError::UnexpectedStatus { status: status.as_u16(), body },
    }
}

#[async_trait]
impl OAuthClientTrait for OAuthClient {
    async fn client_credentials(&self) -> Result<TokenSet, OAuthClientError> {
        self.client_credentials().await
    }

    async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenSet, OAuthClientError> {
        self.refresh_access_token(refresh_token).await
    }
}
