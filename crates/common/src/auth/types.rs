//! OAuth 2.0 types and structures
//!
//! Token, token-response and configuration types for the client-credentials
//! and refresh-token grants.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ofleet_domain::constants::{DEFAULT_TIMEOUT_SECS, TOKEN_PATH};
use ofleet_domain::{AuthLocation, OfleetConfig};
use serde::{Deserialize, Serialize};

/// OAuth 2.0 access and refresh tokens with metadata
///
/// - Optional refresh token (client-credentials servers often omit it)
/// - Both `expires_in` (duration) and `expires_at` (timestamp)
/// - Scope tracking for granted permissions
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    /// Bearer token for API authentication
    pub access_token: String,

    /// Refresh token for obtaining new access tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Token type (always "Bearer" for the OFleet token endpoint)
    pub token_type: String,

    /// Access token lifetime in seconds, if the server announced one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,

    /// Absolute expiration timestamp (UTC)
    /// Calculated from `expires_in` when the token is received
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Granted scopes (space-separated)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl TokenSet {
    /// Create a new `TokenSet` with calculated expiration time
    ///
    /// # Arguments
    /// * `access_token` - The access token
    /// * `refresh_token` - Optional refresh token
    /// * `expires_in` - Token lifetime in seconds (`None` or non-positive
    ///   means no tracked expiry)
    /// * `scope` - Optional space-separated scopes
    #[must_use]
    pub fn new(
        access_token: String,
        refresh_token: Option<String>,
        expires_in: Option<i64>,
        scope: Option<String>,
    ) -> Self {
        // A lifetime beyond the representable range is tracked as no expiry.
        let expires_at = expires_in
            .filter(|secs| *secs > 0)
            .and_then(chrono::Duration::try_seconds)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime));

        Self {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in,
            expires_at,
            scope,
        }
    }

    /// Check if the access token is expired or will expire within the given
    /// threshold
    ///
    /// # Returns
    /// `true` if the token is expired or will expire within the threshold,
    /// `false` if it's still valid beyond the threshold or if no expiry is set
    #[must_use]
    pub fn is_expired(&self, threshold_seconds: i64) -> bool {
        let Some(expires_at) = self.expires_at else {
            return false;
        };

        match chrono::Duration::try_seconds(threshold_seconds)
            .and_then(|threshold| Utc::now().checked_add_signed(threshold))
        {
            Some(deadline) => deadline >= expires_at,
            // Out-of-range thresholds saturate: huge means always stale.
            None => threshold_seconds > 0,
        }
    }

    /// Get seconds until token expiration
    #[must_use]
    pub fn seconds_until_expiry(&self) -> Option<i64> {
        self.expires_at.map(|expires_at| (expires_at - Utc::now()).num_seconds())
    }
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .finish()
    }
}

/// OAuth token response from the authorization server
///
/// Standard OAuth 2.0 token response format (RFC 6749 §5.1).
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    /// Bearer token for API calls
    pub access_token: String,
    /// Token for the refresh grant, when issued
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Token type, `Bearer` when omitted
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Granted scopes, space separated
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl From<TokenResponse> for TokenSet {
    fn from(response: TokenResponse) -> Self {
        let mut tokens = Self::new(
            response.access_token,
            response.refresh_token,
            response.expires_in,
            response.scope,
        );
        tokens.token_type = response.token_type;
        tokens
    }
}

/// Token endpoint configuration for one OAuth client
#[derive(Clone)]
pub struct OAuthConfig {
    /// Absolute token endpoint URL (e.g. `https://fleet.example.com/oauth/token`)
    pub token_url: String,

    /// OAuth client ID
    pub client_id: String,

    client_secret: String,

    /// Where the client credentials are sent on token requests
    pub auth_location: AuthLocation,

    /// Scopes requested on the client-credentials grant (may be empty)
    pub scopes: Vec<String>,

    /// Timeout for token requests
    pub timeout: Duration,

    /// Skip TLS certificate verification on the token endpoint
    pub accept_invalid_certs: bool,

    /// `User-Agent` sent with token requests
    pub user_agent: Option<String>,
}

impl OAuthConfig {
    /// Create a new OAuth configuration with default transport settings
    #[must_use]
    pub fn new(token_url: String, client_id: String, client_secret: String) -> Self {
        Self {
            token_url,
            client_id,
            client_secret,
            auth_location: AuthLocation::Header,
            scopes: Vec::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            accept_invalid_certs: false,
            user_agent: None,
        }
    }

    /// Derive the token endpoint settings from a client configuration
    ///
    /// The token endpoint lives at `{base_url}/oauth/token`.
    #[must_use]
    pub fn from_client_config(config: &OfleetConfig) -> Self {
        Self {
            token_url: format!("{}{}", config.normalized_base_url(), TOKEN_PATH),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            auth_location: config.auth_location,
            scopes: Vec::new(),
            timeout: config.timeout(),
            accept_invalid_certs: config.accept_invalid_certs,
            user_agent: config.user_agent.clone(),
        }
    }

    /// Get the client secret
    #[must_use]
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// Get scopes as space-separated string
    #[must_use]
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("auth_location", &self.auth_location)
            .field("scopes", &self.scopes)
            .field("timeout", &self.timeout)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish_non_exhaustive()
    }
}

/// OAuth error response from authorization server
///
/// Standard OAuth 2.0 error response format (RFC 6749 §5.2).
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthError {
    /// Error code such as `invalid_grant`
    pub error: String,
    /// Human-readable detail
    pub error_description: Option<String>,
}

impl fmt::Display for OAuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_description {
            Some(desc) => write!(f, "{}: {}", self.error, desc),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for OAuthError {}
