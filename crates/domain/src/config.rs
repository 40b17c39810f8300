//! Client configuration structures

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_REFRESH_THRESHOLD_SECS, DEFAULT_TIMEOUT_SECS};
use crate::errors::OfleetError;

/// Where the OAuth client credentials travel on token requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthLocation {
    /// HTTP Basic `Authorization` header
    #[default]
    Header,
    /// `client_id` / `client_secret` form fields
    Body,
}

impl fmt::Display for AuthLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header => write!(f, "header"),
            Self::Body => write!(f, "body"),
        }
    }
}

impl FromStr for AuthLocation {
    type Err = OfleetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "header" => Ok(Self::Header),
            "body" => Ok(Self::Body),
            other => Err(OfleetError::Config(format!("Unknown auth location: {other}"))),
        }
    }
}

/// Connection settings for one OFleet backend
///
/// Only `base_url`, `client_id` and `client_secret` are required; everything
/// else falls back to the defaults below when omitted from a config file.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfleetConfig {
    /// Backend root, e.g. `https://fleet.example.com` (no `/api/v1` suffix)
    pub base_url: String,

    /// OAuth client id
    pub client_id: String,

    /// OAuth client secret
    pub client_secret: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Skip TLS certificate verification (self-signed deployments only)
    #[serde(default)]
    pub accept_invalid_certs: bool,

    /// Treat the access token as expired this many seconds early
    #[serde(default = "default_refresh_threshold_secs")]
    pub refresh_threshold_secs: i64,

    /// Where client credentials go on token requests
    #[serde(default)]
    pub auth_location: AuthLocation,

    /// `User-Agent` header override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_refresh_threshold_secs() -> i64 {
    DEFAULT_REFRESH_THRESHOLD_SECS
}

impl OfleetConfig {
    /// Create a configuration with default transport settings
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            accept_invalid_certs: false,
            refresh_threshold_secs: DEFAULT_REFRESH_THRESHOLD_SECS,
            auth_location: AuthLocation::default(),
            user_agent: None,
        }
    }

    /// Base URL without trailing slashes
    #[must_use]
    pub fn normalized_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Request timeout as a [`Duration`]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check that the required fields are present
    ///
    /// # Errors
    /// Returns `OfleetError::Config` naming the first missing or invalid field.
    pub fn validate(&self) -> crate::Result<()> {
        let base_url = self.normalized_base_url();
        if base_url.is_empty() {
            return Err(OfleetError::Config("base_url must not be empty".to_string()));
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(OfleetError::Config(format!(
                "base_url must start with http:// or https://, got {base_url}"
            )));
        }
        if self.client_id.trim().is_empty() {
            return Err(OfleetError::Config("client_id must not be empty".to_string()));
        }
        if self.client_secret.is_empty() {
            return Err(OfleetError::Config("client_secret must not be empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(OfleetError::Config("timeout_secs must be greater than zero".to_string()));
        }
        Ok(())
    }
}

// Keeps the client secret out of logs and panic messages.
impl fmt::Debug for OfleetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OfleetConfig")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("refresh_threshold_secs", &self.refresh_threshold_secs)
            .field("auth_location", &self.auth_location)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}
