//! OAuth 2.0 client-credentials infrastructure
//!
//! This module owns everything needed to keep a valid bearer token for a
//! machine-to-machine API client. Tokens are acquired lazily, refreshed
//! transparently and held in memory only.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  TokenManager   │  Token lifecycle (lazy acquire, refresh, swap)
//! └────────┬────────┘
//!          │
//!          └──► OAuthClientTrait
//!                    │
//!                    └──► OAuthClient  (HTTP calls to the token endpoint)
//! ```
//!
//! # Usage Example
//!
//! ```no_run
//! use ofleet_common::auth::{OAuthClient, OAuthConfig, TokenManager};
//! use ofleet_domain::OfleetConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = OfleetConfig::new("https://fleet.example.com", "client", "secret");
//! let oauth_client = OAuthClient::new(OAuthConfig::from_client_config(&settings))?;
//! let manager = TokenManager::new(oauth_client, settings.refresh_threshold_secs);
//!
//! // First call hits POST /oauth/token with grant_type=client_credentials
//! let access_token = manager.get_access_token().await?;
//! # let _ = access_token;
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - **[`types`]**: `TokenSet`, `TokenResponse`, `OAuthConfig`, `OAuthError`
//! - **[`client`]**: token endpoint client
//! - **[`traits`]**: `OAuthClientTrait` seam for testing
//! - **[`token_manager`]**: token lifecycle with single-flight refresh

pub mod client;
pub mod token_manager;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use client::{OAuthClient, OAuthClientError};
pub use token_manager::{TokenManager, TokenManagerError};
pub use traits::OAuthClientTrait;
pub use types::{OAuthConfig, OAuthError, TokenResponse, TokenSet};
