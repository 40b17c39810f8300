//! Shared OAuth 2.0 machinery for the OFleet client crates.
//!
//! # Modules
//!
//! - [`auth`]: token types, the token-endpoint client (client-credentials
//!   and refresh-token grants) and the [`auth::TokenManager`] owning the
//!   token lifecycle
//! - `testing` (feature `test-utils`): scripted OAuth client double

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod auth;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", test))]
pub mod testing;

pub use auth::{
    OAuthClient, OAuthClientError, OAuthClientTrait, OAuthConfig, TokenManager,
    TokenManagerError, TokenSet,
};
