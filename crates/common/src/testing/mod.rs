//! Testing utilities and helpers
//!
//! - **[`mocks`]**: scripted [`crate::auth::OAuthClientTrait`] double
//!
//! ## Usage
//!
//! ```ignore
//! use ofleet_common::auth::{TokenManager, TokenSet};
//! use ofleet_common::testing::MockOAuthClient;
//!
//! # async fn example() {
//! let client = MockOAuthClient::new();
//! client.push_client_credentials(Ok(TokenSet::new("t".into(), None, None, None)));
//! let manager = TokenManager::new(client, 0);
//! assert_eq!(manager.get_access_token().await.unwrap(), "t");
//! # }
//! ```

pub mod mocks;

pub use mocks::MockOAuthClient;
