//! OFleet REST API client
//!
//! # Architecture
//!
//! - [`ApiClient`]: GET / raw GET / JSON POST / multipart upload under
//!   `{base_url}/api/v1`, bearer-authenticated
//! - [`AccessTokenProvider`]: token seam; [`ApiAuthService`] backs it with
//!   the OAuth token manager from `ofleet-common`
//! - [`OfleetService`]: one method per remote endpoint
//!
//! A 401 answer causes one token renewal and one retry. There is no other
//! retry, caching or backoff.

pub mod auth;
pub mod client;
pub mod errors;
pub mod service;

pub use auth::{create_api_oauth_config, AccessTokenProvider, ApiAuthService};
pub use client::{ApiClient, ApiClientBuilder};
pub use errors::{ApiError, ApiErrorCategory};
pub use service::{load_document, OfleetService};
