//! # OFleet Infrastructure
//!
//! Network-facing implementation of the OFleet client.
//!
//! This crate contains:
//! - A thin `reqwest` wrapper (TLS, user agent, default headers)
//! - The authenticated [`api::ApiClient`] with its four request primitives
//! - [`api::OfleetService`], one method per remote endpoint
//! - Configuration loading from the environment or JSON/TOML files
//!
//! ## Architecture
//! - Builds on `ofleet-common` for the OAuth token lifecycle
//! - Depends on `ofleet-domain` for configuration, errors and helpers
//! - Contains all the I/O of the client

pub mod api;
pub mod config;
pub mod http;

// Re-export commonly used items
pub use api::{ApiClient, ApiError, OfleetService};
pub use http::HttpClient;
