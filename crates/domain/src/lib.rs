//! # OFleet Domain
//!
//! Domain types for the OFleet fleet and rental management API client.
//!
//! This crate contains:
//! - Domain error types and Result definitions
//! - Client configuration structures
//! - Opaque entity aliases for the remote JSON schema
//! - Pure helpers over entity JSON (value coercion, reward points, grouping)
//!
//! ## Architecture
//! - No dependencies on other OFleet crates
//! - Only external dependencies allowed
//! - No I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
