//! Client constants
//!
//! Remote API layout and defaults shared across the OFleet crates.

// Remote layout
pub const API_VERSION_PATH: &str = "/api/v1";
pub const TOKEN_PATH: &str = "/oauth/token";

// Transport defaults
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_REFRESH_THRESHOLD_SECS: i64 = 0;

// Booking rules
pub const REWARD_POINTS_RATE: f64 = 0.1;
pub const REWARD_POINTS_ATTRIBUTE: &str = "rewardPoints";
pub const USED_REWARD_POINTS_ATTRIBUTE: &str = "usedRewardPoints";
pub const CLIENT_BOOKINGS_PAGE_SIZE: u32 = 50;

// Multipart field names
pub const DRIVING_LICENSE_FIELD: &str = "drivingLicense";
pub const ID_CARD_FIELD: &str = "idCard";
