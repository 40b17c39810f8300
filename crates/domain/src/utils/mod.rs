//! Pure helpers over opaque entity JSON

pub mod bookings;
pub mod coerce;
pub mod grouping;

pub use bookings::{apply_reward_points, reward_point_balance, sum_series};
pub use coerce::{coerce_f64, coerce_i64};
pub use grouping::count_by_property;
