//! Booking reward-point rules
//!
//! Every booking accrues reward points worth a fixed share of its computed
//! amount. The points are stored client-side in the booking's free-form
//! `attributes` object before the booking is persisted.

use serde_json::{Map, Number, Value};

use super::coerce::{as_number, coerce_i64};
use crate::constants::{REWARD_POINTS_ATTRIBUTE, REWARD_POINTS_RATE};
use crate::errors::{OfleetError, Result};

/// Set `attributes.rewardPoints` on a priced contract.
///
/// `contract` must be the server-priced contract (the response of the
/// compute endpoint) and carry a numeric `amount`. A missing or falsy
/// `attributes` value (null, `false`, zero, `""`, `"0"`, empty array) is
/// replaced with an empty object first; other attributes are left untouched.
///
/// # Returns
/// The reward points that were written.
///
/// # Errors
/// Returns `OfleetError::InvalidInput` if the contract is not an object,
/// has no numeric `amount`, or carries non-object `attributes`.
///
/// # Examples
///
/// ```
/// use ofleet_domain::utils::bookings::apply_reward_points;
/// use serde_json::json;
///
/// let mut contract = json!({"amount": 100});
/// let points = apply_reward_points(&mut contract).unwrap();
/// assert_eq!(points, 10.0);
/// assert_eq!(contract["attributes"]["rewardPoints"], 10.0);
/// ```
pub fn apply_reward_points(contract: &mut Value) -> Result<f64> {
    let fields = contract.as_object_mut().ok_or_else(|| {
        OfleetError::InvalidInput("computed contract is not a JSON object".to_string())
    })?;

    let amount = fields.get("amount").and_then(as_number).ok_or_else(|| {
        OfleetError::InvalidInput("computed contract has no numeric amount".to_string())
    })?;

    let points = REWARD_POINTS_RATE * amount;
    let points_value = Number::from_f64(points).map(Value::Number).ok_or_else(|| {
        OfleetError::InvalidInput(format!("reward points are not a finite number: {points}"))
    })?;

    let attributes = fields.entry("attributes").or_insert(Value::Null);
    if is_blank(attributes) {
        *attributes = Value::Object(Map::new());
    }

    let attributes = attributes.as_object_mut().ok_or_else(|| {
        OfleetError::InvalidInput("contract attributes must be a JSON object".to_string())
    })?;
    attributes.insert(REWARD_POINTS_ATTRIBUTE.to_string(), points_value);

    Ok(points)
}

/// Sum a series of attribute values, coercing each to an integer first.
///
/// Arrays are summed element-wise and objects over their values; a bare
/// scalar counts as a one-element series.
#[must_use]
pub fn sum_series(series: &Value) -> i64 {
    match series {
        Value::Array(items) => items.iter().map(coerce_i64).fold(0, i64::saturating_add),
        Value::Object(map) => map.values().map(coerce_i64).fold(0, i64::saturating_add),
        scalar => coerce_i64(scalar),
    }
}

/// Earned reward points minus used reward points.
#[must_use]
pub fn reward_point_balance(earned: &Value, used: &Value) -> i64 {
    sum_series(earned).saturating_sub(sum_series(used))
}

/// Falsy values: null, `false`, zero, `""`, `"0"` and empty containers
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
    }
}
