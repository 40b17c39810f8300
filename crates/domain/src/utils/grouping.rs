//! Grouping and counting over entity lists

use serde_json::Value;

use crate::types::PropertyCount;

/// Count entities by the nested field `entity[prop][key]`.
///
/// Groups are returned by descending count; groups with equal counts keep
/// the order in which their key was first seen. Entities without the nested
/// field fall into the `""` group. String keys are used verbatim, other
/// values by their JSON rendering.
///
/// # Examples
///
/// ```
/// use ofleet_domain::utils::grouping::count_by_property;
/// use serde_json::json;
///
/// let vehicles = vec![
///     json!({"model": {"brand": "Renault"}}),
///     json!({"model": {"brand": "Peugeot"}}),
///     json!({"model": {"brand": "Peugeot"}}),
/// ];
/// let counts = count_by_property(&vehicles, "model", "brand");
/// assert_eq!(counts[0].key, "Peugeot");
/// assert_eq!(counts[0].count, 2);
/// ```
#[must_use]
pub fn count_by_property(entities: &[Value], prop: &str, key: &str) -> Vec<PropertyCount> {
    let mut groups: Vec<PropertyCount> = Vec::new();

    for entity in entities {
        let group_key = match entity.get(prop).and_then(|nested| nested.get(key)) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };

        match groups.iter_mut().find(|group| group.key == group_key) {
            Some(group) => group.count += 1,
            None => groups.push(PropertyCount { key: group_key, count: 1 }),
        }
    }

    // stable sort keeps first-seen order among equal counts
    groups.sort_by(|a, b| b.count.cmp(&a.count));
    groups
}
