//! Structural merging of configuration layers.
//!
//! Layers are folded in precedence order (global, sector, organization).
//! Objects merge key by key at any depth; any other value at a key is
//! replaced wholesale by the higher-precedence layer.

use serde_json::{Map, Value};

use super::store::ConfigRecord;

/// Merges `overlay` into `base`, with `overlay` taking precedence.
///
/// # Example
///
/// ```
/// use payroll_engine::config::deep_merge;
/// use serde_json::json;
///
/// let mut base = json!({"pension": {"rate": "0.11", "function_counts": false}});
/// deep_merge(&mut base, json!({"pension": {"function_counts": true}}));
///
/// assert_eq!(base, json!({"pension": {"rate": "0.11", "function_counts": true}}));
/// ```
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_map.insert(key, overlay_value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Folds a layer of records into the accumulator, keyed by record name.
///
/// Records are applied in the order given. Returns the keys that occurred
/// more than once in the layer.
pub(crate) fn fold_records(accumulator: &mut Map<String, Value>, records: Vec<ConfigRecord>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(records.len());
    let mut duplicates = Vec::new();

    for record in records {
        if seen.contains(&record.key) {
            if !duplicates.contains(&record.key) {
                duplicates.push(record.key.clone());
            }
        } else {
            seen.push(record.key.clone());
        }

        match accumulator.get_mut(&record.key) {
            Some(existing) => deep_merge(existing, record.value),
            None => {
                accumulator.insert(record.key, record.value);
            }
        }
    }

    duplicates
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn record(key: &str, value: Value) -> ConfigRecord {
        ConfigRecord::active(key, value, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
    }

    #[test]
    fn test_nested_objects_merge_field_by_field() {
        let mut base = json!({"benefits": {"food_allowance": "1000", "preschool_allowance": "500"}});
        deep_merge(&mut base, json!({"benefits": {"food_allowance": "1200"}}));

        assert_eq!(
            base,
            json!({"benefits": {"food_allowance": "1200", "preschool_allowance": "500"}})
        );
    }

    #[test]
    fn test_arrays_are_replaced_not_concatenated() {
        let mut base = json!({"salary_adjustments": [{"period": 1, "percent": "6"}]});
        deep_merge(&mut base, json!({"salary_adjustments": []}));

        assert_eq!(base, json!({"salary_adjustments": []}));
    }

    #[test]
    fn test_scalar_replaces_object() {
        let mut base = json!({"dailies": {"rates": {"analyst": "300"}}});
        deep_merge(&mut base, json!({"dailies": null}));

        assert_eq!(base, json!({"dailies": null}));
    }

    #[test]
    fn test_object_replaces_scalar() {
        let mut base = json!({"constants": 1});
        deep_merge(&mut base, json!({"constants": {"leave_divisor": 30}}));

        assert_eq!(base, json!({"constants": {"leave_divisor": 30}}));
    }

    #[test]
    fn test_new_keys_are_added() {
        let mut base = json!({"a": 1});
        deep_merge(&mut base, json!({"b": 2}));

        assert_eq!(base, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_fold_records_keys_by_record_name() {
        let mut accumulator = Map::new();
        let duplicates = fold_records(
            &mut accumulator,
            vec![
                record("pension", json!({"complementary_mandatory_rate": "0.085"})),
                record("constants", json!({"month_day_divisor": 30})),
            ],
        );

        assert!(duplicates.is_empty());
        assert_eq!(accumulator["pension"]["complementary_mandatory_rate"], json!("0.085"));
        assert_eq!(accumulator["constants"]["month_day_divisor"], json!(30));
    }

    #[test]
    fn test_fold_records_reports_duplicate_keys_and_last_write_wins() {
        let mut accumulator = Map::new();
        let duplicates = fold_records(
            &mut accumulator,
            vec![
                record("constants", json!({"month_day_divisor": 30})),
                record("constants", json!({"month_day_divisor": 22})),
                record("constants", json!({"leave_divisor": 30})),
            ],
        );

        assert_eq!(duplicates, vec!["constants".to_string()]);
        assert_eq!(accumulator["constants"]["month_day_divisor"], json!(22));
        assert_eq!(accumulator["constants"]["leave_divisor"], json!(30));
    }
}
