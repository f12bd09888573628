//! Turns extracted candidate maps into validated [`NutritionRecord`]s.

use crate::error::ValidationError;
use crate::extract::CandidateMap;
use crate::models::NutritionRecord;
use serde_json::Value;

pub const KCAL_PER_G_PROTEIN: f64 = 4.0;
pub const KCAL_PER_G_FAT: f64 = 9.0;
pub const KCAL_PER_G_CARBS: f64 = 4.0;

/// Absolute slack between stated and macro-derived calories.
pub const CALORIE_TOLERANCE_KCAL: f64 = 50.0;
/// Relative slack, as a fraction of macro-derived calories.
pub const CALORIE_TOLERANCE_RATIO: f64 = 0.65;

pub fn calories_from_macros(protein_g: f64, fat_g: f64, carbs_g: f64) -> f64 {
    protein_g * KCAL_PER_G_PROTEIN + fat_g * KCAL_PER_G_FAT + carbs_g * KCAL_PER_G_CARBS
}

pub fn within_tolerance(stated: f64, computed: f64) -> bool {
    let allowed = CALORIE_TOLERANCE_KCAL.max(CALORIE_TOLERANCE_RATIO * computed);
    (stated - computed).abs() <= allowed
}

pub fn normalize(item: &CandidateMap) -> Result<NutritionRecord, ValidationError> {
    let food_name = food_name(item)?;
    let protein_g = required_number(item, "protein", &["protein", "protein_g"])?;
    let fat_g = required_number(item, "fat", &["fat", "fat_g"])?;
    let carbs_g = required_number(item, "carbs", &["carbs", "carbs_g", "carbohydrates"])?;

    let computed = calories_from_macros(protein_g, fat_g, carbs_g);
    if !computed.is_finite() {
        return Err(ValidationError::InvalidNumber {
            field: "calories",
            value: computed.to_string(),
        });
    }
    let stated = lookup(item, &["calories", "kcal"]).and_then(|v| coerce_number(v).ok());

    let calories = match stated {
        Some(stated) if within_tolerance(stated, computed) => stated,
        Some(stated) => {
            tracing::debug!(
                "Recomputing calories for '{}': stated {} vs macros {}",
                food_name,
                stated,
                computed
            );
            computed.round()
        }
        None => computed.round(),
    };

    Ok(NutritionRecord::new(
        food_name, calories, protein_g, fat_g, carbs_g,
    ))
}

/// Normalizes every item, dropping the ones that fail validation.
pub fn normalize_batch(items: &[CandidateMap]) -> Vec<NutritionRecord> {
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match normalize(item) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Dropping item {} from model output: {}", index, e);
                None
            }
        })
        .collect()
}

fn lookup<'a>(item: &'a CandidateMap, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| item.get(*key))
        .find(|value| !value.is_null())
}

fn food_name(item: &CandidateMap) -> Result<String, ValidationError> {
    let name = match lookup(item, &["food_name", "name"]) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(_) | None => return Err(ValidationError::MissingField("food_name")),
    };

    if name.is_empty() {
        return Err(ValidationError::MissingField("food_name"));
    }
    Ok(name)
}

fn required_number(
    item: &CandidateMap,
    field: &'static str,
    keys: &[&str],
) -> Result<f64, ValidationError> {
    let value = lookup(item, keys).ok_or(ValidationError::MissingField(field))?;
    coerce_number(value).map_err(|value| ValidationError::InvalidNumber { field, value })
}

/// Accepts JSON numbers and numeric strings such as `"12.5"` or `"12 g"`.
/// The error carries the offending value for reporting.
fn coerce_number(value: &Value) -> Result<f64, String> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            let trimmed = trimmed
                .strip_suffix("kcal")
                .or_else(|| trimmed.strip_suffix('g'))
                .unwrap_or(trimmed)
                .trim();
            trimmed.parse::<f64>().ok()
        }
        _ => None,
    };

    match number {
        Some(n) if n.is_finite() && n >= 0.0 => Ok(n),
        _ => Err(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn item(value: Value) -> CandidateMap {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {}", other),
        }
    }

    #[test]
    fn test_consistent_calories_are_kept_verbatim() {
        let chicken = normalize(&item(json!({
            "food_name": "chicken breast", "calories": 330, "protein": 40, "fat": 5, "carbs": 0
        })))
        .unwrap();
        let rice = normalize(&item(json!({
            "food_name": "rice", "calories": 200, "protein": 4, "fat": 0, "carbs": 45
        })))
        .unwrap();

        assert_eq!(chicken.calories(), 330.0);
        assert_eq!(chicken.protein_g(), 40.0);
        assert_eq!(rice.calories(), 200.0);
        assert_eq!(rice.carbs_g(), 45.0);
    }

    #[test]
    fn test_inconsistent_calories_are_recomputed() {
        let omelette = normalize(&item(json!({
            "food_name": "omelette", "calories": 9999, "protein": 12, "fat": 10, "carbs": 1
        })))
        .unwrap();

        assert_eq!(omelette.calories(), 142.0);
        assert_eq!(omelette.food_name(), "omelette");
    }

    #[test]
    fn test_recomputed_calories_always_match_macros_outside_tolerance() {
        let macros = [(0.0, 0.0, 0.0), (1.5, 2.25, 3.1), (40.0, 5.0, 0.0), (80.0, 60.0, 300.0)];
        for (protein, fat, carbs) in macros {
            let computed = calories_from_macros(protein, fat, carbs);
            for stated in [computed * 2.0 + 100.0, computed * 3.0 + 60.0] {
                let record = normalize(&item(json!({
                    "food_name": "x", "calories": stated,
                    "protein": protein, "fat": fat, "carbs": carbs
                })))
                .unwrap();
                assert!(!within_tolerance(stated, computed));
                assert_eq!(record.calories(), computed.round());
            }
        }
    }

    #[test]
    fn test_missing_calories_are_computed() {
        let record = normalize(&item(json!({
            "food_name": "banana", "protein": 1.3, "fat": 0.4, "carbs": 27
        })))
        .unwrap();
        assert_eq!(record.calories(), 117.0);
    }

    #[test]
    fn test_negative_calories_are_discarded() {
        let record = normalize(&item(json!({
            "food_name": "apple", "calories": -5, "protein": 0, "fat": 0, "carbs": 25
        })))
        .unwrap();
        assert_eq!(record.calories(), 100.0);
    }

    #[test]
    fn test_numeric_strings_with_units_are_coerced() {
        let record = normalize(&item(json!({
            "food_name": "yogurt", "calories": "150 kcal", "protein": "10g", "fat": " 5 ", "carbs": "12.5"
        })))
        .unwrap();
        assert_eq!(record.protein_g(), 10.0);
        assert_eq!(record.fat_g(), 5.0);
        assert_eq!(record.carbs_g(), 12.5);
        assert_eq!(record.calories(), 150.0);
    }

    #[test]
    fn test_suffixed_field_names_are_accepted() {
        let record = normalize(&item(json!({
            "food_name": "tofu", "protein_g": 8, "fat_g": 4, "carbs_g": 2
        })))
        .unwrap();
        assert_eq!(record.calories(), 76.0);
    }

    #[test]
    fn test_missing_name_is_rejected() {
        let err = normalize(&item(json!({"protein": 1, "fat": 1, "carbs": 1}))).unwrap_err();
        assert_eq!(err, ValidationError::MissingField("food_name"));

        let err = normalize(&item(json!({"food_name": "  ", "protein": 1, "fat": 1, "carbs": 1})))
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingField("food_name"));
    }

    #[test]
    fn test_missing_macro_is_rejected() {
        let err = normalize(&item(json!({"food_name": "soup", "protein": 1, "carbs": 1})))
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingField("fat"));
    }

    #[test]
    fn test_invalid_macro_is_rejected() {
        let err = normalize(&item(json!({
            "food_name": "soup", "protein": -2, "fat": 1, "carbs": 1
        })))
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidNumber {
                field: "protein",
                value: "-2".to_string()
            }
        );

        let err = normalize(&item(json!({
            "food_name": "soup", "protein": 2, "fat": "lots", "carbs": 1
        })))
        .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidNumber { field: "fat", .. }));
    }

    #[test]
    fn test_overflowing_macros_are_rejected() {
        let err = normalize(&item(json!({
            "food_name": "glitch", "calories": 500, "protein": 1e308, "fat": 1e308, "carbs": 0
        })))
        .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidNumber { field: "calories", .. }));

        let items = vec![
            item(json!({"food_name": "glitch", "protein": 1e308, "fat": 1e308, "carbs": 0})),
            item(json!({"food_name": "egg", "protein": 6, "fat": 5, "carbs": 0.5})),
        ];
        let records = normalize_batch(&items);
        assert_eq!(records.len(), 1);
        assert!(records[0].calories().is_finite());
    }

    #[test]
    fn test_batch_drops_invalid_items() {
        let items = vec![
            item(json!({"food_name": "egg", "protein": 6, "fat": 5, "carbs": 0.5})),
            item(json!({"food_name": "mystery"})),
            item(json!({"food_name": "milk", "protein": 8, "fat": 8, "carbs": 12})),
        ];

        let records = normalize_batch(&items);
        let names: Vec<&str> = records.iter().map(|r| r.food_name()).collect();
        assert_eq!(names, vec!["egg", "milk"]);
    }
}
