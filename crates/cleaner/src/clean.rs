use serde_json::Value;

use crate::patterns::CleaningPatterns;

/// Remove every match of each pattern, applied in list order.
pub fn clean_text_value(text: &str, patterns: &CleaningPatterns) -> String {
    let mut cleaned = text.to_string();
    for pattern in patterns.iter() {
        cleaned = pattern.replace_all(&cleaned, "").into_owned();
    }
    cleaned
}

/// Clean every string leaf of a JSON tree. Keys, array order and
/// non-string scalars are left alone; the input is not modified.
pub fn recursively_clean(value: &Value, patterns: &CleaningPatterns) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map
                .iter()
                .map(|(key, v)| (key.clone(), recursively_clean(v, patterns)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| recursively_clean(item, patterns))
                .collect(),
        ),
        Value::String(text) => Value::String(clean_text_value(text, patterns)),
        Value::Null | Value::Bool(_) | Value::Number(_) => value.clone(),
    }
}
