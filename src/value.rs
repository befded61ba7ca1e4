//! Text rendering of JSON values for step comparisons.
//!
//! Feature files compare against literals such as `"True"`, so booleans are
//! rendered capitalised. The rendering is fixed here instead of relying on
//! any serializer's default.

use serde_json::Value;

/// Render a JSON value the way step text spells it.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Null => "None".to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        // Compact JSON; serializing a Value cannot fail.
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn booleans_are_capitalised() {
        assert_eq!(display_value(&json!(true)), "True");
        assert_eq!(display_value(&json!(false)), "False");
    }

    #[test]
    fn strings_lose_their_quotes() {
        assert_eq!(display_value(&json!("True")), "True");
        assert_eq!(display_value(&json!("")), "");
    }

    #[test]
    fn scalars_and_containers() {
        assert_eq!(display_value(&Value::Null), "None");
        assert_eq!(display_value(&json!(30)), "30");
        assert_eq!(display_value(&json!(2.5)), "2.5");
        assert_eq!(display_value(&json!([1, "a"])), r#"[1,"a"]"#);
    }
}
