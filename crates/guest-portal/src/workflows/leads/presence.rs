use serde_json::Value;

/// Whether an intake value counts as "answered".
///
/// Numbers always count, zero and negatives included. A `false` checkbox does not.
pub fn has_val(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(text)) => !text.trim().is_empty(),
        Some(Value::Number(_)) => true,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_and_null_are_unanswered() {
        assert!(!has_val(None));
        assert!(!has_val(Some(&Value::Null)));
    }

    #[test]
    fn strings_need_visible_characters() {
        assert!(!has_val(Some(&json!(""))));
        assert!(!has_val(Some(&json!("   \t\n"))));
        assert!(has_val(Some(&json!(" Verizon "))));
    }

    #[test]
    fn any_number_counts_as_answered() {
        assert!(has_val(Some(&json!(0))));
        assert!(has_val(Some(&json!(-3))));
        assert!(has_val(Some(&json!(2.5))));
    }

    #[test]
    fn only_true_booleans_count() {
        assert!(has_val(Some(&json!(true))));
        assert!(!has_val(Some(&json!(false))));
    }

    #[test]
    fn collections_need_content() {
        assert!(!has_val(Some(&json!([]))));
        assert!(has_val(Some(&json!(["unlimited"]))));
        assert!(!has_val(Some(&json!({}))));
        assert!(has_val(Some(&json!({ "plan": "unlimited" }))));
    }
}
