use serde_json::Value;

use super::domain::{
    NormalizedGuestRecord, CUST_NAME, CUST_PHONE, CUST_PHONE_DIGITS, SOLUTION_COMPLETED_AT,
    SOLUTION_TEXT,
};

/// Resolve a logical field key against a normalized record.
///
/// Contact and solution keys map onto their typed fields. Any other key is looked up in
/// `evaluate`, then among the solution's untyped keys, then among unrecognized top-level
/// keys. Unknown or unset keys resolve to `None`.
pub fn get_field(record: &NormalizedGuestRecord, key: &str) -> Option<Value> {
    match key {
        CUST_NAME => record.cust_name.clone().map(Value::String),
        CUST_PHONE => record.cust_phone.clone().map(Value::String),
        CUST_PHONE_DIGITS => Some(Value::String(record.cust_phone_digits.clone())),
        SOLUTION_TEXT => record.solution.text.clone().map(Value::String),
        SOLUTION_COMPLETED_AT => record
            .solution
            .completed_at
            .map(|at| Value::String(at.to_rfc3339())),
        _ => record
            .evaluate
            .get(key)
            .or_else(|| record.solution.extras.get(key))
            .or_else(|| record.extras.get(key))
            .cloned(),
    }
}
