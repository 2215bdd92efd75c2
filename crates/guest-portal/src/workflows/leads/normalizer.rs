use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::{Map, Value};

use super::domain::{
    LeadStatus, NormalizedGuestRecord, Sale, Solution, CUST_NAME, CUST_PHONE, CUST_PHONE_DIGITS,
    QUALIFYING_FIELDS, SOLUTION_TEXT,
};
use super::presence::has_val;

const LEGACY_NAME: &str = "guestName";
const LEGACY_PHONE: &str = "guestPhone";
const PREFILLED_STEP1: &str = "prefilledStep1";

/// Top-level keys mapped onto typed fields; everything else lands in `extras`.
const CONSUMED_KEYS: [&str; 14] = [
    CUST_NAME,
    CUST_PHONE,
    CUST_PHONE_DIGITS,
    LEGACY_NAME,
    LEGACY_PHONE,
    PREFILLED_STEP1,
    "evaluate",
    "solution",
    SOLUTION_TEXT,
    "status",
    "sale",
    "submittedAt",
    "updatedAt",
    "userUid",
];

/// Derived output; never read back as input.
const COMPLETION_KEY: &str = "completion";

/// Map any historical guest record shape onto [`NormalizedGuestRecord`].
///
/// Anything that is not a JSON object (including `null` for a missing record) yields an
/// all-empty record. The caller's value is only borrowed. An explicit boolean
/// `prefilledStep1` is kept as stored; otherwise it is derived from the contact fields.
pub fn normalize(raw: &Value) -> NormalizedGuestRecord {
    let empty = Map::new();
    let source = raw.as_object().unwrap_or(&empty);

    let cust_name = first_text(source, &[CUST_NAME, LEGACY_NAME]);
    let cust_phone = first_text(source, &[CUST_PHONE, LEGACY_PHONE]);
    let cust_phone_digits = cust_phone
        .as_deref()
        .map(phone_digits)
        .unwrap_or_default();

    let prefilled_step1 = match source.get(PREFILLED_STEP1) {
        Some(Value::Bool(asserted)) => *asserted,
        _ => cust_name.is_some() || cust_phone.is_some(),
    };

    let mut evaluate = source
        .get("evaluate")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    for key in QUALIFYING_FIELDS {
        if has_val(evaluate.get(key)) {
            continue;
        }
        if let Some(legacy) = source.get(key).filter(|value| has_val(Some(*value))) {
            evaluate.insert(key.to_string(), legacy.clone());
        }
    }

    let extras = source
        .iter()
        .filter(|(key, _)| {
            !CONSUMED_KEYS.contains(&key.as_str())
                && !QUALIFYING_FIELDS.contains(&key.as_str())
                && key.as_str() != COMPLETION_KEY
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    NormalizedGuestRecord {
        cust_name,
        cust_phone,
        cust_phone_digits,
        prefilled_step1,
        evaluate,
        solution: solution_from(source),
        status: source
            .get("status")
            .and_then(Value::as_str)
            .and_then(LeadStatus::parse),
        sale: source.get("sale").and_then(sale_from),
        submitted_at: parse_timestamp(source.get("submittedAt")),
        updated_at: parse_timestamp(source.get("updatedAt")),
        user_uid: scalar_text(source.get("userUid")),
        extras,
    }
}

/// Digit-only form of a phone number, used for duplicate matching.
pub fn phone_digits(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

/// First key in `keys` carrying an answered value wins.
fn first_text(source: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| scalar_text(source.get(*key)))
}

fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn solution_from(source: &Map<String, Value>) -> Solution {
    let mut solution = match source.get("solution") {
        Some(Value::Object(map)) => {
            let extras = map
                .iter()
                .filter(|(key, _)| key.as_str() != "text" && key.as_str() != "completedAt")
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            Solution {
                text: map.get("text").and_then(Value::as_str).map(str::to_string),
                completed_at: parse_timestamp(map.get("completedAt")),
                extras,
            }
        }
        Some(Value::String(text)) => Solution {
            text: Some(text.clone()),
            ..Solution::default()
        },
        _ => Solution::default(),
    };

    let has_text = solution
        .text
        .as_deref()
        .map(|text| !text.trim().is_empty())
        .unwrap_or(false);
    if !has_text {
        if let Some(text) = source.get(SOLUTION_TEXT).and_then(Value::as_str) {
            solution.text = Some(text.to_string());
        }
    }

    solution
}

fn sale_from(value: &Value) -> Option<Sale> {
    let map = value.as_object()?;
    let units = match map.get("units") {
        Some(Value::Number(number)) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(Value::String(text)) => text.trim().parse().ok(),
        _ => None,
    };

    let sale = Sale {
        sale_id: scalar_text(map.get("saleId")),
        sold_at: parse_timestamp(map.get("soldAt")),
        store_number: scalar_text(map.get("storeNumber")),
        units,
    };

    if sale.is_empty() {
        None
    } else {
        Some(sale)
    }
}

/// Accepts epoch milliseconds (server timestamps), RFC 3339, or `YYYY-MM-DD`.
pub(crate) fn parse_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::Number(number) => {
            let millis = number.as_i64().or_else(|| number.as_f64().map(|f| f as i64))?;
            Utc.timestamp_millis_opt(millis).single()
        }
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return None;
            }

            if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
                return Some(dt.with_timezone(&Utc));
            }

            if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
                return date
                    .and_hms_opt(0, 0, 0)
                    .map(|naive| Utc.from_utc_datetime(&naive));
            }

            trimmed
                .parse::<i64>()
                .ok()
                .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn phone_digits_strip_formatting() {
        let record = normalize(&json!({ "custPhone": "(555) 123-4567" }));
        assert_eq!(record.cust_phone_digits, "5551234567");
        assert_eq!(record.cust_phone.as_deref(), Some("(555) 123-4567"));
    }

    #[test]
    fn numeric_phone_is_stringified() {
        let record = normalize(&json!({ "guestPhone": 5551234567u64 }));
        assert_eq!(record.cust_phone.as_deref(), Some("5551234567"));
        assert_eq!(record.cust_phone_digits, "5551234567");
    }

    #[test]
    fn legacy_contact_keys_are_resolved() {
        let record = normalize(&json!({ "guestName": "Jane Doe", "guestPhone": "555-0100" }));
        assert_eq!(record.cust_name.as_deref(), Some("Jane Doe"));
        assert_eq!(record.cust_phone.as_deref(), Some("555-0100"));
        assert!(record.extras.is_empty());
    }

    #[test]
    fn canonical_contact_keys_win_over_legacy() {
        let record = normalize(&json!({
            "custName": "Jane Doe",
            "guestName": "J. Doe",
            "custPhone": "",
            "guestPhone": "555-0100",
        }));
        assert_eq!(record.cust_name.as_deref(), Some("Jane Doe"));
        assert_eq!(record.cust_phone.as_deref(), Some("555-0100"));
    }

    #[test]
    fn non_object_input_becomes_empty_record() {
        for raw in [Value::Null, json!("guest"), json!([1, 2])] {
            let record = normalize(&raw);
            assert!(record.evaluate.is_empty());
            assert_eq!(record.solution, Solution::default());
            assert!(record.status.is_none());
            assert!(!record.prefilled_step1);
            assert_eq!(record.cust_phone_digits, "");
        }
    }

    #[test]
    fn top_level_answers_migrate_into_evaluate() {
        let record = normalize(&json!({
            "currentCarrier": "T-Mobile",
            "numLines": 3,
            "evaluate": { "numLines": 4, "petName": "Rex" },
        }));
        assert_eq!(record.evaluate.get("currentCarrier"), Some(&json!("T-Mobile")));
        assert_eq!(record.evaluate.get("numLines"), Some(&json!(4)));
        assert_eq!(record.evaluate.get("petName"), Some(&json!("Rex")));
        assert!(!record.extras.contains_key("currentCarrier"));
    }

    #[test]
    fn blank_nested_answer_is_replaced_by_legacy_value() {
        let record = normalize(&json!({
            "billPain": "roaming charges",
            "evaluate": { "billPain": "  " },
        }));
        assert_eq!(record.evaluate.get("billPain"), Some(&json!("roaming charges")));
    }

    #[test]
    fn input_is_not_mutated() {
        let raw = json!({ "guestName": "Jane", "currentCarrier": "AT&T" });
        let before = raw.clone();
        let _ = normalize(&raw);
        assert_eq!(raw, before);
    }

    #[test]
    fn prefilled_flag_respects_raw_assertion() {
        assert!(normalize(&json!({ "prefilledStep1": true })).prefilled_step1);
        assert!(normalize(&json!({ "custName": "Jane" })).prefilled_step1);
        assert!(!normalize(&json!({ "custName": "   " })).prefilled_step1);
        assert!(
            !normalize(&json!({ "prefilledStep1": false, "custName": "Jane" })).prefilled_step1
        );
        assert!(normalize(&json!({ "prefilledStep1": "yes", "custName": "Jane" })).prefilled_step1);
    }

    #[test]
    fn solution_accepts_legacy_shapes() {
        let bare = normalize(&json!({ "solution": "Switch to unlimited" }));
        assert_eq!(bare.solution.text.as_deref(), Some("Switch to unlimited"));

        let top_level = normalize(&json!({ "solutionText": "Add a tablet line" }));
        assert_eq!(top_level.solution.text.as_deref(), Some("Add a tablet line"));

        let nested = normalize(&json!({
            "solution": { "text": "Port in", "completedAt": 1_700_000_000_000i64, "plan": "Go5G" },
        }));
        assert_eq!(nested.solution.text.as_deref(), Some("Port in"));
        assert!(nested.solution.completed_at.is_some());
        assert_eq!(nested.solution.extras.get("plan"), Some(&json!("Go5G")));
    }

    #[test]
    fn status_is_lowercased_and_kept_verbatim() {
        let record = normalize(&json!({ "status": "  SOLD " }));
        assert_eq!(record.status, Some(LeadStatus::Sold));

        let record = normalize(&json!({ "status": "On-Hold" }));
        assert_eq!(record.status, Some(LeadStatus::Other("on-hold".to_string())));

        assert!(normalize(&json!({ "status": "" })).status.is_none());
    }

    #[test]
    fn sale_fields_are_read_permissively() {
        let record = normalize(&json!({
            "sale": { "saleId": 991, "storeNumber": "0412", "units": "2", "soldAt": "2025-10-01" },
        }));
        let sale = record.sale.expect("sale parsed");
        assert_eq!(sale.sale_id.as_deref(), Some("991"));
        assert_eq!(sale.store_number.as_deref(), Some("0412"));
        assert_eq!(sale.units, Some(2));
        assert!(sale.sold_at.is_some());

        assert!(normalize(&json!({ "sale": {} })).sale.is_none());
    }

    #[test]
    fn timestamps_accept_millis_and_strings() {
        let millis = parse_timestamp(Some(&json!(1_727_740_800_000i64))).expect("millis");
        let rfc = parse_timestamp(Some(&json!("2024-10-01T00:00:00Z"))).expect("rfc3339");
        let date = parse_timestamp(Some(&json!("2024-10-01"))).expect("date");
        assert_eq!(millis, rfc);
        assert_eq!(rfc, date);
        assert!(parse_timestamp(Some(&json!("soon"))).is_none());
        assert!(parse_timestamp(Some(&json!(true))).is_none());
    }

    #[test]
    fn derived_completion_is_dropped() {
        let record = normalize(&json!({ "completion": { "percentFull": 80 }, "source": "kiosk" }));
        assert!(!record.extras.contains_key("completion"));
        assert_eq!(record.extras.get("source"), Some(&json!("kiosk")));
    }
}
