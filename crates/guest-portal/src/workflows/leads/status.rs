use serde_json::Value;

use super::accessor::get_field;
use super::domain::{LeadStatus, NormalizedGuestRecord};
use super::presence::has_val;

/// Infer the lifecycle stage of a normalized record. First match wins:
/// explicit status, solution text, any answered qualifying field, then `new`.
pub fn detect_status<'a, I>(record: &NormalizedGuestRecord, qualifying_keys: I) -> LeadStatus
where
    I: IntoIterator<Item = &'a str>,
{
    if let Some(status) = &record.status {
        return status.clone();
    }

    let solution_text = record.solution.text.clone().map(Value::String);
    if has_val(solution_text.as_ref()) {
        return LeadStatus::Proposal;
    }

    if qualifying_keys
        .into_iter()
        .any(|key| has_val(get_field(record, key).as_ref()))
    {
        return LeadStatus::Working;
    }

    LeadStatus::New
}
