//! Integration specifications for the lead pipeline.
//!
//! Scenarios walk a guest record through its lifecycle using only the public engine and
//! service facade, backed by the in-memory record store.

mod common {
    use std::collections::HashMap;
    use std::sync::Arc;

    use guest_portal::workflows::leads::{
        Identity, IdentityError, IdentityProvider, LeadPipelineService, MemoryRecordStore,
        PermissionRules, PitchConfig, Role,
    };

    pub(super) struct TokenTable(HashMap<&'static str, Identity>);

    impl IdentityProvider for TokenTable {
        fn resolve(&self, token: &str) -> Result<Identity, IdentityError> {
            self.0.get(token).cloned().ok_or(IdentityError::Rejected)
        }
    }

    pub(super) fn associate() -> Identity {
        Identity::new("uid-rep", Role::Me)
    }

    pub(super) fn service() -> (
        Arc<MemoryRecordStore>,
        LeadPipelineService<MemoryRecordStore, TokenTable>,
    ) {
        let mut tokens = HashMap::new();
        tokens.insert("rep", associate());
        tokens.insert("admin", Identity::new("uid-admin", Role::Admin));

        let store = Arc::new(MemoryRecordStore::new());
        let service = LeadPipelineService::new(
            store.clone(),
            Arc::new(TokenTable(tokens)),
            PitchConfig::canonical(),
            PermissionRules::standard(),
        );
        (store, service)
    }
}

use common::*;
use guest_portal::workflows::leads::{
    detect_status, normalize, FieldSpec, LeadStatus, PitchConfig, PitchEngine, RecordStore, Sale,
    Step, QUALIFYING_FIELDS,
};
use serde_json::json;

#[test]
fn documented_scenarios_hold() {
    let engine = PitchEngine::default();

    let empty = normalize(&json!({}));
    assert_eq!(detect_status(&empty, QUALIFYING_FIELDS), LeadStatus::New);
    assert_eq!(engine.compute_pitch(&empty).percent_full, 0);

    let contact_only = PitchEngine::new(
        PitchConfig::from_fields([
            FieldSpec::new("custName", 8, Step::Step1),
            FieldSpec::new("custPhone", 7, Step::Step1),
        ])
        .expect("valid table"),
    );
    let jane = normalize(&json!({ "custName": "Jane Doe" }));
    assert_eq!(contact_only.compute_pitch(&jane).percent_full, 53);

    let carrier = normalize(&json!({ "evaluate": { "currentCarrier": "Verizon" } }));
    assert_eq!(engine.detect_status(&carrier), LeadStatus::Working);

    let proposal = normalize(&json!({ "solution": { "text": "Switch to unlimited plan" } }));
    assert_eq!(engine.detect_status(&proposal), LeadStatus::Proposal);

    let sold = normalize(&json!({ "status": "sold", "sale": { "units": 2 } }));
    assert_eq!(engine.detect_status(&sold), LeadStatus::Sold);
    assert_eq!(engine.compute_pitch(&sold).percent_full, 0);

    let phone = normalize(&json!({ "custPhone": "(555) 123-4567" }));
    assert_eq!(phone.cust_phone_digits, "5551234567");
}

#[test]
fn stage_scoped_and_full_percentages_are_reported_separately() {
    let engine = PitchEngine::default();
    let record = normalize(&json!({
        "custName": "Jane Doe",
        "custPhone": "555-0100",
    }));
    let status = engine.detect_status(&record);

    assert_eq!(engine.compute_pitch(&record).percent_full, 15);
    assert_eq!(engine.compute_pitch_stage(&record, &status).percent, 100);
}

#[test]
fn lead_lifecycle_updates_persisted_completion() {
    let (store, service) = service();
    let rep = service
        .authenticate(Some("rep"))
        .expect("token resolves");

    let lead = service
        .submit(&rep, json!({ "guestName": "Ana Ruiz", "guestPhone": "515-555-0142" }))
        .expect("submit succeeds");
    assert_eq!(lead.assessment.status, LeadStatus::New);
    let watch = service.watch(&lead.id).expect("watch succeeds");

    let evaluate_path = format!("{}/evaluate", lead.id.record_path());
    store
        .set(
            &evaluate_path,
            json!({ "currentCarrier": "AT&T", "numLines": 3, "dataNeed": "unlimited" }),
        )
        .expect("associate edits answers");
    let completion = store
        .get(&lead.id.completion_path())
        .expect("get")
        .expect("completion present");
    assert_eq!(completion["status"], json!("working"));
    assert_eq!(completion["percentFull"], json!(45));

    store
        .set(
            &format!("{}/solution", lead.id.record_path()),
            json!({ "text": "Three lines on unlimited, keep the phones" }),
        )
        .expect("associate proposes");
    let completion = store
        .get(&lead.id.completion_path())
        .expect("get")
        .expect("completion present");
    assert_eq!(completion["status"], json!("proposal"));
    assert_eq!(completion["percentFull"], json!(60));

    let sold = service
        .record_sale(
            &rep,
            &lead.id,
            Sale {
                sale_id: Some("S-2002".to_string()),
                units: Some(3),
                ..Sale::default()
            },
        )
        .expect("sale recorded");
    assert_eq!(sold.assessment.status, LeadStatus::Sold);
    assert!(!sold.assessment.record.sold_without_sale());

    service.unwatch(watch).expect("unwatch succeeds");

    let admin = service
        .authenticate(Some("admin"))
        .expect("token resolves");
    let listing = service.list(&admin).expect("list succeeds");
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].status, LeadStatus::Sold);
    assert_eq!(listing[0].cust_name.as_deref(), Some("Ana Ruiz"));
}
