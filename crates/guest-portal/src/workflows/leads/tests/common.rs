use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::workflows::leads::identity::{Identity, IdentityError, IdentityProvider, Role};
use crate::workflows::leads::store::{
    ChangeCallback, MemoryRecordStore, RecordStore, StoreError, SubscriptionId,
};
use crate::workflows::leads::{LeadPipelineService, PermissionRules, PitchConfig, PitchEngine};

pub(super) const ASSOCIATE_TOKEN: &str = "token-associate";
pub(super) const OTHER_ASSOCIATE_TOKEN: &str = "token-associate-2";
pub(super) const LEAD_TOKEN: &str = "token-lead";
pub(super) const DM_TOKEN: &str = "token-dm";

#[derive(Default)]
pub(super) struct StaticIdentities {
    tokens: HashMap<String, Identity>,
}

impl StaticIdentities {
    pub(super) fn standard() -> Self {
        let mut tokens = HashMap::new();
        tokens.insert(ASSOCIATE_TOKEN.to_string(), associate());
        tokens.insert(
            OTHER_ASSOCIATE_TOKEN.to_string(),
            Identity::new("uid-associate-2", Role::Me),
        );
        tokens.insert(LEAD_TOKEN.to_string(), Identity::new("uid-lead", Role::Lead));
        tokens.insert(DM_TOKEN.to_string(), Identity::new("uid-dm", Role::Dm));
        Self { tokens }
    }
}

impl IdentityProvider for StaticIdentities {
    fn resolve(&self, token: &str) -> Result<Identity, IdentityError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or(IdentityError::Rejected)
    }
}

/// Store whose every call fails, for error-path coverage.
pub(super) struct UnavailableStore;

impl RecordStore for UnavailableStore {
    fn get(&self, _path: &str) -> Result<Option<Value>, StoreError> {
        Err(StoreError::Unavailable("offline".to_string()))
    }

    fn set(&self, _path: &str, _value: Value) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("offline".to_string()))
    }

    fn push(&self, _path: &str, _value: Value) -> Result<String, StoreError> {
        Err(StoreError::Unavailable("offline".to_string()))
    }

    fn on_change(
        &self,
        _path: &str,
        _callback: ChangeCallback,
    ) -> Result<SubscriptionId, StoreError> {
        Err(StoreError::Unavailable("offline".to_string()))
    }

    fn off(&self, _id: SubscriptionId) -> Result<(), StoreError> {
        Ok(())
    }
}

pub(super) fn associate() -> Identity {
    Identity::new("uid-associate", Role::Me)
}

pub(super) fn engine() -> PitchEngine {
    PitchEngine::new(PitchConfig::canonical())
}

pub(super) fn memory_service() -> (
    Arc<MemoryRecordStore>,
    LeadPipelineService<MemoryRecordStore, StaticIdentities>,
) {
    let store = Arc::new(MemoryRecordStore::new());
    let service = LeadPipelineService::new(
        store.clone(),
        Arc::new(StaticIdentities::standard()),
        PitchConfig::canonical(),
        PermissionRules::standard(),
    );
    (store, service)
}

pub(super) fn unavailable_service() -> LeadPipelineService<UnavailableStore, StaticIdentities> {
    LeadPipelineService::new(
        Arc::new(UnavailableStore),
        Arc::new(StaticIdentities::standard()),
        PitchConfig::canonical(),
        PermissionRules::standard(),
    )
}

pub(super) fn intake_form() -> Value {
    json!({
        "custName": "Jane Doe",
        "custPhone": "(555) 123-4567",
    })
}

pub(super) fn qualified_guest() -> Value {
    json!({
        "custName": "Jane Doe",
        "custPhone": "(555) 123-4567",
        "evaluate": {
            "currentCarrier": "Verizon",
            "numLines": 4,
            "coverageZip": "50309",
            "deviceStatus": "paid off",
            "financePath": "lease",
            "billPain": "overages",
            "dataNeed": "unlimited",
            "hotspotNeed": true,
            "intlNeed": false,
        },
    })
}

pub(super) fn legacy_guest() -> Value {
    json!({
        "guestName": "Sam Lee",
        "guestPhone": "515.555.0199",
        "currentCarrier": "US Cellular",
        "numLines": "2",
        "solution": "Bring two lines over on the Go5G plan",
    })
}
