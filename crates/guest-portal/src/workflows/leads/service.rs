use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::domain::{LeadId, LeadStatus, Sale, GUESTS_COLLECTION};
use super::identity::{Identity, IdentityError, IdentityProvider};
use super::normalizer::normalize;
use super::permissions::PermissionRules;
use super::scoring::{LeadAssessment, PitchConfig, PitchEngine};
use super::store::{RecordStore, StoreError, SubscriptionId};

/// Drives the pitch engine against a record store: persistence, permissions, and
/// completion write-back.
pub struct LeadPipelineService<S, I> {
    store: Arc<S>,
    identities: Arc<I>,
    engine: Arc<PitchEngine>,
    rules: Arc<PermissionRules>,
}

/// A stored lead together with what the engine derived from it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadRecord {
    pub id: LeadId,
    #[serde(flatten)]
    pub assessment: LeadAssessment,
}

/// Compact row for lead listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadSummary {
    pub id: LeadId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cust_name: Option<String>,
    pub status: LeadStatus,
    pub percent_full: u8,
    pub percent_stage: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl<S, I> LeadPipelineService<S, I>
where
    S: RecordStore + 'static,
    I: IdentityProvider + 'static,
{
    pub fn new(
        store: Arc<S>,
        identities: Arc<I>,
        config: PitchConfig,
        rules: PermissionRules,
    ) -> Self {
        for key in config.unknown_fields() {
            warn!(field = key, "weighted field is not a known guest record field");
        }

        Self {
            store,
            identities,
            engine: Arc::new(PitchEngine::new(config)),
            rules: Arc::new(rules),
        }
    }

    pub fn engine(&self) -> &PitchEngine {
        &self.engine
    }

    pub fn rules(&self) -> &PermissionRules {
        &self.rules
    }

    /// Resolve a bearer token; a missing token is rejected before reaching the provider.
    pub fn authenticate(&self, token: Option<&str>) -> Result<Identity, LeadServiceError> {
        let token = token
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(IdentityError::Missing)?;
        Ok(self.identities.resolve(token)?)
    }

    /// Pure assessment of a raw record; nothing is read or written.
    pub fn assess(&self, raw: &Value) -> LeadAssessment {
        self.engine.assess(raw)
    }

    /// Store a new lead owned by the caller and persist its completion.
    pub fn submit(&self, identity: &Identity, raw: Value) -> Result<LeadRecord, LeadServiceError> {
        let mut fields = into_object(raw)?;
        let now = now_millis();
        fields.remove(COMPLETION_KEY);
        fields.insert("userUid".to_string(), Value::String(identity.uid.clone()));
        fields.insert("submittedAt".to_string(), Value::from(now));
        fields.insert("updatedAt".to_string(), Value::from(now));

        let raw = Value::Object(fields);
        let key = self.store.push(GUESTS_COLLECTION, raw.clone())?;
        let id = LeadId(key);
        let assessment = sync_completion(&*self.store, &self.engine, &id, &raw)?;

        info!(
            lead = %id,
            uid = %identity.uid,
            status = %assessment.status,
            percent_full = assessment.pitch.percent_full,
            "lead submitted"
        );
        Ok(LeadRecord { id, assessment })
    }

    pub fn get(&self, identity: &Identity, id: &LeadId) -> Result<LeadRecord, LeadServiceError> {
        let raw = self.fetch(id)?;
        let owner = owner_of(&raw);
        if !self.rules.can_view(identity, owner) {
            return Err(forbidden(identity, "view", id));
        }

        let assessment = self.engine.assess(&raw);
        Ok(LeadRecord {
            id: id.clone(),
            assessment,
        })
    }

    /// Replace a lead's fields. Ownership and submission time are kept from the stored copy.
    ///
    /// A `sold` record must carry a sale: one omitted by the caller is taken from the stored
    /// copy, and a sold lead with no sale anywhere is rejected.
    pub fn save(
        &self,
        identity: &Identity,
        id: &LeadId,
        raw: Value,
    ) -> Result<LeadRecord, LeadServiceError> {
        let existing = self.fetch(id)?;
        let owner = owner_of(&existing);
        if !self.rules.can_edit(identity, owner) {
            return Err(forbidden(identity, "edit", id));
        }

        let mut fields = into_object(raw)?;
        fields.remove(COMPLETION_KEY);
        for key in ["userUid", "submittedAt"] {
            match existing.get(key) {
                Some(value) => {
                    fields.insert(key.to_string(), value.clone());
                }
                None => {
                    fields.remove(key);
                }
            }
        }
        fields.insert("updatedAt".to_string(), Value::from(now_millis()));

        let mut raw = Value::Object(fields);
        if normalize(&raw).sold_without_sale() {
            let stored_sale = existing.get("sale").filter(|_| normalize(&existing).sale.is_some());
            match (stored_sale, raw.as_object_mut()) {
                (Some(sale), Some(fields)) => {
                    debug!(lead = %id, "keeping stored sale on sold lead");
                    fields.insert("sale".to_string(), sale.clone());
                }
                _ => return Err(LeadServiceError::SoldWithoutSale(id.clone())),
            }
        }

        self.store.set(&id.record_path(), raw.clone())?;
        let assessment = sync_completion(&*self.store, &self.engine, id, &raw)?;

        debug!(lead = %id, status = %assessment.status, "lead saved");
        Ok(LeadRecord {
            id: id.clone(),
            assessment,
        })
    }

    /// Attach a sale and move the lead to `sold`.
    pub fn record_sale(
        &self,
        identity: &Identity,
        id: &LeadId,
        mut sale: Sale,
    ) -> Result<LeadRecord, LeadServiceError> {
        if sale.is_empty() {
            return Err(LeadServiceError::EmptySale);
        }

        let existing = self.fetch(id)?;
        let owner = owner_of(&existing);
        if !self.rules.can_record_sale(identity, owner) {
            return Err(forbidden(identity, "record a sale on", id));
        }

        if sale.sold_at.is_none() {
            sale.sold_at = Some(Utc::now());
        }

        let mut fields = into_object(existing)?;
        fields.remove(COMPLETION_KEY);
        fields.insert("sale".to_string(), serde_json::to_value(&sale)?);
        fields.insert("status".to_string(), Value::String("sold".to_string()));
        fields.insert("updatedAt".to_string(), Value::from(now_millis()));

        let raw = Value::Object(fields);
        self.store.set(&id.record_path(), raw.clone())?;
        let assessment = sync_completion(&*self.store, &self.engine, id, &raw)?;

        info!(lead = %id, uid = %identity.uid, units = ?sale.units, "sale recorded");
        Ok(LeadRecord {
            id: id.clone(),
            assessment,
        })
    }

    /// Leads the caller may see, most recently updated first.
    pub fn list(&self, identity: &Identity) -> Result<Vec<LeadSummary>, LeadServiceError> {
        let Some(Value::Object(guests)) = self.store.get(GUESTS_COLLECTION)? else {
            return Ok(Vec::new());
        };

        let mut summaries: Vec<LeadSummary> = guests
            .into_iter()
            .filter(|(_, raw)| {
                let owner = owner_of(raw);
                self.rules.can_view(identity, owner)
            })
            .map(|(key, raw)| {
                let assessment = self.engine.assess(&raw);
                LeadSummary {
                    id: LeadId(key),
                    cust_name: assessment.record.cust_name.clone(),
                    status: assessment.status.clone(),
                    percent_full: assessment.pitch.percent_full,
                    percent_stage: assessment.stage.percent,
                    user_uid: assessment.record.user_uid.clone(),
                    updated_at: assessment.record.updated_at,
                }
            })
            .collect();

        summaries.sort_by(|left, right| {
            right
                .updated_at
                .cmp(&left.updated_at)
                .then_with(|| left.id.cmp(&right.id))
        });
        Ok(summaries)
    }

    /// Recompute and persist a stored lead's completion.
    pub fn refresh(&self, id: &LeadId) -> Result<LeadAssessment, LeadServiceError> {
        let raw = self.fetch(id)?;
        sync_completion(&*self.store, &self.engine, id, &raw)
    }

    /// Keep a lead's completion current as the store reports changes.
    pub fn watch(&self, id: &LeadId) -> Result<SubscriptionId, LeadServiceError> {
        let store = Arc::clone(&self.store);
        let engine = Arc::clone(&self.engine);
        let lead = id.clone();

        let subscription = self.store.on_change(
            &id.record_path(),
            Arc::new(move |value: Option<Value>| {
                let Some(raw) = value else {
                    return;
                };
                if let Err(error) = sync_completion(&*store, &engine, &lead, &raw) {
                    warn!(lead = %lead, %error, "failed to refresh completion");
                }
            }),
        )?;

        debug!(lead = %id, subscription = subscription.0, "watching lead");
        Ok(subscription)
    }

    pub fn unwatch(&self, subscription: SubscriptionId) -> Result<(), LeadServiceError> {
        Ok(self.store.off(subscription)?)
    }

    fn fetch(&self, id: &LeadId) -> Result<Value, LeadServiceError> {
        self.store
            .get(&id.record_path())?
            .ok_or_else(|| LeadServiceError::NotFound(id.clone()))
    }
}

const COMPLETION_KEY: &str = "completion";

/// Assess `raw` and write its completion back unless the stored one already matches.
///
/// Skipping identical writes keeps watchers from re-triggering themselves.
fn sync_completion<S: RecordStore + ?Sized>(
    store: &S,
    engine: &PitchEngine,
    id: &LeadId,
    raw: &Value,
) -> Result<LeadAssessment, LeadServiceError> {
    let assessment = engine.assess(raw);
    let completion = serde_json::to_value(assessment.completion())?;

    if raw.get(COMPLETION_KEY) != Some(&completion) {
        store.set(&id.completion_path(), completion)?;
        debug!(
            lead = %id,
            percent_full = assessment.pitch.percent_full,
            percent_stage = assessment.stage.percent,
            "completion written"
        );
    }

    Ok(assessment)
}

fn into_object(raw: Value) -> Result<Map<String, Value>, LeadServiceError> {
    match raw {
        Value::Object(fields) => Ok(fields),
        _ => Err(LeadServiceError::InvalidRecord),
    }
}

fn owner_of(raw: &Value) -> Option<&str> {
    raw.get("userUid").and_then(Value::as_str)
}

fn forbidden(identity: &Identity, action: &'static str, id: &LeadId) -> LeadServiceError {
    LeadServiceError::Forbidden {
        uid: identity.uid.clone(),
        action,
        lead: id.clone(),
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Error raised by the lead pipeline service.
#[derive(Debug, thiserror::Error)]
pub enum LeadServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error("lead {0} not found")]
    NotFound(LeadId),
    #[error("{uid} may not {action} lead {lead}")]
    Forbidden {
        uid: String,
        action: &'static str,
        lead: LeadId,
    },
    #[error("guest record must be a JSON object")]
    InvalidRecord,
    #[error("sale details are empty")]
    EmptySale,
    #[error("lead {0} is marked sold without a sale")]
    SoldWithoutSale(LeadId),
    #[error("failed to encode completion: {0}")]
    Encode(#[from] serde_json::Error),
}
