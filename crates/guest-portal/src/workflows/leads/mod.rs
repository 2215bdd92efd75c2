//! Lead progression and pitch scoring for Guest Portal intake records.
//!
//! Raw records flow through [`normalize`], then [`detect_status`] and the weighted
//! scorer in [`PitchEngine`]. The service persists the resulting completion next to the
//! record and keeps it current as the store reports changes.

pub mod accessor;
pub mod domain;
pub mod identity;
pub mod normalizer;
pub mod permissions;
pub mod presence;
pub mod router;
pub mod scoring;
pub mod service;
pub mod status;
pub mod store;

#[cfg(test)]
mod tests;

pub use accessor::get_field;
pub use domain::{
    LeadId, LeadStatus, NormalizedGuestRecord, Sale, Solution, Step, GUESTS_COLLECTION,
    QUALIFYING_FIELDS,
};
pub use identity::{Identity, IdentityError, IdentityProvider, Role};
pub use normalizer::{normalize, phone_digits};
pub use permissions::{Capabilities, PermissionRules};
pub use presence::has_val;
pub use router::lead_router;
pub use scoring::{
    Completion, FieldCheck, FieldSpec, LeadAssessment, PitchConfig, PitchConfigError,
    PitchEngine, PitchScore, StageScore, StepTally,
};
pub use service::{LeadPipelineService, LeadRecord, LeadServiceError, LeadSummary};
pub use status::detect_status;
pub use store::{ChangeCallback, MemoryRecordStore, RecordStore, StoreError, SubscriptionId};
