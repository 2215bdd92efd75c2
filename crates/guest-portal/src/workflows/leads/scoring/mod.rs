mod config;
mod rules;

pub use config::{FieldSpec, PitchConfig, PitchConfigError};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::{LeadStatus, NormalizedGuestRecord, Step};
use super::normalizer::normalize;
use super::status::detect_status;

/// Stateless scorer that applies one weight table to guest records.
#[derive(Debug, Clone, Default)]
pub struct PitchEngine {
    config: PitchConfig,
}

impl PitchEngine {
    pub fn new(config: PitchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PitchConfig {
        &self.config
    }

    /// Stage inference against the fixed qualifying questions, whatever their weights.
    pub fn detect_status(&self, record: &NormalizedGuestRecord) -> LeadStatus {
        detect_status(record, self.config.qualifying_keys())
    }

    /// Completion of the whole pitch, across every weighted field.
    pub fn compute_pitch(&self, record: &NormalizedGuestRecord) -> PitchScore {
        rules::compute_pitch(record, &self.config)
    }

    /// Completion of only the steps the given stage has reached.
    pub fn compute_pitch_stage(
        &self,
        record: &NormalizedGuestRecord,
        status: &LeadStatus,
    ) -> StageScore {
        let pitch = self.compute_pitch(record);
        rules::compute_pitch_stage(&pitch, status)
    }

    /// normalize → detect status → score, the canonical entry point for raw records.
    pub fn assess(&self, raw: &Value) -> LeadAssessment {
        let record = normalize(raw);
        let status = self.detect_status(&record);
        let pitch = self.compute_pitch(&record);
        let stage = rules::compute_pitch_stage(&pitch, &status);

        LeadAssessment {
            record,
            status,
            pitch,
            stage,
        }
    }
}

/// Earned versus available weight for a step or a whole table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepTally {
    pub earned: u64,
    pub max: u64,
}

/// Per-field result for UI display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCheck {
    pub ok: bool,
    pub weight: u64,
}

/// Whole-pitch completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PitchScore {
    pub percent_full: u8,
    pub earned: u64,
    pub max: u64,
    pub per_step: BTreeMap<Step, StepTally>,
    pub fields: BTreeMap<String, FieldCheck>,
}

/// Completion of the steps implied by a lead's stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageScore {
    pub status: LeadStatus,
    pub steps: Vec<Step>,
    pub earned: u64,
    pub max: u64,
    pub percent: u8,
}

/// Everything the engine derives from one raw record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadAssessment {
    pub record: NormalizedGuestRecord,
    pub status: LeadStatus,
    pub pitch: PitchScore,
    pub stage: StageScore,
}

impl LeadAssessment {
    /// The sub-object persisted at `<record path>/completion`.
    pub fn completion(&self) -> Completion {
        Completion {
            status: self.status.clone(),
            percent_full: self.pitch.percent_full,
            percent_stage: self.stage.percent,
            per_step: self.pitch.per_step.clone(),
            fields: self.pitch.fields.clone(),
        }
    }
}

/// Persisted completion summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    pub status: LeadStatus,
    pub percent_full: u8,
    pub percent_stage: u8,
    pub per_step: BTreeMap<Step, StepTally>,
    pub fields: BTreeMap<String, FieldCheck>,
}
