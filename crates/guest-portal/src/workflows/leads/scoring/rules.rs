use std::collections::BTreeMap;

use super::super::accessor::get_field;
use super::super::domain::{LeadStatus, NormalizedGuestRecord, Step};
use super::super::presence::has_val;
use super::config::PitchConfig;
use super::{FieldCheck, PitchScore, StageScore, StepTally};

pub(crate) fn compute_pitch(record: &NormalizedGuestRecord, config: &PitchConfig) -> PitchScore {
    let mut per_step: BTreeMap<Step, StepTally> = Step::ORDERED
        .iter()
        .map(|step| (*step, StepTally::default()))
        .collect();
    let mut fields = BTreeMap::new();
    let mut full = StepTally::default();

    for (key, weight) in config.weights() {
        let weight = u64::from(*weight);
        let ok = has_val(get_field(record, key).as_ref());

        let tally = per_step.entry(config.step_for(key)).or_default();
        tally.max += weight;
        full.max += weight;
        if ok {
            tally.earned += weight;
            full.earned += weight;
        }

        fields.insert(key.clone(), FieldCheck { ok, weight });
    }

    PitchScore {
        percent_full: percent(full.earned, full.max),
        earned: full.earned,
        max: full.max,
        per_step,
        fields,
    }
}

pub(crate) fn compute_pitch_stage(pitch: &PitchScore, status: &LeadStatus) -> StageScore {
    let steps = status.scoped_steps().to_vec();
    let mut scoped = StepTally::default();
    for step in &steps {
        if let Some(tally) = pitch.per_step.get(step) {
            scoped.earned += tally.earned;
            scoped.max += tally.max;
        }
    }

    StageScore {
        status: status.clone(),
        steps,
        earned: scoped.earned,
        max: scoped.max,
        percent: percent(scoped.earned, scoped.max),
    }
}

/// Round-half-up percentage, 0 for an empty table, never above 100.
pub(crate) fn percent(earned: u64, max: u64) -> u8 {
    if max == 0 {
        return 0;
    }

    let rounded = (earned.saturating_mul(200) + max) / (max * 2);
    rounded.min(100) as u8
}
