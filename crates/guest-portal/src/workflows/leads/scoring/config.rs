use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::super::domain::{
    Step, CUST_NAME, CUST_PHONE, CUST_PHONE_DIGITS, QUALIFYING_FIELDS, SOLUTION_COMPLETED_AT,
    SOLUTION_TEXT,
};

/// One weighted field and the step it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub key: String,
    pub weight: u32,
    #[serde(default = "default_step")]
    pub step: Step,
}

fn default_step() -> Step {
    Step::Step1
}

#[derive(Debug, Deserialize)]
struct PitchConfigDocument {
    fields: Vec<FieldSpec>,
}

/// Errors raised while building a weight table.
#[derive(Debug, thiserror::Error)]
pub enum PitchConfigError {
    #[error("field '{key}' is weighted more than once")]
    DuplicateField { key: String },
    #[error("field key must not be blank")]
    BlankField,
    #[error("failed to read weight table: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid weight table: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Field→weight and field→step tables for one engine instance.
///
/// A field belongs to exactly one step; fields absent from `steps` score under step 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PitchConfig {
    weights: BTreeMap<String, u32>,
    steps: BTreeMap<String, Step>,
}

impl PitchConfig {
    /// The canonical Guest Portal table. Weights total 100.
    pub fn canonical() -> Self {
        const STEP2_WEIGHTS: [u32; 9] = [12, 12, 8, 8, 8, 8, 6, 4, 4];

        let mut fields = vec![
            FieldSpec::new(CUST_NAME, 8, Step::Step1),
            FieldSpec::new(CUST_PHONE, 7, Step::Step1),
        ];
        fields.extend(
            QUALIFYING_FIELDS
                .iter()
                .zip(STEP2_WEIGHTS)
                .map(|(key, weight)| FieldSpec::new(*key, weight, Step::Step2)),
        );
        fields.push(FieldSpec::new(SOLUTION_TEXT, 15, Step::Step3));

        let mut weights = BTreeMap::new();
        let mut steps = BTreeMap::new();
        for field in fields {
            steps.insert(field.key.clone(), field.step);
            weights.insert(field.key, field.weight);
        }
        Self { weights, steps }
    }

    /// Build from raw tables. A key in `steps` without a weight is ignored.
    pub fn new(weights: BTreeMap<String, u32>, steps: BTreeMap<String, Step>) -> Self {
        let steps = steps
            .into_iter()
            .filter(|(key, _)| weights.contains_key(key))
            .collect();
        Self { weights, steps }
    }

    /// Build from a field list, rejecting a key listed twice.
    pub fn from_fields<I>(fields: I) -> Result<Self, PitchConfigError>
    where
        I: IntoIterator<Item = FieldSpec>,
    {
        let mut weights = BTreeMap::new();
        let mut steps = BTreeMap::new();

        for field in fields {
            let key = field.key.trim().to_string();
            if key.is_empty() {
                return Err(PitchConfigError::BlankField);
            }
            if weights.contains_key(&key) {
                return Err(PitchConfigError::DuplicateField { key });
            }
            steps.insert(key.clone(), field.step);
            weights.insert(key, field.weight);
        }

        Ok(Self { weights, steps })
    }

    /// Load a `{"fields": [{"key", "weight", "step"}]}` document.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, PitchConfigError> {
        let document: PitchConfigDocument = serde_json::from_reader(reader)?;
        Self::from_fields(document.fields)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, PitchConfigError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    pub fn weights(&self) -> &BTreeMap<String, u32> {
        &self.weights
    }

    pub fn step_for(&self, key: &str) -> Step {
        self.steps.get(key).copied().unwrap_or(Step::Step1)
    }

    pub fn total_weight(&self) -> u64 {
        self.weights.values().map(|weight| u64::from(*weight)).sum()
    }

    /// Questions whose answers move a lead to `working`: the fixed qualifying fields plus
    /// any extra step-2 field in this table. Independent of how the table weights them.
    pub fn qualifying_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = QUALIFYING_FIELDS.to_vec();
        keys.extend(
            self.weights
                .keys()
                .map(String::as_str)
                .filter(|key| !QUALIFYING_FIELDS.contains(key))
                .filter(|key| self.step_for(key) == Step::Step2),
        );
        keys
    }

    /// Weighted keys that are neither contact, solution, nor canonical qualifying fields.
    ///
    /// Such keys can still be answered through free-form `evaluate` entries, so they are
    /// only worth a warning.
    pub fn unknown_fields(&self) -> Vec<&str> {
        const KNOWN: [&str; 5] = [
            CUST_NAME,
            CUST_PHONE,
            CUST_PHONE_DIGITS,
            SOLUTION_TEXT,
            SOLUTION_COMPLETED_AT,
        ];

        self.weights
            .keys()
            .map(String::as_str)
            .filter(|key| !KNOWN.contains(key) && !QUALIFYING_FIELDS.contains(key))
            .collect()
    }
}

impl Default for PitchConfig {
    fn default() -> Self {
        Self::canonical()
    }
}

impl FieldSpec {
    pub fn new(key: impl Into<String>, weight: u32, step: Step) -> Self {
        Self {
            key: key.into(),
            weight,
            step,
        }
    }
}
