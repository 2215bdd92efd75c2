use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const CUST_NAME: &str = "custName";
pub const CUST_PHONE: &str = "custPhone";
pub const CUST_PHONE_DIGITS: &str = "custPhoneDigits";
pub const SOLUTION_TEXT: &str = "solutionText";
pub const SOLUTION_COMPLETED_AT: &str = "solutionCompletedAt";

/// Qualifying questions asked during step 2 of the pitch.
pub const QUALIFYING_FIELDS: [&str; 9] = [
    "currentCarrier",
    "numLines",
    "coverageZip",
    "deviceStatus",
    "financePath",
    "billPain",
    "dataNeed",
    "hotspotNeed",
    "intlNeed",
];

/// Store key of a guest record under the `guests` collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeadId(pub String);

impl LeadId {
    pub fn record_path(&self) -> String {
        format!("{}/{}", GUESTS_COLLECTION, self.0)
    }

    pub fn completion_path(&self) -> String {
        format!("{}/{}/completion", GUESTS_COLLECTION, self.0)
    }
}

impl fmt::Display for LeadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub const GUESTS_COLLECTION: &str = "guests";

/// Coarse lifecycle position of a lead.
///
/// Explicit status strings are never validated, so anything outside the four canonical
/// stages survives as [`LeadStatus::Other`] in lower case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LeadStatus {
    New,
    Working,
    Proposal,
    Sold,
    Other(String),
}

impl LeadStatus {
    /// Parses an explicit status override. Blank input is not an override.
    pub fn parse(raw: &str) -> Option<Self> {
        let lowered = raw.trim().to_lowercase();
        if lowered.is_empty() {
            return None;
        }

        Some(match lowered.as_str() {
            "new" => Self::New,
            "working" => Self::Working,
            "proposal" => Self::Proposal,
            "sold" => Self::Sold,
            _ => Self::Other(lowered),
        })
    }

    pub fn label(&self) -> &str {
        match self {
            Self::New => "new",
            Self::Working => "working",
            Self::Proposal => "proposal",
            Self::Sold => "sold",
            Self::Other(label) => label,
        }
    }

    /// Steps whose fields count toward the stage-scoped completion.
    pub fn scoped_steps(&self) -> &'static [Step] {
        match self {
            Self::New => &[Step::Step1],
            Self::Working => &[Step::Step1, Step::Step2],
            Self::Proposal | Self::Sold | Self::Other(_) => &Step::ORDERED,
        }
    }
}

impl From<String> for LeadStatus {
    fn from(value: String) -> Self {
        Self::parse(&value).unwrap_or(Self::New)
    }
}

impl From<LeadStatus> for String {
    fn from(value: LeadStatus) -> Self {
        value.label().to_string()
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Grouping of weighted fields: contact info, qualifying questions, proposed solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Step1,
    Step2,
    Step3,
}

impl Step {
    pub const ORDERED: [Self; 3] = [Self::Step1, Self::Step2, Self::Step3];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Step1 => "step1",
            Self::Step2 => "step2",
            Self::Step3 => "step3",
        }
    }
}

/// Proposed offer attached once an associate reaches step 3.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Solution {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

/// Sale details recorded when a lead closes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sold_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<u32>,
}

impl Sale {
    pub fn is_empty(&self) -> bool {
        self.sale_id.is_none()
            && self.sold_at.is_none()
            && self.store_number.is_none()
            && self.units.is_none()
    }
}

/// Canonical in-memory shape of a guest record, whatever shape it was stored in.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedGuestRecord {
    pub cust_name: Option<String>,
    pub cust_phone: Option<String>,
    pub cust_phone_digits: String,
    pub prefilled_step1: bool,
    pub evaluate: Map<String, Value>,
    pub solution: Solution,
    /// Explicit override carried by the raw record, if any.
    pub status: Option<LeadStatus>,
    pub sale: Option<Sale>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub user_uid: Option<String>,
    /// Top-level keys the normalizer does not recognize.
    pub extras: Map<String, Value>,
}

impl NormalizedGuestRecord {
    /// `sold` without a sale attached breaks the lifecycle contract.
    pub fn sold_without_sale(&self) -> bool {
        self.status == Some(LeadStatus::Sold)
            && self.sale.as_ref().map(Sale::is_empty).unwrap_or(true)
    }
}
