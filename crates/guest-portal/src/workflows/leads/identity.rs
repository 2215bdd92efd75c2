use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse role claim, ordered from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Me,
    Lead,
    Dm,
    Admin,
}

impl Role {
    pub const ORDERED: [Self; 4] = [Self::Me, Self::Lead, Self::Dm, Self::Admin];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "me" => Some(Self::Me),
            "lead" => Some(Self::Lead),
            "dm" => Some(Self::Dm),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Me => "me",
            Self::Lead => "lead",
            Self::Dm => "dm",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub role: Role,
}

impl Identity {
    pub fn new(uid: impl Into<String>, role: Role) -> Self {
        Self {
            uid: uid.into(),
            role,
        }
    }
}

/// Resolves bearer tokens to identities (Firebase Auth in the browser clients).
pub trait IdentityProvider: Send + Sync {
    fn resolve(&self, token: &str) -> Result<Identity, IdentityError>;
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("missing credentials")]
    Missing,
    #[error("unknown or expired token")]
    Rejected,
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}
