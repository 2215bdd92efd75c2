//! Lead progression and pitch-quality scoring for guest intake records.
//!
//! The scoring engine under [`workflows::leads`] is pure computation over raw guest
//! records. The service and router layered on top drive it against an abstract record
//! store and identity provider.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
