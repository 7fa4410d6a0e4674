/// API route handlers
///
/// Every tenant-data handler follows the same per-request sequence:
/// resolved session → tenant context → `ensure_hydrated` → working-set
/// read/mutate → durable persist with bounded retry → response envelope
/// with a warning when durability degraded.

pub mod auth;
pub mod health;
pub mod stock;
pub mod suppliers;

use serde::{Deserialize, Serialize};
use shopfloor_core::db::WriteOutcome;

/// Response envelope for create/update/delete operations.
///
/// A degraded durable write is still an overall success (the record lives
/// in the working set and is served from memory), but `persisted: false`
/// plus `warning` lets the client surface it or schedule a retry. Data is
/// never silently dropped and durable success is never pretended.
#[derive(Debug, Serialize, Deserialize)]
pub struct SaveResponse<T> {
    /// The record as held in the working set
    pub data: T,

    /// Whether the record reached the durable store
    pub persisted: bool,

    /// Present when persistence degraded to memory-only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl<T> SaveResponse<T> {
    /// Builds the envelope from a write outcome.
    pub fn from_outcome(data: T, outcome: &WriteOutcome) -> Self {
        Self {
            data,
            persisted: outcome.success,
            warning: if outcome.success {
                None
            } else {
                Some(format!(
                    "Saved locally; durable write failed after {} attempts and will be retried on next sync",
                    outcome.attempts
                ))
            },
        }
    }

    /// Builds the envelope for demo-tenant mutations, which live in memory
    /// by design and are never written back durably.
    pub fn demo(data: T) -> Self {
        Self {
            data,
            persisted: false,
            warning: Some("Demo workspace changes are not saved durably".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successful_outcome_has_no_warning() {
        let outcome = WriteOutcome {
            success: true,
            attempts: 1,
            error: None,
        };
        let envelope = SaveResponse::from_outcome(42u32, &outcome);
        assert!(envelope.persisted);
        assert!(envelope.warning.is_none());
    }

    #[test]
    fn test_exhausted_outcome_carries_warning() {
        let outcome = WriteOutcome {
            success: false,
            attempts: 3,
            error: Some("connection refused".to_string()),
        };
        let envelope = SaveResponse::from_outcome(42u32, &outcome);
        assert!(!envelope.persisted);
        assert!(envelope.warning.expect("warning").contains("3 attempts"));
    }
}
