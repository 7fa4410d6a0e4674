/// Durable writes with bounded retry
///
/// Every durable insert/update/delete goes through this module and comes
/// back as a [`WriteOutcome`] value, never an error the caller could
/// accidentally let propagate. The working set has already been updated
/// optimistically by the time these run; a failed outcome means the record
/// lives in memory only, and the caller decides how to present that.
///
/// Transient failures (store unreachable) pace their retries with a short
/// sleep; structural failures retry immediately, since waiting will not heal
/// a schema problem. Attempts are capped regardless of failure class.

use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::records::TenantRecord;

use super::store::{StoreError, TenantStore};

/// Retry knobs for durable writes
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempt cap, applied to every failure class
    pub max_attempts: u32,

    /// Sleep between attempts after a transient failure
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            // A zero cap would mean "never try"; clamp to one real attempt.
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(150),
        }
    }
}

/// Structured result of a durable write attempt.
///
/// Returned as a value so every call site must explicitly handle the
/// degraded case; there is no exception path to ignore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Whether the write eventually reached the durable store
    pub success: bool,

    /// Number of attempts consumed
    pub attempts: u32,

    /// Last error message when `success` is false
    pub error: Option<String>,
}

impl WriteOutcome {
    fn succeeded(attempts: u32) -> Self {
        Self {
            success: true,
            attempts,
            error: None,
        }
    }

    fn exhausted(attempts: u32, error: Option<StoreError>) -> Self {
        Self {
            success: false,
            attempts,
            error: error.map(|e| e.to_string()),
        }
    }
}

/// Durably upserts one record, bounded by `policy`.
///
/// This function never mutates the working set; it is purely a durability
/// side-effect.
pub async fn persist(
    store: &dyn TenantStore,
    record: &TenantRecord,
    policy: &RetryPolicy,
) -> WriteOutcome {
    let table = record.table();
    let id = record.id();
    let outcome = attempt_bounded(policy, || store.upsert_record(record).boxed()).await;

    if outcome.success {
        debug!(table, record_id = %id, attempts = outcome.attempts, "Record persisted");
    } else {
        warn!(
            table,
            record_id = %id,
            attempts = outcome.attempts,
            error = outcome.error.as_deref().unwrap_or("unknown"),
            "Durable write exhausted retries; record retained in memory only"
        );
    }

    outcome
}

/// Durably deletes one record, bounded by `policy`.
pub async fn discard(
    store: &dyn TenantStore,
    table: &str,
    id: Uuid,
    tenant_id: Uuid,
    policy: &RetryPolicy,
) -> WriteOutcome {
    let outcome =
        attempt_bounded(policy, || store.delete_record(table, id, tenant_id).boxed()).await;

    if !outcome.success {
        warn!(
            table,
            record_id = %id,
            attempts = outcome.attempts,
            error = outcome.error.as_deref().unwrap_or("unknown"),
            "Durable delete exhausted retries"
        );
    }

    outcome
}

async fn attempt_bounded<'a, F>(policy: &RetryPolicy, mut op: F) -> WriteOutcome
where
    F: FnMut() -> BoxFuture<'a, Result<(), StoreError>>,
{
    let cap = policy.max_attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=cap {
        match op().await {
            Ok(()) => return WriteOutcome::succeeded(attempt),
            Err(err) => {
                let transient = err.is_transient();
                debug!(attempt, cap, transient, error = %err, "Durable write attempt failed");
                last_error = Some(err);

                if transient && attempt < cap {
                    tokio::time::sleep(policy.backoff).await;
                }
            }
        }
    }

    WriteOutcome::exhausted(cap, last_error)
}
