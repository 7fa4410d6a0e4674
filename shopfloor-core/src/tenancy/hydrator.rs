/// Lazy, TTL-bounded tenant hydration
///
/// [`TenantCache::ensure_hydrated`] is called once per request before any
/// tenant data is touched. It refreshes the tenant's working set from the
/// durable store at most once per TTL window, subject to the write-ordering
/// invariant: the durable store is not guaranteed to reflect very recent
/// writes (a write may have failed, or the store may lag), so once this
/// process has observed a fresher local state, an older durable read must
/// not overwrite it. Reconciliation waits for the next TTL boundary.
///
/// This is the only place that bulk-replaces working-set collections; all
/// other mutation is incremental single-record changes through
/// [`TenantHandle`](super::TenantHandle), which is why comparing
/// `last_write_at` against `last_hydrated_at` is sufficient to prevent
/// regressions.

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::db::store::StoreError;
use crate::models::TenantContext;

use super::cache::TenantCache;
use super::working_set::WorkingRecord;

/// What a hydration attempt did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hydration {
    /// Demo tenant: never hydrated from the durable store
    DemoTenant,

    /// Within the TTL window; nothing to do
    Fresh,

    /// A local write is newer than the last refresh; reload skipped, and the
    /// watermark advanced so the next reconciliation waits a full TTL
    SkippedDirty,

    /// All collections reloaded from the durable store
    Refreshed,

    /// Some collection reads failed; the failed collections were left
    /// untouched and the watermark was not advanced, so the next request
    /// retries instead of caching a known-incomplete state
    Partial { failed: usize },

    /// A local write landed while the reload was in flight; the stale
    /// durable snapshot was discarded
    Aborted,
}

impl TenantCache {
    /// Brings a tenant's working set up to date with the durable store, if
    /// due and safe.
    ///
    /// Failures are soft by design: the request is served from whatever
    /// state the working set already holds, and the outcome reports what
    /// happened for logging and tests.
    pub async fn ensure_hydrated(&self, ctx: &TenantContext) -> Hydration {
        if ctx.is_demo() {
            return Hydration::DemoTenant;
        }

        let slot = self.slot(ctx.tenant_id);
        let started = Instant::now();

        {
            let mut meta = slot.meta.lock().expect("hydration meta lock poisoned");

            // Ordering rule first: a dirty set is never reloaded, even once
            // the TTL has lapsed. Advancing the watermark here pushes the
            // next reconciliation a full TTL past this observation instead
            // of re-checking on every request.
            if meta.dirty_since_hydration() {
                meta.last_hydrated_at = Some(started);
                debug!(tenant_id = %ctx.tenant_id, "Hydration skipped: local writes are newer");
                return Hydration::SkippedDirty;
            }

            if !meta.refresh_due(started, self.hydration_ttl) {
                return Hydration::Fresh;
            }
        }

        // Load every collection before touching the working set; no locks
        // are held across these awaits.
        let suppliers = self.store.suppliers_for(ctx).await;
        let bom_lines = self.store.bom_lines_for(ctx).await;
        let stock_items = self.store.stock_items_for(ctx).await;
        let non_conformances = self.store.non_conformances_for(ctx).await;

        let mut meta = slot.meta.lock().expect("hydration meta lock poisoned");

        // The durable snapshot predates any write that landed while it was
        // being read; applying it now would clobber that write.
        if matches!(meta.last_write_at, Some(write) if write > started) {
            debug!(tenant_id = %ctx.tenant_id, "Hydration aborted: write landed during reload");
            return Hydration::Aborted;
        }

        let mut failed = 0usize;
        {
            let mut ws = slot.working.write().expect("working set lock poisoned");
            apply(ctx, &mut ws, suppliers, &mut failed);
            apply(ctx, &mut ws, bom_lines, &mut failed);
            apply(ctx, &mut ws, stock_items, &mut failed);
            apply(ctx, &mut ws, non_conformances, &mut failed);
        }

        if failed == 0 {
            meta.last_hydrated_at = Some(started);
            debug!(tenant_id = %ctx.tenant_id, "Working set refreshed from durable store");
            Hydration::Refreshed
        } else {
            // Watermark intentionally not advanced: the next request retries
            // rather than trusting an incomplete refresh for a whole TTL.
            Hydration::Partial { failed }
        }
    }
}

fn apply<T: WorkingRecord>(
    ctx: &TenantContext,
    ws: &mut super::working_set::WorkingSet,
    loaded: Result<Vec<T>, StoreError>,
    failed: &mut usize,
) {
    match loaded {
        Ok(records) => T::collection_mut(ws).replace_all(records),
        Err(err) => {
            *failed += 1;
            warn!(
                tenant_id = %ctx.tenant_id,
                collection = T::COLLECTION,
                error = %err,
                "Collection read failed; keeping cached records"
            );
        }
    }
}
