/// Tenant registry and working-set handles
///
/// The [`TenantCache`] is the single owner of every tenant's working set and
/// hydration metadata, keyed by effective tenant id. It is constructed once
/// at startup and injected into request handling; nothing here is a process
/// global.
///
/// Working sets are created as empty skeletons on first access and are never
/// evicted: tenant cardinality is assumed small, and no eviction policy is
/// defined for this layer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

use crate::db::store::TenantStore;
use crate::models::session::DEMO_TENANT_ID;

use super::working_set::{WorkingRecord, WorkingSet};

/// Process-local hydration bookkeeping for one tenant.
///
/// Both timestamps are monotonic and meaningful only within this process
/// lifetime; they are never persisted.
#[derive(Debug, Default)]
pub(crate) struct HydrationMeta {
    /// When the working set was last refreshed from (or reconciled against)
    /// the durable store
    pub(crate) last_hydrated_at: Option<Instant>,

    /// When the working set was last mutated by a handler
    pub(crate) last_write_at: Option<Instant>,
}

impl HydrationMeta {
    /// The in-memory set has been touched more recently than it was last
    /// refreshed; an older durable read must not overwrite it.
    pub(crate) fn dirty_since_hydration(&self) -> bool {
        match (self.last_write_at, self.last_hydrated_at) {
            (Some(write), Some(hydrated)) => write > hydrated,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    /// Whether the TTL window since the last hydration has elapsed
    pub(crate) fn refresh_due(&self, now: Instant, ttl: Duration) -> bool {
        match self.last_hydrated_at {
            None => true,
            Some(hydrated) => now.duration_since(hydrated) >= ttl,
        }
    }
}

pub(crate) struct TenantSlot {
    pub(crate) working: RwLock<WorkingSet>,
    pub(crate) meta: Mutex<HydrationMeta>,
}

impl TenantSlot {
    fn new() -> Self {
        Self {
            working: RwLock::new(WorkingSet::new()),
            meta: Mutex::new(HydrationMeta::default()),
        }
    }
}

/// Registry of per-tenant working sets and hydration metadata
pub struct TenantCache {
    pub(crate) store: Arc<dyn TenantStore>,
    pub(crate) hydration_ttl: Duration,
    slots: RwLock<HashMap<Uuid, Arc<TenantSlot>>>,
}

impl TenantCache {
    /// Creates the registry with the demo tenant slot pre-created (empty
    /// until [`seed_demo`](Self::seed_demo) runs).
    pub fn new(store: Arc<dyn TenantStore>, hydration_ttl: Duration) -> Self {
        let mut slots = HashMap::new();
        slots.insert(DEMO_TENANT_ID, Arc::new(TenantSlot::new()));

        Self {
            store,
            hydration_ttl,
            slots: RwLock::new(slots),
        }
    }

    /// Seeds the shared demo tenant's working set. Called once at startup;
    /// the demo tenant is never hydrated from the durable store.
    pub fn seed_demo(&self, working: WorkingSet) {
        let slot = self.slot(DEMO_TENANT_ID);
        *slot.working.write().expect("working set lock poisoned") = working;
        tracing::info!("Demo tenant working set seeded");
    }

    /// A handle over one tenant's working set, creating the empty skeleton
    /// on first access.
    pub fn handle(&self, tenant_id: Uuid) -> TenantHandle {
        TenantHandle {
            tenant_id,
            slot: self.slot(tenant_id),
        }
    }

    pub(crate) fn slot(&self, tenant_id: Uuid) -> Arc<TenantSlot> {
        if let Some(slot) = self
            .slots
            .read()
            .expect("slot registry lock poisoned")
            .get(&tenant_id)
        {
            return Arc::clone(slot);
        }

        let mut slots = self.slots.write().expect("slot registry lock poisoned");
        Arc::clone(
            slots
                .entry(tenant_id)
                .or_insert_with(|| Arc::new(TenantSlot::new())),
        )
    }

    /// Number of tenants currently resident (monitoring)
    pub fn resident_tenants(&self) -> usize {
        self.slots.read().expect("slot registry lock poisoned").len()
    }
}

/// A request-scoped view over one tenant's working set.
///
/// Every mutating call on a real (non-demo) tenant marks the tenant's
/// `last_write_at`, which is what upholds the hydrator's ordering invariant.
/// Demo-tenant mutations stay in memory and never mark anything: the demo
/// set is shared, read-mostly state that is never written back durably.
#[derive(Clone)]
pub struct TenantHandle {
    tenant_id: Uuid,
    slot: Arc<TenantSlot>,
}

impl TenantHandle {
    pub fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }

    pub fn is_demo(&self) -> bool {
        self.tenant_id == DEMO_TENANT_ID
    }

    /// Clones out the full collection for `T`, in insertion order
    pub fn list<T: WorkingRecord>(&self) -> Vec<T> {
        let ws = self.slot.working.read().expect("working set lock poisoned");
        T::collection(&ws).iter().cloned().collect()
    }

    /// Finds one record by id
    pub fn find<T: WorkingRecord>(&self, id: Uuid) -> Option<T> {
        let ws = self.slot.working.read().expect("working set lock poisoned");
        T::collection(&ws).find(id).cloned()
    }

    /// Appends a record and marks the tenant as written
    pub fn append<T: WorkingRecord>(&self, record: T) {
        {
            let mut ws = self.slot.working.write().expect("working set lock poisoned");
            T::collection_mut(&mut ws).append(record);
        }
        self.mark_written();
    }

    /// Replaces the record with `id`; marks the tenant as written when a
    /// record was actually replaced
    pub fn replace<T: WorkingRecord>(&self, id: Uuid, record: T) -> bool {
        let replaced = {
            let mut ws = self.slot.working.write().expect("working set lock poisoned");
            T::collection_mut(&mut ws).replace(id, record)
        };
        if replaced {
            self.mark_written();
        }
        replaced
    }

    /// Removes the record with `id`; marks the tenant as written when a
    /// record was actually removed
    pub fn remove<T: WorkingRecord>(&self, id: Uuid) -> bool {
        let removed = {
            let mut ws = self.slot.working.write().expect("working set lock poisoned");
            T::collection_mut(&mut ws).remove(id)
        };
        if removed {
            self.mark_written();
        }
        removed
    }

    fn mark_written(&self) {
        if self.is_demo() {
            return;
        }
        let mut meta = self.slot.meta.lock().expect("hydration meta lock poisoned");
        meta.last_write_at = Some(Instant::now());
    }
}
