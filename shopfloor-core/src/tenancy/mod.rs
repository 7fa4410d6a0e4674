/// Tenant working sets, registry, and hydration
///
/// Each tenant gets an in-process working set: the fixed set of record
/// collections its request handlers read and mutate directly. The
/// [`TenantCache`] owns every working set plus the hydration metadata that
/// keeps them consistent-enough with the durable store:
///
/// - working sets are created empty on first access and never evicted;
/// - [`TenantCache::ensure_hydrated`] refreshes a working set from the
///   durable store at most once per TTL window, and never when the set has
///   been written more recently than it was last refreshed (the no-clobber
///   ordering rule);
/// - the reserved demo tenant is seeded once at startup and never hydrated.
///
/// The cache is an owned component injected where it is needed; there are no
/// process globals.

mod cache;
mod hydrator;
mod working_set;

pub use cache::{TenantCache, TenantHandle};
pub use hydrator::Hydration;
pub use working_set::{Collection, WorkingRecord, WorkingSet};
