/// Database layer
///
/// This module provides everything that touches the durable store:
///
/// - `pool`: PostgreSQL connection pool management
/// - `store`: the durable store gateway (`TenantStore` trait + `PgStore`)
/// - `evolve`: idempotent additive schema evolution
/// - `retry`: bounded-retry durable writes with structured outcomes

pub mod evolve;
pub mod pool;
pub mod retry;
pub mod store;

pub use retry::{RetryPolicy, WriteOutcome};
pub use store::{PgStore, StoreError, TenantStore};
