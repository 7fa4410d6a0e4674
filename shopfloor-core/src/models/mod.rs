/// Data models for Shopfloor
///
/// This module contains the durable identity records (accounts, sessions)
/// and the per-collection business records held in tenant working sets.
///
/// # Model Categories
///
/// - **Identity**: `Account`, `Session`: who is calling, and for which tenant
/// - **Business records**: `Supplier`, `BomLine`, `StockItem`,
///   `NonConformance`, opaque to the cache layer beyond their id and
///   tenant-scoping fields

pub mod account;
pub mod records;
pub mod session;

pub use account::{Account, AccountPlan, NewAccount};
pub use records::{BomLine, NonConformance, StockItem, Supplier, TenantRecord};
pub use session::{Session, TenantContext, DEMO_TENANT_ID};
