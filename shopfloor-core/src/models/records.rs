/// Business records held in tenant working sets
///
/// Each collection gets its own record type so the cache layer has
/// compile-time safety on the fields it actually interprets (ids and
/// tenant-scoping fields); the remaining fields are business payload this
/// layer never inspects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A supplier on the approved-vendor list. Company-scoped in addition to
/// tenant-scoped.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Supplier {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub company_id: Option<Uuid>,
    pub name: String,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
    /// "pending", "approved", or "suspended"
    pub approval_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line of a bill of materials: a component consumed by a parent item.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BomLine {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub parent_sku: String,
    pub component_sku: String,
    pub description: Option<String>,
    pub quantity: f64,
    pub unit: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An inventory stock item.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StockItem {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub sku: String,
    pub description: Option<String>,
    pub quantity_on_hand: f64,
    pub location: Option<String>,
    pub reorder_point: Option<f64>,
    /// Fallback supplier consulted when the primary cannot deliver
    pub secondary_supplier_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A quality non-conformance report.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct NonConformance {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub reference: String,
    /// "minor", "major", or "critical"
    pub severity: String,
    pub description: String,
    /// "open", "investigating", or "closed"
    pub status: String,
    pub reported_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A record destined for durable persistence, tagged by collection.
///
/// The gateway derives the target table from the variant, so handlers can
/// hand any working-set record to the same persistence path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "collection", rename_all = "snake_case")]
pub enum TenantRecord {
    Supplier(Supplier),
    BomLine(BomLine),
    StockItem(StockItem),
    NonConformance(NonConformance),
}

impl TenantRecord {
    /// Target table for this record
    pub fn table(&self) -> &'static str {
        match self {
            TenantRecord::Supplier(_) => "suppliers",
            TenantRecord::BomLine(_) => "bom_lines",
            TenantRecord::StockItem(_) => "stock_items",
            TenantRecord::NonConformance(_) => "non_conformances",
        }
    }

    /// Primary key of the wrapped record
    pub fn id(&self) -> Uuid {
        match self {
            TenantRecord::Supplier(r) => r.id,
            TenantRecord::BomLine(r) => r.id,
            TenantRecord::StockItem(r) => r.id,
            TenantRecord::NonConformance(r) => r.id,
        }
    }

    /// Owning tenant of the wrapped record
    pub fn tenant_id(&self) -> Uuid {
        match self {
            TenantRecord::Supplier(r) => r.tenant_id,
            TenantRecord::BomLine(r) => r.tenant_id,
            TenantRecord::StockItem(r) => r.tenant_id,
            TenantRecord::NonConformance(r) => r.tenant_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supplier(tenant_id: Uuid, name: &str) -> Supplier {
        let now = Utc::now();
        Supplier {
            id: Uuid::new_v4(),
            tenant_id,
            company_id: None,
            name: name.to_string(),
            contact_name: None,
            contact_email: None,
            phone: None,
            approval_status: "pending".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_tenant_record_table_mapping() {
        let tenant = Uuid::new_v4();
        let record = TenantRecord::Supplier(supplier(tenant, "Acme Metals"));
        assert_eq!(record.table(), "suppliers");
        assert_eq!(record.tenant_id(), tenant);
    }

    #[test]
    fn test_tenant_record_id_passthrough() {
        let s = supplier(Uuid::new_v4(), "Acme Metals");
        let id = s.id;
        assert_eq!(TenantRecord::Supplier(s).id(), id);
    }
}
