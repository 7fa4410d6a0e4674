/// Shared demo workspace seeding
///
/// The demo tenant's working set is seeded once at startup and lives only in
/// memory: it is shared read-mostly by every demo session, never hydrated
/// from the durable store, and never written back. A `demo@shopfloor.dev`
/// account is registered durably on first boot so the demo workspace is
/// reachable through the normal login flow.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use shopfloor_core::accounts::AccountDirectory;
use shopfloor_core::auth::password;
use shopfloor_core::models::records::{NonConformance, StockItem, Supplier};
use shopfloor_core::models::{NewAccount, DEMO_TENANT_ID};
use shopfloor_core::tenancy::{TenantCache, WorkingSet};

/// Email of the built-in demo login
pub const DEMO_EMAIL: &str = "demo@shopfloor.dev";

/// Password of the built-in demo login
pub const DEMO_PASSWORD: &str = "shopfloor-demo-1";

/// Seeds the demo tenant working set with a small, plausible dataset.
pub fn seed_demo_workspace(tenants: &TenantCache) {
    let mut working = WorkingSet::new();
    let now = Utc::now();

    for (name, contact) in [
        ("Meridian Castings", "sales@meridiancastings.example"),
        ("Blue Ridge Fasteners", "orders@brfasteners.example"),
        ("Halvorsen Plating", "quotes@halvorsen.example"),
    ] {
        working.suppliers.append(Supplier {
            id: Uuid::new_v4(),
            tenant_id: DEMO_TENANT_ID,
            company_id: None,
            name: name.to_string(),
            contact_name: None,
            contact_email: Some(contact.to_string()),
            phone: None,
            approval_status: "approved".to_string(),
            created_at: now,
            updated_at: now,
        });
    }

    for (sku, qty, location) in [
        ("CAST-041", 120.0, "A-03"),
        ("BOLT-M8-25", 4800.0, "B-11"),
        ("PLATE-ZN-2", 75.0, "C-02"),
    ] {
        working.stock_items.append(StockItem {
            id: Uuid::new_v4(),
            tenant_id: DEMO_TENANT_ID,
            sku: sku.to_string(),
            description: None,
            quantity_on_hand: qty,
            location: Some(location.to_string()),
            reorder_point: Some(50.0),
            secondary_supplier_id: None,
            created_at: now,
            updated_at: now,
        });
    }

    working.non_conformances.append(NonConformance {
        id: Uuid::new_v4(),
        tenant_id: DEMO_TENANT_ID,
        reference: "NCR-0001".to_string(),
        severity: "minor".to_string(),
        description: "Surface finish out of tolerance on CAST-041 batch 12".to_string(),
        status: "open".to_string(),
        reported_at: now,
        created_at: now,
        updated_at: now,
    });

    tenants.seed_demo(working);
}

/// Registers the demo account if this is the first boot against the store.
///
/// Failures are logged and ignored: the demo login is a convenience, and an
/// unreachable store at boot should not stop the server from coming up.
pub async fn ensure_demo_account(accounts: &AccountDirectory) {
    match accounts.find_by_email(DEMO_EMAIL).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            let hash = match password::hash_password(DEMO_PASSWORD) {
                Ok(hash) => hash,
                Err(err) => {
                    warn!(error = %err, "Could not hash demo password; demo login disabled");
                    return;
                }
            };
            let registered = accounts
                .register(NewAccount {
                    email: DEMO_EMAIL.to_string(),
                    password_hash: hash,
                    company_id: None,
                    group_id: None,
                    is_demo: true,
                    delegated_owner_id: None,
                    role: "member".to_string(),
                })
                .await;
            match registered {
                Ok(_) => info!("Demo account registered"),
                Err(err) => warn!(error = %err, "Could not register demo account"),
            }
        }
        Err(err) => {
            warn!(error = %err, "Could not check for demo account; continuing without it");
        }
    }
}
