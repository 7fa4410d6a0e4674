/// Idempotent additive schema evolution
///
/// New record fields roll out without a separate deployment step: the write
/// path that depends on a new column calls [`ensure_columns`] first, and the
/// column is added (or a known legacy column renamed) on the spot. Databases
/// created by current migrations already have the columns, so the usual case
/// is a single introspection query and no DDL.
///
/// Multiple uncoordinated processes may attempt the same migration
/// concurrently. There is no locking: safety comes from tolerating
/// duplicate-object errors and from re-introspecting when a rename loses the
/// race.
///
/// # Example
///
/// ```no_run
/// use shopfloor_core::db::evolve::{ensure_columns, ColumnSpec};
/// use shopfloor_core::db::TenantStore;
///
/// # async fn example(store: &dyn TenantStore) -> Result<(), shopfloor_core::db::StoreError> {
/// ensure_columns(
///     store,
///     "stock_items",
///     &[ColumnSpec {
///         name: "secondary_supplier_id",
///         ddl: "UUID",
///         renamed_from: Some("backup_supplier_id"),
///     }],
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```

use tracing::{debug, info, warn};

use super::store::{StoreError, TenantStore};

/// A column some write path requires to exist
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    /// Column name after evolution
    pub name: &'static str,

    /// Column type and constraints as DDL, e.g. `"DOUBLE PRECISION"`
    pub ddl: &'static str,

    /// A legacy column that maps semantically to this one. Present on an old
    /// database, it is renamed instead of adding a fresh column, preserving
    /// its data.
    pub renamed_from: Option<&'static str>,
}

/// Ensures every required column exists on `table`, applying additive
/// changes for the missing ones.
///
/// Safe to call concurrently from uncoordinated processes: duplicate-object
/// errors are swallowed, and a rename that loses a concurrent race is
/// verified by re-introspection. Any other error is a migration failure and
/// must abort the dependent write.
///
/// # Errors
///
/// Returns `StoreError::Unavailable` when the store cannot be reached and
/// `StoreError::Schema`/`Query` when DDL fails structurally.
pub async fn ensure_columns(
    store: &dyn TenantStore,
    table: &str,
    required: &[ColumnSpec],
) -> Result<(), StoreError> {
    let existing = store.columns(table).await?;

    for spec in required {
        if existing.iter().any(|c| c == spec.name) {
            continue;
        }

        let has_legacy = spec
            .renamed_from
            .map(|legacy| existing.iter().any(|c| c == legacy))
            .unwrap_or(false);

        if has_legacy {
            let legacy = spec.renamed_from.unwrap();
            let ddl = format!(
                "ALTER TABLE {} RENAME COLUMN {} TO {}",
                table, legacy, spec.name
            );
            match store.execute_ddl(&ddl).await {
                Ok(()) => {
                    info!(table, column = spec.name, from = legacy, "Renamed legacy column");
                }
                Err(StoreError::AlreadyExists(_)) => {
                    debug!(table, column = spec.name, "Column already present, skipping rename");
                }
                Err(err) => {
                    // A concurrent migrator may have renamed the legacy column
                    // from under us; trust the schema over the error.
                    let current = store.columns(table).await?;
                    if current.iter().any(|c| c == spec.name) {
                        debug!(table, column = spec.name, "Concurrent rename won the race");
                    } else {
                        warn!(table, column = spec.name, error = %err, "Column rename failed");
                        return Err(err);
                    }
                }
            }
        } else {
            let ddl = format!("ALTER TABLE {} ADD COLUMN {} {}", table, spec.name, spec.ddl);
            match store.execute_ddl(&ddl).await {
                Ok(()) => {
                    info!(table, column = spec.name, "Added column");
                }
                Err(StoreError::AlreadyExists(_)) => {
                    debug!(table, column = spec.name, "Column already present, skipping add");
                }
                Err(err) => {
                    warn!(table, column = spec.name, error = %err, "Column add failed");
                    return Err(err);
                }
            }
        }
    }

    Ok(())
}

/// Opportunistically creates an index, tolerating concurrent creators.
pub async fn ensure_index(
    store: &dyn TenantStore,
    table: &str,
    index: &str,
    columns: &[&str],
) -> Result<(), StoreError> {
    let ddl = format!(
        "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
        index,
        table,
        columns.join(", ")
    );
    match store.execute_ddl(&ddl).await {
        Ok(()) => Ok(()),
        // IF NOT EXISTS races can still surface duplicate-object errors
        Err(StoreError::AlreadyExists(_)) => Ok(()),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockStore;

    const DRIFT: &[ColumnSpec] = &[
        ColumnSpec {
            name: "reorder_point",
            ddl: "DOUBLE PRECISION",
            renamed_from: None,
        },
        ColumnSpec {
            name: "secondary_supplier_id",
            ddl: "UUID",
            renamed_from: Some("backup_supplier_id"),
        },
    ];

    #[tokio::test]
    async fn test_adds_missing_column() {
        let store = MockStore::new();
        store.set_columns("stock_items", &["id", "tenant_id", "sku"]);

        ensure_columns(&store, "stock_items", &DRIFT[..1])
            .await
            .expect("evolve");

        assert!(store.column_names("stock_items").contains(&"reorder_point".to_string()));
        assert_eq!(store.ddl_statements().len(), 1);
    }

    #[tokio::test]
    async fn test_renames_legacy_column() {
        let store = MockStore::new();
        store.set_columns("stock_items", &["id", "tenant_id", "sku", "backup_supplier_id"]);

        ensure_columns(&store, "stock_items", DRIFT).await.expect("evolve");

        let cols = store.column_names("stock_items");
        assert!(cols.contains(&"secondary_supplier_id".to_string()));
        assert!(!cols.contains(&"backup_supplier_id".to_string()));
    }

    #[tokio::test]
    async fn test_second_call_is_a_no_op() {
        let store = MockStore::new();
        store.set_columns("stock_items", &["id", "tenant_id", "sku"]);

        ensure_columns(&store, "stock_items", DRIFT).await.expect("first");
        let after_first = store.ddl_statements().len();

        ensure_columns(&store, "stock_items", DRIFT).await.expect("second");

        // No error, no extra DDL, no duplicate column.
        assert_eq!(store.ddl_statements().len(), after_first);
        let cols = store.column_names("stock_items");
        assert_eq!(
            cols.iter().filter(|c| *c == "reorder_point").count(),
            1
        );
    }

    #[tokio::test]
    async fn test_tolerates_concurrent_duplicate_add() {
        let store = MockStore::new();
        store.set_columns("stock_items", &["id", "tenant_id", "sku"]);
        // Another process added the column between our introspection and DDL.
        store.fail_next_ddl(StoreError::AlreadyExists("duplicate column".to_string()));

        ensure_columns(&store, "stock_items", &DRIFT[..1])
            .await
            .expect("duplicate add must be swallowed");
    }

    #[tokio::test]
    async fn test_structural_failure_propagates() {
        let store = MockStore::new();
        store.set_columns("stock_items", &["id", "tenant_id", "sku"]);
        store.fail_next_ddl(StoreError::Schema("type does not exist".to_string()));

        let result = ensure_columns(&store, "stock_items", &DRIFT[..1]).await;
        assert!(matches!(result, Err(StoreError::Schema(_))));
    }

    #[tokio::test]
    async fn test_lost_rename_race_is_verified_by_reintrospection() {
        let store = MockStore::new();
        store.set_columns("stock_items", &["id", "backup_supplier_id"]);
        // The rename fails structurally, but by then a concurrent migrator
        // has already produced the target column.
        store.fail_next_ddl(StoreError::Schema("column does not exist".to_string()));
        store.on_next_ddl_failure_set_columns("stock_items", &["id", "secondary_supplier_id"]);

        ensure_columns(&store, "stock_items", &DRIFT[1..])
            .await
            .expect("lost race must be tolerated");
    }

    #[tokio::test]
    async fn test_ensure_index_is_idempotent() {
        let store = MockStore::new();
        ensure_index(&store, "suppliers", "suppliers_tenant_idx", &["tenant_id"])
            .await
            .expect("create");
        ensure_index(&store, "suppliers", "suppliers_tenant_idx", &["tenant_id"])
            .await
            .expect("recreate");

        assert!(store
            .ddl_statements()
            .iter()
            .all(|ddl| ddl.contains("IF NOT EXISTS")));
    }
}
