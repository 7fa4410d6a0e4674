/// Durable store gateway
///
/// The gateway executes parameterized reads, writes, and schema introspection
/// against the remote store. It contains no business logic: callers decide
/// what to do with results, including every failure.
///
/// The [`TenantStore`] trait is the seam between the cache layer and
/// PostgreSQL. Production uses [`PgStore`]; tests substitute scripted mock
/// stores to exercise retry, hydration, and session behavior under failure.
///
/// # Error classification
///
/// Every gateway error is folded into [`StoreError`], whose variants drive
/// policy elsewhere: `Unavailable` is retried with pacing, `AlreadyExists`
/// is the idempotency carve-out for concurrent schema migration, `Schema`
/// aborts dependent writes, and `Query` covers the rest.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::records::{BomLine, NonConformance, StockItem, Supplier, TenantRecord};
use crate::models::{Account, Session, TenantContext};

/// Classified durable store error
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// Transport/pool outage; the operation may succeed if retried
    #[error("durable store unavailable: {0}")]
    Unavailable(String),

    /// A schema object this operation would create already exists
    #[error("schema object already exists: {0}")]
    AlreadyExists(String),

    /// A uniqueness constraint rejected the write (e.g. duplicate email)
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// Structural schema error; retrying without intervention will not help
    #[error("schema migration failed: {0}")]
    Schema(String),

    /// Any other failed statement
    #[error("query failed: {0}")]
    Query(String),
}

impl StoreError {
    /// Whether a retry with pacing is worth attempting
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::Unavailable(err.to_string()),
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                // duplicate_column / duplicate_table / duplicate_object
                Some("42701") | Some("42P07") | Some("42710") => {
                    StoreError::AlreadyExists(err.to_string())
                }
                // Class 42: syntax error or access rule violation
                Some(code) if code.starts_with("42") => StoreError::Schema(err.to_string()),
                // unique_violation
                Some("23505") => StoreError::Conflict(err.to_string()),
                // Class 08: connection exception; 57P01: admin shutdown
                Some(code) if code.starts_with("08") || code == "57P01" => {
                    StoreError::Unavailable(err.to_string())
                }
                _ => StoreError::Query(err.to_string()),
            },
            _ => StoreError::Query(err.to_string()),
        }
    }
}

/// The durable store gateway interface.
///
/// Object-safe so the cache layer can hold `Arc<dyn TenantStore>` and tests
/// can substitute scripted implementations.
#[async_trait]
pub trait TenantStore: Send + Sync {
    // -- accounts ----------------------------------------------------------

    /// Inserts a newly registered account.
    async fn insert_account(&self, account: &Account) -> Result<(), StoreError>;

    /// Looks up an account by email.
    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    /// Records a successful login.
    async fn record_login(&self, account_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;

    // -- sessions ----------------------------------------------------------

    /// Writes a freshly issued session.
    async fn insert_session(&self, session: &Session) -> Result<(), StoreError>;

    /// Looks up a session by token; expiry is the caller's concern.
    async fn session_by_token(&self, token: &str) -> Result<Option<Session>, StoreError>;

    /// Deletes a single session.
    async fn delete_session(&self, token: &str) -> Result<(), StoreError>;

    /// Deletes all sessions that expired at or before `cutoff`; returns the
    /// number removed.
    async fn delete_expired_sessions(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;

    // -- working-set collection reads --------------------------------------

    /// All suppliers for a tenant, additionally scoped by company when the
    /// context carries one.
    async fn suppliers_for(&self, ctx: &TenantContext) -> Result<Vec<Supplier>, StoreError>;

    /// All BOM lines for a tenant.
    async fn bom_lines_for(&self, ctx: &TenantContext) -> Result<Vec<BomLine>, StoreError>;

    /// All stock items for a tenant.
    async fn stock_items_for(&self, ctx: &TenantContext) -> Result<Vec<StockItem>, StoreError>;

    /// All non-conformances for a tenant.
    async fn non_conformances_for(
        &self,
        ctx: &TenantContext,
    ) -> Result<Vec<NonConformance>, StoreError>;

    // -- record writes -----------------------------------------------------

    /// Inserts or fully replaces one record in its collection table.
    async fn upsert_record(&self, record: &TenantRecord) -> Result<(), StoreError>;

    /// Deletes one record, tenant-scoped.
    async fn delete_record(&self, table: &str, id: Uuid, tenant_id: Uuid)
        -> Result<(), StoreError>;

    // -- schema ------------------------------------------------------------

    /// Current column names of a table (empty if the table does not exist).
    async fn columns(&self, table: &str) -> Result<Vec<String>, StoreError>;

    /// Executes a single DDL statement.
    async fn execute_ddl(&self, ddl: &str) -> Result<(), StoreError>;
}

/// PostgreSQL implementation of the durable store gateway
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wraps an initialized connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool, for health checks and shutdown
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TenantStore for PgStore {
    async fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, email, password_hash, company_id, group_id,
                                  is_demo, delegated_owner_id, plan, role,
                                  trial_ends_at, last_login_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(account.id)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.company_id)
        .bind(account.group_id)
        .bind(account.is_demo)
        .bind(account.delegated_owner_id)
        .bind(&account.plan)
        .bind(&account.role)
        .bind(account.trial_ends_at)
        .bind(account.last_login_at)
        .bind(account.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, email, password_hash, company_id, group_id, is_demo,
                   delegated_owner_id, plan, role, trial_ends_at, last_login_at,
                   created_at
            FROM accounts
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn record_login(&self, account_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("UPDATE accounts SET last_login_at = $2 WHERE id = $1")
            .bind(account_id)
            .bind(at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (token, user_id, company_id, group_id, is_demo,
                                  delegated_owner_id, role, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&session.token)
        .bind(session.user_id)
        .bind(session.company_id)
        .bind(session.group_id)
        .bind(session.is_demo)
        .bind(session.delegated_owner_id)
        .bind(&session.role)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn session_by_token(&self, token: &str) -> Result<Option<Session>, StoreError> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT token, user_id, company_id, group_id, is_demo,
                   delegated_owner_id, role, created_at, expires_at
            FROM sessions
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn delete_session(&self, token: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_expired_sessions(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn suppliers_for(&self, ctx: &TenantContext) -> Result<Vec<Supplier>, StoreError> {
        let suppliers = sqlx::query_as::<_, Supplier>(
            r#"
            SELECT id, tenant_id, company_id, name, contact_name, contact_email,
                   phone, approval_status, created_at, updated_at
            FROM suppliers
            WHERE tenant_id = $1
              AND ($2::uuid IS NULL OR company_id = $2)
            ORDER BY created_at ASC
            "#,
        )
        .bind(ctx.tenant_id)
        .bind(ctx.company_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(suppliers)
    }

    async fn bom_lines_for(&self, ctx: &TenantContext) -> Result<Vec<BomLine>, StoreError> {
        let lines = sqlx::query_as::<_, BomLine>(
            r#"
            SELECT id, tenant_id, parent_sku, component_sku, description,
                   quantity, unit, created_at, updated_at
            FROM bom_lines
            WHERE tenant_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(ctx.tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    async fn stock_items_for(&self, ctx: &TenantContext) -> Result<Vec<StockItem>, StoreError> {
        let items = sqlx::query_as::<_, StockItem>(
            r#"
            SELECT id, tenant_id, sku, description, quantity_on_hand, location,
                   reorder_point, secondary_supplier_id, created_at, updated_at
            FROM stock_items
            WHERE tenant_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(ctx.tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    async fn non_conformances_for(
        &self,
        ctx: &TenantContext,
    ) -> Result<Vec<NonConformance>, StoreError> {
        let reports = sqlx::query_as::<_, NonConformance>(
            r#"
            SELECT id, tenant_id, reference, severity, description, status,
                   reported_at, created_at, updated_at
            FROM non_conformances
            WHERE tenant_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(ctx.tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(reports)
    }

    async fn upsert_record(&self, record: &TenantRecord) -> Result<(), StoreError> {
        match record {
            TenantRecord::Supplier(s) => {
                sqlx::query(
                    r#"
                    INSERT INTO suppliers (id, tenant_id, company_id, name, contact_name,
                                           contact_email, phone, approval_status,
                                           created_at, updated_at)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                    ON CONFLICT (id) DO UPDATE SET
                        company_id = EXCLUDED.company_id,
                        name = EXCLUDED.name,
                        contact_name = EXCLUDED.contact_name,
                        contact_email = EXCLUDED.contact_email,
                        phone = EXCLUDED.phone,
                        approval_status = EXCLUDED.approval_status,
                        updated_at = EXCLUDED.updated_at
                    "#,
                )
                .bind(s.id)
                .bind(s.tenant_id)
                .bind(s.company_id)
                .bind(&s.name)
                .bind(&s.contact_name)
                .bind(&s.contact_email)
                .bind(&s.phone)
                .bind(&s.approval_status)
                .bind(s.created_at)
                .bind(s.updated_at)
                .execute(&self.pool)
                .await?;
            }
            TenantRecord::BomLine(l) => {
                sqlx::query(
                    r#"
                    INSERT INTO bom_lines (id, tenant_id, parent_sku, component_sku,
                                           description, quantity, unit, created_at, updated_at)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                    ON CONFLICT (id) DO UPDATE SET
                        parent_sku = EXCLUDED.parent_sku,
                        component_sku = EXCLUDED.component_sku,
                        description = EXCLUDED.description,
                        quantity = EXCLUDED.quantity,
                        unit = EXCLUDED.unit,
                        updated_at = EXCLUDED.updated_at
                    "#,
                )
                .bind(l.id)
                .bind(l.tenant_id)
                .bind(&l.parent_sku)
                .bind(&l.component_sku)
                .bind(&l.description)
                .bind(l.quantity)
                .bind(&l.unit)
                .bind(l.created_at)
                .bind(l.updated_at)
                .execute(&self.pool)
                .await?;
            }
            TenantRecord::StockItem(i) => {
                sqlx::query(
                    r#"
                    INSERT INTO stock_items (id, tenant_id, sku, description,
                                             quantity_on_hand, location, reorder_point,
                                             secondary_supplier_id, created_at, updated_at)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                    ON CONFLICT (id) DO UPDATE SET
                        sku = EXCLUDED.sku,
                        description = EXCLUDED.description,
                        quantity_on_hand = EXCLUDED.quantity_on_hand,
                        location = EXCLUDED.location,
                        reorder_point = EXCLUDED.reorder_point,
                        secondary_supplier_id = EXCLUDED.secondary_supplier_id,
                        updated_at = EXCLUDED.updated_at
                    "#,
                )
                .bind(i.id)
                .bind(i.tenant_id)
                .bind(&i.sku)
                .bind(&i.description)
                .bind(i.quantity_on_hand)
                .bind(&i.location)
                .bind(i.reorder_point)
                .bind(i.secondary_supplier_id)
                .bind(i.created_at)
                .bind(i.updated_at)
                .execute(&self.pool)
                .await?;
            }
            TenantRecord::NonConformance(n) => {
                sqlx::query(
                    r#"
                    INSERT INTO non_conformances (id, tenant_id, reference, severity,
                                                  description, status, reported_at,
                                                  created_at, updated_at)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                    ON CONFLICT (id) DO UPDATE SET
                        reference = EXCLUDED.reference,
                        severity = EXCLUDED.severity,
                        description = EXCLUDED.description,
                        status = EXCLUDED.status,
                        reported_at = EXCLUDED.reported_at,
                        updated_at = EXCLUDED.updated_at
                    "#,
                )
                .bind(n.id)
                .bind(n.tenant_id)
                .bind(&n.reference)
                .bind(&n.severity)
                .bind(&n.description)
                .bind(&n.status)
                .bind(n.reported_at)
                .bind(n.created_at)
                .bind(n.updated_at)
                .execute(&self.pool)
                .await?;
            }
        }

        Ok(())
    }

    async fn delete_record(
        &self,
        table: &str,
        id: Uuid,
        tenant_id: Uuid,
    ) -> Result<(), StoreError> {
        // Static statements only; the table name is never interpolated.
        let sql = match table {
            "suppliers" => "DELETE FROM suppliers WHERE id = $1 AND tenant_id = $2",
            "bom_lines" => "DELETE FROM bom_lines WHERE id = $1 AND tenant_id = $2",
            "stock_items" => "DELETE FROM stock_items WHERE id = $1 AND tenant_id = $2",
            "non_conformances" => {
                "DELETE FROM non_conformances WHERE id = $1 AND tenant_id = $2"
            }
            other => {
                return Err(StoreError::Query(format!("unknown table: {}", other)));
            }
        };

        sqlx::query(sql)
            .bind(id)
            .bind(tenant_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn columns(&self, table: &str) -> Result<Vec<String>, StoreError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT column_name::text
            FROM information_schema.columns
            WHERE table_schema = 'public'
              AND table_name = $1
            ORDER BY ordinal_position
            "#,
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    async fn execute_ddl(&self, ddl: &str) -> Result<(), StoreError> {
        sqlx::query(ddl).execute(&self.pool).await?;
        Ok(())
    }
}
