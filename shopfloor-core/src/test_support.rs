//! Shared test fixtures: a scripted in-memory `TenantStore` for exercising
//! retry, hydration, schema-evolution, and session behavior under controlled
//! failures, plus record constructors used across test modules.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::db::store::{StoreError, TenantStore};
use crate::models::records::{BomLine, NonConformance, StockItem, Supplier, TenantRecord};
use crate::models::{Account, Session, TenantContext};

pub(crate) fn sample_supplier(tenant_id: Uuid, name: &str) -> Supplier {
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

pub(crate) fn sample_stock_item(tenant_id: Uuid, sku: &str) -> StockItem {
    let now = Utc::now();
    StockItem {
        id: Uuid::new_v4(),
        tenant_id,
        sku: sku.to_string(),
        description: None,
        quantity_on_hand: 0.0,
        location: None,
        reorder_point: None,
        secondary_supplier_id: None,
        created_at: now,
        updated_at: now,
    }
}

pub(crate) fn sample_session(user_id: Uuid, expires_at: DateTime<Utc>) -> Session {
    Session {
        token: crate::auth::token::generate_token(user_id, Utc::now()),
        user_id,
        company_id: None,
        group_id: None,
        is_demo: false,
        delegated_owner_id: None,
        role: "member".to_string(),
        created_at: Utc::now(),
        expires_at,
    }
}

/// Scripted in-memory durable store.
///
/// Behaves like a healthy store by default; individual failure modes are
/// switched on per test.
#[derive(Default)]
pub(crate) struct MockStore {
    accounts: Mutex<HashMap<Uuid, Account>>,
    sessions: Mutex<HashMap<String, Session>>,
    session_inserts: AtomicU32,
    fail_session_inserts: Mutex<Option<StoreError>>,
    fail_session_lookups: AtomicBool,

    suppliers: Mutex<Vec<Supplier>>,
    bom_lines: Mutex<Vec<BomLine>>,
    stock_items: Mutex<Vec<StockItem>>,
    non_conformances: Mutex<Vec<NonConformance>>,
    failing_collections: Mutex<HashSet<&'static str>>,
    read_counts: Mutex<HashMap<&'static str, u32>>,
    read_gate: Mutex<Option<Arc<Semaphore>>>,

    upserts: AtomicU32,
    deletes: AtomicU32,
    upsert_failures: Mutex<VecDeque<StoreError>>,
    fail_all_upserts: Mutex<Option<StoreError>>,
    fail_all_deletes: Mutex<Option<StoreError>>,

    table_columns: Mutex<HashMap<String, Vec<String>>>,
    ddl_log: Mutex<Vec<String>>,
    ddl_failures: Mutex<VecDeque<StoreError>>,
    ddl_failure_column_override: Mutex<Option<(String, Vec<String>)>>,
}

impl MockStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    // -- configuration -----------------------------------------------------

    pub(crate) fn set_suppliers(&self, suppliers: Vec<Supplier>) {
        *self.suppliers.lock().unwrap() = suppliers;
    }

    pub(crate) fn set_stock_items(&self, items: Vec<StockItem>) {
        *self.stock_items.lock().unwrap() = items;
    }

    pub(crate) fn fail_collection(&self, collection: &'static str) {
        self.failing_collections.lock().unwrap().insert(collection);
    }

    pub(crate) fn heal_collections(&self) {
        self.failing_collections.lock().unwrap().clear();
    }

    /// Blocks every collection read on a zero-permit semaphore until the
    /// test hands out permits.
    pub(crate) fn gate_reads(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.read_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub(crate) fn read_count(&self, collection: &'static str) -> u32 {
        *self.read_counts.lock().unwrap().get(collection).unwrap_or(&0)
    }

    pub(crate) fn fail_next_upserts(&self, count: u32, err: StoreError) {
        let mut queue = self.upsert_failures.lock().unwrap();
        for _ in 0..count {
            queue.push_back(err.clone());
        }
    }

    pub(crate) fn fail_upserts_forever(&self, err: StoreError) {
        *self.fail_all_upserts.lock().unwrap() = Some(err);
    }

    pub(crate) fn fail_deletes_forever(&self, err: StoreError) {
        *self.fail_all_deletes.lock().unwrap() = Some(err);
    }

    pub(crate) fn upsert_count(&self) -> u32 {
        self.upserts.load(Ordering::SeqCst)
    }

    pub(crate) fn set_columns(&self, table: &str, columns: &[&str]) {
        self.table_columns.lock().unwrap().insert(
            table.to_string(),
            columns.iter().map(|c| c.to_string()).collect(),
        );
    }

    pub(crate) fn column_names(&self, table: &str) -> Vec<String> {
        self.table_columns
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn ddl_statements(&self) -> Vec<String> {
        self.ddl_log.lock().unwrap().clone()
    }

    pub(crate) fn fail_next_ddl(&self, err: StoreError) {
        self.ddl_failures.lock().unwrap().push_back(err);
    }

    /// When the next DDL failure fires, also rewrite the table's columns;
    /// simulates a concurrent migrator finishing first.
    pub(crate) fn on_next_ddl_failure_set_columns(&self, table: &str, columns: &[&str]) {
        *self.ddl_failure_column_override.lock().unwrap() = Some((
            table.to_string(),
            columns.iter().map(|c| c.to_string()).collect(),
        ));
    }

    pub(crate) fn put_session(&self, session: Session) {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.token.clone(), session);
    }

    pub(crate) fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub(crate) fn session_insert_count(&self) -> u32 {
        self.session_inserts.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_session_inserts(&self, err: StoreError) {
        *self.fail_session_inserts.lock().unwrap() = Some(err);
    }

    pub(crate) fn fail_session_lookups(&self, failing: bool) {
        self.fail_session_lookups.store(failing, Ordering::SeqCst);
    }

    // -- internals ---------------------------------------------------------

    async fn collection_read(&self, collection: &'static str) -> Result<(), StoreError> {
        // Counted on entry so tests can observe a read that is parked on
        // the gate.
        *self.read_counts.lock().unwrap().entry(collection).or_insert(0) += 1;

        let gate = self.read_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            let permit = gate.acquire().await.expect("gate closed");
            permit.forget();
        }

        if self.failing_collections.lock().unwrap().contains(collection) {
            return Err(StoreError::Unavailable(format!(
                "scripted outage reading {}",
                collection
            )));
        }
        Ok(())
    }

    fn take_upsert_failure(&self) -> Option<StoreError> {
        if let Some(err) = self.upsert_failures.lock().unwrap().pop_front() {
            return Some(err);
        }
        self.fail_all_upserts.lock().unwrap().clone()
    }

    fn apply_ddl(&self, ddl: &str) -> Result<(), StoreError> {
        let tokens: Vec<&str> = ddl.split_whitespace().collect();
        let mut tables = self.table_columns.lock().unwrap();

        if ddl.starts_with("ALTER TABLE") && tokens.get(3) == Some(&"ADD") {
            let table = tokens[2];
            let column = tokens[5].to_string();
            let columns = tables.entry(table.to_string()).or_default();
            if columns.contains(&column) {
                return Err(StoreError::AlreadyExists(format!(
                    "column \"{}\" of relation \"{}\" already exists",
                    column, table
                )));
            }
            columns.push(column);
            return Ok(());
        }

        if ddl.starts_with("ALTER TABLE") && tokens.get(3) == Some(&"RENAME") {
            let table = tokens[2];
            let from = tokens[5].to_string();
            let to = tokens[7].to_string();
            let columns = tables.entry(table.to_string()).or_default();
            if columns.contains(&to) {
                return Err(StoreError::AlreadyExists(format!(
                    "column \"{}\" of relation \"{}\" already exists",
                    to, table
                )));
            }
            match columns.iter_mut().find(|c| **c == from) {
                Some(slot) => {
                    *slot = to;
                    Ok(())
                }
                None => Err(StoreError::Schema(format!(
                    "column \"{}\" of relation \"{}\" does not exist",
                    from, table
                ))),
            }
        } else {
            // CREATE INDEX IF NOT EXISTS and friends: accept silently.
            Ok(())
        }
    }
}

#[async_trait]
impl TenantStore for MockStore {
    async fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        self.accounts
            .lock()
            .unwrap()
            .insert(account.id, account.clone());
        Ok(())
    }

    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .values()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn record_login(&self, account_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(account) = self.accounts.lock().unwrap().get_mut(&account_id) {
            account.last_login_at = Some(at);
        }
        Ok(())
    }

    async fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
        self.session_inserts.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.fail_session_inserts.lock().unwrap().clone() {
            return Err(err);
        }
        self.put_session(session.clone());
        Ok(())
    }

    async fn session_by_token(&self, token: &str) -> Result<Option<Session>, StoreError> {
        if self.fail_session_lookups.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("scripted session outage".to_string()));
        }
        Ok(self.sessions.lock().unwrap().get(token).cloned())
    }

    async fn delete_session(&self, token: &str) -> Result<(), StoreError> {
        self.sessions.lock().unwrap().remove(token);
        Ok(())
    }

    async fn delete_expired_sessions(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > cutoff);
        Ok((before - sessions.len()) as u64)
    }

    async fn suppliers_for(&self, ctx: &TenantContext) -> Result<Vec<Supplier>, StoreError> {
        self.collection_read("suppliers").await?;
        Ok(self
            .suppliers
            .lock()
            .unwrap()
            .iter()
            .filter(|s| {
                s.tenant_id == ctx.tenant_id
                    && (ctx.company_id.is_none() || s.company_id == ctx.company_id)
            })
            .cloned()
            .collect())
    }

    async fn bom_lines_for(&self, ctx: &TenantContext) -> Result<Vec<BomLine>, StoreError> {
        self.collection_read("bom_lines").await?;
        Ok(self
            .bom_lines
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.tenant_id == ctx.tenant_id)
            .cloned()
            .collect())
    }

    async fn stock_items_for(&self, ctx: &TenantContext) -> Result<Vec<StockItem>, StoreError> {
        self.collection_read("stock_items").await?;
        Ok(self
            .stock_items
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.tenant_id == ctx.tenant_id)
            .cloned()
            .collect())
    }

    async fn non_conformances_for(
        &self,
        ctx: &TenantContext,
    ) -> Result<Vec<NonConformance>, StoreError> {
        self.collection_read("non_conformances").await?;
        Ok(self
            .non_conformances
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.tenant_id == ctx.tenant_id)
            .cloned()
            .collect())
    }

    async fn upsert_record(&self, record: &TenantRecord) -> Result<(), StoreError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.take_upsert_failure() {
            return Err(err);
        }

        match record {
            TenantRecord::Supplier(s) => {
                let mut suppliers = self.suppliers.lock().unwrap();
                match suppliers.iter_mut().find(|x| x.id == s.id) {
                    Some(slot) => *slot = s.clone(),
                    None => suppliers.push(s.clone()),
                }
            }
            TenantRecord::BomLine(l) => {
                let mut lines = self.bom_lines.lock().unwrap();
                match lines.iter_mut().find(|x| x.id == l.id) {
                    Some(slot) => *slot = l.clone(),
                    None => lines.push(l.clone()),
                }
            }
            TenantRecord::StockItem(i) => {
                let mut items = self.stock_items.lock().unwrap();
                match items.iter_mut().find(|x| x.id == i.id) {
                    Some(slot) => *slot = i.clone(),
                    None => items.push(i.clone()),
                }
            }
            TenantRecord::NonConformance(n) => {
                let mut reports = self.non_conformances.lock().unwrap();
                match reports.iter_mut().find(|x| x.id == n.id) {
                    Some(slot) => *slot = n.clone(),
                    None => reports.push(n.clone()),
                }
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
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.fail_all_deletes.lock().unwrap().clone() {
            return Err(err);
        }

        match table {
            "suppliers" => self
                .suppliers
                .lock()
                .unwrap()
                .retain(|s| !(s.id == id && s.tenant_id == tenant_id)),
            "bom_lines" => self
                .bom_lines
                .lock()
                .unwrap()
                .retain(|l| !(l.id == id && l.tenant_id == tenant_id)),
            "stock_items" => self
                .stock_items
                .lock()
                .unwrap()
                .retain(|i| !(i.id == id && i.tenant_id == tenant_id)),
            "non_conformances" => self
                .non_conformances
                .lock()
                .unwrap()
                .retain(|n| !(n.id == id && n.tenant_id == tenant_id)),
            other => return Err(StoreError::Query(format!("unknown table: {}", other))),
        }
        Ok(())
    }

    async fn columns(&self, table: &str) -> Result<Vec<String>, StoreError> {
        Ok(self.column_names(table))
    }

    async fn execute_ddl(&self, ddl: &str) -> Result<(), StoreError> {
        self.ddl_log.lock().unwrap().push(ddl.to_string());

        if let Some(err) = self.ddl_failures.lock().unwrap().pop_front() {
            if let Some((table, columns)) = self.ddl_failure_column_override.lock().unwrap().take()
            {
                self.table_columns.lock().unwrap().insert(table, columns);
            }
            return Err(err);
        }

        self.apply_ddl(ddl)
    }
}
