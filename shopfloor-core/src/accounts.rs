/// Registered account directory
///
/// Durable identity lookups with an in-process by-email cache: the first
/// lookup for an email probes the durable store, later lookups are served
/// from memory. Registration and login-stamping write through to the store.
///
/// Unlike session resolution, account operations propagate store errors:
/// registration and login are the places where a hard failure is the right
/// user experience.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use tracing::debug;

use crate::db::store::{StoreError, TenantStore};
use crate::models::{Account, NewAccount};

pub struct AccountDirectory {
    store: Arc<dyn TenantStore>,
    by_email: RwLock<HashMap<String, Account>>,
}

impl AccountDirectory {
    pub fn new(store: Arc<dyn TenantStore>) -> Self {
        Self {
            store,
            by_email: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a new account and caches it.
    ///
    /// # Errors
    ///
    /// Propagates store errors, including unique-violation on a duplicate
    /// email.
    pub async fn register(&self, new_account: NewAccount) -> Result<Account, StoreError> {
        let account = new_account.into_account(Utc::now());
        self.store.insert_account(&account).await?;

        self.by_email
            .write()
            .expect("account cache lock poisoned")
            .insert(account.email.clone(), account.clone());

        debug!(account_id = %account.id, "Account registered");
        Ok(account)
    }

    /// Finds an account by email, serving from the in-process cache after
    /// the first durable lookup.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        if let Some(account) = self
            .by_email
            .read()
            .expect("account cache lock poisoned")
            .get(email)
        {
            return Ok(Some(account.clone()));
        }

        let Some(account) = self.store.account_by_email(email).await? else {
            return Ok(None);
        };

        self.by_email
            .write()
            .expect("account cache lock poisoned")
            .insert(account.email.clone(), account.clone());

        Ok(Some(account))
    }

    /// Stamps a successful login on the account, in cache and durably.
    pub async fn record_login(&self, account: &Account) -> Result<(), StoreError> {
        let now = Utc::now();
        self.store.record_login(account.id, now).await?;

        if let Some(cached) = self
            .by_email
            .write()
            .expect("account cache lock poisoned")
            .get_mut(&account.email)
        {
            cached.last_login_at = Some(now);
        }
        Ok(())
    }
}
