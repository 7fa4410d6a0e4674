/// Session issue, resolution, and expiry
///
/// The [`SessionStore`] keeps an in-process cache of issued sessions in
/// front of the durable copy. The cache exists because the durable store
/// may be slow or unreachable; the durable copy exists because the runtime
/// gives no process affinity: the next request may land on an instance
/// that has never seen the token.
///
/// # Failure semantics
///
/// Identity is security-relevant, so every failure resolves toward
/// "unauthenticated": an unreachable store on lookup is logged and treated
/// as an absent session, and an expired session behaves identically to one
/// that never existed, no matter which cache still holds a stale copy.
///
/// The durable write at session creation is a deliberate asymmetry with
/// record persistence: it runs once, failures are logged and ignored, and
/// there is no retry. The issuing instance can always serve the session
/// from its own cache; a lost durable copy costs at most a re-login after
/// a recycle.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::token;
use crate::db::store::{StoreError, TenantStore};
use crate::models::{Account, Session};

/// Issues and resolves session tokens
pub struct SessionStore {
    store: Arc<dyn TenantStore>,
    ttl: Duration,
    cache: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    /// Creates a session store issuing sessions with the given TTL
    /// (typically 8 hours).
    pub fn new(store: Arc<dyn TenantStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Issues a session for an authenticated account.
    ///
    /// The token is unguessable and never reused. The session is cached
    /// in-process unconditionally; the durable copy is written once,
    /// best-effort.
    pub async fn create_session(&self, account: &Account) -> Session {
        let now = Utc::now();
        let session = Session {
            token: token::generate_token(account.id, now),
            user_id: account.id,
            company_id: account.company_id,
            group_id: account.group_id,
            is_demo: account.is_demo,
            delegated_owner_id: account.delegated_owner_id,
            role: account.role.clone(),
            created_at: now,
            expires_at: now + self.ttl,
        };

        // Write now, ignore failure, never retry.
        if let Err(err) = self.store.insert_session(&session).await {
            warn!(
                user_id = %account.id,
                error = %err,
                "Session not durably persisted; serving from in-process cache only"
            );
        }

        self.cache
            .write()
            .expect("session cache lock poisoned")
            .insert(session.token.clone(), session.clone());

        debug!(user_id = %account.id, "Session issued");
        session
    }

    /// Resolves a presented token to a live session.
    ///
    /// Checks the in-process cache first, then probes the durable store and
    /// promotes a hit into the cache. Expired and unknown tokens are
    /// indistinguishable to the caller.
    pub async fn resolve_session(&self, token: &str) -> Option<Session> {
        if !token::is_well_formed(token) {
            return None;
        }

        let now = Utc::now();

        let cached = self
            .cache
            .read()
            .expect("session cache lock poisoned")
            .get(token)
            .cloned();

        if let Some(session) = cached {
            if session.is_expired(now) {
                self.cache
                    .write()
                    .expect("session cache lock poisoned")
                    .remove(token);
                debug!(user_id = %session.user_id, "Expired session evicted from cache");
                return None;
            }
            return Some(session);
        }

        let session = match self.store.session_by_token(token).await {
            Ok(found) => found?,
            Err(err) => {
                // Fail closed: an unreachable store must look like "no
                // session", not take the process down.
                warn!(error = %err, "Session lookup failed; treating as unauthenticated");
                return None;
            }
        };

        if session.is_expired(now) {
            // The durable copy is cleaned up by the sweep, not here.
            return None;
        }

        self.cache
            .write()
            .expect("session cache lock poisoned")
            .insert(token.to_string(), session.clone());

        Some(session)
    }

    /// The tenant id downstream components operate on for this session.
    pub fn effective_tenant_id(&self, session: &Session) -> Uuid {
        session.effective_tenant_id()
    }

    /// Drops a session from the cache and, best-effort, from the durable
    /// store.
    pub async fn invalidate(&self, token: &str) {
        self.cache
            .write()
            .expect("session cache lock poisoned")
            .remove(token);

        if let Err(err) = self.store.delete_session(token).await {
            warn!(error = %err, "Durable session delete failed; sweep will retry");
        }
    }

    /// Removes expired sessions from the cache and the durable store.
    ///
    /// Lazy per-lookup expiry already keeps expired sessions unusable; this
    /// sweep reclaims the storage.
    pub async fn sweep_expired(&self) -> Result<u64, StoreError> {
        let now = Utc::now();

        self.cache
            .write()
            .expect("session cache lock poisoned")
            .retain(|_, session| !session.is_expired(now));

        let removed = self.store.delete_expired_sessions(now).await?;
        if removed > 0 {
            info!(removed, "Swept expired sessions");
        }
        Ok(removed)
    }

    #[cfg(test)]
    pub(crate) fn cached_session_count(&self) -> usize {
        self.cache.read().expect("session cache lock poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewAccount;
    use crate::test_support::{sample_session, MockStore};

    fn account() -> Account {
        NewAccount {
            email: "ops@example.com".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            company_id: Some(Uuid::new_v4()),
            group_id: None,
            is_demo: false,
            delegated_owner_id: None,
            role: "owner".to_string(),
        }
        .into_account(Utc::now())
    }

    fn store_pair(ttl: Duration) -> (Arc<MockStore>, SessionStore) {
        let store = Arc::new(MockStore::new());
        let sessions = SessionStore::new(Arc::clone(&store) as Arc<dyn TenantStore>, ttl);
        (store, sessions)
    }

    #[tokio::test]
    async fn test_create_and_resolve() {
        let (store, sessions) = store_pair(Duration::hours(8));
        let account = account();

        let session = sessions.create_session(&account).await;
        assert_eq!(store.session_count(), 1);

        let resolved = sessions.resolve_session(&session.token).await.expect("live");
        assert_eq!(resolved.user_id, account.id);
        assert_eq!(resolved.expires_at, session.created_at + Duration::hours(8));
    }

    #[tokio::test]
    async fn test_create_survives_durable_write_failure() {
        let (store, sessions) = store_pair(Duration::hours(8));
        store.fail_session_inserts(StoreError::Unavailable("down".to_string()));

        let session = sessions.create_session(&account()).await;

        // Single-shot write: attempted once, never retried.
        assert_eq!(store.session_insert_count(), 1);
        // The issuing instance still serves the session from its cache.
        assert!(sessions.resolve_session(&session.token).await.is_some());
    }

    #[tokio::test]
    async fn test_unknown_token_is_absent() {
        let (_, sessions) = store_pair(Duration::hours(8));
        let stray = "a".repeat(token::TOKEN_LENGTH);
        assert!(sessions.resolve_session(&stray).await.is_none());
        assert!(sessions.resolve_session("malformed").await.is_none());
    }

    #[tokio::test]
    async fn test_expired_cached_session_is_absent_and_evicted() {
        // Negative TTL: the session is expired the instant it is issued,
        // while a copy still sits in the in-process cache.
        let (_, sessions) = store_pair(Duration::seconds(-1));
        let session = sessions.create_session(&account()).await;
        assert_eq!(sessions.cached_session_count(), 1);

        assert!(sessions.resolve_session(&session.token).await.is_none());
        assert_eq!(sessions.cached_session_count(), 0);
    }

    #[tokio::test]
    async fn test_durable_hit_is_promoted_into_cache() {
        let (store, sessions) = store_pair(Duration::hours(8));
        let durable = sample_session(Uuid::new_v4(), Utc::now() + Duration::hours(1));
        store.put_session(durable.clone());

        let resolved = sessions.resolve_session(&durable.token).await.expect("live");
        assert_eq!(resolved.user_id, durable.user_id);

        // Promotion: a later outage no longer affects this token.
        store.fail_session_lookups(true);
        assert!(sessions.resolve_session(&durable.token).await.is_some());
    }

    #[tokio::test]
    async fn test_expired_durable_session_is_absent() {
        let (store, sessions) = store_pair(Duration::hours(8));
        let stale = sample_session(Uuid::new_v4(), Utc::now() - Duration::seconds(1));
        store.put_session(stale.clone());

        assert!(sessions.resolve_session(&stale.token).await.is_none());
        assert_eq!(sessions.cached_session_count(), 0);
    }

    #[tokio::test]
    async fn test_store_outage_fails_closed() {
        let (store, sessions) = store_pair(Duration::hours(8));
        let durable = sample_session(Uuid::new_v4(), Utc::now() + Duration::hours(1));
        store.put_session(durable.clone());
        store.fail_session_lookups(true);

        // The session exists durably, but the store cannot be reached: the
        // request resolves toward unauthenticated instead of erroring.
        assert!(sessions.resolve_session(&durable.token).await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_removes_both_copies() {
        let (store, sessions) = store_pair(Duration::hours(8));
        let session = sessions.create_session(&account()).await;

        sessions.invalidate(&session.token).await;

        assert!(sessions.resolve_session(&session.token).await.is_none());
        assert_eq!(store.session_count(), 0);
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let (store, sessions) = store_pair(Duration::hours(8));
        let live = sessions.create_session(&account()).await;
        store.put_session(sample_session(Uuid::new_v4(), Utc::now() - Duration::minutes(5)));
        store.put_session(sample_session(Uuid::new_v4(), Utc::now() - Duration::hours(9)));

        let removed = sessions.sweep_expired().await.expect("sweep");

        assert_eq!(removed, 2);
        assert_eq!(store.session_count(), 1);
        assert!(sessions.resolve_session(&live.token).await.is_some());
    }
}
