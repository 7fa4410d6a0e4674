/// Session model and tenant resolution
///
/// A session ties an opaque token to an account and to the tenant-scoping
/// fields captured at login time. A session is valid iff `now < expires_at`;
/// an expired session must behave identically to one that never existed,
/// regardless of stale cached copies.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE sessions (
///     token VARCHAR(64) PRIMARY KEY,
///     user_id UUID NOT NULL,
///     company_id UUID,
///     group_id UUID,
///     is_demo BOOLEAN NOT NULL DEFAULT FALSE,
///     delegated_owner_id UUID,
///     role VARCHAR(50) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL,
///     expires_at TIMESTAMPTZ NOT NULL
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reserved tenant id for the shared demo tenant.
///
/// All sessions flagged `is_demo` resolve to this tenant. Its working set is
/// seeded in-process at startup, shared across demo sessions, never hydrated
/// from the durable store, and never written back.
pub const DEMO_TENANT_ID: Uuid = Uuid::nil();

/// An issued session
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    /// Opaque, unguessable token (hex-encoded digest)
    pub token: String,

    /// Account this session was issued to
    pub user_id: Uuid,

    /// Company captured from the account at login
    pub company_id: Option<Uuid>,

    /// Group captured from the account at login
    pub group_id: Option<Uuid>,

    /// Whether this session operates on the shared demo tenant
    pub is_demo: bool,

    /// For invited users: the owning account whose tenant they work in
    pub delegated_owner_id: Option<Uuid>,

    /// Role captured from the account at login
    pub role: String,

    /// When the session was issued
    pub created_at: DateTime<Utc>,

    /// Absolute expiry; the session is valid strictly before this instant
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session has expired as of `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// The tenant id all downstream components operate on.
    ///
    /// Demo sessions resolve to [`DEMO_TENANT_ID`]; invited users resolve to
    /// the delegating owner's id; everyone else owns their own tenant. This
    /// indirection keeps the demo/real and owner/invitee distinctions out of
    /// the hydrator and working-set code entirely.
    pub fn effective_tenant_id(&self) -> Uuid {
        if self.is_demo {
            DEMO_TENANT_ID
        } else {
            self.delegated_owner_id.unwrap_or(self.user_id)
        }
    }

    /// The scoping context handed to the hydrator and gateway reads.
    pub fn tenant_context(&self) -> TenantContext {
        TenantContext {
            tenant_id: self.effective_tenant_id(),
            company_id: self.company_id,
        }
    }
}

/// Scoping context carried into every tenant-aware call.
///
/// The tenant id is always derived from a resolved session, never from
/// caller-supplied input; this is the multi-tenant isolation boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantContext {
    /// Effective tenant id (see [`Session::effective_tenant_id`])
    pub tenant_id: Uuid,

    /// Secondary scoping id for collections that are company-scoped
    pub company_id: Option<Uuid>,
}

impl TenantContext {
    /// Whether this context addresses the shared demo tenant
    pub fn is_demo(&self) -> bool {
        self.tenant_id == DEMO_TENANT_ID
    }
}
