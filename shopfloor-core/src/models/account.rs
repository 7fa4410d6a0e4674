/// Registered account model
///
/// An account is the durable identity record behind a login. It carries the
/// tenant-scoping fields that later flow into every session issued for it.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE accounts (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email VARCHAR(255) NOT NULL UNIQUE,
///     password_hash TEXT NOT NULL,
///     company_id UUID,
///     group_id UUID,
///     is_demo BOOLEAN NOT NULL DEFAULT FALSE,
///     delegated_owner_id UUID,
///     plan VARCHAR(50) NOT NULL DEFAULT 'trial',
///     role VARCHAR(50) NOT NULL DEFAULT 'member',
///     trial_ends_at TIMESTAMPTZ,
///     last_login_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// Accounts are created on registration and updated on login (last-login
/// timestamp). They are never hard-deleted by this layer.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Billing plan types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountPlan {
    /// Trial plan (14 days)
    Trial,

    /// Standard plan
    Standard,

    /// Professional plan
    Pro,
}

impl AccountPlan {
    /// Converts plan to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountPlan::Trial => "trial",
            AccountPlan::Standard => "standard",
            AccountPlan::Pro => "pro",
        }
    }

    /// Parses plan from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "trial" => Some(AccountPlan::Trial),
            "standard" => Some(AccountPlan::Standard),
            "pro" => Some(AccountPlan::Pro),
            _ => None,
        }
    }
}

/// Registered account record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    /// Unique account ID (UUID v4)
    pub id: Uuid,

    /// Login email (unique, case-preserved)
    pub email: String,

    /// Argon2id password hash in PHC string format
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Company the account belongs to (tenant-scoping field)
    pub company_id: Option<Uuid>,

    /// Optional group within the company (tenant-scoping field)
    pub group_id: Option<Uuid>,

    /// Whether this account operates on the shared demo tenant
    pub is_demo: bool,

    /// For invited users: the owning account whose tenant they work in
    pub delegated_owner_id: Option<Uuid>,

    /// Current billing plan
    pub plan: String,

    /// Role within the tenant (e.g. "owner", "member")
    pub role: String,

    /// End of the trial window, if on trial
    pub trial_ends_at: Option<DateTime<Utc>>,

    /// Last successful login
    pub last_login_at: Option<DateTime<Utc>>,

    /// When the account was created
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Gets the parsed plan enum
    pub fn get_plan(&self) -> Option<AccountPlan> {
        AccountPlan::from_str(&self.plan)
    }

    /// Whether the trial window has lapsed
    pub fn trial_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.trial_ends_at, Some(ends) if now >= ends)
    }
}

/// Input for creating a new account
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub company_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub is_demo: bool,
    pub delegated_owner_id: Option<Uuid>,
    pub role: String,
}

impl NewAccount {
    /// Materializes a full account record with a fresh id, trial plan, and
    /// a 14-day trial window starting now.
    pub fn into_account(self, now: DateTime<Utc>) -> Account {
        Account {
            id: Uuid::new_v4(),
            email: self.email,
            password_hash: self.password_hash,
            company_id: self.company_id,
            group_id: self.group_id,
            is_demo: self.is_demo,
            delegated_owner_id: self.delegated_owner_id,
            plan: AccountPlan::Trial.as_str().to_string(),
            role: self.role,
            trial_ends_at: Some(now + Duration::days(14)),
            last_login_at: None,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_account() -> NewAccount {
        NewAccount {
            email: "ops@example.com".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            company_id: Some(Uuid::new_v4()),
            group_id: None,
            is_demo: false,
            delegated_owner_id: None,
            role: "owner".to_string(),
        }
    }

    #[test]
    fn test_account_plan_round_trip() {
        assert_eq!(AccountPlan::from_str("trial"), Some(AccountPlan::Trial));
        assert_eq!(AccountPlan::from_str("standard"), Some(AccountPlan::Standard));
        assert_eq!(AccountPlan::from_str("pro"), Some(AccountPlan::Pro));
        assert_eq!(AccountPlan::from_str("enterprise"), None);
        assert_eq!(AccountPlan::Pro.as_str(), "pro");
    }

    #[test]
    fn test_into_account_starts_trial() {
        let now = Utc::now();
        let account = new_account().into_account(now);

        assert_eq!(account.plan, "trial");
        assert_eq!(account.trial_ends_at, Some(now + Duration::days(14)));
        assert!(!account.trial_expired(now));
        assert!(account.trial_expired(now + Duration::days(15)));
    }

    #[test]
    fn test_no_trial_window_never_expires() {
        let now = Utc::now();
        let mut account = new_account().into_account(now);
        account.trial_ends_at = None;

        assert!(!account.trial_expired(now + Duration::days(365)));
    }
}
