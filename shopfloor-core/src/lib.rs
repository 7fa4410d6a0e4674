//! # Shopfloor Core Library
//!
//! This crate contains the tenant state cache and durability layer shared by
//! the Shopfloor API server: the durable store gateway, schema evolution,
//! bounded-retry persistence, session resolution, and the per-tenant working
//! set with its hydration rules.
//!
//! ## Module Organization
//!
//! - `db`: Connection pool, durable store gateway, schema evolver, retry
//! - `models`: Accounts, sessions, and the per-collection business records
//! - `auth`: Password hashing and session token generation
//! - `accounts`: Registered account directory with an in-process email cache
//! - `sessions`: Session issue/resolve/expire with an in-process cache
//! - `tenancy`: Tenant working sets, registry, and the hydrator

pub mod accounts;
pub mod auth;
pub mod db;
pub mod models;
pub mod sessions;
pub mod tenancy;

#[cfg(test)]
pub(crate) mod test_support;

/// Current version of the Shopfloor core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
