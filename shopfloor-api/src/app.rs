/// Application state and router builder
///
/// This module defines the shared application state and provides a function
/// to build the Axum router with all routes and middleware.
///
/// Every authenticated request flows through the same sequence: the session
/// layer resolves the bearer token to a `Session` (failing closed to 401),
/// and each handler derives its tenant context from that session, never
/// from request input, before touching tenant data.

use std::sync::Arc;

use axum::{
    extract::Request,
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use shopfloor_core::accounts::AccountDirectory;
use shopfloor_core::db::{PgStore, RetryPolicy, TenantStore};
use shopfloor_core::sessions::SessionStore;
use shopfloor_core::tenancy::TenantCache;

use crate::config::Config;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor; all
/// components are behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,

    /// Durable store gateway
    pub store: Arc<PgStore>,

    /// Registered account directory
    pub accounts: Arc<AccountDirectory>,

    /// Session issue/resolve
    pub sessions: Arc<SessionStore>,

    /// Tenant working sets and hydration
    pub tenants: Arc<TenantCache>,

    /// Retry policy for durable record writes
    pub retry: RetryPolicy,
}

impl AppState {
    /// Wires up all core components around one connection pool
    pub fn new(pool: PgPool, config: Config) -> Self {
        let store = Arc::new(PgStore::new(pool));
        let gateway: Arc<dyn TenantStore> = store.clone();

        let accounts = Arc::new(AccountDirectory::new(gateway.clone()));
        let sessions = Arc::new(SessionStore::new(gateway.clone(), config.cache.session_ttl()));
        let tenants = Arc::new(TenantCache::new(gateway, config.cache.hydration_ttl()));
        let retry = RetryPolicy::new(
            config.cache.write_max_attempts,
            config.cache.write_backoff(),
        );

        Self {
            config: Arc::new(config),
            store,
            accounts,
            sessions,
            tenants,
            retry,
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── /health                     # Health check (public)
/// └── /v1/
///     ├── /auth/
///     │   ├── POST /register      # Register new account (public)
///     │   ├── POST /login         # Login, returns session token (public)
///     │   ├── POST /logout        # Invalidate session (authenticated)
///     │   └── GET  /me            # Session introspection (authenticated)
///     ├── /suppliers/             # Supplier CRUD (authenticated)
///     └── /stock-items/           # Stock item CRUD (authenticated)
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let public_auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login));

    let session_auth_routes = Router::new()
        .route("/logout", post(routes::auth::logout))
        .route("/me", get(routes::auth::me))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_auth_layer,
        ));

    let supplier_routes = Router::new()
        .route(
            "/",
            get(routes::suppliers::list_suppliers).post(routes::suppliers::create_supplier),
        )
        .route(
            "/:id",
            axum::routing::put(routes::suppliers::update_supplier)
                .delete(routes::suppliers::delete_supplier),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_auth_layer,
        ));

    let stock_routes = Router::new()
        .route(
            "/",
            get(routes::stock::list_stock_items).post(routes::stock::create_stock_item),
        )
        .route(
            "/:id",
            axum::routing::put(routes::stock::update_stock_item)
                .delete(routes::stock::delete_stock_item),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_auth_layer,
        ));

    let v1_routes = Router::new()
        .nest("/auth", public_auth_routes.merge(session_auth_routes))
        .nest("/suppliers", supplier_routes)
        .nest("/stock-items", stock_routes);

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

/// Session authentication middleware layer
///
/// Extracts the bearer token, resolves it through the session store (cache
/// first, durable probe second), and injects the resolved `Session` into
/// request extensions. Expired, unknown, and unresolvable tokens all produce
/// the same 401.
async fn session_auth_layer(
    state: axum::extract::State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, crate::error::ApiError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            crate::error::ApiError::Unauthorized("Missing authorization header".to_string())
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        crate::error::ApiError::BadRequest("Expected Bearer token".to_string())
    })?;

    let session = state
        .sessions
        .resolve_session(token)
        .await
        .ok_or_else(|| crate::error::ApiError::Unauthorized("Invalid or expired session".to_string()))?;

    req.extensions_mut().insert(session);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    // AppState construction requires a connection pool; covered by the
    // ignored integration tests in tests/api_tests.rs.
}
