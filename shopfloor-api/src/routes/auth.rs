/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - Register new account
/// - `POST /v1/auth/login` - Login and get a session token
/// - `POST /v1/auth/logout` - Invalidate the current session
/// - `GET /v1/auth/me` - Introspect the current session

use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use shopfloor_core::auth::password;
use shopfloor_core::models::{NewAccount, Session};

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
};

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (validated for strength)
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    /// Optional company to scope records under
    pub company_id: Option<Uuid>,

    /// Optional group within the company
    pub group_id: Option<Uuid>,

    /// Register as a demo user operating on the shared demo workspace
    #[serde(default)]
    pub demo: bool,
}

/// Register / login response
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// Account ID
    pub account_id: Uuid,

    /// Opaque session token; present it as a Bearer token
    pub token: String,

    /// Absolute session expiry
    pub expires_at: DateTime<Utc>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    pub password: String,
}

/// Session introspection response
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub account_id: Uuid,
    pub tenant_id: Uuid,
    pub role: String,
    pub is_demo: bool,
    pub expires_at: DateTime<Utc>,
}

fn validation_details(errors: validator::ValidationErrors) -> ApiError {
    let details: Vec<ValidationErrorDetail> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| ValidationErrorDetail {
                field: field.to_string(),
                message: error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Validation failed".to_string()),
            })
        })
        .collect();
    ApiError::ValidationError(details)
}

/// Register a new account
///
/// # Errors
///
/// - `409 Conflict`: Email already registered
/// - `422 Unprocessable Entity`: Validation failed
/// - `503 Service Unavailable`: Durable store unreachable
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<SessionResponse>> {
    req.validate().map_err(validation_details)?;

    password::validate_password_strength(&req.password).map_err(|e| {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "password".to_string(),
            message: e,
        }])
    })?;

    let password_hash = password::hash_password(&req.password)?;

    let account = state
        .accounts
        .register(NewAccount {
            email: req.email,
            password_hash,
            company_id: req.company_id,
            group_id: req.group_id,
            is_demo: req.demo,
            delegated_owner_id: None,
            role: "owner".to_string(),
        })
        .await?;

    let session = state.sessions.create_session(&account).await;

    Ok(Json(SessionResponse {
        account_id: account.id,
        token: session.token,
        expires_at: session.expires_at,
    }))
}

/// Login with email and password
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown email or wrong password (indistinguishable)
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<SessionResponse>> {
    req.validate().map_err(validation_details)?;

    let account = state
        .accounts
        .find_by_email(&req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

    let valid = password::verify_password(&req.password, &account.password_hash)?;
    if !valid {
        return Err(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    // Best-effort: a failed login stamp should not block the login itself.
    if let Err(err) = state.accounts.record_login(&account).await {
        tracing::warn!(account_id = %account.id, error = %err, "Failed to stamp last login");
    }

    let session = state.sessions.create_session(&account).await;

    Ok(Json(SessionResponse {
        account_id: account.id,
        token: session.token,
        expires_at: session.expires_at,
    }))
}

/// Invalidate the current session
pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<serde_json::Value>> {
    state.sessions.invalidate(&session.token).await;
    Ok(Json(serde_json::json!({ "logged_out": true })))
}

/// Introspect the current session
pub async fn me(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<MeResponse>> {
    Ok(Json(MeResponse {
        account_id: session.user_id,
        tenant_id: state.sessions.effective_tenant_id(&session),
        role: session.role.clone(),
        is_demo: session.is_demo,
        expires_at: session.expires_at,
    }))
}
