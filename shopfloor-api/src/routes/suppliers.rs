/// Supplier CRUD endpoints
///
/// Suppliers are company-scoped in addition to tenant-scoped: the hydrator
/// loads them filtered by both ids from the session-derived context.
///
/// # Endpoints
///
/// - `GET    /v1/suppliers`     - List the tenant's suppliers
/// - `POST   /v1/suppliers`     - Create a supplier
/// - `PUT    /v1/suppliers/:id` - Update a supplier
/// - `DELETE /v1/suppliers/:id` - Remove a supplier

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use shopfloor_core::db::evolve::{ensure_columns, ColumnSpec};
use shopfloor_core::db::retry;
use shopfloor_core::models::records::{Supplier, TenantRecord};
use shopfloor_core::models::Session;
use shopfloor_core::tenancy::WorkingRecord;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::SaveResponse,
};

/// Columns the current supplier write path depends on. Databases created by
/// older releases gain them here, before the first write that needs them.
const SUPPLIER_DRIFT: &[ColumnSpec] = &[ColumnSpec {
    name: "approval_status",
    ddl: "VARCHAR(50) NOT NULL DEFAULT 'pending'",
    renamed_from: None,
}];

/// Create/update request body
#[derive(Debug, Deserialize, Validate)]
pub struct SupplierRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    pub contact_name: Option<String>,

    #[validate(email(message = "Invalid contact email"))]
    pub contact_email: Option<String>,

    pub phone: Option<String>,

    /// "pending", "approved", or "suspended"; defaults to "pending"
    pub approval_status: Option<String>,
}

/// List the tenant's suppliers from the working set
pub async fn list_suppliers(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<Vec<Supplier>>> {
    let ctx = session.tenant_context();
    state.tenants.ensure_hydrated(&ctx).await;

    let handle = state.tenants.handle(ctx.tenant_id);
    Ok(Json(handle.list::<Supplier>()))
}

/// Create a supplier
///
/// The working set is updated optimistically; the durable write runs after,
/// with bounded retry, and a failure degrades the response instead of
/// discarding the record.
pub async fn create_supplier(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<SupplierRequest>,
) -> ApiResult<Json<SaveResponse<Supplier>>> {
    req.validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let ctx = session.tenant_context();
    state.tenants.ensure_hydrated(&ctx).await;

    let now = Utc::now();
    let supplier = Supplier {
        id: Uuid::new_v4(),
        tenant_id: ctx.tenant_id,
        company_id: ctx.company_id,
        name: req.name,
        contact_name: req.contact_name,
        contact_email: req.contact_email,
        phone: req.phone,
        approval_status: req.approval_status.unwrap_or_else(|| "pending".to_string()),
        created_at: now,
        updated_at: now,
    };

    let handle = state.tenants.handle(ctx.tenant_id);
    handle.append(supplier.clone());

    if handle.is_demo() {
        return Ok(Json(SaveResponse::demo(supplier)));
    }

    // Migration failure aborts the dependent write as a hard error; a
    // durable-write failure after it only degrades the response.
    ensure_columns(state.store.as_ref(), Supplier::COLLECTION, SUPPLIER_DRIFT).await?;

    let outcome = retry::persist(
        state.store.as_ref(),
        &TenantRecord::Supplier(supplier.clone()),
        &state.retry,
    )
    .await;

    Ok(Json(SaveResponse::from_outcome(supplier, &outcome)))
}

/// Update a supplier in place
pub async fn update_supplier(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
    Json(req): Json<SupplierRequest>,
) -> ApiResult<Json<SaveResponse<Supplier>>> {
    req.validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let ctx = session.tenant_context();
    state.tenants.ensure_hydrated(&ctx).await;

    let handle = state.tenants.handle(ctx.tenant_id);
    let mut supplier = handle
        .find::<Supplier>(id)
        .ok_or_else(|| ApiError::NotFound("Supplier not found".to_string()))?;

    supplier.name = req.name;
    supplier.contact_name = req.contact_name;
    supplier.contact_email = req.contact_email;
    supplier.phone = req.phone;
    if let Some(status) = req.approval_status {
        supplier.approval_status = status;
    }
    supplier.updated_at = Utc::now();

    handle.replace(id, supplier.clone());

    if handle.is_demo() {
        return Ok(Json(SaveResponse::demo(supplier)));
    }

    ensure_columns(state.store.as_ref(), Supplier::COLLECTION, SUPPLIER_DRIFT).await?;

    let outcome = retry::persist(
        state.store.as_ref(),
        &TenantRecord::Supplier(supplier.clone()),
        &state.retry,
    )
    .await;

    Ok(Json(SaveResponse::from_outcome(supplier, &outcome)))
}

/// Remove a supplier
pub async fn delete_supplier(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SaveResponse<Uuid>>> {
    let ctx = session.tenant_context();
    state.tenants.ensure_hydrated(&ctx).await;

    let handle = state.tenants.handle(ctx.tenant_id);
    if !handle.remove::<Supplier>(id) {
        return Err(ApiError::NotFound("Supplier not found".to_string()));
    }

    if handle.is_demo() {
        return Ok(Json(SaveResponse::demo(id)));
    }

    let outcome = retry::discard(
        state.store.as_ref(),
        Supplier::COLLECTION,
        id,
        ctx.tenant_id,
        &state.retry,
    )
    .await;

    Ok(Json(SaveResponse::from_outcome(id, &outcome)))
}
