/// Stock item CRUD endpoints
///
/// The stock write path is where live schema drift shows up in practice:
/// `reorder_point` is a new column, and `secondary_supplier_id` replaced the
/// legacy `backup_supplier_id` column. Both are ensured before any write
/// that depends on them.
///
/// # Endpoints
///
/// - `GET    /v1/stock-items`     - List the tenant's stock items
/// - `POST   /v1/stock-items`     - Create a stock item
/// - `PUT    /v1/stock-items/:id` - Update a stock item
/// - `DELETE /v1/stock-items/:id` - Remove a stock item

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
use shopfloor_core::models::records::{StockItem, TenantRecord};
use shopfloor_core::models::Session;
use shopfloor_core::tenancy::WorkingRecord;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::SaveResponse,
};

const STOCK_DRIFT: &[ColumnSpec] = &[
    ColumnSpec {
        name: "reorder_point",
        ddl: "DOUBLE PRECISION",
        renamed_from: None,
    },
    ColumnSpec {
        name: "secondary_supplier_id",
        ddl: "UUID",
        renamed_from: Some("backup_supplier_id"),
    },
];

/// Create/update request body
#[derive(Debug, Deserialize, Validate)]
pub struct StockItemRequest {
    #[validate(length(min = 1, max = 100, message = "SKU must be 1-100 characters"))]
    pub sku: String,

    pub description: Option<String>,

    #[serde(default)]
    pub quantity_on_hand: f64,

    pub location: Option<String>,

    pub reorder_point: Option<f64>,

    pub secondary_supplier_id: Option<Uuid>,
}

/// List the tenant's stock items from the working set
pub async fn list_stock_items(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<Vec<StockItem>>> {
    let ctx = session.tenant_context();
    state.tenants.ensure_hydrated(&ctx).await;

    let handle = state.tenants.handle(ctx.tenant_id);
    Ok(Json(handle.list::<StockItem>()))
}

/// Create a stock item
pub async fn create_stock_item(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<StockItemRequest>,
) -> ApiResult<Json<SaveResponse<StockItem>>> {
    req.validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let ctx = session.tenant_context();
    state.tenants.ensure_hydrated(&ctx).await;

    let now = Utc::now();
    let item = StockItem {
        id: Uuid::new_v4(),
        tenant_id: ctx.tenant_id,
        sku: req.sku,
        description: req.description,
        quantity_on_hand: req.quantity_on_hand,
        location: req.location,
        reorder_point: req.reorder_point,
        secondary_supplier_id: req.secondary_supplier_id,
        created_at: now,
        updated_at: now,
    };

    let handle = state.tenants.handle(ctx.tenant_id);
    handle.append(item.clone());

    if handle.is_demo() {
        return Ok(Json(SaveResponse::demo(item)));
    }

    ensure_columns(state.store.as_ref(), StockItem::COLLECTION, STOCK_DRIFT).await?;

    let outcome = retry::persist(
        state.store.as_ref(),
        &TenantRecord::StockItem(item.clone()),
        &state.retry,
    )
    .await;

    Ok(Json(SaveResponse::from_outcome(item, &outcome)))
}

/// Update a stock item in place
pub async fn update_stock_item(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
    Json(req): Json<StockItemRequest>,
) -> ApiResult<Json<SaveResponse<StockItem>>> {
    req.validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let ctx = session.tenant_context();
    state.tenants.ensure_hydrated(&ctx).await;

    let handle = state.tenants.handle(ctx.tenant_id);
    let mut item = handle
        .find::<StockItem>(id)
        .ok_or_else(|| ApiError::NotFound("Stock item not found".to_string()))?;

    item.sku = req.sku;
    item.description = req.description;
    item.quantity_on_hand = req.quantity_on_hand;
    item.location = req.location;
    item.reorder_point = req.reorder_point;
    item.secondary_supplier_id = req.secondary_supplier_id;
    item.updated_at = Utc::now();

    handle.replace(id, item.clone());

    if handle.is_demo() {
        return Ok(Json(SaveResponse::demo(item)));
    }

    ensure_columns(state.store.as_ref(), StockItem::COLLECTION, STOCK_DRIFT).await?;

    let outcome = retry::persist(
        state.store.as_ref(),
        &TenantRecord::StockItem(item.clone()),
        &state.retry,
    )
    .await;

    Ok(Json(SaveResponse::from_outcome(item, &outcome)))
}

/// Remove a stock item
pub async fn delete_stock_item(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SaveResponse<Uuid>>> {
    let ctx = session.tenant_context();
    state.tenants.ensure_hydrated(&ctx).await;

    let handle = state.tenants.handle(ctx.tenant_id);
    if !handle.remove::<StockItem>(id) {
        return Err(ApiError::NotFound("Stock item not found".to_string()));
    }

    if handle.is_demo() {
        return Ok(Json(SaveResponse::demo(id)));
    }

    let outcome = retry::discard(
        state.store.as_ref(),
        StockItem::COLLECTION,
        id,
        ctx.tenant_id,
        &state.retry,
    )
    .await;

    Ok(Json(SaveResponse::from_outcome(id, &outcome)))
}
