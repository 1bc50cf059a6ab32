//! HTTP handlers for stock levels, movements, adjustments and transfers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{PaginatedResponse, Role};
use uuid::Uuid;

use crate::error::{AppResult, ErrorResponse};
use crate::handlers::PageQuery;
use crate::middleware::CurrentUser;
use crate::services::stock::{
    AdjustStockInput, AdjustmentFilter, LowStockItem, MovementFilter, ProductStock,
    RecordMovementInput, StockAdjustment, StockFilter, StockMovement, StockRecord, StockService,
    TransferResult, TransferStockInput,
};
use crate::AppState;

/// List stock levels per product and location
#[utoipa::path(
    get,
    path = "/api/stock",
    tag = "stock",
    params(PageQuery, StockFilter),
    responses((status = 200, description = "Page of stock records", body = PaginatedResponse<StockRecord>)),
    security(("bearer_auth" = []))
)]
pub async fn list_stock(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Query(page): Query<PageQuery>,
    Query(filter): Query<StockFilter>,
) -> AppResult<Json<PaginatedResponse<StockRecord>>> {
    let pagination = page.resolve(&state);
    let stock = StockService::new(state.db)
        .list_stock(&filter, pagination)
        .await?;
    Ok(Json(stock))
}

/// Stock of one product across all locations
#[utoipa::path(
    get,
    path = "/api/stock/products/{product_id}",
    tag = "stock",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Per-location stock and totals", body = ProductStock),
        (status = 404, description = "Product not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_product_stock(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ProductStock>> {
    let stock = StockService::new(state.db)
        .get_product_stock(product_id)
        .await?;
    Ok(Json(stock))
}

/// Products at or below their reorder level
#[utoipa::path(
    get,
    path = "/api/stock/low-stock",
    tag = "stock",
    responses((status = 200, description = "Low stock alerts", body = [LowStockItem])),
    security(("bearer_auth" = []))
)]
pub async fn low_stock_alerts(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
) -> AppResult<Json<Vec<LowStockItem>>> {
    let items = StockService::new(state.db).low_stock_alerts().await?;
    Ok(Json(items))
}

/// Movement history
#[utoipa::path(
    get,
    path = "/api/stock/movements",
    tag = "stock",
    params(PageQuery, MovementFilter),
    responses(
        (status = 200, description = "Page of movements", body = PaginatedResponse<StockMovement>),
        (status = 400, description = "Invalid date range", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_movements(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Query(page): Query<PageQuery>,
    Query(filter): Query<MovementFilter>,
) -> AppResult<Json<PaginatedResponse<StockMovement>>> {
    let pagination = page.resolve(&state);
    let movements = StockService::new(state.db)
        .list_movements(&filter, pagination)
        .await?;
    Ok(Json(movements))
}

/// Record a manual stock movement (manager)
#[utoipa::path(
    post,
    path = "/api/stock/movements",
    tag = "stock",
    request_body = RecordMovementInput,
    responses(
        (status = 201, description = "Movement recorded", body = StockMovement),
        (status = 422, description = "Insufficient stock", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn record_movement(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<RecordMovementInput>,
) -> AppResult<(StatusCode, Json<StockMovement>)> {
    user.require(Role::Manager)?;
    let movement = StockService::new(state.db)
        .record_movement(user.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(movement)))
}

/// Adjustment history
#[utoipa::path(
    get,
    path = "/api/stock/adjustments",
    tag = "stock",
    params(PageQuery, AdjustmentFilter),
    responses((status = 200, description = "Page of adjustments", body = PaginatedResponse<StockAdjustment>)),
    security(("bearer_auth" = []))
)]
pub async fn list_adjustments(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Query(page): Query<PageQuery>,
    Query(filter): Query<AdjustmentFilter>,
) -> AppResult<Json<PaginatedResponse<StockAdjustment>>> {
    let pagination = page.resolve(&state);
    let adjustments = StockService::new(state.db)
        .list_adjustments(&filter, pagination)
        .await?;
    Ok(Json(adjustments))
}

/// Adjust stock after a count or write-off (manager)
#[utoipa::path(
    post,
    path = "/api/stock/adjustments",
    tag = "stock",
    request_body = AdjustStockInput,
    responses(
        (status = 201, description = "Adjustment applied", body = StockAdjustment),
        (status = 422, description = "Adjustment would leave negative stock", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<AdjustStockInput>,
) -> AppResult<(StatusCode, Json<StockAdjustment>)> {
    user.require(Role::Manager)?;
    let adjustment = StockService::new(state.db)
        .adjust_stock(user.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(adjustment)))
}

/// Move stock between two locations (manager)
#[utoipa::path(
    post,
    path = "/api/stock/transfers",
    tag = "stock",
    request_body = TransferStockInput,
    responses(
        (status = 201, description = "Transfer completed", body = TransferResult),
        (status = 400, description = "Same source and destination", body = ErrorResponse),
        (status = 422, description = "Insufficient stock at source", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn transfer_stock(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<TransferStockInput>,
) -> AppResult<(StatusCode, Json<TransferResult>)> {
    user.require(Role::Manager)?;
    let transfer = StockService::new(state.db)
        .transfer_stock(user.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(transfer)))
}
