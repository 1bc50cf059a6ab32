//! HTTP handlers for purchase orders

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
use crate::services::purchase_order::{
    CreatePurchaseOrderInput, PurchaseOrder, PurchaseOrderDetail, PurchaseOrderFilter,
    PurchaseOrderService, ReceivePurchaseOrderInput, UpdatePurchaseOrderInput,
};
use crate::AppState;

/// List purchase orders
#[utoipa::path(
    get,
    path = "/api/purchase-orders",
    tag = "purchase-orders",
    params(PageQuery, PurchaseOrderFilter),
    responses((status = 200, description = "Page of purchase orders", body = PaginatedResponse<PurchaseOrder>)),
    security(("bearer_auth" = []))
)]
pub async fn list_purchase_orders(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Query(page): Query<PageQuery>,
    Query(filter): Query<PurchaseOrderFilter>,
) -> AppResult<Json<PaginatedResponse<PurchaseOrder>>> {
    let pagination = page.resolve(&state);
    let orders = PurchaseOrderService::new(state.db)
        .list_purchase_orders(&filter, pagination)
        .await?;
    Ok(Json(orders))
}

/// Get a purchase order with its lines
#[utoipa::path(
    get,
    path = "/api/purchase-orders/{id}",
    tag = "purchase-orders",
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Purchase order", body = PurchaseOrderDetail),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_purchase_order(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<PurchaseOrderDetail>> {
    let order = PurchaseOrderService::new(state.db)
        .get_purchase_order(order_id)
        .await?;
    Ok(Json(order))
}

/// Create a draft purchase order (manager)
#[utoipa::path(
    post,
    path = "/api/purchase-orders",
    tag = "purchase-orders",
    request_body = CreatePurchaseOrderInput,
    responses(
        (status = 201, description = "Purchase order created", body = PurchaseOrderDetail),
        (status = 400, description = "Invalid lines", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_purchase_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreatePurchaseOrderInput>,
) -> AppResult<(StatusCode, Json<PurchaseOrderDetail>)> {
    user.require(Role::Manager)?;
    let order = PurchaseOrderService::new(state.db)
        .create_purchase_order(user.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Update a draft purchase order (manager)
#[utoipa::path(
    put,
    path = "/api/purchase-orders/{id}",
    tag = "purchase-orders",
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    request_body = UpdatePurchaseOrderInput,
    responses(
        (status = 200, description = "Purchase order updated", body = PurchaseOrderDetail),
        (status = 422, description = "Order is no longer a draft", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_purchase_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(input): Json<UpdatePurchaseOrderInput>,
) -> AppResult<Json<PurchaseOrderDetail>> {
    user.require(Role::Manager)?;
    let order = PurchaseOrderService::new(state.db)
        .update_purchase_order(user.user_id, order_id, input)
        .await?;
    Ok(Json(order))
}

/// Submit a draft to the supplier (manager)
#[utoipa::path(
    post,
    path = "/api/purchase-orders/{id}/submit",
    tag = "purchase-orders",
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Purchase order submitted", body = PurchaseOrderDetail),
        (status = 422, description = "Invalid status transition", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn submit_purchase_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<PurchaseOrderDetail>> {
    user.require(Role::Manager)?;
    let order = PurchaseOrderService::new(state.db)
        .submit_purchase_order(user.user_id, order_id)
        .await?;
    Ok(Json(order))
}

/// Receive goods against a submitted order (manager)
#[utoipa::path(
    post,
    path = "/api/purchase-orders/{id}/receive",
    tag = "purchase-orders",
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    request_body = ReceivePurchaseOrderInput,
    responses(
        (status = 200, description = "Goods received", body = PurchaseOrderDetail),
        (status = 400, description = "Quantity exceeds the outstanding amount", body = ErrorResponse),
        (status = 422, description = "Order cannot be received", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn receive_purchase_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(input): Json<ReceivePurchaseOrderInput>,
) -> AppResult<Json<PurchaseOrderDetail>> {
    user.require(Role::Manager)?;
    let order = PurchaseOrderService::new(state.db)
        .receive_purchase_order(user.user_id, order_id, input)
        .await?;
    Ok(Json(order))
}

/// Cancel a purchase order (manager)
#[utoipa::path(
    post,
    path = "/api/purchase-orders/{id}/cancel",
    tag = "purchase-orders",
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Purchase order cancelled", body = PurchaseOrderDetail),
        (status = 422, description = "Invalid status transition", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn cancel_purchase_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<PurchaseOrderDetail>> {
    user.require(Role::Manager)?;
    let order = PurchaseOrderService::new(state.db)
        .cancel_purchase_order(user.user_id, order_id)
        .await?;
    Ok(Json(order))
}

/// Delete a draft or cancelled purchase order (admin)
#[utoipa::path(
    delete,
    path = "/api/purchase-orders/{id}",
    tag = "purchase-orders",
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 204, description = "Purchase order deleted"),
        (status = 422, description = "Order cannot be deleted in its status", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_purchase_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    user.require(Role::Admin)?;
    PurchaseOrderService::new(state.db)
        .delete_purchase_order(user.user_id, order_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
