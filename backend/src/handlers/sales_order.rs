//! HTTP handlers for sales orders

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
use crate::services::sales_order::{
    CreateSalesOrderInput, SalesOrder, SalesOrderDetail, SalesOrderFilter, SalesOrderService,
    UpdateSalesOrderInput,
};
use crate::AppState;

/// List sales orders
#[utoipa::path(
    get,
    path = "/api/sales-orders",
    tag = "sales-orders",
    params(PageQuery, SalesOrderFilter),
    responses((status = 200, description = "Page of sales orders", body = PaginatedResponse<SalesOrder>)),
    security(("bearer_auth" = []))
)]
pub async fn list_sales_orders(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Query(page): Query<PageQuery>,
    Query(filter): Query<SalesOrderFilter>,
) -> AppResult<Json<PaginatedResponse<SalesOrder>>> {
    let pagination = page.resolve(&state);
    let orders = SalesOrderService::new(state.db)
        .list_sales_orders(&filter, pagination)
        .await?;
    Ok(Json(orders))
}

/// Get a sales order with its lines
#[utoipa::path(
    get,
    path = "/api/sales-orders/{id}",
    tag = "sales-orders",
    params(("id" = Uuid, Path, description = "Sales order ID")),
    responses(
        (status = 200, description = "Sales order", body = SalesOrderDetail),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_sales_order(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<SalesOrderDetail>> {
    let order = SalesOrderService::new(state.db)
        .get_sales_order(order_id)
        .await?;
    Ok(Json(order))
}

/// Create a pending sales order
#[utoipa::path(
    post,
    path = "/api/sales-orders",
    tag = "sales-orders",
    request_body = CreateSalesOrderInput,
    responses(
        (status = 201, description = "Sales order created", body = SalesOrderDetail),
        (status = 400, description = "Invalid lines", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_sales_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateSalesOrderInput>,
) -> AppResult<(StatusCode, Json<SalesOrderDetail>)> {
    let order = SalesOrderService::new(state.db)
        .create_sales_order(user.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Update a pending sales order (manager)
#[utoipa::path(
    put,
    path = "/api/sales-orders/{id}",
    tag = "sales-orders",
    params(("id" = Uuid, Path, description = "Sales order ID")),
    request_body = UpdateSalesOrderInput,
    responses(
        (status = 200, description = "Sales order updated", body = SalesOrderDetail),
        (status = 422, description = "Order is no longer pending", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_sales_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(input): Json<UpdateSalesOrderInput>,
) -> AppResult<Json<SalesOrderDetail>> {
    user.require(Role::Manager)?;
    let order = SalesOrderService::new(state.db)
        .update_sales_order(user.user_id, order_id, input)
        .await?;
    Ok(Json(order))
}

/// Confirm an order and reserve its stock (manager)
#[utoipa::path(
    post,
    path = "/api/sales-orders/{id}/confirm",
    tag = "sales-orders",
    params(("id" = Uuid, Path, description = "Sales order ID")),
    responses(
        (status = 200, description = "Sales order confirmed", body = SalesOrderDetail),
        (status = 422, description = "Insufficient stock or invalid transition", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn confirm_sales_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<SalesOrderDetail>> {
    user.require(Role::Manager)?;
    let order = SalesOrderService::new(state.db)
        .confirm_sales_order(user.user_id, order_id)
        .await?;
    Ok(Json(order))
}

/// Ship a confirmed order (manager)
#[utoipa::path(
    post,
    path = "/api/sales-orders/{id}/ship",
    tag = "sales-orders",
    params(("id" = Uuid, Path, description = "Sales order ID")),
    responses(
        (status = 200, description = "Sales order shipped", body = SalesOrderDetail),
        (status = 422, description = "Invalid status transition", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn ship_sales_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<SalesOrderDetail>> {
    user.require(Role::Manager)?;
    let order = SalesOrderService::new(state.db)
        .ship_sales_order(user.user_id, order_id)
        .await?;
    Ok(Json(order))
}

/// Mark a shipped order as delivered (manager)
#[utoipa::path(
    post,
    path = "/api/sales-orders/{id}/deliver",
    tag = "sales-orders",
    params(("id" = Uuid, Path, description = "Sales order ID")),
    responses(
        (status = 200, description = "Sales order delivered", body = SalesOrderDetail),
        (status = 422, description = "Invalid status transition", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn deliver_sales_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<SalesOrderDetail>> {
    user.require(Role::Manager)?;
    let order = SalesOrderService::new(state.db)
        .deliver_sales_order(user.user_id, order_id)
        .await?;
    Ok(Json(order))
}

/// Cancel an order, releasing any reservation (manager)
#[utoipa::path(
    post,
    path = "/api/sales-orders/{id}/cancel",
    tag = "sales-orders",
    params(("id" = Uuid, Path, description = "Sales order ID")),
    responses(
        (status = 200, description = "Sales order cancelled", body = SalesOrderDetail),
        (status = 422, description = "Invalid status transition", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn cancel_sales_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<SalesOrderDetail>> {
    user.require(Role::Manager)?;
    let order = SalesOrderService::new(state.db)
        .cancel_sales_order(user.user_id, order_id)
        .await?;
    Ok(Json(order))
}

/// Delete a pending or cancelled sales order (admin)
#[utoipa::path(
    delete,
    path = "/api/sales-orders/{id}",
    tag = "sales-orders",
    params(("id" = Uuid, Path, description = "Sales order ID")),
    responses(
        (status = 204, description = "Sales order deleted"),
        (status = 422, description = "Order cannot be deleted in its status", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_sales_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    user.require(Role::Admin)?;
    SalesOrderService::new(state.db)
        .delete_sales_order(user.user_id, order_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
