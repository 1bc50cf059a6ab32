//! HTTP handlers for suppliers

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
use crate::services::product::Product;
use crate::services::supplier::{
    CreateSupplierInput, Supplier, SupplierFilter, SupplierService, UpdateSupplierInput,
};
use crate::AppState;

/// List suppliers
#[utoipa::path(
    get,
    path = "/api/suppliers",
    tag = "suppliers",
    params(PageQuery, SupplierFilter),
    responses((status = 200, description = "Page of suppliers", body = PaginatedResponse<Supplier>)),
    security(("bearer_auth" = []))
)]
pub async fn list_suppliers(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Query(page): Query<PageQuery>,
    Query(filter): Query<SupplierFilter>,
) -> AppResult<Json<PaginatedResponse<Supplier>>> {
    let pagination = page.resolve(&state);
    let suppliers = SupplierService::new(state.db)
        .list_suppliers(&filter, pagination)
        .await?;
    Ok(Json(suppliers))
}

/// Get a supplier
#[utoipa::path(
    get,
    path = "/api/suppliers/{id}",
    tag = "suppliers",
    params(("id" = Uuid, Path, description = "Supplier ID")),
    responses(
        (status = 200, description = "Supplier", body = Supplier),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_supplier(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(supplier_id): Path<Uuid>,
) -> AppResult<Json<Supplier>> {
    let supplier = SupplierService::new(state.db)
        .get_supplier(supplier_id)
        .await?;
    Ok(Json(supplier))
}

/// Products supplied by a supplier
#[utoipa::path(
    get,
    path = "/api/suppliers/{id}/products",
    tag = "suppliers",
    params(("id" = Uuid, Path, description = "Supplier ID")),
    responses((status = 200, description = "Products of the supplier", body = [Product])),
    security(("bearer_auth" = []))
)]
pub async fn list_supplier_products(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(supplier_id): Path<Uuid>,
) -> AppResult<Json<Vec<Product>>> {
    let products = SupplierService::new(state.db)
        .list_supplier_products(supplier_id)
        .await?;
    Ok(Json(products))
}

/// Create a supplier (manager)
#[utoipa::path(
    post,
    path = "/api/suppliers",
    tag = "suppliers",
    request_body = CreateSupplierInput,
    responses((status = 201, description = "Supplier created", body = Supplier)),
    security(("bearer_auth" = []))
)]
pub async fn create_supplier(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateSupplierInput>,
) -> AppResult<(StatusCode, Json<Supplier>)> {
    user.require(Role::Manager)?;
    let supplier = SupplierService::new(state.db)
        .create_supplier(user.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

/// Update a supplier (manager)
#[utoipa::path(
    put,
    path = "/api/suppliers/{id}",
    tag = "suppliers",
    params(("id" = Uuid, Path, description = "Supplier ID")),
    request_body = UpdateSupplierInput,
    responses((status = 200, description = "Supplier updated", body = Supplier)),
    security(("bearer_auth" = []))
)]
pub async fn update_supplier(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(supplier_id): Path<Uuid>,
    Json(input): Json<UpdateSupplierInput>,
) -> AppResult<Json<Supplier>> {
    user.require(Role::Manager)?;
    let supplier = SupplierService::new(state.db)
        .update_supplier(user.user_id, supplier_id, input)
        .await?;
    Ok(Json(supplier))
}

/// Deactivate a supplier (admin)
#[utoipa::path(
    delete,
    path = "/api/suppliers/{id}",
    tag = "suppliers",
    params(("id" = Uuid, Path, description = "Supplier ID")),
    responses(
        (status = 204, description = "Supplier deactivated"),
        (status = 409, description = "Supplier has open purchase orders", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_supplier(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(supplier_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    user.require(Role::Admin)?;
    SupplierService::new(state.db)
        .delete_supplier(user.user_id, supplier_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
