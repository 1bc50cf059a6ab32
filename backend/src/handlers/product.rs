//! HTTP handlers for the product catalog

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
use crate::services::product::{
    CreateProductInput, Product, ProductDetail, ProductFilter, ProductService,
    UpdateProductInput,
};
use crate::AppState;

/// List products
#[utoipa::path(
    get,
    path = "/api/products",
    tag = "products",
    params(PageQuery, ProductFilter),
    responses((status = 200, description = "Page of products", body = PaginatedResponse<Product>)),
    security(("bearer_auth" = []))
)]
pub async fn list_products(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Query(page): Query<PageQuery>,
    Query(filter): Query<ProductFilter>,
) -> AppResult<Json<PaginatedResponse<Product>>> {
    let pagination = page.resolve(&state);
    let products = ProductService::new(state.db)
        .list_products(&filter, pagination)
        .await?;
    Ok(Json(products))
}

/// Get a product with stock totals
#[utoipa::path(
    get,
    path = "/api/products/{id}",
    tag = "products",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product with stock totals", body = ProductDetail),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_product(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ProductDetail>> {
    let product = ProductService::new(state.db).get_product(product_id).await?;
    Ok(Json(product))
}

/// Create a product (manager)
#[utoipa::path(
    post,
    path = "/api/products",
    tag = "products",
    request_body = CreateProductInput,
    responses(
        (status = 201, description = "Product created", body = Product),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "SKU already exists", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateProductInput>,
) -> AppResult<(StatusCode, Json<Product>)> {
    user.require(Role::Manager)?;
    let product = ProductService::new(state.db)
        .create_product(user.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Update a product (manager)
#[utoipa::path(
    put,
    path = "/api/products/{id}",
    tag = "products",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductInput,
    responses(
        (status = 200, description = "Product updated", body = Product),
        (status = 409, description = "SKU already exists", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> AppResult<Json<Product>> {
    user.require(Role::Manager)?;
    let product = ProductService::new(state.db)
        .update_product(user.user_id, product_id, input)
        .await?;
    Ok(Json(product))
}

/// Deactivate a product (admin)
#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    tag = "products",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses((status = 204, description = "Product deactivated")),
    security(("bearer_auth" = []))
)]
pub async fn delete_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    user.require(Role::Admin)?;
    ProductService::new(state.db)
        .delete_product(user.user_id, product_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
