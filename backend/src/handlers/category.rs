//! HTTP handlers for product categories

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::Role;
use uuid::Uuid;

use crate::error::{AppResult, ErrorResponse};
use crate::middleware::CurrentUser;
use crate::services::category::{
    Category, CategoryService, CreateCategoryInput, UpdateCategoryInput,
};
use crate::AppState;

/// List categories
#[utoipa::path(
    get,
    path = "/api/categories",
    tag = "categories",
    responses((status = 200, description = "All categories", body = [Category])),
    security(("bearer_auth" = []))
)]
pub async fn list_categories(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
) -> AppResult<Json<Vec<Category>>> {
    let categories = CategoryService::new(state.db).list_categories().await?;
    Ok(Json(categories))
}

/// Get a category
#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    tag = "categories",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category", body = Category),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_category(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(category_id): Path<Uuid>,
) -> AppResult<Json<Category>> {
    let category = CategoryService::new(state.db)
        .get_category(category_id)
        .await?;
    Ok(Json(category))
}

/// Create a category (manager)
#[utoipa::path(
    post,
    path = "/api/categories",
    tag = "categories",
    request_body = CreateCategoryInput,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 409, description = "Name already used", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_category(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateCategoryInput>,
) -> AppResult<(StatusCode, Json<Category>)> {
    user.require(Role::Manager)?;
    let category = CategoryService::new(state.db)
        .create_category(user.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// Update a category (manager)
#[utoipa::path(
    put,
    path = "/api/categories/{id}",
    tag = "categories",
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = UpdateCategoryInput,
    responses((status = 200, description = "Category updated", body = Category)),
    security(("bearer_auth" = []))
)]
pub async fn update_category(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(category_id): Path<Uuid>,
    Json(input): Json<UpdateCategoryInput>,
) -> AppResult<Json<Category>> {
    user.require(Role::Manager)?;
    let category = CategoryService::new(state.db)
        .update_category(user.user_id, category_id, input)
        .await?;
    Ok(Json(category))
}

/// Delete a category (admin)
#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    tag = "categories",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 409, description = "Category still has products", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_category(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(category_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    user.require(Role::Admin)?;
    CategoryService::new(state.db)
        .delete_category(user.user_id, category_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
