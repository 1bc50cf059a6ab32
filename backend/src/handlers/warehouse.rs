//! HTTP handlers for warehouses and their locations

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::Role;
use uuid::Uuid;

use crate::error::{AppResult, ErrorResponse};
use crate::middleware::CurrentUser;
use crate::services::warehouse::{
    CreateLocationInput, CreateWarehouseInput, Location, UpdateLocationInput,
    UpdateWarehouseInput, Warehouse, WarehouseDetail, WarehouseService,
};
use crate::AppState;

/// List warehouses
#[utoipa::path(
    get,
    path = "/api/warehouses",
    tag = "warehouses",
    responses((status = 200, description = "All warehouses", body = [Warehouse])),
    security(("bearer_auth" = []))
)]
pub async fn list_warehouses(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
) -> AppResult<Json<Vec<Warehouse>>> {
    let warehouses = WarehouseService::new(state.db).list_warehouses().await?;
    Ok(Json(warehouses))
}

/// Get a warehouse with its locations
#[utoipa::path(
    get,
    path = "/api/warehouses/{id}",
    tag = "warehouses",
    params(("id" = Uuid, Path, description = "Warehouse ID")),
    responses(
        (status = 200, description = "Warehouse with locations", body = WarehouseDetail),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_warehouse(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(warehouse_id): Path<Uuid>,
) -> AppResult<Json<WarehouseDetail>> {
    let warehouse = WarehouseService::new(state.db)
        .get_warehouse(warehouse_id)
        .await?;
    Ok(Json(warehouse))
}

/// Create a warehouse (manager)
#[utoipa::path(
    post,
    path = "/api/warehouses",
    tag = "warehouses",
    request_body = CreateWarehouseInput,
    responses(
        (status = 201, description = "Warehouse created", body = Warehouse),
        (status = 409, description = "Code already used", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_warehouse(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateWarehouseInput>,
) -> AppResult<(StatusCode, Json<Warehouse>)> {
    user.require(Role::Manager)?;
    let warehouse = WarehouseService::new(state.db)
        .create_warehouse(user.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(warehouse)))
}

/// Update a warehouse (manager)
#[utoipa::path(
    put,
    path = "/api/warehouses/{id}",
    tag = "warehouses",
    params(("id" = Uuid, Path, description = "Warehouse ID")),
    request_body = UpdateWarehouseInput,
    responses((status = 200, description = "Warehouse updated", body = Warehouse)),
    security(("bearer_auth" = []))
)]
pub async fn update_warehouse(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(warehouse_id): Path<Uuid>,
    Json(input): Json<UpdateWarehouseInput>,
) -> AppResult<Json<Warehouse>> {
    user.require(Role::Manager)?;
    let warehouse = WarehouseService::new(state.db)
        .update_warehouse(user.user_id, warehouse_id, input)
        .await?;
    Ok(Json(warehouse))
}

/// Delete an empty warehouse (admin)
#[utoipa::path(
    delete,
    path = "/api/warehouses/{id}",
    tag = "warehouses",
    params(("id" = Uuid, Path, description = "Warehouse ID")),
    responses(
        (status = 204, description = "Warehouse deleted"),
        (status = 409, description = "Warehouse still holds stock", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_warehouse(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(warehouse_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    user.require(Role::Admin)?;
    WarehouseService::new(state.db)
        .delete_warehouse(user.user_id, warehouse_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List the locations of a warehouse
#[utoipa::path(
    get,
    path = "/api/warehouses/{id}/locations",
    tag = "warehouses",
    params(("id" = Uuid, Path, description = "Warehouse ID")),
    responses((status = 200, description = "Locations", body = [Location])),
    security(("bearer_auth" = []))
)]
pub async fn list_locations(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(warehouse_id): Path<Uuid>,
) -> AppResult<Json<Vec<Location>>> {
    let service = WarehouseService::new(state.db);
    // 404 for an unknown warehouse rather than an empty list
    let detail = service.get_warehouse(warehouse_id).await?;
    Ok(Json(detail.locations))
}

/// Add a location to a warehouse (manager)
#[utoipa::path(
    post,
    path = "/api/warehouses/{id}/locations",
    tag = "warehouses",
    params(("id" = Uuid, Path, description = "Warehouse ID")),
    request_body = CreateLocationInput,
    responses(
        (status = 201, description = "Location created", body = Location),
        (status = 409, description = "Code already used in this warehouse", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_location(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(warehouse_id): Path<Uuid>,
    Json(input): Json<CreateLocationInput>,
) -> AppResult<(StatusCode, Json<Location>)> {
    user.require(Role::Manager)?;
    let location = WarehouseService::new(state.db)
        .create_location(user.user_id, warehouse_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(location)))
}

/// Update a location (manager)
#[utoipa::path(
    put,
    path = "/api/warehouses/{id}/locations/{location_id}",
    tag = "warehouses",
    params(
        ("id" = Uuid, Path, description = "Warehouse ID"),
        ("location_id" = Uuid, Path, description = "Location ID")
    ),
    request_body = UpdateLocationInput,
    responses((status = 200, description = "Location updated", body = Location)),
    security(("bearer_auth" = []))
)]
pub async fn update_location(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((warehouse_id, location_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<UpdateLocationInput>,
) -> AppResult<Json<Location>> {
    user.require(Role::Manager)?;
    let location = WarehouseService::new(state.db)
        .update_location(user.user_id, warehouse_id, location_id, input)
        .await?;
    Ok(Json(location))
}

/// Delete an empty location (admin)
#[utoipa::path(
    delete,
    path = "/api/warehouses/{id}/locations/{location_id}",
    tag = "warehouses",
    params(
        ("id" = Uuid, Path, description = "Warehouse ID"),
        ("location_id" = Uuid, Path, description = "Location ID")
    ),
    responses(
        (status = 204, description = "Location deleted"),
        (status = 409, description = "Location still holds stock", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_location(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((warehouse_id, location_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    user.require(Role::Admin)?;
    WarehouseService::new(state.db)
        .delete_location(user.user_id, warehouse_id, location_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
