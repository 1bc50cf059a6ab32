//! Authentication and user administration handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::Role;
use uuid::Uuid;

use crate::error::{AppResult, ErrorResponse};
use crate::middleware::CurrentUser;
use crate::services::auth::{
    AuthResponse, AuthService, AuthTokens, ChangePasswordInput, LoginInput, RefreshInput,
    RegisterInput, UpdateRoleInput, UpdateStatusInput, User,
};
use crate::AppState;

fn auth_service(state: &AppState) -> AuthService {
    AuthService::new(state.db.clone(), &state.config)
}

/// Register endpoint handler
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = RegisterInput,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterInput>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let response = auth_service(&state).register(body).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Login endpoint handler
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginInput,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginInput>,
) -> AppResult<Json<AuthResponse>> {
    let response = auth_service(&state).login(body).await?;
    Ok(Json(response))
}

/// Refresh token endpoint handler
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "auth",
    request_body = RefreshInput,
    responses(
        (status = 200, description = "New token pair", body = AuthTokens),
        (status = 401, description = "Refresh token invalid, expired or revoked", body = ErrorResponse)
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshInput>,
) -> AppResult<Json<AuthTokens>> {
    let tokens = auth_service(&state)
        .refresh_token(&body.refresh_token)
        .await?;
    Ok(Json(tokens))
}

/// Logout endpoint handler
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    request_body = RefreshInput,
    responses((status = 204, description = "Refresh token revoked")),
    security(("bearer_auth" = []))
)]
pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<RefreshInput>,
) -> AppResult<StatusCode> {
    auth_service(&state).logout(&body.refresh_token).await?;
    tracing::info!(user_id = %user.user_id, "User logged out");
    Ok(StatusCode::NO_CONTENT)
}

/// Get current user endpoint handler
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    responses((status = 200, description = "Current user", body = User)),
    security(("bearer_auth" = []))
)]
pub async fn me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<User>> {
    let profile = auth_service(&state).get_user(user.user_id).await?;
    Ok(Json(profile))
}

/// Change the current user's password
#[utoipa::path(
    put,
    path = "/api/auth/me/password",
    tag = "auth",
    request_body = ChangePasswordInput,
    responses(
        (status = 204, description = "Password changed"),
        (status = 401, description = "Current password is wrong", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<ChangePasswordInput>,
) -> AppResult<StatusCode> {
    auth_service(&state)
        .change_password(user.user_id, body)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List users (admin)
#[utoipa::path(
    get,
    path = "/api/auth/users",
    tag = "auth",
    responses(
        (status = 200, description = "All users", body = [User]),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<User>>> {
    user.require(Role::Admin)?;
    let users = auth_service(&state).list_users().await?;
    Ok(Json(users))
}

/// Change a user's role (admin)
#[utoipa::path(
    put,
    path = "/api/auth/users/{id}/role",
    tag = "auth",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateRoleInput,
    responses(
        (status = 200, description = "Role updated", body = User),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 409, description = "Admins cannot demote themselves", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_user_role(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(body): Json<UpdateRoleInput>,
) -> AppResult<Json<User>> {
    user.require(Role::Admin)?;
    let updated = auth_service(&state)
        .update_user_role(user.user_id, user_id, body.role)
        .await?;
    Ok(Json(updated))
}

/// Enable or disable a user (admin)
#[utoipa::path(
    put,
    path = "/api/auth/users/{id}/status",
    tag = "auth",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateStatusInput,
    responses(
        (status = 200, description = "Status updated", body = User),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_user_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(body): Json<UpdateStatusInput>,
) -> AppResult<Json<User>> {
    user.require(Role::Admin)?;
    let updated = auth_service(&state)
        .set_user_active(user.user_id, user_id, body.is_active)
        .await?;
    Ok(Json(updated))
}
