//! Authentication middleware
//!
//! JWT authentication and role-based access control

use axum::{
    extract::{Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use shared::Role;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::AuthService;
use crate::AppState;

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    /// Check if the user's role grants at least `required`
    pub fn has_role(&self, required: Role) -> bool {
        self.role.satisfies(required)
    }

    /// Fail with 403 unless the user's role grants at least `required`
    pub fn require(&self, required: Role) -> AppResult<()> {
        if self.has_role(required) {
            Ok(())
        } else {
            tracing::debug!(
                user_id = %self.user_id,
                role = %self.role,
                required = %required,
                "Access denied"
            );
            Err(AppError::InsufficientPermissions)
        }
    }
}

/// Authentication middleware that validates JWT bearer tokens and stores
/// the resulting `AuthUser` in the request extensions
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or_else(|| {
        AppError::Unauthorized("Missing or invalid Authorization header".to_string())
    })?;

    let claims =
        AuthService::new(state.db.clone(), &state.config).validate_token(bearer.token())?;

    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;

    let auth_user = AuthUser {
        user_id,
        email: claims.email,
        role: claims.role,
    };

    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            email: "someone@example.com".to_string(),
            role,
        }
    }

    #[test]
    fn test_require_role() {
        assert!(user(Role::Admin).require(Role::Manager).is_ok());
        assert!(user(Role::Manager).require(Role::Manager).is_ok());
        assert!(matches!(
            user(Role::User).require(Role::Manager),
            Err(AppError::InsufficientPermissions)
        ));
        assert!(user(Role::Manager).require(Role::Admin).is_err());
    }
}
