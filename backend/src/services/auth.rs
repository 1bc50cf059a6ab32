//! Authentication service for user registration, login, and token management

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use bcrypt::{hash, verify};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared::Role;
use sqlx::{FromRow, PgPool};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::services::audit::{self, AuditEntry};

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
    bcrypt_cost: u32,
}

/// Input for registering a new account
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterInput {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(custom = "shared::password_rule")]
    pub password: String,
}

/// Input for logging in
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginInput {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Input for refreshing or revoking a refresh token
#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshInput {
    pub refresh_token: String,
}

/// Input for changing the current user's password
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordInput {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(custom = "shared::password_rule")]
    pub new_password: String,
}

/// Input for changing a user's role
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRoleInput {
    pub role: Role,
}

/// Input for enabling or disabling a user
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusInput {
    pub is_active: bool,
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub email: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

/// Authentication tokens
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Response after successful registration or login
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub user: User,
    #[serde(flatten)]
    pub tokens: AuthTokens,
}

/// Public user profile
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User info from database, including the password hash
#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    name: String,
    role: Role,
    is_active: bool,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            name: row.name,
            role: row.role,
            is_active: row.is_active,
            last_login_at: row.last_login_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const USER_COLUMNS: &str =
    "id, email, name, role, is_active, last_login_at, created_at, updated_at";

/// Decode and validate an access token
pub fn decode_access_token(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::InvalidToken,
    })
}

/// Sign an access token for a user
pub fn encode_access_token(
    user_id: Uuid,
    email: &str,
    role: Role,
    secret: &str,
    expiry_secs: i64,
) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        role,
        exp: (now + Duration::seconds(expiry_secs)).timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
            refresh_token_expiry: config.jwt.refresh_token_expiry,
            bcrypt_cost: config.security.bcrypt_cost,
        }
    }

    /// Register a new user account.
    ///
    /// The first account created on an empty database becomes an admin.
    pub async fn register(&self, input: RegisterInput) -> AppResult<AuthResponse> {
        input.validate()?;
        let email = normalize_email(&input.email);

        // Check if email already exists
        let existing = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)",
        )
        .bind(&email)
        .fetch_one(&self.db)
        .await?;

        if existing {
            return Err(AppError::DuplicateEntry("email".to_string()));
        }

        // Hash password
        let password_hash = hash(&input.password, self.bcrypt_cost)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        // Start transaction
        let mut tx = self.db.begin().await?;

        // Serialise bootstrap so two concurrent first registrations cannot both become admin
        sqlx::query("LOCK TABLE users IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;

        let user_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&mut *tx)
            .await?;
        let role = if user_count == 0 { Role::Admin } else { Role::User };

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, name, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&email)
        .bind(&password_hash)
        .bind(input.name.trim())
        .bind(role)
        .fetch_one(&mut *tx)
        .await?;

        audit::record(
            &mut *tx,
            AuditEntry::new(user.id, "register", "user", user.id)
                .with_details(serde_json::json!({ "role": role })),
        )
        .await?;

        // Commit transaction
        tx.commit().await?;

        tracing::info!(user_id = %user.id, role = %role, "User registered");

        let tokens = self.issue_tokens(user.id, &user.email, user.role).await?;
        Ok(AuthResponse { user, tokens })
    }

    /// Authenticate user with email and password
    pub async fn login(&self, input: LoginInput) -> AppResult<AuthResponse> {
        input.validate()?;
        let email = normalize_email(&input.email);

        // Find user by email
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, password_hash, name, role, is_active, last_login_at, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(&email)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        // Verify password
        let valid = verify(&input.password, &row.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;

        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        // Check if user is active
        if !row.is_active {
            return Err(AppError::Unauthorized("Account is disabled".to_string()));
        }

        // Update last login
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(row.id)
            .execute(&self.db)
            .await?;

        tracing::info!(user_id = %row.id, "User logged in");

        let user: User = row.into();
        let tokens = self.issue_tokens(user.id, &user.email, user.role).await?;
        Ok(AuthResponse { user, tokens })
    }

    /// Refresh access token using refresh token
    pub async fn refresh_token(&self, refresh_token: &str) -> AppResult<AuthTokens> {
        let token_hash = hash_token(refresh_token);

        let mut tx = self.db.begin().await?;

        // Revoke the presented token and fetch its owner in one step
        let user = sqlx::query_as::<_, (Uuid, String, Role)>(
            r#"
            UPDATE refresh_tokens rt
            SET revoked_at = NOW()
            FROM users u
            WHERE u.id = rt.user_id
              AND rt.token_hash = $1
              AND rt.expires_at > NOW()
              AND rt.revoked_at IS NULL
              AND u.is_active = true
            RETURNING u.id, u.email, u.role
            "#,
        )
        .bind(&token_hash)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired refresh token".to_string()))?;

        tx.commit().await?;

        let (user_id, email, role) = user;
        self.issue_tokens(user_id, &email, role).await
    }

    /// Revoke a refresh token
    pub async fn logout(&self, refresh_token: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = NOW() WHERE token_hash = $1 AND revoked_at IS NULL",
        )
        .bind(hash_token(refresh_token))
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Validate access token and return claims
    pub fn validate_token(&self, token: &str) -> AppResult<Claims> {
        decode_access_token(token, &self.jwt_secret)
    }

    /// Get a user by ID
    pub async fn get_user(&self, user_id: Uuid) -> AppResult<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))
    }

    /// List all users
    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC"
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(users)
    }

    /// Change a user's role
    pub async fn update_user_role(
        &self,
        actor_id: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> AppResult<User> {
        if actor_id == user_id && role != Role::Admin {
            return Err(AppError::conflict(
                "user",
                "Administrators cannot demote themselves",
            ));
        }

        let mut tx = self.db.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET role = $1 WHERE id = $2 RETURNING {USER_COLUMNS}"
        ))
        .bind(role)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        audit::record(
            &mut *tx,
            AuditEntry::new(actor_id, "update_role", "user", user_id)
                .with_details(serde_json::json!({ "role": role })),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(user_id = %user_id, role = %role, "User role changed");
        Ok(user)
    }

    /// Enable or disable a user account
    pub async fn set_user_active(
        &self,
        actor_id: Uuid,
        user_id: Uuid,
        is_active: bool,
    ) -> AppResult<User> {
        if actor_id == user_id && !is_active {
            return Err(AppError::conflict(
                "user",
                "Administrators cannot disable their own account",
            ));
        }

        let mut tx = self.db.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET is_active = $1 WHERE id = $2 RETURNING {USER_COLUMNS}"
        ))
        .bind(is_active)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        if !is_active {
            sqlx::query(
                "UPDATE refresh_tokens SET revoked_at = NOW() WHERE user_id = $1 AND revoked_at IS NULL",
            )
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        audit::record(
            &mut *tx,
            AuditEntry::new(actor_id, "update_status", "user", user_id)
                .with_details(serde_json::json!({ "is_active": is_active })),
        )
        .await?;

        tx.commit().await?;
        Ok(user)
    }

    /// Change the password of the given user after verifying the current one
    pub async fn change_password(&self, user_id: Uuid, input: ChangePasswordInput) -> AppResult<()> {
        input.validate()?;

        let current_hash = sqlx::query_scalar::<_, String>(
            "SELECT password_hash FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        let valid = verify(&input.current_password, &current_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;
        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        let new_hash = hash(&input.new_password, self.bcrypt_cost)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let mut tx = self.db.begin().await?;

        sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(&new_hash)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        // Existing sessions must log in again
        sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = NOW() WHERE user_id = $1 AND revoked_at IS NULL",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        audit::record(
            &mut *tx,
            AuditEntry::new(user_id, "change_password", "user", user_id),
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Generate tokens and persist the refresh token
    async fn issue_tokens(&self, user_id: Uuid, email: &str, role: Role) -> AppResult<AuthTokens> {
        let access_token = encode_access_token(
            user_id,
            email,
            role,
            &self.jwt_secret,
            self.access_token_expiry,
        )?;

        // Refresh token (simple random token)
        let refresh_token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        let expires_at = Utc::now() + Duration::seconds(self.refresh_token_expiry);

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user_id)
        .bind(hash_token(&refresh_token))
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        Ok(AuthTokens {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
        })
    }
}

/// Hash a refresh token for storage
fn hash_token(token: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(token.as_bytes()))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-for-unit-tests";

    #[test]
    fn test_token_round_trip() {
        let user_id = Uuid::new_v4();
        let token =
            encode_access_token(user_id, "a@example.com", Role::Manager, SECRET, 60).unwrap();
        let claims = decode_access_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.role, Role::Manager);
        assert_eq!(claims.email, "a@example.com");
    }

    #[test]
    fn test_token_wrong_secret_rejected() {
        let token =
            encode_access_token(Uuid::new_v4(), "a@example.com", Role::User, SECRET, 60).unwrap();
        assert!(matches!(
            decode_access_token(&token, "another-secret"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        // Default validation allows 60 seconds of leeway
        let token =
            encode_access_token(Uuid::new_v4(), "a@example.com", Role::User, SECRET, -120).unwrap();
        assert!(matches!(
            decode_access_token(&token, SECRET),
            Err(AppError::TokenExpired)
        ));
    }

    #[test]
    fn test_hash_token_is_stable_and_opaque() {
        let token = "abc123";
        assert_eq!(hash_token(token), hash_token(token));
        assert_ne!(hash_token(token), token);
        assert_ne!(hash_token(token), hash_token("abc124"));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Jane@Example.COM "), "jane@example.com");
    }

    #[test]
    fn test_register_input_validation() {
        let input = RegisterInput {
            name: "Jane".to_string(),
            email: "not-an-email".to_string(),
            password: "secret123".to_string(),
        };
        assert!(input.validate().is_err());

        let input = RegisterInput {
            name: "Jane".to_string(),
            email: "jane@example.com".to_string(),
            password: "short".to_string(),
        };
        assert!(input.validate().is_err());
    }
}
