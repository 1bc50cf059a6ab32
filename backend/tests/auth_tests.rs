//! Authentication and authorization tests
//!
//! Property-based and unit tests for:
//! - Role hierarchy enforcement
//! - Access token signing and verification

use inventory_backend::error::AppError;
use inventory_backend::services::auth::{decode_access_token, encode_access_token};
use proptest::prelude::*;
use shared::Role;
use std::str::FromStr;
use uuid::Uuid;

const SECRET: &str = "test-secret-key-with-enough-length";

// ============================================================================
// Property Test Strategies
// ============================================================================

fn role_strategy() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::Admin), Just(Role::Manager), Just(Role::User)]
}

/// Generate valid email addresses
fn email_strategy() -> impl Strategy<Value = String> {
    "[a-z]{5,10}@[a-z]{3,8}\\.(com|org|net)"
}

fn rank(role: Role) -> u8 {
    match role {
        Role::Admin => 3,
        Role::Manager => 2,
        Role::User => 1,
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    /// A role satisfies a requirement exactly when it ranks at least as high
    #[test]
    fn test_role_satisfies_matches_rank(
        role in role_strategy(),
        required in role_strategy(),
    ) {
        prop_assert_eq!(role.satisfies(required), rank(role) >= rank(required));
    }

    /// Satisfaction is transitive along the hierarchy
    #[test]
    fn test_role_satisfies_is_transitive(
        a in role_strategy(),
        b in role_strategy(),
        c in role_strategy(),
    ) {
        if a.satisfies(b) && b.satisfies(c) {
            prop_assert!(a.satisfies(c));
        }
    }

    /// Role names parse back to the same role
    #[test]
    fn test_role_name_round_trip(role in role_strategy()) {
        prop_assert_eq!(Role::from_str(role.as_str()).unwrap(), role);
    }

    /// Claims survive signing and verification unchanged
    #[test]
    fn test_access_token_preserves_claims(
        role in role_strategy(),
        email in email_strategy(),
        expiry in 60i64..86_400,
    ) {
        let user_id = Uuid::new_v4();
        let token = encode_access_token(user_id, &email, role, SECRET, expiry).unwrap();
        let claims = decode_access_token(&token, SECRET).unwrap();

        prop_assert_eq!(claims.sub, user_id.to_string());
        prop_assert_eq!(claims.email, email);
        prop_assert_eq!(claims.role, role);
        prop_assert_eq!(claims.exp - claims.iat, expiry);
    }
}

// ============================================================================
// Unit Tests: Token Verification
// ============================================================================

#[test]
fn test_token_signed_with_other_secret_is_rejected() {
    let token = encode_access_token(
        Uuid::new_v4(),
        "someone@example.com",
        Role::Admin,
        "another-secret-key-of-enough-size",
        3600,
    )
    .unwrap();

    assert!(matches!(
        decode_access_token(&token, SECRET),
        Err(AppError::InvalidToken)
    ));
}

#[test]
fn test_expired_token_is_reported_as_expired() {
    // Past the default 60 second leeway
    let token = encode_access_token(
        Uuid::new_v4(),
        "someone@example.com",
        Role::User,
        SECRET,
        -300,
    )
    .unwrap();

    assert!(matches!(
        decode_access_token(&token, SECRET),
        Err(AppError::TokenExpired)
    ));
}

#[test]
fn test_garbage_token_is_invalid() {
    for token in ["", "not-a-jwt", "a.b.c"] {
        assert!(matches!(
            decode_access_token(token, SECRET),
            Err(AppError::InvalidToken)
        ));
    }
}

#[test]
fn test_unknown_role_name_is_rejected() {
    assert!(Role::from_str("owner").is_err());
    assert!(Role::from_str("Admin").is_err());
}
