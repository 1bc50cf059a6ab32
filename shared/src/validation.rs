//! Validation utilities for the Inventory Management API
//!
//! Field-level rules shared by request bodies. The backend wires these into
//! `validator` derives through `custom` validators.

use rust_decimal::Decimal;
use validator::ValidationError;

// ============================================================================
// Identifiers
// ============================================================================

/// Validate SKU format (3-64 chars, uppercase alphanumeric, '-' or '_')
pub fn validate_sku(sku: &str) -> Result<(), &'static str> {
    if sku.len() < 3 {
        return Err("SKU must be at least 3 characters");
    }
    if sku.len() > 64 {
        return Err("SKU must be at most 64 characters");
    }
    if !sku
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err("SKU may only contain uppercase letters, digits, '-' and '_'");
    }
    if sku.starts_with(['-', '_']) || sku.ends_with(['-', '_']) {
        return Err("SKU cannot start or end with a separator");
    }
    Ok(())
}

/// Validate warehouse/location code format (2-20 uppercase alphanumeric or '-')
pub fn validate_code(code: &str) -> Result<(), &'static str> {
    if code.len() < 2 || code.len() > 20 {
        return Err("Code must be 2-20 characters");
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
    {
        return Err("Code may only contain uppercase letters, digits and '-'");
    }
    Ok(())
}

// ============================================================================
// Accounts
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    let Some((local, domain)) = email.split_once('@') else {
        return Err("Invalid email format");
    };
    if local.is_empty() || !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.')
    {
        return Err("Invalid email format");
    }
    Ok(())
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    if password.len() > 72 {
        // bcrypt ignores everything past 72 bytes
        return Err("Password must be at most 72 characters");
    }
    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err("Password must contain a letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain a digit");
    }
    Ok(())
}

// ============================================================================
// Quantities and money
// ============================================================================

/// Validate a quantity is strictly positive
pub fn validate_positive_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be positive");
    }
    Ok(())
}

/// Largest amount, in cents, that fits a `NUMERIC(14, 2)` column
pub const MAX_MONEY_CENTS: i64 = 99_999_999_999_999;

/// Largest storable monetary amount (999999999999.99)
pub fn max_money() -> Decimal {
    Decimal::new(MAX_MONEY_CENTS, 2)
}

/// Validate a monetary amount (non-negative, at most 2 decimal places)
pub fn validate_money(amount: Decimal) -> Result<(), &'static str> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err("Amount cannot be negative");
    }
    if amount.normalize().scale() > 2 {
        return Err("Amount cannot have more than 2 decimal places");
    }
    if amount > max_money() {
        return Err("Amount cannot exceed 999999999999.99");
    }
    Ok(())
}

/// Validate a computed order total still fits the amount columns
pub fn validate_order_total(total: Decimal) -> Result<(), &'static str> {
    if total > max_money() {
        return Err("Order total cannot exceed 999999999999.99");
    }
    Ok(())
}

/// Validate text still has content once surrounding whitespace is removed
pub fn validate_not_blank(text: &str) -> Result<(), &'static str> {
    if text.trim().is_empty() {
        return Err("Value cannot be blank");
    }
    Ok(())
}

// ============================================================================
// validator adapters
// ============================================================================

fn to_validation_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

pub fn sku_rule(sku: &str) -> Result<(), ValidationError> {
    validate_sku(sku).map_err(|m| to_validation_error("sku", m))
}

pub fn code_rule(code: &str) -> Result<(), ValidationError> {
    validate_code(code).map_err(|m| to_validation_error("code", m))
}

pub fn password_rule(password: &str) -> Result<(), ValidationError> {
    validate_password(password).map_err(|m| to_validation_error("password", m))
}

pub fn not_blank_rule(text: &str) -> Result<(), ValidationError> {
    validate_not_blank(text).map_err(|m| to_validation_error("blank", m))
}

pub fn money_rule(amount: &Decimal) -> Result<(), ValidationError> {
    validate_money(*amount).map_err(|m| to_validation_error("money", m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_valid_skus() {
        assert!(validate_sku("ABC").is_ok());
        assert!(validate_sku("WIDGET-001").is_ok());
        assert!(validate_sku("BOLT_M8_20").is_ok());
    }

    #[test]
    fn test_invalid_skus() {
        assert!(validate_sku("AB").is_err()); // Too short
        assert!(validate_sku(&"A".repeat(65)).is_err()); // Too long
        assert!(validate_sku("abc-1").is_err()); // Lowercase
        assert!(validate_sku("AB C").is_err()); // Space
        assert!(validate_sku("-ABC").is_err());
        assert!(validate_sku("ABC_").is_err());
    }

    #[test]
    fn test_codes() {
        assert!(validate_code("WH-01").is_ok());
        assert!(validate_code("A").is_err());
        assert!(validate_code("wh1").is_err());
    }

    #[test]
    fn test_emails() {
        assert!(validate_email("jane@example.com").is_ok());
        assert!(validate_email("janeexample.com").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("jane@localhost").is_err());
        assert!(validate_email("jane@example.").is_err());
    }

    #[test]
    fn test_passwords() {
        assert!(validate_password("secret123").is_ok());
        assert!(validate_password("short1").is_err());
        assert!(validate_password("nodigitshere").is_err());
        assert!(validate_password("12345678").is_err());
    }

    #[test]
    fn test_quantities() {
        assert!(validate_positive_quantity(1).is_ok());
        assert!(validate_positive_quantity(0).is_err());
        assert!(validate_positive_quantity(-5).is_err());
    }

    #[test]
    fn test_money() {
        assert!(validate_money(Decimal::from_str("19.99").unwrap()).is_ok());
        assert!(validate_money(Decimal::from_str("19.900").unwrap()).is_ok());
        assert!(validate_money(Decimal::ZERO).is_ok());
        assert!(validate_money(Decimal::from_str("-1.00").unwrap()).is_err());
        assert!(validate_money(Decimal::from_str("1.999").unwrap()).is_err());
    }

    #[test]
    fn test_money_upper_bound() {
        assert!(validate_money(max_money()).is_ok());
        assert!(validate_money(Decimal::from_str("999999999999.99").unwrap()).is_ok());
        assert!(validate_money(Decimal::from_str("1000000000000.00").unwrap()).is_err());
        assert!(validate_money(Decimal::from_str("1000000000000000.00").unwrap()).is_err());
    }

    #[test]
    fn test_order_total_bound() {
        assert!(validate_order_total(Decimal::ZERO).is_ok());
        assert!(validate_order_total(max_money()).is_ok());
        assert!(validate_order_total(max_money() + Decimal::new(1, 2)).is_err());
    }

    #[test]
    fn test_not_blank() {
        assert!(validate_not_blank("Cycle count").is_ok());
        assert!(validate_not_blank("  x ").is_ok());
        assert!(validate_not_blank("").is_err());
        assert!(validate_not_blank("   \t\n").is_err());
        assert_eq!(not_blank_rule(" ").unwrap_err().code, "blank");
    }

    #[test]
    fn test_rule_adapters_carry_message() {
        let err = sku_rule("x").unwrap_err();
        assert_eq!(err.code, "sku");
        assert!(err.message.is_some());
    }
}
