//! Stock arithmetic tests
//!
//! Property-based tests for the quantity rules every stock mutation goes
//! through: on-hand never drops below reserved, reservations never exceed
//! on-hand, and transfers conserve the total.

use proptest::prelude::*;
use shared::{is_low_stock, AdjustmentType, MovementType, StockError, StockLevel};

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Generate a consistent stock level (0 <= reserved <= quantity)
fn stock_level_strategy() -> impl Strategy<Value = StockLevel> {
    (0i32..100_000).prop_flat_map(|quantity| {
        (Just(quantity), 0..=quantity).prop_map(|(q, r)| StockLevel::new(q, r))
    })
}

fn quantity_strategy() -> impl Strategy<Value = i32> {
    1i32..50_000
}

fn adjustment_strategy() -> impl Strategy<Value = AdjustmentType> {
    prop_oneof![
        Just(AdjustmentType::Increase),
        Just(AdjustmentType::Decrease),
        Just(AdjustmentType::Set),
    ]
}

fn is_consistent(level: &StockLevel) -> bool {
    level.quantity >= 0 && level.reserved >= 0 && level.reserved <= level.quantity
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    /// Every successful operation keeps the level consistent
    #[test]
    fn test_operations_preserve_consistency(
        level in stock_level_strategy(),
        qty in quantity_strategy(),
        kind in adjustment_strategy(),
    ) {
        for result in [
            level.add(qty),
            level.remove(qty),
            level.reserve(qty),
            level.release(qty),
            level.ship(qty),
            level.adjust(kind, qty),
        ] {
            if let Ok(next) = result {
                prop_assert!(is_consistent(&next), "{:?} -> {:?}", level, next);
            }
        }
    }

    /// Removing more than is available fails with the available amount
    #[test]
    fn test_remove_beyond_available_fails(level in stock_level_strategy(), extra in 1i32..1000) {
        let requested = level.available() + extra;
        prop_assert_eq!(
            level.remove(requested),
            Err(StockError::Insufficient { requested, available: level.available() })
        );
    }

    /// Reserving then releasing the same amount restores the level
    #[test]
    fn test_reserve_release_restores(level in stock_level_strategy(), qty in quantity_strategy()) {
        if let Ok(reserved) = level.reserve(qty) {
            prop_assert_eq!(reserved.available(), level.available() - qty);
            prop_assert_eq!(reserved.release(qty).unwrap(), level);
        } else {
            prop_assert!(qty > level.available());
        }
    }

    /// Shipping consumes both the reservation and the on-hand units
    #[test]
    fn test_ship_consumes_reservation(level in stock_level_strategy(), qty in quantity_strategy()) {
        if let Ok(reserved) = level.reserve(qty) {
            let shipped = reserved.ship(qty).unwrap();
            prop_assert_eq!(shipped.quantity, level.quantity - qty);
            prop_assert_eq!(shipped.reserved, level.reserved);
        }
    }

    /// A transfer of any size conserves the combined quantity
    #[test]
    fn test_transfer_conserves_total(
        from in stock_level_strategy(),
        to in stock_level_strategy(),
        qty in quantity_strategy(),
    ) {
        if let (Ok(source), Ok(destination)) = (from.remove(qty), to.add(qty)) {
            prop_assert_eq!(
                source.quantity + destination.quantity,
                from.quantity + to.quantity
            );
        } else {
            prop_assert!(qty > from.available());
        }
    }

    /// Set adjustments land exactly on the target unless it would cut into reservations
    #[test]
    fn test_set_adjustment(level in stock_level_strategy(), target in 0i32..100_000) {
        match level.adjust(AdjustmentType::Set, target) {
            Ok(next) => prop_assert_eq!(next.quantity, target),
            Err(_) => prop_assert!(target < level.reserved),
        }
    }

    /// Inbound movement types add, outbound types subtract
    #[test]
    fn test_movement_sign(qty in quantity_strategy()) {
        prop_assert_eq!(MovementType::Inbound.signed(qty), qty);
        prop_assert_eq!(MovementType::PurchaseReceipt.signed(qty), qty);
        prop_assert_eq!(MovementType::TransferIn.signed(qty), qty);
        prop_assert_eq!(MovementType::Outbound.signed(qty), -qty);
        prop_assert_eq!(MovementType::SalesShipment.signed(qty), -qty);
        prop_assert_eq!(MovementType::TransferOut.signed(qty), -qty);
    }

    /// Low stock is inclusive of the reorder level
    #[test]
    fn test_low_stock_threshold(reorder in 0i32..10_000, total in 0i64..20_000) {
        prop_assert_eq!(is_low_stock(total, reorder), total <= i64::from(reorder));
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[test]
fn test_reserved_units_cannot_be_removed() {
    let level = StockLevel::new(10, 8);
    assert!(level.remove(2).is_ok());
    assert!(matches!(
        level.remove(3),
        Err(StockError::Insufficient {
            requested: 3,
            available: 2
        })
    ));
}

#[test]
fn test_non_positive_quantities_are_rejected() {
    let level = StockLevel::new(10, 0);
    assert_eq!(level.add(0), Err(StockError::NonPositiveQuantity(0)));
    assert_eq!(level.reserve(-1), Err(StockError::NonPositiveQuantity(-1)));
    assert_eq!(
        level.adjust(AdjustmentType::Set, -5),
        Err(StockError::NegativeQuantity(-5))
    );
}

#[test]
fn test_add_overflow_is_reported() {
    let level = StockLevel::new(i32::MAX - 1, 0);
    assert_eq!(level.add(5), Err(StockError::Overflow));
}
