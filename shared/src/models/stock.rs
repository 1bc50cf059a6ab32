//! Stock levels, movements and adjustments
//!
//! `StockLevel` holds the arithmetic every stock mutation goes through. The
//! backend locks the row, loads it into a `StockLevel`, applies one of the
//! operations below and writes the result back in the same transaction.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Kind of stock movement recorded in the movement ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(
    feature = "sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "movement_type", rename_all = "snake_case")
)]
pub enum MovementType {
    Inbound,
    Outbound,
    Adjustment,
    TransferIn,
    TransferOut,
    PurchaseReceipt,
    SalesShipment,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Inbound => "inbound",
            MovementType::Outbound => "outbound",
            MovementType::Adjustment => "adjustment",
            MovementType::TransferIn => "transfer_in",
            MovementType::TransferOut => "transfer_out",
            MovementType::PurchaseReceipt => "purchase_receipt",
            MovementType::SalesShipment => "sales_shipment",
        }
    }

    /// Signed quantity change for a movement of `quantity` units.
    /// Adjustments carry their own sign and are returned unchanged.
    pub fn signed(&self, quantity: i32) -> i32 {
        match self {
            MovementType::Inbound | MovementType::TransferIn | MovementType::PurchaseReceipt => {
                quantity
            }
            MovementType::Outbound | MovementType::TransferOut | MovementType::SalesShipment => {
                -quantity
            }
            MovementType::Adjustment => quantity,
        }
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a manual movement posted through the stock endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum ManualMovement {
    Inbound,
    Outbound,
}

impl From<ManualMovement> for MovementType {
    fn from(value: ManualMovement) -> Self {
        match value {
            ManualMovement::Inbound => MovementType::Inbound,
            ManualMovement::Outbound => MovementType::Outbound,
        }
    }
}

/// Kind of stock adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(
    feature = "sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "adjustment_type", rename_all = "snake_case")
)]
pub enum AdjustmentType {
    Increase,
    Decrease,
    Set,
}

impl AdjustmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentType::Increase => "increase",
            AdjustmentType::Decrease => "decrease",
            AdjustmentType::Set => "set",
        }
    }
}

/// Errors produced by stock arithmetic
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockError {
    #[error("quantity must be positive, got {0}")]
    NonPositiveQuantity(i32),

    #[error("quantity cannot be negative, got {0}")]
    NegativeQuantity(i32),

    #[error("insufficient stock: requested {requested}, available {available}")]
    Insufficient { requested: i32, available: i32 },

    #[error("cannot release {requested} units, only {reserved} reserved")]
    OverRelease { requested: i32, reserved: i32 },

    #[error("stock quantity overflow")]
    Overflow,
}

/// On-hand and reserved quantity of one product at one location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StockLevel {
    pub quantity: i32,
    pub reserved: i32,
}

impl StockLevel {
    pub fn new(quantity: i32, reserved: i32) -> Self {
        Self { quantity, reserved }
    }

    /// Quantity not held by a reservation
    pub fn available(&self) -> i32 {
        self.quantity - self.reserved
    }

    /// Whether `quantity` units can be taken from available stock
    pub fn can_fulfill(&self, quantity: i32) -> bool {
        quantity <= self.available()
    }

    /// Apply a signed change to the on-hand quantity.
    ///
    /// Reserved units can never be removed this way.
    pub fn apply_delta(&self, delta: i32) -> Result<StockLevel, StockError> {
        let quantity = self
            .quantity
            .checked_add(delta)
            .ok_or(StockError::Overflow)?;

        if quantity < self.reserved {
            return Err(StockError::Insufficient {
                requested: -delta,
                available: self.available(),
            });
        }

        Ok(StockLevel {
            quantity,
            reserved: self.reserved,
        })
    }

    /// Take `quantity` units out of available stock
    pub fn remove(&self, quantity: i32) -> Result<StockLevel, StockError> {
        ensure_positive(quantity)?;
        self.apply_delta(-quantity)
    }

    /// Add `quantity` units
    pub fn add(&self, quantity: i32) -> Result<StockLevel, StockError> {
        ensure_positive(quantity)?;
        self.apply_delta(quantity)
    }

    /// Resulting level of an adjustment
    pub fn adjust(&self, kind: AdjustmentType, quantity: i32) -> Result<StockLevel, StockError> {
        match kind {
            AdjustmentType::Increase => self.add(quantity),
            AdjustmentType::Decrease => self.remove(quantity),
            AdjustmentType::Set => {
                if quantity < 0 {
                    return Err(StockError::NegativeQuantity(quantity));
                }
                self.apply_delta(quantity - self.quantity)
            }
        }
    }

    /// Hold `quantity` units for an order
    pub fn reserve(&self, quantity: i32) -> Result<StockLevel, StockError> {
        ensure_positive(quantity)?;
        if !self.can_fulfill(quantity) {
            return Err(StockError::Insufficient {
                requested: quantity,
                available: self.available(),
            });
        }
        Ok(StockLevel {
            quantity: self.quantity,
            reserved: self.reserved + quantity,
        })
    }

    /// Give back a reservation
    pub fn release(&self, quantity: i32) -> Result<StockLevel, StockError> {
        ensure_positive(quantity)?;
        if quantity > self.reserved {
            return Err(StockError::OverRelease {
                requested: quantity,
                reserved: self.reserved,
            });
        }
        Ok(StockLevel {
            quantity: self.quantity,
            reserved: self.reserved - quantity,
        })
    }

    /// Ship reserved units: both on-hand and reserved drop by `quantity`
    pub fn ship(&self, quantity: i32) -> Result<StockLevel, StockError> {
        let released = self.release(quantity)?;
        Ok(StockLevel {
            quantity: released.quantity - quantity,
            reserved: released.reserved,
        })
    }
}

fn ensure_positive(quantity: i32) -> Result<(), StockError> {
    if quantity <= 0 {
        return Err(StockError::NonPositiveQuantity(quantity));
    }
    Ok(())
}

/// Whether a product total has reached its reorder level
pub fn is_low_stock(total_quantity: i64, reorder_level: i32) -> bool {
    total_quantity <= i64::from(reorder_level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_excludes_reserved() {
        let level = StockLevel::new(10, 4);
        assert_eq!(level.available(), 6);
        assert!(level.can_fulfill(6));
        assert!(!level.can_fulfill(7));
    }

    #[test]
    fn test_remove_beyond_available_fails() {
        let level = StockLevel::new(10, 4);
        assert_eq!(
            level.remove(7),
            Err(StockError::Insufficient {
                requested: 7,
                available: 6
            })
        );
        assert_eq!(level.remove(6).unwrap(), StockLevel::new(4, 4));
    }

    #[test]
    fn test_zero_and_negative_quantities_rejected() {
        let level = StockLevel::new(10, 0);
        assert_eq!(level.add(0), Err(StockError::NonPositiveQuantity(0)));
        assert_eq!(level.remove(-3), Err(StockError::NonPositiveQuantity(-3)));
        assert_eq!(
            level.adjust(AdjustmentType::Set, -1),
            Err(StockError::NegativeQuantity(-1))
        );
    }

    #[test]
    fn test_adjust_set_respects_reservations() {
        let level = StockLevel::new(10, 3);
        assert_eq!(level.adjust(AdjustmentType::Set, 3).unwrap(), StockLevel::new(3, 3));
        assert!(level.adjust(AdjustmentType::Set, 2).is_err());
        assert!(level.adjust(AdjustmentType::Set, 0).is_err());

        let empty = StockLevel::new(10, 0);
        assert_eq!(empty.adjust(AdjustmentType::Set, 0).unwrap(), StockLevel::new(0, 0));
    }

    #[test]
    fn test_reserve_release_ship() {
        let level = StockLevel::new(10, 0);
        let reserved = level.reserve(4).unwrap();
        assert_eq!(reserved, StockLevel::new(10, 4));
        assert_eq!(reserved.available(), 6);

        let shipped = reserved.ship(4).unwrap();
        assert_eq!(shipped, StockLevel::new(6, 0));

        assert!(reserved.release(5).is_err());
        assert_eq!(reserved.release(4).unwrap(), level);
    }

    #[test]
    fn test_reserve_more_than_available_fails() {
        let level = StockLevel::new(5, 2);
        assert!(matches!(
            level.reserve(4),
            Err(StockError::Insufficient { requested: 4, available: 3 })
        ));
    }

    #[test]
    fn test_overflow_detected() {
        let level = StockLevel::new(i32::MAX, 0);
        assert_eq!(level.add(1), Err(StockError::Overflow));
    }

    #[test]
    fn test_movement_sign() {
        assert_eq!(MovementType::Inbound.signed(5), 5);
        assert_eq!(MovementType::PurchaseReceipt.signed(5), 5);
        assert_eq!(MovementType::TransferIn.signed(5), 5);
        assert_eq!(MovementType::Outbound.signed(5), -5);
        assert_eq!(MovementType::SalesShipment.signed(5), -5);
        assert_eq!(MovementType::TransferOut.signed(5), -5);
        assert_eq!(MovementType::Adjustment.signed(-2), -2);
    }

    #[test]
    fn test_low_stock_threshold_inclusive() {
        assert!(is_low_stock(10, 10));
        assert!(is_low_stock(0, 0));
        assert!(!is_low_stock(11, 10));
    }
}
