//! Purchase and sales order lifecycles

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a purchase order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(
    feature = "sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "purchase_order_status", rename_all = "snake_case")
)]
pub enum PurchaseOrderStatus {
    Draft,
    Submitted,
    PartiallyReceived,
    Received,
    Cancelled,
}

impl PurchaseOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseOrderStatus::Draft => "draft",
            PurchaseOrderStatus::Submitted => "submitted",
            PurchaseOrderStatus::PartiallyReceived => "partially_received",
            PurchaseOrderStatus::Received => "received",
            PurchaseOrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn can_transition_to(&self, next: PurchaseOrderStatus) -> bool {
        use PurchaseOrderStatus::*;
        matches!(
            (self, next),
            (Draft, Submitted)
                | (Draft, Cancelled)
                | (Submitted, PartiallyReceived)
                | (Submitted, Received)
                | (Submitted, Cancelled)
                | (PartiallyReceived, PartiallyReceived)
                | (PartiallyReceived, Received)
                | (PartiallyReceived, Cancelled)
        )
    }

    /// Header and lines may only be changed while drafting
    pub fn is_editable(&self) -> bool {
        matches!(self, PurchaseOrderStatus::Draft)
    }

    /// Goods can be booked in
    pub fn can_receive(&self) -> bool {
        matches!(
            self,
            PurchaseOrderStatus::Submitted | PurchaseOrderStatus::PartiallyReceived
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PurchaseOrderStatus::Received | PurchaseOrderStatus::Cancelled
        )
    }

    /// Only orders that never touched stock can be deleted
    pub fn is_deletable(&self) -> bool {
        matches!(
            self,
            PurchaseOrderStatus::Draft | PurchaseOrderStatus::Cancelled
        )
    }
}

impl fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a sales order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(
    feature = "sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "sales_order_status", rename_all = "snake_case")
)]
pub enum SalesOrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl SalesOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SalesOrderStatus::Pending => "pending",
            SalesOrderStatus::Confirmed => "confirmed",
            SalesOrderStatus::Shipped => "shipped",
            SalesOrderStatus::Delivered => "delivered",
            SalesOrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn can_transition_to(&self, next: SalesOrderStatus) -> bool {
        use SalesOrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Shipped)
                | (Confirmed, Cancelled)
                | (Shipped, Delivered)
        )
    }

    pub fn is_editable(&self) -> bool {
        matches!(self, SalesOrderStatus::Pending)
    }

    /// Stock is held for the order's lines
    pub fn holds_reservation(&self) -> bool {
        matches!(self, SalesOrderStatus::Confirmed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SalesOrderStatus::Delivered | SalesOrderStatus::Cancelled
        )
    }

    pub fn is_deletable(&self) -> bool {
        matches!(
            self,
            SalesOrderStatus::Pending | SalesOrderStatus::Cancelled
        )
    }
}

impl fmt::Display for SalesOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered vs received quantity of one purchase order line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptLine {
    pub ordered: i32,
    pub received: i32,
}

impl ReceiptLine {
    pub fn remaining(&self) -> i32 {
        (self.ordered - self.received).max(0)
    }

    pub fn is_complete(&self) -> bool {
        self.received >= self.ordered
    }
}

/// Status of a purchase order after a receipt has been booked
pub fn receipt_status(lines: &[ReceiptLine]) -> PurchaseOrderStatus {
    if !lines.is_empty() && lines.iter().all(ReceiptLine::is_complete) {
        PurchaseOrderStatus::Received
    } else {
        PurchaseOrderStatus::PartiallyReceived
    }
}

/// Extended price of one order line
pub fn line_total(quantity: i32, unit_price: Decimal) -> Decimal {
    Decimal::from(quantity) * unit_price
}

/// Sum of all line totals
pub fn order_total<I>(lines: I) -> Decimal
where
    I: IntoIterator<Item = (i32, Decimal)>,
{
    lines
        .into_iter()
        .map(|(quantity, unit_price)| line_total(quantity, unit_price))
        .sum()
}

/// Generate a human-readable order number (e.g., "PO-20240131-0007")
pub fn generate_order_number(prefix: &str, date: NaiveDate, sequence: i64) -> String {
    format!("{}-{}-{:04}", prefix, date.format("%Y%m%d"), sequence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_purchase_order_transitions() {
        use PurchaseOrderStatus::*;
        assert!(Draft.can_transition_to(Submitted));
        assert!(Draft.can_transition_to(Cancelled));
        assert!(Submitted.can_transition_to(Received));
        assert!(PartiallyReceived.can_transition_to(Cancelled));
        assert!(!Draft.can_transition_to(Received));
        assert!(!Received.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Submitted));
    }

    #[test]
    fn test_sales_order_transitions() {
        use SalesOrderStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(Shipped));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(Shipped.can_transition_to(Delivered));
        assert!(!Shipped.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Shipped));
        assert!(!Delivered.can_transition_to(Pending));
    }

    #[test]
    fn test_receipt_status() {
        let partial = [
            ReceiptLine { ordered: 10, received: 10 },
            ReceiptLine { ordered: 5, received: 2 },
        ];
        assert_eq!(receipt_status(&partial), PurchaseOrderStatus::PartiallyReceived);

        let complete = [
            ReceiptLine { ordered: 10, received: 10 },
            ReceiptLine { ordered: 5, received: 5 },
        ];
        assert_eq!(receipt_status(&complete), PurchaseOrderStatus::Received);
        assert_eq!(partial[1].remaining(), 3);
    }

    #[test]
    fn test_order_total() {
        let total = order_total([
            (3, Decimal::from_str("2.50").unwrap()),
            (2, Decimal::from_str("10.00").unwrap()),
        ]);
        assert_eq!(total, Decimal::from_str("27.50").unwrap());
        assert_eq!(order_total(Vec::<(i32, Decimal)>::new()), Decimal::ZERO);
    }

    #[test]
    fn test_generate_order_number() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(generate_order_number("PO", date, 7), "PO-20240131-0007");
        assert_eq!(generate_order_number("SO", date, 12345), "SO-20240131-12345");
    }
}
