//! Purchase and sales order rule tests
//!
//! - Status lifecycles
//! - Receipt status derivation
//! - Line and order totals
//! - Order number format

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    generate_order_number, line_total, order_total, receipt_status, PurchaseOrderStatus,
    ReceiptLine, SalesOrderStatus,
};

// ============================================================================
// Property Test Strategies
// ============================================================================

fn purchase_status_strategy() -> impl Strategy<Value = PurchaseOrderStatus> {
    prop_oneof![
        Just(PurchaseOrderStatus::Draft),
        Just(PurchaseOrderStatus::Submitted),
        Just(PurchaseOrderStatus::PartiallyReceived),
        Just(PurchaseOrderStatus::Received),
        Just(PurchaseOrderStatus::Cancelled),
    ]
}

fn sales_status_strategy() -> impl Strategy<Value = SalesOrderStatus> {
    prop_oneof![
        Just(SalesOrderStatus::Pending),
        Just(SalesOrderStatus::Confirmed),
        Just(SalesOrderStatus::Shipped),
        Just(SalesOrderStatus::Delivered),
        Just(SalesOrderStatus::Cancelled),
    ]
}

/// Generate prices with at most two decimal places
fn price_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn receipt_line_strategy() -> impl Strategy<Value = ReceiptLine> {
    (1i32..1000).prop_flat_map(|ordered| {
        (Just(ordered), 0..=ordered).prop_map(|(ordered, received)| ReceiptLine { ordered, received })
    })
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    /// Terminal statuses have no way out
    #[test]
    fn test_purchase_terminal_statuses_are_final(
        from in purchase_status_strategy(),
        to in purchase_status_strategy(),
    ) {
        if from.is_terminal() {
            prop_assert!(!from.can_transition_to(to));
        }
    }

    #[test]
    fn test_sales_terminal_statuses_are_final(
        from in sales_status_strategy(),
        to in sales_status_strategy(),
    ) {
        if from.is_terminal() {
            prop_assert!(!from.can_transition_to(to));
        }
    }

    /// Nothing ever moves back to its initial status
    #[test]
    fn test_no_return_to_initial_status(
        po in purchase_status_strategy(),
        so in sales_status_strategy(),
    ) {
        prop_assert!(!po.can_transition_to(PurchaseOrderStatus::Draft));
        prop_assert!(!so.can_transition_to(SalesOrderStatus::Pending));
    }

    /// An order is fully received exactly when every line is complete
    #[test]
    fn test_receipt_status_reflects_lines(lines in prop::collection::vec(receipt_line_strategy(), 1..10)) {
        let all_complete = lines.iter().all(|l| l.received == l.ordered);
        let expected = if all_complete {
            PurchaseOrderStatus::Received
        } else {
            PurchaseOrderStatus::PartiallyReceived
        };
        prop_assert_eq!(receipt_status(&lines), expected);
    }

    /// Remaining quantity never goes negative
    #[test]
    fn test_remaining_is_never_negative(ordered in 1i32..1000, received in 0i32..2000) {
        let line = ReceiptLine { ordered, received };
        prop_assert!(line.remaining() >= 0);
        prop_assert_eq!(line.remaining() == 0, line.is_complete());
    }

    /// The order total is the sum of its line totals
    #[test]
    fn test_order_total_sums_lines(
        lines in prop::collection::vec((1i32..1000, price_strategy()), 0..20),
    ) {
        let expected: Decimal = lines.iter().map(|(q, p)| line_total(*q, *p)).sum();
        prop_assert_eq!(order_total(lines.clone()), expected);
        prop_assert!(order_total(lines) >= Decimal::ZERO);
    }

    /// Order numbers are prefix, date and a zero padded sequence
    #[test]
    fn test_order_number_format(sequence in 1i64..10_000) {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let number = generate_order_number("SO", date, sequence);
        prop_assert!(number.starts_with("SO-20240305-"));
        let suffix = number.rsplit('-').next().unwrap();
        prop_assert_eq!(suffix.len(), 4);
        prop_assert_eq!(suffix.parse::<i64>().unwrap(), sequence);
    }
}

// ============================================================================
// Unit Tests: Lifecycles
// ============================================================================

#[test]
fn test_purchase_order_happy_path() {
    use PurchaseOrderStatus::*;
    assert!(Draft.can_transition_to(Submitted));
    assert!(Submitted.can_transition_to(PartiallyReceived));
    assert!(PartiallyReceived.can_transition_to(Received));
    assert!(!Draft.can_transition_to(Received));
    assert!(Draft.is_editable());
    assert!(!Submitted.is_editable());
    assert!(!Draft.can_receive());
    assert!(Submitted.can_receive());
    assert!(PartiallyReceived.can_receive());
}

#[test]
fn test_sales_order_happy_path() {
    use SalesOrderStatus::*;
    assert!(Pending.can_transition_to(Confirmed));
    assert!(Confirmed.can_transition_to(Shipped));
    assert!(Shipped.can_transition_to(Delivered));
    assert!(!Pending.can_transition_to(Shipped));
    assert!(!Shipped.can_transition_to(Cancelled));
    assert!(Confirmed.holds_reservation());
    assert!(!Pending.holds_reservation());
}

#[test]
fn test_deletable_statuses() {
    assert!(PurchaseOrderStatus::Draft.is_deletable());
    assert!(PurchaseOrderStatus::Cancelled.is_deletable());
    assert!(!PurchaseOrderStatus::PartiallyReceived.is_deletable());
    assert!(SalesOrderStatus::Pending.is_deletable());
    assert!(!SalesOrderStatus::Shipped.is_deletable());
}

#[test]
fn test_empty_receipt_is_partial() {
    assert_eq!(receipt_status(&[]), PurchaseOrderStatus::PartiallyReceived);
}

#[test]
fn test_line_total() {
    assert_eq!(line_total(3, Decimal::new(1999, 2)), Decimal::new(5997, 2));
}
