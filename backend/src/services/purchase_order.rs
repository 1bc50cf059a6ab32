//! Purchase order service
//!
//! Orders are drafted, submitted to the supplier and then received in one or
//! more deliveries. Receiving books stock into a location through the same
//! locking path the stock service uses.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    generate_order_number, order_total, receipt_status, validate_order_total, DateRange,
    MovementType, PaginatedResponse, Pagination, PurchaseOrderStatus, ReceiptLine,
};
use sqlx::{FromRow, PgConnection, PgPool};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::audit::{self, AuditEntry};
use crate::services::stock::{self, NewMovement};

/// Purchase order service
#[derive(Clone)]
pub struct PurchaseOrderService {
    db: PgPool,
}

/// Purchase order header
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct PurchaseOrder {
    pub id: Uuid,
    pub order_number: String,
    pub supplier_id: Uuid,
    pub supplier_name: String,
    pub status: PurchaseOrderStatus,
    pub order_date: NaiveDate,
    pub expected_date: Option<NaiveDate>,
    pub total_amount: Decimal,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Purchase order line
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct PurchaseOrderItem {
    pub id: Uuid,
    pub purchase_order_id: Uuid,
    pub product_id: Uuid,
    pub sku: String,
    pub product_name: String,
    pub quantity: i32,
    pub received_quantity: i32,
    pub unit_cost: Decimal,
    pub line_total: Decimal,
}

/// Purchase order with its lines
#[derive(Debug, Serialize, ToSchema)]
pub struct PurchaseOrderDetail {
    #[serde(flatten)]
    pub order: PurchaseOrder,
    pub items: Vec<PurchaseOrderItem>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct PurchaseOrderItemInput {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
    #[validate(custom = "shared::money_rule")]
    pub unit_cost: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePurchaseOrderInput {
    pub supplier_id: Uuid,
    pub expected_date: Option<NaiveDate>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    pub items: Vec<PurchaseOrderItemInput>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdatePurchaseOrderInput {
    pub supplier_id: Option<Uuid>,
    pub expected_date: Option<NaiveDate>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    /// Replaces all lines when present
    pub items: Option<Vec<PurchaseOrderItemInput>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReceiveLineInput {
    pub item_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
}

/// Goods received against a purchase order
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReceivePurchaseOrderInput {
    /// Location the goods are booked into
    pub location_id: Uuid,
    pub items: Vec<ReceiveLineInput>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PurchaseOrderFilter {
    pub status: Option<PurchaseOrderStatus>,
    pub supplier_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

const ORDER_SELECT: &str = r#"
    SELECT po.id, po.order_number, po.supplier_id, s.name AS supplier_name, po.status,
           po.order_date, po.expected_date, po.total_amount, po.notes, po.created_by,
           po.created_at, po.updated_at
    FROM purchase_orders po
    JOIN suppliers s ON s.id = po.supplier_id
"#;

/// Next order number for today, serialised with a transaction-scoped advisory lock
pub(crate) async fn next_order_number(
    conn: &mut PgConnection,
    table: &'static str,
    prefix: &'static str,
) -> AppResult<String> {
    let today = Utc::now().date_naive();
    let stem = format!("{}-{}-", prefix, today.format("%Y%m%d"));

    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(table)
        .execute(&mut *conn)
        .await?;

    let last = sqlx::query_scalar::<_, i64>(&format!(
        r#"
        SELECT COALESCE(MAX(SUBSTRING(order_number FROM '[0-9]+$')::bigint), 0)
        FROM {table}
        WHERE order_number LIKE $1 || '%'
        "#
    ))
    .bind(&stem)
    .fetch_one(&mut *conn)
    .await?;

    Ok(generate_order_number(prefix, today, last + 1))
}

/// Every referenced product exists and is active
pub(crate) async fn ensure_active_products(
    conn: &mut PgConnection,
    product_ids: &[Uuid],
) -> AppResult<()> {
    let distinct: HashSet<Uuid> = product_ids.iter().copied().collect();
    let ids: Vec<Uuid> = distinct.into_iter().collect();

    let found = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM products WHERE id = ANY($1) AND is_active = true",
    )
    .bind(&ids)
    .fetch_one(&mut *conn)
    .await?;

    if found != ids.len() as i64 {
        return Err(AppError::NotFound("Product".to_string()));
    }
    Ok(())
}

fn validate_items(items: &[PurchaseOrderItemInput]) -> AppResult<()> {
    if items.is_empty() {
        return Err(AppError::validation(
            "items",
            "At least one item is required",
        ));
    }
    for item in items {
        item.validate()?;
    }
    Ok(())
}

fn validate_receipt(input: &ReceivePurchaseOrderInput) -> AppResult<()> {
    input.validate()?;
    if input.items.is_empty() {
        return Err(AppError::validation(
            "items",
            "At least one line must be received",
        ));
    }
    let mut seen = HashSet::new();
    for line in &input.items {
        line.validate()?;
        if !seen.insert(line.item_id) {
            return Err(AppError::validation(
                "items",
                "Each order line may appear only once per receipt",
            ));
        }
    }
    Ok(())
}

fn ensure_transition(current: PurchaseOrderStatus, next: PurchaseOrderStatus) -> AppResult<()> {
    if !current.can_transition_to(next) {
        return Err(AppError::InvalidStateTransition(format!(
            "Purchase order cannot move from {} to {}",
            current, next
        )));
    }
    Ok(())
}

fn items_total(items: &[PurchaseOrderItemInput]) -> Decimal {
    order_total(items.iter().map(|i| (i.quantity, i.unit_cost)))
}

/// Order totals must fit the amount columns
pub(crate) fn ensure_total_in_range(total: Decimal) -> AppResult<()> {
    validate_order_total(total).map_err(|message| AppError::validation("items", message))
}

async fn insert_items(
    conn: &mut PgConnection,
    order_id: Uuid,
    items: &[PurchaseOrderItemInput],
) -> AppResult<()> {
    for item in items {
        sqlx::query(
            r#"
            INSERT INTO purchase_order_items (purchase_order_id, product_id, quantity, unit_cost)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(order_id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(item.unit_cost)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Lock the order header and return its status
async fn lock_order(conn: &mut PgConnection, order_id: Uuid) -> AppResult<PurchaseOrderStatus> {
    sqlx::query_scalar::<_, PurchaseOrderStatus>(
        "SELECT status FROM purchase_orders WHERE id = $1 FOR UPDATE",
    )
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))
}

async fn ensure_active_supplier(conn: &mut PgConnection, supplier_id: Uuid) -> AppResult<()> {
    let active = sqlx::query_scalar::<_, bool>("SELECT is_active FROM suppliers WHERE id = $1")
        .bind(supplier_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Supplier".to_string()))?;

    if !active {
        return Err(AppError::validation("supplier_id", "Supplier is inactive"));
    }
    Ok(())
}

impl PurchaseOrderService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List purchase orders with filters and pagination
    pub async fn list_purchase_orders(
        &self,
        filter: &PurchaseOrderFilter,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<PurchaseOrder>> {
        let range = DateRange::from_bounds(filter.start_date, filter.end_date);
        if !range.is_valid() {
            return Err(AppError::validation(
                "end_date",
                "end_date must not be before start_date",
            ));
        }

        const WHERE: &str = r#"
            WHERE ($1::purchase_order_status IS NULL OR po.status = $1)
              AND ($2::uuid IS NULL OR po.supplier_id = $2)
              AND po.order_date BETWEEN $3 AND $4
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM purchase_orders po {WHERE}"
        ))
        .bind(filter.status)
        .bind(filter.supplier_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&self.db)
        .await?;

        let orders = sqlx::query_as::<_, PurchaseOrder>(&format!(
            r#"
            {ORDER_SELECT}
            {WHERE}
            ORDER BY po.created_at DESC
            LIMIT $5 OFFSET $6
            "#
        ))
        .bind(filter.status)
        .bind(filter.supplier_id)
        .bind(range.start)
        .bind(range.end)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(orders, pagination, total))
    }

    /// Get a purchase order with its lines
    pub async fn get_purchase_order(&self, order_id: Uuid) -> AppResult<PurchaseOrderDetail> {
        let order = sqlx::query_as::<_, PurchaseOrder>(&format!(
            "{ORDER_SELECT} WHERE po.id = $1"
        ))
        .bind(order_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))?;

        let items = sqlx::query_as::<_, PurchaseOrderItem>(
            r#"
            SELECT i.id, i.purchase_order_id, i.product_id, p.sku, p.name AS product_name,
                   i.quantity, i.received_quantity, i.unit_cost,
                   (i.quantity * i.unit_cost) AS line_total
            FROM purchase_order_items i
            JOIN products p ON p.id = i.product_id
            WHERE i.purchase_order_id = $1
            ORDER BY p.sku ASC
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.db)
        .await?;

        Ok(PurchaseOrderDetail { order, items })
    }

    /// Create a draft purchase order
    pub async fn create_purchase_order(
        &self,
        user_id: Uuid,
        input: CreatePurchaseOrderInput,
    ) -> AppResult<PurchaseOrderDetail> {
        input.validate()?;
        validate_items(&input.items)?;
        let total = items_total(&input.items);
        ensure_total_in_range(total)?;

        let mut tx = self.db.begin().await?;

        ensure_active_supplier(&mut tx, input.supplier_id).await?;
        let product_ids: Vec<Uuid> = input.items.iter().map(|i| i.product_id).collect();
        ensure_active_products(&mut tx, &product_ids).await?;

        let order_number = next_order_number(&mut tx, "purchase_orders", "PO").await?;

        let order_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO purchase_orders (order_number, supplier_id, status, expected_date,
                                         total_amount, notes, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&order_number)
        .bind(input.supplier_id)
        .bind(PurchaseOrderStatus::Draft)
        .bind(input.expected_date)
        .bind(total)
        .bind(&input.notes)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        insert_items(&mut tx, order_id, &input.items).await?;

        audit::record(
            &mut *tx,
            AuditEntry::new(user_id, "create", "purchase_order", order_id).with_details(
                serde_json::json!({ "order_number": order_number, "total_amount": total }),
            ),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(order_id = %order_id, order_number = %order_number, "Purchase order created");
        self.get_purchase_order(order_id).await
    }

    /// Update a draft purchase order
    pub async fn update_purchase_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        input: UpdatePurchaseOrderInput,
    ) -> AppResult<PurchaseOrderDetail> {
        input.validate()?;
        if let Some(ref items) = input.items {
            validate_items(items)?;
            ensure_total_in_range(items_total(items))?;
        }

        let mut tx = self.db.begin().await?;

        let status = lock_order(&mut tx, order_id).await?;
        if !status.is_editable() {
            return Err(AppError::InvalidStateTransition(format!(
                "Only draft purchase orders can be edited (status: {})",
                status
            )));
        }

        if let Some(supplier_id) = input.supplier_id {
            ensure_active_supplier(&mut tx, supplier_id).await?;
        }

        if let Some(ref items) = input.items {
            let product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
            ensure_active_products(&mut tx, &product_ids).await?;

            sqlx::query("DELETE FROM purchase_order_items WHERE purchase_order_id = $1")
                .bind(order_id)
                .execute(&mut *tx)
                .await?;
            insert_items(&mut tx, order_id, items).await?;
        }

        sqlx::query(
            r#"
            UPDATE purchase_orders
            SET supplier_id = COALESCE($1, supplier_id),
                expected_date = COALESCE($2, expected_date),
                notes = COALESCE($3, notes),
                total_amount = (
                    SELECT COALESCE(SUM(quantity * unit_cost), 0)
                    FROM purchase_order_items WHERE purchase_order_id = $4
                )
            WHERE id = $4
            "#,
        )
        .bind(input.supplier_id)
        .bind(input.expected_date)
        .bind(&input.notes)
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

        audit::record(
            &mut *tx,
            AuditEntry::new(user_id, "update", "purchase_order", order_id),
        )
        .await?;

        tx.commit().await?;
        self.get_purchase_order(order_id).await
    }

    /// Submit a draft purchase order to the supplier
    pub async fn submit_purchase_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> AppResult<PurchaseOrderDetail> {
        self.change_status(user_id, order_id, PurchaseOrderStatus::Submitted, "submit")
            .await
    }

    /// Cancel a purchase order; stock already received stays booked
    pub async fn cancel_purchase_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> AppResult<PurchaseOrderDetail> {
        self.change_status(user_id, order_id, PurchaseOrderStatus::Cancelled, "cancel")
            .await
    }

    async fn change_status(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        next: PurchaseOrderStatus,
        action: &'static str,
    ) -> AppResult<PurchaseOrderDetail> {
        let mut tx = self.db.begin().await?;

        let current = lock_order(&mut tx, order_id).await?;
        ensure_transition(current, next)?;

        sqlx::query("UPDATE purchase_orders SET status = $1 WHERE id = $2")
            .bind(next)
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        audit::record(
            &mut *tx,
            AuditEntry::new(user_id, action, "purchase_order", order_id)
                .with_details(serde_json::json!({ "from": current, "to": next })),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(order_id = %order_id, from = %current, to = %next, "Purchase order status changed");
        self.get_purchase_order(order_id).await
    }

    /// Book received goods into stock
    pub async fn receive_purchase_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        input: ReceivePurchaseOrderInput,
    ) -> AppResult<PurchaseOrderDetail> {
        validate_receipt(&input)?;

        let mut tx = self.db.begin().await?;

        let current = lock_order(&mut tx, order_id).await?;
        if !current.can_receive() {
            return Err(AppError::InvalidStateTransition(format!(
                "Purchase order in status {} cannot be received",
                current
            )));
        }
        stock::ensure_active_location(&mut tx, input.location_id).await?;

        let lines = sqlx::query_as::<_, (Uuid, Uuid, i32, i32)>(
            r#"
            SELECT id, product_id, quantity, received_quantity
            FROM purchase_order_items
            WHERE purchase_order_id = $1
            FOR UPDATE
            "#,
        )
        .bind(order_id)
        .fetch_all(&mut *tx)
        .await?;

        let mut state: HashMap<Uuid, (Uuid, ReceiptLine)> = lines
            .into_iter()
            .map(|(id, product_id, ordered, received)| {
                (id, (product_id, ReceiptLine { ordered, received }))
            })
            .collect();

        // Resolve lines first so nothing is booked when any line is invalid
        let mut receipts = Vec::with_capacity(input.items.len());
        for line in &input.items {
            let (product_id, receipt) = state
                .get(&line.item_id)
                .copied()
                .ok_or_else(|| AppError::NotFound("Purchase order item".to_string()))?;

            if line.quantity > receipt.remaining() {
                return Err(AppError::validation(
                    "quantity",
                    format!(
                        "Cannot receive {} units, only {} remaining on line {}",
                        line.quantity,
                        receipt.remaining(),
                        line.item_id
                    ),
                ));
            }
            receipts.push((line.item_id, product_id, line.quantity));
        }

        // Stock rows are locked in product order
        receipts.sort_by_key(|(_, product_id, _)| *product_id);

        for (item_id, product_id, quantity) in receipts {
            sqlx::query(
                "UPDATE purchase_order_items SET received_quantity = received_quantity + $1 WHERE id = $2",
            )
            .bind(quantity)
            .bind(item_id)
            .execute(&mut *tx)
            .await?;

            if let Some((_, receipt)) = state.get_mut(&item_id) {
                receipt.received += quantity;
            }

            let level = stock::lock_stock(&mut tx, product_id, input.location_id).await?;
            let updated = level.add(quantity)?;
            stock::store_stock(&mut tx, product_id, input.location_id, updated).await?;

            stock::insert_movement(
                &mut tx,
                &NewMovement {
                    product_id,
                    location_id: input.location_id,
                    movement_type: MovementType::PurchaseReceipt,
                    quantity_change: MovementType::PurchaseReceipt.signed(quantity),
                    quantity_after: updated.quantity,
                    reference_type: Some("purchase_order"),
                    reference_id: Some(order_id),
                    notes: input.notes.as_deref(),
                    created_by: user_id,
                },
            )
            .await?;
        }

        let all_lines: Vec<ReceiptLine> = state.values().map(|(_, line)| *line).collect();
        let next = receipt_status(&all_lines);
        ensure_transition(current, next)?;

        sqlx::query("UPDATE purchase_orders SET status = $1 WHERE id = $2")
            .bind(next)
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        audit::record(
            &mut *tx,
            AuditEntry::new(user_id, "receive", "purchase_order", order_id).with_details(
                serde_json::json!({
                    "location_id": input.location_id,
                    "lines": input.items.len(),
                    "status": next,
                }),
            ),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            order_id = %order_id,
            location_id = %input.location_id,
            lines = input.items.len(),
            status = %next,
            "Purchase order received"
        );

        self.get_purchase_order(order_id).await
    }

    /// Delete a draft or cancelled purchase order
    pub async fn delete_purchase_order(&self, user_id: Uuid, order_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let status = lock_order(&mut tx, order_id).await?;
        if !status.is_deletable() {
            return Err(AppError::InvalidStateTransition(format!(
                "Purchase order in status {} cannot be deleted",
                status
            )));
        }

        sqlx::query("DELETE FROM purchase_orders WHERE id = $1")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        audit::record(
            &mut *tx,
            AuditEntry::new(user_id, "delete", "purchase_order", order_id),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(order_id = %order_id, "Purchase order deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn item(quantity: i32, unit_cost: &str) -> PurchaseOrderItemInput {
        PurchaseOrderItemInput {
            product_id: Uuid::new_v4(),
            quantity,
            unit_cost: Decimal::from_str(unit_cost).unwrap(),
        }
    }

    #[test]
    fn test_items_required() {
        assert!(matches!(
            validate_items(&[]),
            Err(AppError::Validation { .. })
        ));
        assert!(validate_items(&[item(1, "1.00")]).is_ok());
        assert!(validate_items(&[item(0, "1.00")]).is_err());
        assert!(validate_items(&[item(1, "-1.00")]).is_err());
    }

    #[test]
    fn test_total_beyond_column_range_is_rejected() {
        // Each unit cost is valid on its own, the extended total is not
        let items = [item(2, "999999999999.00")];
        assert!(validate_items(&items).is_ok());
        assert!(matches!(
            ensure_total_in_range(items_total(&items)),
            Err(AppError::Validation { field, .. }) if field == "items"
        ));
        assert!(ensure_total_in_range(items_total(&[item(1, "999999999999.99")])).is_ok());
    }

    #[test]
    fn test_unit_cost_beyond_column_range_is_rejected() {
        assert!(validate_items(&[item(1, "1000000000000000.00")]).is_err());
    }

    #[test]
    fn test_items_total() {
        let total = items_total(&[item(3, "2.50"), item(1, "10.00")]);
        assert_eq!(total, Decimal::from_str("17.50").unwrap());
    }

    #[test]
    fn test_receipt_rejects_repeated_lines() {
        let item_id = Uuid::new_v4();
        let input = ReceivePurchaseOrderInput {
            location_id: Uuid::new_v4(),
            items: vec![
                ReceiveLineInput { item_id, quantity: 1 },
                ReceiveLineInput { item_id, quantity: 2 },
            ],
            notes: None,
        };
        assert!(validate_receipt(&input).is_err());
    }

    #[test]
    fn test_transition_errors_are_unprocessable() {
        let err = ensure_transition(PurchaseOrderStatus::Received, PurchaseOrderStatus::Cancelled)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidStateTransition(_)));
        assert!(ensure_transition(PurchaseOrderStatus::Draft, PurchaseOrderStatus::Submitted).is_ok());
    }
}
