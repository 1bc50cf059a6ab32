//! Sales order service
//!
//! Pending orders only check availability. Confirming reserves stock at the
//! ship-from location, shipping consumes the reservation, and cancelling a
//! confirmed order hands it back.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    order_total, DateRange, MovementType, PaginatedResponse, Pagination, SalesOrderStatus,
};
use sqlx::{FromRow, PgConnection, PgPool};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::audit::{self, AuditEntry};
use crate::services::purchase_order::{ensure_total_in_range, next_order_number};
use crate::services::stock::{self, NewMovement};

/// Sales order service
#[derive(Clone)]
pub struct SalesOrderService {
    db: PgPool,
}

/// Sales order header
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct SalesOrder {
    pub id: Uuid,
    pub order_number: String,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub location_id: Uuid,
    pub location_code: String,
    pub status: SalesOrderStatus,
    pub order_date: NaiveDate,
    pub total_amount: Decimal,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sales order line
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct SalesOrderItem {
    pub id: Uuid,
    pub sales_order_id: Uuid,
    pub product_id: Uuid,
    pub sku: String,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// Sales order with its lines
#[derive(Debug, Serialize, ToSchema)]
pub struct SalesOrderDetail {
    #[serde(flatten)]
    pub order: SalesOrder,
    pub items: Vec<SalesOrderItem>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SalesOrderItemInput {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
    /// Defaults to the product's unit price
    #[validate(custom = "shared::money_rule")]
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSalesOrderInput {
    #[validate(
        length(min = 1, max = 200, message = "Customer name must be 1-200 characters"),
        custom = "shared::not_blank_rule"
    )]
    pub customer_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub customer_email: Option<String>,
    /// Ship-from location
    pub location_id: Uuid,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    pub items: Vec<SalesOrderItemInput>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateSalesOrderInput {
    #[validate(
        length(min = 1, max = 200, message = "Customer name must be 1-200 characters"),
        custom = "shared::not_blank_rule"
    )]
    pub customer_name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub customer_email: Option<String>,
    pub location_id: Option<Uuid>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    /// Replaces all lines when present
    pub items: Option<Vec<SalesOrderItemInput>>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SalesOrderFilter {
    pub status: Option<SalesOrderStatus>,
    /// Case-insensitive match on customer name or email
    pub search: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// A line with its price resolved
struct PricedLine {
    product_id: Uuid,
    quantity: i32,
    unit_price: Decimal,
}

const ORDER_SELECT: &str = r#"
    SELECT so.id, so.order_number, so.customer_name, so.customer_email, so.location_id,
           l.code AS location_code, so.status, so.order_date, so.total_amount, so.notes,
           so.created_by, so.created_at, so.updated_at
    FROM sales_orders so
    JOIN locations l ON l.id = so.location_id
"#;

fn validate_items(items: &[SalesOrderItemInput]) -> AppResult<()> {
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

fn ensure_transition(current: SalesOrderStatus, next: SalesOrderStatus) -> AppResult<()> {
    if !current.can_transition_to(next) {
        return Err(AppError::InvalidStateTransition(format!(
            "Sales order cannot move from {} to {}",
            current, next
        )));
    }
    Ok(())
}

/// Total quantity per product, ordered by product id for lock ordering
fn quantities_by_product<I>(lines: I) -> AppResult<BTreeMap<Uuid, i32>>
where
    I: IntoIterator<Item = (Uuid, i32)>,
{
    let mut totals: BTreeMap<Uuid, i32> = BTreeMap::new();
    for (product_id, quantity) in lines {
        let total = totals.entry(product_id).or_insert(0);
        *total = total.checked_add(quantity).ok_or_else(|| {
            AppError::validation(
                "quantity",
                format!("Total quantity for product {} is too large", product_id),
            )
        })?;
    }
    Ok(totals)
}

/// Fill in default prices from the catalog; every product must exist and be active
async fn price_lines(
    conn: &mut PgConnection,
    items: &[SalesOrderItemInput],
) -> AppResult<Vec<PricedLine>> {
    let ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();

    let prices: HashMap<Uuid, Decimal> = sqlx::query_as::<_, (Uuid, Decimal)>(
        "SELECT id, unit_price FROM products WHERE id = ANY($1) AND is_active = true",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .collect();

    items
        .iter()
        .map(|item| -> AppResult<PricedLine> {
            let catalog_price = prices
                .get(&item.product_id)
                .copied()
                .ok_or_else(|| AppError::NotFound("Product".to_string()))?;
            Ok(PricedLine {
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: item.unit_price.unwrap_or(catalog_price),
            })
        })
        .collect()
}

/// Check the location can cover every line without reserving anything
async fn check_availability(
    conn: &mut PgConnection,
    location_id: Uuid,
    lines: &[PricedLine],
) -> AppResult<()> {
    let needed = quantities_by_product(lines.iter().map(|l| (l.product_id, l.quantity)))?;

    for (product_id, quantity) in needed {
        let available = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT quantity - reserved_quantity
            FROM stock
            WHERE product_id = $1 AND location_id = $2
            "#,
        )
        .bind(product_id)
        .bind(location_id)
        .fetch_optional(&mut *conn)
        .await?
        .unwrap_or(0);

        if quantity > available {
            return Err(AppError::InsufficientStock(format!(
                "Product {} has {} available at this location, {} requested",
                product_id, available, quantity
            )));
        }
    }
    Ok(())
}

async fn insert_items(
    conn: &mut PgConnection,
    order_id: Uuid,
    lines: &[PricedLine],
) -> AppResult<()> {
    for line in lines {
        sqlx::query(
            r#"
            INSERT INTO sales_order_items (sales_order_id, product_id, quantity, unit_price)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(order_id)
        .bind(line.product_id)
        .bind(line.quantity)
        .bind(line.unit_price)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Lock the order header and return its status and ship-from location
async fn lock_order(
    conn: &mut PgConnection,
    order_id: Uuid,
) -> AppResult<(SalesOrderStatus, Uuid)> {
    sqlx::query_as::<_, (SalesOrderStatus, Uuid)>(
        "SELECT status, location_id FROM sales_orders WHERE id = $1 FOR UPDATE",
    )
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Sales order".to_string()))
}

async fn order_quantities(
    conn: &mut PgConnection,
    order_id: Uuid,
) -> AppResult<BTreeMap<Uuid, i32>> {
    let lines = sqlx::query_as::<_, (Uuid, i32)>(
        "SELECT product_id, quantity FROM sales_order_items WHERE sales_order_id = $1",
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    quantities_by_product(lines)
}

async fn set_status(
    conn: &mut PgConnection,
    order_id: Uuid,
    status: SalesOrderStatus,
) -> AppResult<()> {
    sqlx::query("UPDATE sales_orders SET status = $1 WHERE id = $2")
        .bind(status)
        .bind(order_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

impl SalesOrderService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List sales orders with filters and pagination
    pub async fn list_sales_orders(
        &self,
        filter: &SalesOrderFilter,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<SalesOrder>> {
        let range = DateRange::from_bounds(filter.start_date, filter.end_date);
        if !range.is_valid() {
            return Err(AppError::validation(
                "end_date",
                "end_date must not be before start_date",
            ));
        }
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        const WHERE: &str = r#"
            WHERE ($1::sales_order_status IS NULL OR so.status = $1)
              AND ($2::text IS NULL OR so.customer_name ILIKE $2 OR so.customer_email ILIKE $2)
              AND so.order_date BETWEEN $3 AND $4
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM sales_orders so {WHERE}"
        ))
        .bind(filter.status)
        .bind(&search)
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&self.db)
        .await?;

        let orders = sqlx::query_as::<_, SalesOrder>(&format!(
            r#"
            {ORDER_SELECT}
            {WHERE}
            ORDER BY so.created_at DESC
            LIMIT $5 OFFSET $6
            "#
        ))
        .bind(filter.status)
        .bind(&search)
        .bind(range.start)
        .bind(range.end)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(orders, pagination, total))
    }

    /// Get a sales order with its lines
    pub async fn get_sales_order(&self, order_id: Uuid) -> AppResult<SalesOrderDetail> {
        let order = sqlx::query_as::<_, SalesOrder>(&format!("{ORDER_SELECT} WHERE so.id = $1"))
            .bind(order_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Sales order".to_string()))?;

        let items = sqlx::query_as::<_, SalesOrderItem>(
            r#"
            SELECT i.id, i.sales_order_id, i.product_id, p.sku, p.name AS product_name,
                   i.quantity, i.unit_price, (i.quantity * i.unit_price) AS line_total
            FROM sales_order_items i
            JOIN products p ON p.id = i.product_id
            WHERE i.sales_order_id = $1
            ORDER BY p.sku ASC
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.db)
        .await?;

        Ok(SalesOrderDetail { order, items })
    }

    /// Create a pending sales order
    pub async fn create_sales_order(
        &self,
        user_id: Uuid,
        input: CreateSalesOrderInput,
    ) -> AppResult<SalesOrderDetail> {
        input.validate()?;
        validate_items(&input.items)?;

        let mut tx = self.db.begin().await?;

        stock::ensure_active_location(&mut tx, input.location_id).await?;
        let lines = price_lines(&mut tx, &input.items).await?;
        check_availability(&mut tx, input.location_id, &lines).await?;

        let total = order_total(lines.iter().map(|l| (l.quantity, l.unit_price)));
        ensure_total_in_range(total)?;

        let order_number = next_order_number(&mut tx, "sales_orders", "SO").await?;

        let order_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO sales_orders (order_number, customer_name, customer_email, location_id,
                                      status, total_amount, notes, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&order_number)
        .bind(input.customer_name.trim())
        .bind(&input.customer_email)
        .bind(input.location_id)
        .bind(SalesOrderStatus::Pending)
        .bind(total)
        .bind(&input.notes)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        insert_items(&mut tx, order_id, &lines).await?;

        audit::record(
            &mut *tx,
            AuditEntry::new(user_id, "create", "sales_order", order_id).with_details(
                serde_json::json!({ "order_number": order_number, "total_amount": total }),
            ),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(order_id = %order_id, order_number = %order_number, "Sales order created");
        self.get_sales_order(order_id).await
    }

    /// Update a pending sales order
    pub async fn update_sales_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        input: UpdateSalesOrderInput,
    ) -> AppResult<SalesOrderDetail> {
        input.validate()?;
        if let Some(ref items) = input.items {
            validate_items(items)?;
        }

        let mut tx = self.db.begin().await?;

        let (status, current_location) = lock_order(&mut tx, order_id).await?;
        if !status.is_editable() {
            return Err(AppError::InvalidStateTransition(format!(
                "Only pending sales orders can be edited (status: {})",
                status
            )));
        }

        let location_id = input.location_id.unwrap_or(current_location);
        if input.location_id.is_some() {
            stock::ensure_active_location(&mut tx, location_id).await?;
        }

        if let Some(ref items) = input.items {
            let lines = price_lines(&mut tx, items).await?;
            ensure_total_in_range(order_total(lines.iter().map(|l| (l.quantity, l.unit_price))))?;
            check_availability(&mut tx, location_id, &lines).await?;

            sqlx::query("DELETE FROM sales_order_items WHERE sales_order_id = $1")
                .bind(order_id)
                .execute(&mut *tx)
                .await?;
            insert_items(&mut tx, order_id, &lines).await?;
        }

        sqlx::query(
            r#"
            UPDATE sales_orders
            SET customer_name = COALESCE($1, customer_name),
                customer_email = COALESCE($2, customer_email),
                location_id = $3,
                notes = COALESCE($4, notes),
                total_amount = (
                    SELECT COALESCE(SUM(quantity * unit_price), 0)
                    FROM sales_order_items WHERE sales_order_id = $5
                )
            WHERE id = $5
            "#,
        )
        .bind(input.customer_name.as_deref().map(str::trim))
        .bind(&input.customer_email)
        .bind(location_id)
        .bind(&input.notes)
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

        audit::record(
            &mut *tx,
            AuditEntry::new(user_id, "update", "sales_order", order_id),
        )
        .await?;

        tx.commit().await?;
        self.get_sales_order(order_id).await
    }

    /// Confirm a pending order and reserve its stock, all lines or none
    pub async fn confirm_sales_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> AppResult<SalesOrderDetail> {
        let mut tx = self.db.begin().await?;

        let (current, location_id) = lock_order(&mut tx, order_id).await?;
        ensure_transition(current, SalesOrderStatus::Confirmed)?;

        for (product_id, quantity) in order_quantities(&mut tx, order_id).await? {
            let level = stock::lock_stock(&mut tx, product_id, location_id).await?;
            let updated = level.reserve(quantity).map_err(|e| {
                AppError::InsufficientStock(format!("Product {}: {}", product_id, e))
            })?;
            stock::store_stock(&mut tx, product_id, location_id, updated).await?;
        }

        set_status(&mut tx, order_id, SalesOrderStatus::Confirmed).await?;

        audit::record(
            &mut *tx,
            AuditEntry::new(user_id, "confirm", "sales_order", order_id),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(order_id = %order_id, location_id = %location_id, "Sales order confirmed, stock reserved");
        self.get_sales_order(order_id).await
    }

    /// Ship a confirmed order, consuming its reservation
    pub async fn ship_sales_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> AppResult<SalesOrderDetail> {
        let mut tx = self.db.begin().await?;

        let (current, location_id) = lock_order(&mut tx, order_id).await?;
        ensure_transition(current, SalesOrderStatus::Shipped)?;

        for (product_id, quantity) in order_quantities(&mut tx, order_id).await? {
            let level = stock::lock_stock(&mut tx, product_id, location_id).await?;
            let updated = level.ship(quantity)?;
            stock::store_stock(&mut tx, product_id, location_id, updated).await?;

            stock::insert_movement(
                &mut tx,
                &NewMovement {
                    product_id,
                    location_id,
                    movement_type: MovementType::SalesShipment,
                    quantity_change: MovementType::SalesShipment.signed(quantity),
                    quantity_after: updated.quantity,
                    reference_type: Some("sales_order"),
                    reference_id: Some(order_id),
                    notes: None,
                    created_by: user_id,
                },
            )
            .await?;
        }

        set_status(&mut tx, order_id, SalesOrderStatus::Shipped).await?;

        audit::record(
            &mut *tx,
            AuditEntry::new(user_id, "ship", "sales_order", order_id),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(order_id = %order_id, location_id = %location_id, "Sales order shipped");
        self.get_sales_order(order_id).await
    }

    /// Mark a shipped order as delivered
    pub async fn deliver_sales_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> AppResult<SalesOrderDetail> {
        let mut tx = self.db.begin().await?;

        let (current, _) = lock_order(&mut tx, order_id).await?;
        ensure_transition(current, SalesOrderStatus::Delivered)?;
        set_status(&mut tx, order_id, SalesOrderStatus::Delivered).await?;

        audit::record(
            &mut *tx,
            AuditEntry::new(user_id, "deliver", "sales_order", order_id),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(order_id = %order_id, "Sales order delivered");
        self.get_sales_order(order_id).await
    }

    /// Cancel a pending or confirmed order, releasing any reservation
    pub async fn cancel_sales_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> AppResult<SalesOrderDetail> {
        let mut tx = self.db.begin().await?;

        let (current, location_id) = lock_order(&mut tx, order_id).await?;
        ensure_transition(current, SalesOrderStatus::Cancelled)?;

        if current.holds_reservation() {
            for (product_id, quantity) in order_quantities(&mut tx, order_id).await? {
                let level = stock::lock_stock(&mut tx, product_id, location_id).await?;
                let updated = level.release(quantity)?;
                stock::store_stock(&mut tx, product_id, location_id, updated).await?;
            }
        }

        set_status(&mut tx, order_id, SalesOrderStatus::Cancelled).await?;

        audit::record(
            &mut *tx,
            AuditEntry::new(user_id, "cancel", "sales_order", order_id)
                .with_details(serde_json::json!({ "from": current })),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(order_id = %order_id, from = %current, "Sales order cancelled");
        self.get_sales_order(order_id).await
    }

    /// Delete a pending or cancelled order
    pub async fn delete_sales_order(&self, user_id: Uuid, order_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let (status, _) = lock_order(&mut tx, order_id).await?;
        if !status.is_deletable() {
            return Err(AppError::InvalidStateTransition(format!(
                "Sales order in status {} cannot be deleted",
                status
            )));
        }

        sqlx::query("DELETE FROM sales_orders WHERE id = $1")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        audit::record(
            &mut *tx,
            AuditEntry::new(user_id, "delete", "sales_order", order_id),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(order_id = %order_id, "Sales order deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantities_merge_repeated_products() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let totals = quantities_by_product([(a, 2), (b, 5), (a, 3)]).unwrap();
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[&a], 5);
        assert_eq!(totals[&b], 5);

        let keys: Vec<Uuid> = totals.keys().copied().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_repeated_lines_beyond_i32_are_rejected() {
        let a = Uuid::new_v4();
        let result = quantities_by_product([(a, 2_000_000_000), (a, 2_000_000_000)]);
        assert!(matches!(
            result,
            Err(AppError::Validation { field, .. }) if field == "quantity"
        ));

        let totals = quantities_by_product([(a, i32::MAX - 1), (a, 1)]).unwrap();
        assert_eq!(totals[&a], i32::MAX);
    }

    #[test]
    fn test_shipped_orders_cannot_be_cancelled() {
        assert!(matches!(
            ensure_transition(SalesOrderStatus::Shipped, SalesOrderStatus::Cancelled),
            Err(AppError::InvalidStateTransition(_))
        ));
        assert!(ensure_transition(SalesOrderStatus::Confirmed, SalesOrderStatus::Cancelled).is_ok());
    }

    #[test]
    fn test_item_validation() {
        assert!(validate_items(&[]).is_err());
        let item = SalesOrderItemInput {
            product_id: Uuid::new_v4(),
            quantity: 0,
            unit_price: None,
        };
        assert!(validate_items(&[item]).is_err());
    }
}
