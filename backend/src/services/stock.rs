//! Stock level service
//!
//! Every mutation follows the same shape inside one transaction:
//! lock the `stock` row (creating it at zero when missing), run the
//! `StockLevel` arithmetic from `shared`, write the row back, then append a
//! movement and an audit entry. Any error drops the transaction, which rolls
//! back all of it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shared::{
    AdjustmentType, DateRange, ManualMovement, MovementType, PaginatedResponse, Pagination,
    StockLevel,
};
use sqlx::{FromRow, PgConnection, PgPool};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::audit::{self, AuditEntry};
use crate::services::product::StockTotals;

/// Stock service
#[derive(Clone)]
pub struct StockService {
    db: PgPool,
}

/// Stock of one product at one location
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct StockRecord {
    pub id: Uuid,
    pub product_id: Uuid,
    pub sku: String,
    pub product_name: String,
    pub location_id: Uuid,
    pub location_code: String,
    pub warehouse_id: Uuid,
    pub warehouse_code: String,
    pub quantity: i32,
    pub reserved_quantity: i32,
    pub available_quantity: i32,
    pub updated_at: DateTime<Utc>,
}

/// Stock of one product at every location
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductStock {
    pub product_id: Uuid,
    pub sku: String,
    pub name: String,
    pub reorder_level: i32,
    pub is_low_stock: bool,
    pub totals: StockTotals,
    pub locations: Vec<StockRecord>,
}

/// Stock movement ledger entry
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct StockMovement {
    pub id: Uuid,
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub movement_type: MovementType,
    pub quantity_change: i32,
    pub quantity_after: i32,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Stock adjustment record
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct StockAdjustment {
    pub id: Uuid,
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub adjustment_type: AdjustmentType,
    pub quantity: i32,
    pub previous_quantity: i32,
    pub new_quantity: i32,
    pub reason: String,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Active product at or below its reorder level
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct LowStockItem {
    pub product_id: Uuid,
    pub sku: String,
    pub name: String,
    pub reorder_level: i32,
    pub quantity_on_hand: i64,
    pub quantity_available: i64,
    pub shortfall: i64,
}

/// Result of a transfer between two locations
#[derive(Debug, Serialize, ToSchema)]
pub struct TransferResult {
    pub transfer_out: StockMovement,
    pub transfer_in: StockMovement,
}

/// Input for a manual inbound/outbound movement
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RecordMovementInput {
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub movement_type: ManualMovement,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

/// Input for a stock adjustment
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AdjustStockInput {
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub adjustment_type: AdjustmentType,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: i32,
    #[validate(
        length(min = 1, max = 500, message = "Reason is required"),
        custom = "shared::not_blank_rule"
    )]
    pub reason: String,
}

/// Input for moving stock between locations
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TransferStockInput {
    pub product_id: Uuid,
    pub from_location_id: Uuid,
    pub to_location_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

/// Filters for listing stock levels
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StockFilter {
    pub product_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    /// Only rows whose product total is at or below its reorder level
    pub low_stock: Option<bool>,
}

/// Filters for listing movements
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MovementFilter {
    pub product_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub movement_type: Option<MovementType>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Filters for listing adjustments
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AdjustmentFilter {
    pub product_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
}

/// A movement row to append to the ledger
pub(crate) struct NewMovement<'a> {
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub movement_type: MovementType,
    pub quantity_change: i32,
    pub quantity_after: i32,
    pub reference_type: Option<&'static str>,
    pub reference_id: Option<Uuid>,
    pub notes: Option<&'a str>,
    pub created_by: Uuid,
}

const STOCK_RECORD_SELECT: &str = r#"
    SELECT s.id, s.product_id, p.sku, p.name AS product_name,
           s.location_id, l.code AS location_code,
           l.warehouse_id, w.code AS warehouse_code,
           s.quantity, s.reserved_quantity,
           (s.quantity - s.reserved_quantity) AS available_quantity,
           s.updated_at
    FROM stock s
    JOIN products p ON p.id = s.product_id
    JOIN locations l ON l.id = s.location_id
    JOIN warehouses w ON w.id = l.warehouse_id
"#;

const MOVEMENT_COLUMNS: &str = "id, product_id, location_id, movement_type, quantity_change, quantity_after, reference_type, reference_id, notes, created_by, created_at";

const ADJUSTMENT_COLUMNS: &str = "id, product_id, location_id, adjustment_type, quantity, previous_quantity, new_quantity, reason, created_by, created_at";

// ============================================================================
// Transaction building blocks
// ============================================================================

/// Lock the stock row for a product at a location, creating it when missing
pub(crate) async fn lock_stock(
    conn: &mut PgConnection,
    product_id: Uuid,
    location_id: Uuid,
) -> AppResult<StockLevel> {
    sqlx::query(
        r#"
        INSERT INTO stock (product_id, location_id, quantity, reserved_quantity)
        VALUES ($1, $2, 0, 0)
        ON CONFLICT (product_id, location_id) DO NOTHING
        "#,
    )
    .bind(product_id)
    .bind(location_id)
    .execute(&mut *conn)
    .await?;

    let (quantity, reserved) = sqlx::query_as::<_, (i32, i32)>(
        r#"
        SELECT quantity, reserved_quantity
        FROM stock
        WHERE product_id = $1 AND location_id = $2
        FOR UPDATE
        "#,
    )
    .bind(product_id)
    .bind(location_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(StockLevel::new(quantity, reserved))
}

/// Write a locked stock row back
pub(crate) async fn store_stock(
    conn: &mut PgConnection,
    product_id: Uuid,
    location_id: Uuid,
    level: StockLevel,
) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE stock
        SET quantity = $1, reserved_quantity = $2
        WHERE product_id = $3 AND location_id = $4
        "#,
    )
    .bind(level.quantity)
    .bind(level.reserved)
    .bind(product_id)
    .bind(location_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Append a movement to the ledger
pub(crate) async fn insert_movement(
    conn: &mut PgConnection,
    movement: &NewMovement<'_>,
) -> AppResult<StockMovement> {
    let row = sqlx::query_as::<_, StockMovement>(&format!(
        r#"
        INSERT INTO stock_movements (product_id, location_id, movement_type, quantity_change,
                                     quantity_after, reference_type, reference_id, notes, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {MOVEMENT_COLUMNS}
        "#
    ))
    .bind(movement.product_id)
    .bind(movement.location_id)
    .bind(movement.movement_type)
    .bind(movement.quantity_change)
    .bind(movement.quantity_after)
    .bind(movement.reference_type)
    .bind(movement.reference_id)
    .bind(movement.notes)
    .bind(movement.created_by)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}

/// Product exists and is active
pub(crate) async fn ensure_active_product(
    conn: &mut PgConnection,
    product_id: Uuid,
) -> AppResult<()> {
    let active = sqlx::query_scalar::<_, bool>("SELECT is_active FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

    if !active {
        return Err(AppError::validation("product_id", "Product is inactive"));
    }
    Ok(())
}

/// Location exists and is active, and so is its warehouse
pub(crate) async fn ensure_active_location(
    conn: &mut PgConnection,
    location_id: Uuid,
) -> AppResult<()> {
    let active = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT l.is_active AND w.is_active
        FROM locations l
        JOIN warehouses w ON w.id = l.warehouse_id
        WHERE l.id = $1
        "#,
    )
    .bind(location_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Location".to_string()))?;

    if !active {
        return Err(AppError::validation("location_id", "Location is inactive"));
    }
    Ok(())
}

fn validate_transfer(input: &TransferStockInput) -> AppResult<()> {
    input.validate()?;
    if input.from_location_id == input.to_location_id {
        return Err(AppError::validation(
            "to_location_id",
            "Source and destination locations must differ",
        ));
    }
    Ok(())
}

impl StockService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List stock levels with filters and pagination
    pub async fn list_stock(
        &self,
        filter: &StockFilter,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<StockRecord>> {
        const WHERE: &str = r#"
            WHERE ($1::uuid IS NULL OR s.product_id = $1)
              AND ($2::uuid IS NULL OR l.warehouse_id = $2)
              AND ($3::uuid IS NULL OR s.location_id = $3)
              AND ($4::bool IS NULL OR (
                    (SELECT COALESCE(SUM(t.quantity), 0) FROM stock t WHERE t.product_id = s.product_id)
                        <= p.reorder_level
                  ) = $4)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            r#"
            SELECT COUNT(*)
            FROM stock s
            JOIN products p ON p.id = s.product_id
            JOIN locations l ON l.id = s.location_id
            {WHERE}
            "#
        ))
        .bind(filter.product_id)
        .bind(filter.warehouse_id)
        .bind(filter.location_id)
        .bind(filter.low_stock)
        .fetch_one(&self.db)
        .await?;

        let records = sqlx::query_as::<_, StockRecord>(&format!(
            r#"
            {STOCK_RECORD_SELECT}
            {WHERE}
            ORDER BY p.sku ASC, w.code ASC, l.code ASC
            LIMIT $5 OFFSET $6
            "#
        ))
        .bind(filter.product_id)
        .bind(filter.warehouse_id)
        .bind(filter.location_id)
        .bind(filter.low_stock)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(records, pagination, total))
    }

    /// Per-location stock and totals for one product
    pub async fn get_product_stock(&self, product_id: Uuid) -> AppResult<ProductStock> {
        let (sku, name, reorder_level) = sqlx::query_as::<_, (String, String, i32)>(
            "SELECT sku, name, reorder_level FROM products WHERE id = $1",
        )
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        let locations = sqlx::query_as::<_, StockRecord>(&format!(
            r#"
            {STOCK_RECORD_SELECT}
            WHERE s.product_id = $1
            ORDER BY w.code ASC, l.code ASC
            "#
        ))
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        let totals = locations.iter().fold(StockTotals::default(), |acc, s| StockTotals {
            quantity_on_hand: acc.quantity_on_hand + i64::from(s.quantity),
            quantity_reserved: acc.quantity_reserved + i64::from(s.reserved_quantity),
            quantity_available: acc.quantity_available + i64::from(s.available_quantity),
        });

        Ok(ProductStock {
            product_id,
            sku,
            name,
            reorder_level,
            is_low_stock: shared::is_low_stock(totals.quantity_on_hand, reorder_level),
            totals,
            locations,
        })
    }

    /// Record a manual inbound or outbound movement
    pub async fn record_movement(
        &self,
        user_id: Uuid,
        input: RecordMovementInput,
    ) -> AppResult<StockMovement> {
        input.validate()?;
        let movement_type = MovementType::from(input.movement_type);

        let mut tx = self.db.begin().await?;

        ensure_active_product(&mut tx, input.product_id).await?;
        ensure_active_location(&mut tx, input.location_id).await?;

        let level = lock_stock(&mut tx, input.product_id, input.location_id).await?;
        let updated = match input.movement_type {
            ManualMovement::Inbound => level.add(input.quantity)?,
            ManualMovement::Outbound => level.remove(input.quantity)?,
        };
        store_stock(&mut tx, input.product_id, input.location_id, updated).await?;

        let movement = insert_movement(
            &mut tx,
            &NewMovement {
                product_id: input.product_id,
                location_id: input.location_id,
                movement_type,
                quantity_change: movement_type.signed(input.quantity),
                quantity_after: updated.quantity,
                reference_type: None,
                reference_id: None,
                notes: input.notes.as_deref(),
                created_by: user_id,
            },
        )
        .await?;

        audit::record(
            &mut *tx,
            AuditEntry::new(user_id, movement_type.as_str(), "stock", movement.id).with_details(
                serde_json::json!({
                    "product_id": input.product_id,
                    "location_id": input.location_id,
                    "quantity": input.quantity,
                    "quantity_after": updated.quantity,
                }),
            ),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            product_id = %input.product_id,
            location_id = %input.location_id,
            movement = %movement_type,
            quantity = input.quantity,
            quantity_after = updated.quantity,
            "Stock movement recorded"
        );

        Ok(movement)
    }

    /// List movements with filters and pagination
    pub async fn list_movements(
        &self,
        filter: &MovementFilter,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<StockMovement>> {
        let range = DateRange::from_bounds(filter.start_date, filter.end_date);
        if !range.is_valid() {
            return Err(AppError::validation(
                "end_date",
                "end_date must not be before start_date",
            ));
        }

        const WHERE: &str = r#"
            WHERE ($1::uuid IS NULL OR product_id = $1)
              AND ($2::uuid IS NULL OR location_id = $2)
              AND ($3::movement_type IS NULL OR movement_type = $3)
              AND created_at::date BETWEEN $4 AND $5
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM stock_movements {WHERE}"
        ))
        .bind(filter.product_id)
        .bind(filter.location_id)
        .bind(filter.movement_type)
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&self.db)
        .await?;

        let movements = sqlx::query_as::<_, StockMovement>(&format!(
            r#"
            SELECT {MOVEMENT_COLUMNS}
            FROM stock_movements
            {WHERE}
            ORDER BY created_at DESC
            LIMIT $6 OFFSET $7
            "#
        ))
        .bind(filter.product_id)
        .bind(filter.location_id)
        .bind(filter.movement_type)
        .bind(range.start)
        .bind(range.end)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(movements, pagination, total))
    }

    /// Increase, decrease or set the quantity at a location
    pub async fn adjust_stock(
        &self,
        user_id: Uuid,
        input: AdjustStockInput,
    ) -> AppResult<StockAdjustment> {
        input.validate()?;

        let mut tx = self.db.begin().await?;

        ensure_active_product(&mut tx, input.product_id).await?;
        ensure_active_location(&mut tx, input.location_id).await?;

        let level = lock_stock(&mut tx, input.product_id, input.location_id).await?;
        let updated = level.adjust(input.adjustment_type, input.quantity)?;
        let change = updated.quantity - level.quantity;

        store_stock(&mut tx, input.product_id, input.location_id, updated).await?;

        let adjustment = sqlx::query_as::<_, StockAdjustment>(&format!(
            r#"
            INSERT INTO stock_adjustments (product_id, location_id, adjustment_type, quantity,
                                           previous_quantity, new_quantity, reason, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {ADJUSTMENT_COLUMNS}
            "#
        ))
        .bind(input.product_id)
        .bind(input.location_id)
        .bind(input.adjustment_type)
        .bind(input.quantity)
        .bind(level.quantity)
        .bind(updated.quantity)
        .bind(input.reason.trim())
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        insert_movement(
            &mut tx,
            &NewMovement {
                product_id: input.product_id,
                location_id: input.location_id,
                movement_type: MovementType::Adjustment,
                quantity_change: change,
                quantity_after: updated.quantity,
                reference_type: Some("stock_adjustment"),
                reference_id: Some(adjustment.id),
                notes: Some(input.reason.trim()),
                created_by: user_id,
            },
        )
        .await?;

        audit::record(
            &mut *tx,
            AuditEntry::new(user_id, "adjust", "stock", adjustment.id).with_details(
                serde_json::json!({
                    "product_id": input.product_id,
                    "location_id": input.location_id,
                    "adjustment_type": input.adjustment_type,
                    "previous_quantity": level.quantity,
                    "new_quantity": updated.quantity,
                }),
            ),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            product_id = %input.product_id,
            location_id = %input.location_id,
            adjustment = input.adjustment_type.as_str(),
            previous = level.quantity,
            new = updated.quantity,
            "Stock adjusted"
        );

        Ok(adjustment)
    }

    /// List adjustments, newest first
    pub async fn list_adjustments(
        &self,
        filter: &AdjustmentFilter,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<StockAdjustment>> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM stock_adjustments
            WHERE ($1::uuid IS NULL OR product_id = $1)
              AND ($2::uuid IS NULL OR location_id = $2)
            "#,
        )
        .bind(filter.product_id)
        .bind(filter.location_id)
        .fetch_one(&self.db)
        .await?;

        let adjustments = sqlx::query_as::<_, StockAdjustment>(&format!(
            r#"
            SELECT {ADJUSTMENT_COLUMNS}
            FROM stock_adjustments
            WHERE ($1::uuid IS NULL OR product_id = $1)
              AND ($2::uuid IS NULL OR location_id = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(filter.product_id)
        .bind(filter.location_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(adjustments, pagination, total))
    }

    /// Move stock between two locations
    pub async fn transfer_stock(
        &self,
        user_id: Uuid,
        input: TransferStockInput,
    ) -> AppResult<TransferResult> {
        validate_transfer(&input)?;
        let product_id = input.product_id;
        let (from, to) = (input.from_location_id, input.to_location_id);

        let mut tx = self.db.begin().await?;

        ensure_active_product(&mut tx, product_id).await?;
        ensure_active_location(&mut tx, from).await?;
        ensure_active_location(&mut tx, to).await?;

        // Lock in location id order so opposite transfers cannot deadlock
        let (from_level, to_level) = if from < to {
            let f = lock_stock(&mut tx, product_id, from).await?;
            let t = lock_stock(&mut tx, product_id, to).await?;
            (f, t)
        } else {
            let t = lock_stock(&mut tx, product_id, to).await?;
            let f = lock_stock(&mut tx, product_id, from).await?;
            (f, t)
        };

        let from_updated = from_level.remove(input.quantity)?;
        let to_updated = to_level.add(input.quantity)?;

        store_stock(&mut tx, product_id, from, from_updated).await?;
        store_stock(&mut tx, product_id, to, to_updated).await?;

        let transfer_id = Uuid::new_v4();

        let transfer_out = insert_movement(
            &mut tx,
            &NewMovement {
                product_id,
                location_id: from,
                movement_type: MovementType::TransferOut,
                quantity_change: MovementType::TransferOut.signed(input.quantity),
                quantity_after: from_updated.quantity,
                reference_type: Some("transfer"),
                reference_id: Some(transfer_id),
                notes: input.notes.as_deref(),
                created_by: user_id,
            },
        )
        .await?;

        let transfer_in = insert_movement(
            &mut tx,
            &NewMovement {
                product_id,
                location_id: to,
                movement_type: MovementType::TransferIn,
                quantity_change: MovementType::TransferIn.signed(input.quantity),
                quantity_after: to_updated.quantity,
                reference_type: Some("transfer"),
                reference_id: Some(transfer_id),
                notes: input.notes.as_deref(),
                created_by: user_id,
            },
        )
        .await?;

        audit::record(
            &mut *tx,
            AuditEntry::new(user_id, "transfer", "stock", transfer_id).with_details(
                serde_json::json!({
                    "product_id": product_id,
                    "from_location_id": from,
                    "to_location_id": to,
                    "quantity": input.quantity,
                }),
            ),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            product_id = %product_id,
            from = %from,
            to = %to,
            quantity = input.quantity,
            "Stock transferred"
        );

        Ok(TransferResult {
            transfer_out,
            transfer_in,
        })
    }

    /// Active products whose total on-hand quantity is at or below the reorder level
    pub async fn low_stock_alerts(&self) -> AppResult<Vec<LowStockItem>> {
        let items = sqlx::query_as::<_, LowStockItem>(
            r#"
            SELECT p.id AS product_id, p.sku, p.name, p.reorder_level,
                   COALESCE(SUM(s.quantity), 0)::bigint AS quantity_on_hand,
                   COALESCE(SUM(s.quantity - s.reserved_quantity), 0)::bigint AS quantity_available,
                   (p.reorder_level - COALESCE(SUM(s.quantity), 0))::bigint AS shortfall
            FROM products p
            LEFT JOIN stock s ON s.product_id = p.id
            WHERE p.is_active = true
            GROUP BY p.id
            HAVING COALESCE(SUM(s.quantity), 0) <= p.reorder_level
            ORDER BY shortfall DESC, p.sku ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer(from: Uuid, to: Uuid, quantity: i32) -> TransferStockInput {
        TransferStockInput {
            product_id: Uuid::new_v4(),
            from_location_id: from,
            to_location_id: to,
            quantity,
            notes: None,
        }
    }

    #[test]
    fn test_transfer_requires_distinct_locations() {
        let location = Uuid::new_v4();
        assert!(matches!(
            validate_transfer(&transfer(location, location, 5)),
            Err(AppError::Validation { .. })
        ));
        assert!(validate_transfer(&transfer(Uuid::new_v4(), Uuid::new_v4(), 5)).is_ok());
    }

    #[test]
    fn test_transfer_requires_positive_quantity() {
        assert!(matches!(
            validate_transfer(&transfer(Uuid::new_v4(), Uuid::new_v4(), 0)),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_adjustment_requires_reason() {
        let input = AdjustStockInput {
            product_id: Uuid::new_v4(),
            location_id: Uuid::new_v4(),
            adjustment_type: AdjustmentType::Set,
            quantity: 0,
            reason: String::new(),
        };
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("reason"));
    }

    #[test]
    fn test_adjustment_rejects_blank_reason() {
        let input = AdjustStockInput {
            product_id: Uuid::new_v4(),
            location_id: Uuid::new_v4(),
            adjustment_type: AdjustmentType::Decrease,
            quantity: 2,
            reason: "   ".to_string(),
        };
        let errors = input.validate().unwrap_err();
        assert_eq!(errors.field_errors()["reason"][0].code, "blank");
    }
}
