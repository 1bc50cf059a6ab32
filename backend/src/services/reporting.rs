//! Reporting service for inventory analytics and data export

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::DateRange;
use sqlx::{FromRow, PgPool};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::stock::{LowStockItem, StockService};

/// Default number of rows in the top products report
pub const DEFAULT_TOP_PRODUCTS: i64 = 10;

/// Column names of a CSV report, written even when the report has no rows
pub trait CsvColumns {
    const COLUMNS: &'static [&'static str];
}

/// Reporting service
#[derive(Clone)]
pub struct ReportingService {
    db: PgPool,
}

/// Output format of a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Json,
    Csv,
}

/// Common report query parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReportQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub format: ReportFormat,
    /// Row limit for ranked reports
    pub limit: Option<i64>,
}

impl ReportQuery {
    pub fn date_range(&self) -> AppResult<DateRange> {
        let range = DateRange::from_bounds(self.start_date, self.end_date);
        if !range.is_valid() {
            return Err(AppError::validation(
                "end_date",
                "end_date must not be before start_date",
            ));
        }
        Ok(range)
    }
}

/// Headline numbers for the dashboard
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct DashboardMetrics {
    pub total_products: i64,
    pub active_products: i64,
    pub total_suppliers: i64,
    pub total_warehouses: i64,
    pub low_stock_products: i64,
    pub open_purchase_orders: i64,
    pub open_sales_orders: i64,
    pub total_units: i64,
    pub total_inventory_value: Decimal,
}

/// Inventory value at cost for one warehouse
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct InventoryValuationRow {
    pub warehouse_id: Uuid,
    pub warehouse_code: String,
    pub warehouse_name: String,
    pub product_count: i64,
    pub total_quantity: i64,
    pub total_value: Decimal,
}

/// Movements of one type in a period
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct MovementSummaryRow {
    pub movement_type: String,
    pub movement_count: i64,
    pub units_in: i64,
    pub units_out: i64,
    pub net_change: i64,
}

/// Orders of one status in a period
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct OrderSummaryRow {
    pub status: String,
    pub order_count: i64,
    pub total_amount: Decimal,
}

/// Best selling product by shipped quantity
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct TopProductRow {
    pub product_id: Uuid,
    pub sku: String,
    pub name: String,
    pub quantity_shipped: i64,
    pub revenue: Decimal,
}

impl ReportingService {
    /// Create a new ReportingService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Get dashboard metrics
    pub async fn get_dashboard_metrics(&self) -> AppResult<DashboardMetrics> {
        let metrics = sqlx::query_as::<_, DashboardMetrics>(
            r#"
            WITH product_totals AS (
                SELECT p.id, p.reorder_level, p.is_active, p.cost_price,
                       COALESCE(SUM(s.quantity), 0)::bigint AS on_hand
                FROM products p
                LEFT JOIN stock s ON s.product_id = p.id
                GROUP BY p.id
            )
            SELECT
                (SELECT COUNT(*) FROM products) AS total_products,
                (SELECT COUNT(*) FROM products WHERE is_active) AS active_products,
                (SELECT COUNT(*) FROM suppliers WHERE is_active) AS total_suppliers,
                (SELECT COUNT(*) FROM warehouses WHERE is_active) AS total_warehouses,
                (SELECT COUNT(*) FROM product_totals
                    WHERE is_active AND on_hand <= reorder_level) AS low_stock_products,
                (SELECT COUNT(*) FROM purchase_orders
                    WHERE status IN ('draft', 'submitted', 'partially_received')) AS open_purchase_orders,
                (SELECT COUNT(*) FROM sales_orders
                    WHERE status IN ('pending', 'confirmed', 'shipped')) AS open_sales_orders,
                (SELECT COALESCE(SUM(on_hand), 0)::bigint FROM product_totals) AS total_units,
                (SELECT COALESCE(SUM(on_hand * cost_price), 0) FROM product_totals) AS total_inventory_value
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        Ok(metrics)
    }

    /// Inventory value at cost per warehouse
    pub async fn get_inventory_valuation(&self) -> AppResult<Vec<InventoryValuationRow>> {
        let rows = sqlx::query_as::<_, InventoryValuationRow>(
            r#"
            SELECT w.id AS warehouse_id, w.code AS warehouse_code, w.name AS warehouse_name,
                   COUNT(DISTINCT s.product_id) FILTER (WHERE s.quantity > 0) AS product_count,
                   COALESCE(SUM(s.quantity), 0)::bigint AS total_quantity,
                   COALESCE(SUM(s.quantity * p.cost_price), 0) AS total_value
            FROM warehouses w
            LEFT JOIN locations l ON l.warehouse_id = w.id
            LEFT JOIN stock s ON s.location_id = l.id
            LEFT JOIN products p ON p.id = s.product_id
            GROUP BY w.id
            ORDER BY w.code ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Products at or below their reorder level
    pub async fn get_low_stock_report(&self) -> AppResult<Vec<LowStockItem>> {
        StockService::new(self.db.clone()).low_stock_alerts().await
    }

    /// Movement totals grouped by type
    pub async fn get_movement_summary(
        &self,
        range: &DateRange,
    ) -> AppResult<Vec<MovementSummaryRow>> {
        let rows = sqlx::query_as::<_, MovementSummaryRow>(
            r#"
            SELECT movement_type::text AS movement_type,
                   COUNT(*) AS movement_count,
                   COALESCE(SUM(quantity_change) FILTER (WHERE quantity_change > 0), 0)::bigint AS units_in,
                   COALESCE(-SUM(quantity_change) FILTER (WHERE quantity_change < 0), 0)::bigint AS units_out,
                   COALESCE(SUM(quantity_change), 0)::bigint AS net_change
            FROM stock_movements
            WHERE created_at::date BETWEEN $1 AND $2
            GROUP BY movement_type
            ORDER BY movement_type
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Sales orders grouped by status
    pub async fn get_sales_summary(&self, range: &DateRange) -> AppResult<Vec<OrderSummaryRow>> {
        let rows = sqlx::query_as::<_, OrderSummaryRow>(
            r#"
            SELECT status::text AS status, COUNT(*) AS order_count,
                   COALESCE(SUM(total_amount), 0) AS total_amount
            FROM sales_orders
            WHERE order_date BETWEEN $1 AND $2
            GROUP BY status
            ORDER BY status
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Purchase orders grouped by status
    pub async fn get_purchase_summary(
        &self,
        range: &DateRange,
    ) -> AppResult<Vec<OrderSummaryRow>> {
        let rows = sqlx::query_as::<_, OrderSummaryRow>(
            r#"
            SELECT status::text AS status, COUNT(*) AS order_count,
                   COALESCE(SUM(total_amount), 0) AS total_amount
            FROM purchase_orders
            WHERE order_date BETWEEN $1 AND $2
            GROUP BY status
            ORDER BY status
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Products ranked by quantity on shipped or delivered orders
    pub async fn get_top_products(
        &self,
        range: &DateRange,
        limit: i64,
    ) -> AppResult<Vec<TopProductRow>> {
        let rows = sqlx::query_as::<_, TopProductRow>(
            r#"
            SELECT p.id AS product_id, p.sku, p.name,
                   SUM(i.quantity)::bigint AS quantity_shipped,
                   SUM(i.quantity * i.unit_price) AS revenue
            FROM sales_order_items i
            JOIN sales_orders so ON so.id = i.sales_order_id
            JOIN products p ON p.id = i.product_id
            WHERE so.status IN ('shipped', 'delivered')
              AND so.order_date BETWEEN $1 AND $2
            GROUP BY p.id
            ORDER BY quantity_shipped DESC, p.sku ASC
            LIMIT $3
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .bind(limit.clamp(1, 100))
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Export report data to CSV format
    pub fn export_to_csv<T: Serialize + CsvColumns>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(vec![]);
        wtr.write_record(T::COLUMNS)
            .map_err(|e| AppError::Internal(format!("CSV header error: {}", e)))?;
        for record in data {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
    }
}

impl CsvColumns for InventoryValuationRow {
    const COLUMNS: &'static [&'static str] = &[
        "warehouse_id",
        "warehouse_code",
        "warehouse_name",
        "product_count",
        "total_quantity",
        "total_value",
    ];
}

impl CsvColumns for MovementSummaryRow {
    const COLUMNS: &'static [&'static str] = &[
        "movement_type",
        "movement_count",
        "units_in",
        "units_out",
        "net_change",
    ];
}

impl CsvColumns for OrderSummaryRow {
    const COLUMNS: &'static [&'static str] = &["status", "order_count", "total_amount"];
}

impl CsvColumns for TopProductRow {
    const COLUMNS: &'static [&'static str] =
        &["product_id", "sku", "name", "quantity_shipped", "revenue"];
}

impl CsvColumns for LowStockItem {
    const COLUMNS: &'static [&'static str] = &[
        "product_id",
        "sku",
        "name",
        "reorder_level",
        "quantity_on_hand",
        "quantity_available",
        "shortfall",
    ];
}
