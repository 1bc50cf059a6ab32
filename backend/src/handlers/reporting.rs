//! Reporting handlers for analytics and data export

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::{PaginatedResponse, Role};

use crate::error::{AppResult, ErrorResponse};
use crate::handlers::PageQuery;
use crate::middleware::CurrentUser;
use crate::services::audit::{AuditLog, AuditLogFilter, AuditService};
use crate::services::reporting::{
    CsvColumns, DashboardMetrics, InventoryValuationRow, MovementSummaryRow, OrderSummaryRow, ReportFormat,
    ReportQuery, ReportingService, TopProductRow, DEFAULT_TOP_PRODUCTS,
};
use crate::services::stock::LowStockItem;
use crate::AppState;

/// JSON by default, CSV attachment when `format=csv`
fn report_response<T: Serialize + CsvColumns>(
    format: ReportFormat,
    disposition: &'static str,
    data: Vec<T>,
) -> AppResult<Response> {
    match format {
        ReportFormat::Csv => {
            let csv = ReportingService::export_to_csv(&data)?;
            Ok((
                [
                    (header::CONTENT_TYPE, "text/csv"),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                csv,
            )
                .into_response())
        }
        ReportFormat::Json => Ok(Json(data).into_response()),
    }
}

/// Get dashboard metrics
#[utoipa::path(
    get,
    path = "/api/reports/dashboard",
    tag = "reports",
    responses(
        (status = 200, description = "Dashboard metrics", body = DashboardMetrics),
        (status = 403, description = "Manager role required", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<DashboardMetrics>> {
    user.require(Role::Manager)?;
    let metrics = ReportingService::new(state.db)
        .get_dashboard_metrics()
        .await?;
    Ok(Json(metrics))
}

/// Inventory value at cost per warehouse
#[utoipa::path(
    get,
    path = "/api/reports/inventory-valuation",
    tag = "reports",
    params(ReportQuery),
    responses((status = 200, description = "Valuation per warehouse (JSON or CSV)", body = [InventoryValuationRow])),
    security(("bearer_auth" = []))
)]
pub async fn get_inventory_valuation_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    user.require(Role::Manager)?;
    let data = ReportingService::new(state.db)
        .get_inventory_valuation()
        .await?;
    report_response(
        query.format,
        "attachment; filename=\"inventory_valuation.csv\"",
        data,
    )
}

/// Products at or below their reorder level
#[utoipa::path(
    get,
    path = "/api/reports/low-stock",
    tag = "reports",
    params(ReportQuery),
    responses((status = 200, description = "Low stock products (JSON or CSV)", body = [LowStockItem])),
    security(("bearer_auth" = []))
)]
pub async fn get_low_stock_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    user.require(Role::Manager)?;
    let data = ReportingService::new(state.db)
        .get_low_stock_report()
        .await?;
    report_response(query.format, "attachment; filename=\"low_stock.csv\"", data)
}

/// Stock movements summarised by type
#[utoipa::path(
    get,
    path = "/api/reports/stock-movements",
    tag = "reports",
    params(ReportQuery),
    responses(
        (status = 200, description = "Movement summary (JSON or CSV)", body = [MovementSummaryRow]),
        (status = 400, description = "Invalid date range", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_stock_movement_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    user.require(Role::Manager)?;
    let range = query.date_range()?;
    let data = ReportingService::new(state.db)
        .get_movement_summary(&range)
        .await?;
    report_response(
        query.format,
        "attachment; filename=\"stock_movements.csv\"",
        data,
    )
}

/// Sales orders summarised by status
#[utoipa::path(
    get,
    path = "/api/reports/sales-summary",
    tag = "reports",
    params(ReportQuery),
    responses((status = 200, description = "Sales summary (JSON or CSV)", body = [OrderSummaryRow])),
    security(("bearer_auth" = []))
)]
pub async fn get_sales_summary_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    user.require(Role::Manager)?;
    let range = query.date_range()?;
    let data = ReportingService::new(state.db)
        .get_sales_summary(&range)
        .await?;
    report_response(
        query.format,
        "attachment; filename=\"sales_summary.csv\"",
        data,
    )
}

/// Purchase orders summarised by status
#[utoipa::path(
    get,
    path = "/api/reports/purchase-summary",
    tag = "reports",
    params(ReportQuery),
    responses((status = 200, description = "Purchase summary (JSON or CSV)", body = [OrderSummaryRow])),
    security(("bearer_auth" = []))
)]
pub async fn get_purchase_summary_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    user.require(Role::Manager)?;
    let range = query.date_range()?;
    let data = ReportingService::new(state.db)
        .get_purchase_summary(&range)
        .await?;
    report_response(
        query.format,
        "attachment; filename=\"purchase_summary.csv\"",
        data,
    )
}

/// Best selling products in a period
#[utoipa::path(
    get,
    path = "/api/reports/top-products",
    tag = "reports",
    params(ReportQuery),
    responses((status = 200, description = "Top products (JSON or CSV)", body = [TopProductRow])),
    security(("bearer_auth" = []))
)]
pub async fn get_top_products_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    user.require(Role::Manager)?;
    let range = query.date_range()?;
    let limit = query.limit.unwrap_or(DEFAULT_TOP_PRODUCTS).clamp(1, 100);
    let data = ReportingService::new(state.db)
        .get_top_products(&range, limit)
        .await?;
    report_response(
        query.format,
        "attachment; filename=\"top_products.csv\"",
        data,
    )
}

/// Audit trail of mutations (admin)
#[utoipa::path(
    get,
    path = "/api/reports/audit-logs",
    tag = "reports",
    params(PageQuery, AuditLogFilter),
    responses(
        (status = 200, description = "Page of audit log entries", body = PaginatedResponse<AuditLog>),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_audit_logs(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(page): Query<PageQuery>,
    Query(filter): Query<AuditLogFilter>,
) -> AppResult<Json<PaginatedResponse<AuditLog>>> {
    user.require(Role::Admin)?;
    let pagination = page.resolve(&state);
    let logs = AuditService::new(state.db).list(&filter, pagination).await?;
    Ok(Json(logs))
}
