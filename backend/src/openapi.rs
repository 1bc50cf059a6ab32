//! OpenAPI document and Swagger UI

use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{error, handlers, services};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Inventory Management API",
        version = "1.0.0",
        description = r#"
REST API for products, suppliers, warehouses, stock levels, purchase orders and sales orders.

Every route except register, login, refresh, health and these docs needs a JWT access token:

```
Authorization: Bearer <access-token>
```

List endpoints accept `page` and `per_page` query parameters.
"#
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Liveness and database connectivity"),
        (name = "auth", description = "Registration, login, tokens and user administration"),
        (name = "categories", description = "Product categories"),
        (name = "products", description = "Product catalog"),
        (name = "suppliers", description = "Suppliers"),
        (name = "warehouses", description = "Warehouses and storage locations"),
        (name = "stock", description = "Stock levels, movements, adjustments and transfers"),
        (name = "purchase-orders", description = "Purchase order lifecycle and receiving"),
        (name = "sales-orders", description = "Sales order lifecycle and fulfilment"),
        (name = "reports", description = "Reports, CSV exports and audit trail")
    ),
    paths(
        handlers::health::health_check,
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::logout,
        handlers::auth::me,
        handlers::auth::change_password,
        handlers::auth::list_users,
        handlers::auth::update_user_role,
        handlers::auth::update_user_status,
        handlers::category::list_categories,
        handlers::category::get_category,
        handlers::category::create_category,
        handlers::category::update_category,
        handlers::category::delete_category,
        handlers::product::list_products,
        handlers::product::get_product,
        handlers::product::create_product,
        handlers::product::update_product,
        handlers::product::delete_product,
        handlers::supplier::list_suppliers,
        handlers::supplier::get_supplier,
        handlers::supplier::list_supplier_products,
        handlers::supplier::create_supplier,
        handlers::supplier::update_supplier,
        handlers::supplier::delete_supplier,
        handlers::warehouse::list_warehouses,
        handlers::warehouse::get_warehouse,
        handlers::warehouse::create_warehouse,
        handlers::warehouse::update_warehouse,
        handlers::warehouse::delete_warehouse,
        handlers::warehouse::list_locations,
        handlers::warehouse::create_location,
        handlers::warehouse::update_location,
        handlers::warehouse::delete_location,
        handlers::stock::list_stock,
        handlers::stock::get_product_stock,
        handlers::stock::low_stock_alerts,
        handlers::stock::list_movements,
        handlers::stock::record_movement,
        handlers::stock::list_adjustments,
        handlers::stock::adjust_stock,
        handlers::stock::transfer_stock,
        handlers::purchase_order::list_purchase_orders,
        handlers::purchase_order::get_purchase_order,
        handlers::purchase_order::create_purchase_order,
        handlers::purchase_order::update_purchase_order,
        handlers::purchase_order::submit_purchase_order,
        handlers::purchase_order::receive_purchase_order,
        handlers::purchase_order::cancel_purchase_order,
        handlers::purchase_order::delete_purchase_order,
        handlers::sales_order::list_sales_orders,
        handlers::sales_order::get_sales_order,
        handlers::sales_order::create_sales_order,
        handlers::sales_order::update_sales_order,
        handlers::sales_order::confirm_sales_order,
        handlers::sales_order::ship_sales_order,
        handlers::sales_order::deliver_sales_order,
        handlers::sales_order::cancel_sales_order,
        handlers::sales_order::delete_sales_order,
        handlers::reporting::get_dashboard,
        handlers::reporting::get_inventory_valuation_report,
        handlers::reporting::get_low_stock_report,
        handlers::reporting::get_stock_movement_report,
        handlers::reporting::get_sales_summary_report,
        handlers::reporting::get_purchase_summary_report,
        handlers::reporting::get_top_products_report,
        handlers::reporting::list_audit_logs,
    ),
    components(
        schemas(
            // Shared domain types
            shared::Role,
            shared::MovementType,
            shared::ManualMovement,
            shared::AdjustmentType,
            shared::PurchaseOrderStatus,
            shared::SalesOrderStatus,
            shared::PaginationMeta,

            // Errors
            error::ErrorResponse,
            error::ErrorDetail,

            // Report formats
            services::reporting::ReportFormat,
        )
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` JWT scheme referenced by protected paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_generation() {
        let openapi = ApiDoc::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Inventory Management API"));
        assert!(json.contains("/api/products"));
        assert!(json.contains("/api/stock/transfers"));
        assert!(json.contains("/api/sales-orders/{id}/confirm"));
        assert!(json.contains("bearer_auth"));
    }
}
