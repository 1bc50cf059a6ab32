//! Route definitions for the Inventory Management API

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes, mounted under `/api`
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Auth routes (register, login and refresh are public)
        .nest("/auth", auth_routes(state.clone()))
        .nest("/categories", category_routes(state.clone()))
        .nest("/products", product_routes(state.clone()))
        .nest("/suppliers", supplier_routes(state.clone()))
        .nest("/warehouses", warehouse_routes(state.clone()))
        .nest("/stock", stock_routes(state.clone()))
        .nest("/purchase-orders", purchase_order_routes(state.clone()))
        .nest("/sales-orders", sales_order_routes(state.clone()))
        .nest("/reports", report_routes(state))
}

fn protected(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router.route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Authentication and user administration routes
fn auth_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh));

    let private = Router::new()
        .route("/logout", post(handlers::logout))
        .route("/me", get(handlers::me))
        .route("/me/password", put(handlers::change_password))
        .route("/users", get(handlers::list_users))
        .route("/users/:id/role", put(handlers::update_user_role))
        .route("/users/:id/status", put(handlers::update_user_status));

    public.merge(protected(private, state))
}

/// Category routes (protected)
fn category_routes(state: AppState) -> Router<AppState> {
    let router = Router::new()
        .route(
            "/",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/:id",
            get(handlers::get_category)
                .put(handlers::update_category)
                .delete(handlers::delete_category),
        );
    protected(router, state)
}

/// Product catalog routes (protected)
fn product_routes(state: AppState) -> Router<AppState> {
    let router = Router::new()
        .route("/", get(handlers::list_products).post(handlers::create_product))
        .route(
            "/:id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        );
    protected(router, state)
}

/// Supplier routes (protected)
fn supplier_routes(state: AppState) -> Router<AppState> {
    let router = Router::new()
        .route(
            "/",
            get(handlers::list_suppliers).post(handlers::create_supplier),
        )
        .route(
            "/:id",
            get(handlers::get_supplier)
                .put(handlers::update_supplier)
                .delete(handlers::delete_supplier),
        )
        .route("/:id/products", get(handlers::list_supplier_products));
    protected(router, state)
}

/// Warehouse and location routes (protected)
fn warehouse_routes(state: AppState) -> Router<AppState> {
    let router = Router::new()
        .route(
            "/",
            get(handlers::list_warehouses).post(handlers::create_warehouse),
        )
        .route(
            "/:id",
            get(handlers::get_warehouse)
                .put(handlers::update_warehouse)
                .delete(handlers::delete_warehouse),
        )
        .route(
            "/:id/locations",
            get(handlers::list_locations).post(handlers::create_location),
        )
        .route(
            "/:id/locations/:location_id",
            put(handlers::update_location).delete(handlers::delete_location),
        );
    protected(router, state)
}

/// Stock level, movement, adjustment and transfer routes (protected)
fn stock_routes(state: AppState) -> Router<AppState> {
    let router = Router::new()
        .route("/", get(handlers::list_stock))
        .route("/products/:product_id", get(handlers::get_product_stock))
        .route("/low-stock", get(handlers::low_stock_alerts))
        .route(
            "/movements",
            get(handlers::list_movements).post(handlers::record_movement),
        )
        .route(
            "/adjustments",
            get(handlers::list_adjustments).post(handlers::adjust_stock),
        )
        .route("/transfers", post(handlers::transfer_stock));
    protected(router, state)
}

/// Purchase order routes (protected)
fn purchase_order_routes(state: AppState) -> Router<AppState> {
    let router = Router::new()
        .route(
            "/",
            get(handlers::list_purchase_orders).post(handlers::create_purchase_order),
        )
        .route(
            "/:id",
            get(handlers::get_purchase_order)
                .put(handlers::update_purchase_order)
                .delete(handlers::delete_purchase_order),
        )
        .route("/:id/submit", post(handlers::submit_purchase_order))
        .route("/:id/receive", post(handlers::receive_purchase_order))
        .route("/:id/cancel", post(handlers::cancel_purchase_order));
    protected(router, state)
}

/// Sales order routes (protected)
fn sales_order_routes(state: AppState) -> Router<AppState> {
    let router = Router::new()
        .route(
            "/",
            get(handlers::list_sales_orders).post(handlers::create_sales_order),
        )
        .route(
            "/:id",
            get(handlers::get_sales_order)
                .put(handlers::update_sales_order)
                .delete(handlers::delete_sales_order),
        )
        .route("/:id/confirm", post(handlers::confirm_sales_order))
        .route("/:id/ship", post(handlers::ship_sales_order))
        .route("/:id/deliver", post(handlers::deliver_sales_order))
        .route("/:id/cancel", post(handlers::cancel_sales_order));
    protected(router, state)
}

/// Reporting routes (protected)
fn report_routes(state: AppState) -> Router<AppState> {
    let router = Router::new()
        .route("/dashboard", get(handlers::get_dashboard))
        .route(
            "/inventory-valuation",
            get(handlers::get_inventory_valuation_report),
        )
        .route("/low-stock", get(handlers::get_low_stock_report))
        .route("/stock-movements", get(handlers::get_stock_movement_report))
        .route("/sales-summary", get(handlers::get_sales_summary_report))
        .route(
            "/purchase-summary",
            get(handlers::get_purchase_summary_report),
        )
        .route("/top-products", get(handlers::get_top_products_report))
        .route("/audit-logs", get(handlers::list_audit_logs));
    protected(router, state)
}
