//! Business logic services for the Inventory Management API

pub mod audit;
pub mod auth;
pub mod category;
pub mod product;
pub mod purchase_order;
pub mod reporting;
pub mod sales_order;
pub mod stock;
pub mod supplier;
pub mod warehouse;

pub use audit::AuditService;
pub use auth::AuthService;
pub use category::CategoryService;
pub use product::ProductService;
pub use purchase_order::PurchaseOrderService;
pub use reporting::ReportingService;
pub use sales_order::SalesOrderService;
pub use stock::StockService;
pub use supplier::SupplierService;
pub use warehouse::WarehouseService;
