//! HTTP handlers for the Inventory Management API

pub mod auth;
pub mod category;
pub mod health;
pub mod product;
pub mod purchase_order;
pub mod reporting;
pub mod sales_order;
pub mod stock;
pub mod supplier;
pub mod warehouse;

use serde::Deserialize;
use shared::Pagination;
use utoipa::IntoParams;

use crate::AppState;

pub use auth::*;
pub use category::*;
pub use health::*;
pub use product::*;
pub use purchase_order::*;
pub use reporting::*;
pub use sales_order::*;
pub use stock::*;
pub use supplier::*;
pub use warehouse::*;

/// Page selection for list endpoints
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// 1-based page number
    pub page: Option<u32>,
    /// Items per page, capped by configuration
    pub per_page: Option<u32>,
}

impl PageQuery {
    pub(crate) fn resolve(&self, state: &AppState) -> Pagination {
        state.config.pagination.resolve(self.page, self.per_page)
    }
}
