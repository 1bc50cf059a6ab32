//! Product catalog service

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{PaginatedResponse, Pagination};
use sqlx::{FromRow, PgPool};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::audit::{self, AuditEntry};

/// Product service
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

/// Product information
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub unit: String,
    pub unit_price: Decimal,
    pub cost_price: Decimal,
    pub reorder_level: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stock totals across all locations
#[derive(Debug, Clone, Default, Serialize, FromRow, ToSchema)]
pub struct StockTotals {
    pub quantity_on_hand: i64,
    pub quantity_reserved: i64,
    pub quantity_available: i64,
}

/// Product with its current stock totals
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub stock: StockTotals,
    pub is_low_stock: bool,
}

/// Input for creating a product
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductInput {
    #[validate(custom = "shared::sku_rule")]
    pub sku: String,
    #[validate(
        length(min = 1, max = 200, message = "Name must be 1-200 characters"),
        custom = "shared::not_blank_rule"
    )]
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    #[validate(
        length(min = 1, max = 20, message = "Unit must be 1-20 characters"),
        custom = "shared::not_blank_rule"
    )]
    pub unit: Option<String>,
    #[validate(custom = "shared::money_rule")]
    pub unit_price: Decimal,
    #[validate(custom = "shared::money_rule")]
    pub cost_price: Decimal,
    #[validate(range(min = 0, message = "Reorder level cannot be negative"))]
    pub reorder_level: Option<i32>,
}

/// Input for updating a product
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProductInput {
    #[validate(custom = "shared::sku_rule")]
    pub sku: Option<String>,
    #[validate(
        length(min = 1, max = 200, message = "Name must be 1-200 characters"),
        custom = "shared::not_blank_rule"
    )]
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    #[validate(
        length(min = 1, max = 20, message = "Unit must be 1-20 characters"),
        custom = "shared::not_blank_rule"
    )]
    pub unit: Option<String>,
    #[validate(custom = "shared::money_rule")]
    pub unit_price: Option<Decimal>,
    #[validate(custom = "shared::money_rule")]
    pub cost_price: Option<Decimal>,
    #[validate(range(min = 0, message = "Reorder level cannot be negative"))]
    pub reorder_level: Option<i32>,
    pub is_active: Option<bool>,
}

/// Filters for listing products
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductFilter {
    /// Case-insensitive match on name or SKU
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

pub(crate) const PRODUCT_COLUMNS: &str = "id, sku, name, description, category_id, supplier_id, unit, unit_price, cost_price, reorder_level, is_active, created_at, updated_at";

impl ProductService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List products with filters and pagination
    pub async fn list_products(
        &self,
        filter: &ProductFilter,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<Product>> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM products
            WHERE ($1::text IS NULL OR name ILIKE $1 OR sku ILIKE $1)
              AND ($2::uuid IS NULL OR category_id = $2)
              AND ($3::uuid IS NULL OR supplier_id = $3)
              AND ($4::bool IS NULL OR is_active = $4)
            "#,
        )
        .bind(&search)
        .bind(filter.category_id)
        .bind(filter.supplier_id)
        .bind(filter.is_active)
        .fetch_one(&self.db)
        .await?;

        let products = sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE ($1::text IS NULL OR name ILIKE $1 OR sku ILIKE $1)
              AND ($2::uuid IS NULL OR category_id = $2)
              AND ($3::uuid IS NULL OR supplier_id = $3)
              AND ($4::bool IS NULL OR is_active = $4)
            ORDER BY name ASC, sku ASC
            LIMIT $5 OFFSET $6
            "#
        ))
        .bind(&search)
        .bind(filter.category_id)
        .bind(filter.supplier_id)
        .bind(filter.is_active)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(products, pagination, total))
    }

    /// Get a product row without stock totals
    pub async fn find_product(&self, product_id: Uuid) -> AppResult<Product> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    /// Get a product with its stock totals across all locations
    pub async fn get_product(&self, product_id: Uuid) -> AppResult<ProductDetail> {
        let product = self.find_product(product_id).await?;

        let stock = sqlx::query_as::<_, StockTotals>(
            r#"
            SELECT
                COALESCE(SUM(quantity), 0)::bigint AS quantity_on_hand,
                COALESCE(SUM(reserved_quantity), 0)::bigint AS quantity_reserved,
                COALESCE(SUM(quantity - reserved_quantity), 0)::bigint AS quantity_available
            FROM stock
            WHERE product_id = $1
            "#,
        )
        .bind(product_id)
        .fetch_one(&self.db)
        .await?;

        let is_low_stock = shared::is_low_stock(stock.quantity_on_hand, product.reorder_level);

        Ok(ProductDetail {
            product,
            stock,
            is_low_stock,
        })
    }

    /// Create a new product
    pub async fn create_product(
        &self,
        user_id: Uuid,
        input: CreateProductInput,
    ) -> AppResult<Product> {
        input.validate()?;

        self.ensure_sku_available(&input.sku, None).await?;
        self.ensure_references(input.category_id, input.supplier_id)
            .await?;

        let mut tx = self.db.begin().await?;

        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products (sku, name, description, category_id, supplier_id, unit,
                                  unit_price, cost_price, reorder_level)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(&input.sku)
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(input.category_id)
        .bind(input.supplier_id)
        .bind(input.unit.as_deref().unwrap_or("pcs"))
        .bind(input.unit_price)
        .bind(input.cost_price)
        .bind(input.reorder_level.unwrap_or(0))
        .fetch_one(&mut *tx)
        .await
        .map_err(duplicate_sku)?;

        audit::record(
            &mut *tx,
            AuditEntry::new(user_id, "create", "product", product.id)
                .with_details(serde_json::json!({ "sku": product.sku })),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(product_id = %product.id, sku = %product.sku, "Product created");
        Ok(product)
    }

    /// Update a product
    pub async fn update_product(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> AppResult<Product> {
        input.validate()?;
        let existing = self.find_product(product_id).await?;

        if let Some(ref sku) = input.sku {
            if sku != &existing.sku {
                self.ensure_sku_available(sku, Some(product_id)).await?;
            }
        }
        self.ensure_references(input.category_id, input.supplier_id)
            .await?;

        let sku = input.sku.unwrap_or(existing.sku);
        let name = input
            .name
            .map(|n| n.trim().to_string())
            .unwrap_or(existing.name);
        let description = input.description.or(existing.description);
        let category_id = input.category_id.or(existing.category_id);
        let supplier_id = input.supplier_id.or(existing.supplier_id);
        let unit = input.unit.unwrap_or(existing.unit);
        let unit_price = input.unit_price.unwrap_or(existing.unit_price);
        let cost_price = input.cost_price.unwrap_or(existing.cost_price);
        let reorder_level = input.reorder_level.unwrap_or(existing.reorder_level);
        let is_active = input.is_active.unwrap_or(existing.is_active);

        let mut tx = self.db.begin().await?;

        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE products
            SET sku = $1, name = $2, description = $3, category_id = $4, supplier_id = $5,
                unit = $6, unit_price = $7, cost_price = $8, reorder_level = $9, is_active = $10
            WHERE id = $11
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(&sku)
        .bind(&name)
        .bind(&description)
        .bind(category_id)
        .bind(supplier_id)
        .bind(&unit)
        .bind(unit_price)
        .bind(cost_price)
        .bind(reorder_level)
        .bind(is_active)
        .bind(product_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(duplicate_sku)?;

        audit::record(
            &mut *tx,
            AuditEntry::new(user_id, "update", "product", product_id),
        )
        .await?;

        tx.commit().await?;
        Ok(product)
    }

    /// Soft delete a product
    pub async fn delete_product(&self, user_id: Uuid, product_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let result = sqlx::query("UPDATE products SET is_active = false WHERE id = $1")
            .bind(product_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Product".to_string()));
        }

        audit::record(
            &mut *tx,
            AuditEntry::new(user_id, "delete", "product", product_id),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(product_id = %product_id, "Product deactivated");
        Ok(())
    }

    async fn ensure_sku_available(&self, sku: &str, exclude: Option<Uuid>) -> AppResult<()> {
        let duplicate = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM products WHERE sku = $1 AND ($2::uuid IS NULL OR id != $2))",
        )
        .bind(sku)
        .bind(exclude)
        .fetch_one(&self.db)
        .await?;

        if duplicate {
            return Err(AppError::DuplicateEntry("sku".to_string()));
        }
        Ok(())
    }

    async fn ensure_references(
        &self,
        category_id: Option<Uuid>,
        supplier_id: Option<Uuid>,
    ) -> AppResult<()> {
        if let Some(category_id) = category_id {
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)",
            )
            .bind(category_id)
            .fetch_one(&self.db)
            .await?;
            if !exists {
                return Err(AppError::NotFound("Category".to_string()));
            }
        }

        if let Some(supplier_id) = supplier_id {
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM suppliers WHERE id = $1)",
            )
            .bind(supplier_id)
            .fetch_one(&self.db)
            .await?;
            if !exists {
                return Err(AppError::NotFound("Supplier".to_string()));
            }
        }

        Ok(())
    }
}

/// A concurrent insert can still race past the pre-check
fn duplicate_sku(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::DuplicateEntry("sku".to_string())
        }
        _ => AppError::DatabaseError(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn input() -> CreateProductInput {
        CreateProductInput {
            sku: "WIDGET-001".to_string(),
            name: "Widget".to_string(),
            description: None,
            category_id: None,
            supplier_id: None,
            unit: None,
            unit_price: Decimal::from_str("9.99").unwrap(),
            cost_price: Decimal::from_str("4.50").unwrap(),
            reorder_level: Some(10),
        }
    }

    #[test]
    fn test_valid_product_input() {
        assert!(input().validate().is_ok());
    }

    #[test]
    fn test_invalid_sku_rejected() {
        let mut bad = input();
        bad.sku = "w 1".to_string();
        let errors = bad.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("sku"));
    }

    #[test]
    fn test_negative_price_rejected() {
        let mut bad = input();
        bad.unit_price = Decimal::from_str("-1.00").unwrap();
        assert!(bad.validate().is_err());

        let mut bad = input();
        bad.reorder_level = Some(-1);
        assert!(bad.validate().is_err());
    }
}
