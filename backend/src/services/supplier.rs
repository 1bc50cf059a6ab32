//! Supplier management service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{PaginatedResponse, Pagination};
use sqlx::{FromRow, PgPool};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::audit::{self, AuditEntry};
use crate::services::product::{Product, PRODUCT_COLUMNS};

/// Supplier service
#[derive(Clone)]
pub struct SupplierService {
    db: PgPool,
}

/// Supplier information
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Supplier {
    pub id: Uuid,
    pub name: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a supplier
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSupplierInput {
    #[validate(
        length(min = 1, max = 200, message = "Name must be 1-200 characters"),
        custom = "shared::not_blank_rule"
    )]
    pub name: String,
    #[validate(length(max = 100))]
    pub contact_person: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Input for updating a supplier
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateSupplierInput {
    #[validate(
        length(min = 1, max = 200, message = "Name must be 1-200 characters"),
        custom = "shared::not_blank_rule"
    )]
    pub name: Option<String>,
    #[validate(length(max = 100))]
    pub contact_person: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: Option<bool>,
}

/// Filters for listing suppliers
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SupplierFilter {
    /// Case-insensitive match on name, contact or email
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

const SUPPLIER_COLUMNS: &str =
    "id, name, contact_person, email, phone, address, is_active, created_at, updated_at";

impl SupplierService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List suppliers with search and pagination
    pub async fn list_suppliers(
        &self,
        filter: &SupplierFilter,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<Supplier>> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM suppliers
            WHERE ($1::text IS NULL OR name ILIKE $1 OR contact_person ILIKE $1 OR email ILIKE $1)
              AND ($2::bool IS NULL OR is_active = $2)
            "#,
        )
        .bind(&search)
        .bind(filter.is_active)
        .fetch_one(&self.db)
        .await?;

        let suppliers = sqlx::query_as::<_, Supplier>(&format!(
            r#"
            SELECT {SUPPLIER_COLUMNS}
            FROM suppliers
            WHERE ($1::text IS NULL OR name ILIKE $1 OR contact_person ILIKE $1 OR email ILIKE $1)
              AND ($2::bool IS NULL OR is_active = $2)
            ORDER BY name ASC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(&search)
        .bind(filter.is_active)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(suppliers, pagination, total))
    }

    pub async fn get_supplier(&self, supplier_id: Uuid) -> AppResult<Supplier> {
        sqlx::query_as::<_, Supplier>(&format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE id = $1"
        ))
        .bind(supplier_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Supplier".to_string()))
    }

    /// Products supplied by a supplier
    pub async fn list_supplier_products(&self, supplier_id: Uuid) -> AppResult<Vec<Product>> {
        self.get_supplier(supplier_id).await?;

        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE supplier_id = $1 ORDER BY name ASC"
        ))
        .bind(supplier_id)
        .fetch_all(&self.db)
        .await?;

        Ok(products)
    }

    /// Create a new supplier
    pub async fn create_supplier(
        &self,
        user_id: Uuid,
        input: CreateSupplierInput,
    ) -> AppResult<Supplier> {
        input.validate()?;

        let mut tx = self.db.begin().await?;

        let supplier = sqlx::query_as::<_, Supplier>(&format!(
            r#"
            INSERT INTO suppliers (name, contact_person, email, phone, address)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {SUPPLIER_COLUMNS}
            "#
        ))
        .bind(input.name.trim())
        .bind(&input.contact_person)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.address)
        .fetch_one(&mut *tx)
        .await?;

        audit::record(
            &mut *tx,
            AuditEntry::new(user_id, "create", "supplier", supplier.id)
                .with_details(serde_json::json!({ "name": supplier.name })),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(supplier_id = %supplier.id, "Supplier created");
        Ok(supplier)
    }

    /// Update a supplier
    pub async fn update_supplier(
        &self,
        user_id: Uuid,
        supplier_id: Uuid,
        input: UpdateSupplierInput,
    ) -> AppResult<Supplier> {
        input.validate()?;
        let existing = self.get_supplier(supplier_id).await?;

        let name = input
            .name
            .map(|n| n.trim().to_string())
            .unwrap_or(existing.name);
        let contact_person = input.contact_person.or(existing.contact_person);
        let email = input.email.or(existing.email);
        let phone = input.phone.or(existing.phone);
        let address = input.address.or(existing.address);
        let is_active = input.is_active.unwrap_or(existing.is_active);

        let mut tx = self.db.begin().await?;

        let supplier = sqlx::query_as::<_, Supplier>(&format!(
            r#"
            UPDATE suppliers
            SET name = $1, contact_person = $2, email = $3, phone = $4, address = $5, is_active = $6
            WHERE id = $7
            RETURNING {SUPPLIER_COLUMNS}
            "#
        ))
        .bind(&name)
        .bind(&contact_person)
        .bind(&email)
        .bind(&phone)
        .bind(&address)
        .bind(is_active)
        .bind(supplier_id)
        .fetch_one(&mut *tx)
        .await?;

        audit::record(
            &mut *tx,
            AuditEntry::new(user_id, "update", "supplier", supplier_id),
        )
        .await?;

        tx.commit().await?;
        Ok(supplier)
    }

    /// Soft delete a supplier without open purchase orders
    pub async fn delete_supplier(&self, user_id: Uuid, supplier_id: Uuid) -> AppResult<()> {
        self.get_supplier(supplier_id).await?;

        let open_orders = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM purchase_orders
            WHERE supplier_id = $1
              AND status IN ('draft', 'submitted', 'partially_received')
            "#,
        )
        .bind(supplier_id)
        .fetch_one(&self.db)
        .await?;

        if open_orders > 0 {
            return Err(AppError::conflict(
                "supplier",
                format!("Supplier has {} open purchase order(s)", open_orders),
            ));
        }

        let mut tx = self.db.begin().await?;

        sqlx::query("UPDATE suppliers SET is_active = false WHERE id = $1")
            .bind(supplier_id)
            .execute(&mut *tx)
            .await?;

        audit::record(
            &mut *tx,
            AuditEntry::new(user_id, "delete", "supplier", supplier_id),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(supplier_id = %supplier_id, "Supplier deactivated");
        Ok(())
    }
}
