//! Warehouse and storage location management

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::audit::{self, AuditEntry};

/// Warehouse service
#[derive(Clone)]
pub struct WarehouseService {
    db: PgPool,
}

/// Warehouse information
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Warehouse {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub address: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Storage location inside a warehouse
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Location {
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Warehouse with its locations
#[derive(Debug, Serialize, ToSchema)]
pub struct WarehouseDetail {
    #[serde(flatten)]
    pub warehouse: Warehouse,
    pub locations: Vec<Location>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateWarehouseInput {
    #[validate(custom = "shared::code_rule")]
    pub code: String,
    #[validate(
        length(min = 1, max = 100, message = "Name must be 1-100 characters"),
        custom = "shared::not_blank_rule"
    )]
    pub name: String,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateWarehouseInput {
    #[validate(custom = "shared::code_rule")]
    pub code: Option<String>,
    #[validate(
        length(min = 1, max = 100, message = "Name must be 1-100 characters"),
        custom = "shared::not_blank_rule"
    )]
    pub name: Option<String>,
    pub address: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateLocationInput {
    #[validate(custom = "shared::code_rule")]
    pub code: String,
    #[validate(
        length(min = 1, max = 100, message = "Name must be 1-100 characters"),
        custom = "shared::not_blank_rule"
    )]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateLocationInput {
    #[validate(custom = "shared::code_rule")]
    pub code: Option<String>,
    #[validate(
        length(min = 1, max = 100, message = "Name must be 1-100 characters"),
        custom = "shared::not_blank_rule"
    )]
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

const WAREHOUSE_COLUMNS: &str = "id, code, name, address, is_active, created_at, updated_at";
const LOCATION_COLUMNS: &str =
    "id, warehouse_id, code, name, description, is_active, created_at, updated_at";

impl WarehouseService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ========================================================================
    // Warehouses
    // ========================================================================

    pub async fn list_warehouses(&self) -> AppResult<Vec<Warehouse>> {
        let warehouses = sqlx::query_as::<_, Warehouse>(&format!(
            "SELECT {WAREHOUSE_COLUMNS} FROM warehouses ORDER BY code ASC"
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(warehouses)
    }

    async fn find_warehouse(&self, warehouse_id: Uuid) -> AppResult<Warehouse> {
        sqlx::query_as::<_, Warehouse>(&format!(
            "SELECT {WAREHOUSE_COLUMNS} FROM warehouses WHERE id = $1"
        ))
        .bind(warehouse_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))
    }

    /// Get a warehouse with its locations
    pub async fn get_warehouse(&self, warehouse_id: Uuid) -> AppResult<WarehouseDetail> {
        let warehouse = self.find_warehouse(warehouse_id).await?;
        let locations = self.list_locations(warehouse_id).await?;
        Ok(WarehouseDetail {
            warehouse,
            locations,
        })
    }

    pub async fn create_warehouse(
        &self,
        user_id: Uuid,
        input: CreateWarehouseInput,
    ) -> AppResult<Warehouse> {
        input.validate()?;
        self.ensure_warehouse_code_available(&input.code, None)
            .await?;

        let mut tx = self.db.begin().await?;

        let warehouse = sqlx::query_as::<_, Warehouse>(&format!(
            r#"
            INSERT INTO warehouses (code, name, address)
            VALUES ($1, $2, $3)
            RETURNING {WAREHOUSE_COLUMNS}
            "#
        ))
        .bind(&input.code)
        .bind(input.name.trim())
        .bind(&input.address)
        .fetch_one(&mut *tx)
        .await?;

        audit::record(
            &mut *tx,
            AuditEntry::new(user_id, "create", "warehouse", warehouse.id)
                .with_details(serde_json::json!({ "code": warehouse.code })),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(warehouse_id = %warehouse.id, code = %warehouse.code, "Warehouse created");
        Ok(warehouse)
    }

    pub async fn update_warehouse(
        &self,
        user_id: Uuid,
        warehouse_id: Uuid,
        input: UpdateWarehouseInput,
    ) -> AppResult<Warehouse> {
        input.validate()?;
        let existing = self.find_warehouse(warehouse_id).await?;

        if let Some(ref code) = input.code {
            self.ensure_warehouse_code_available(code, Some(warehouse_id))
                .await?;
        }

        let code = input.code.unwrap_or(existing.code);
        let name = input
            .name
            .map(|n| n.trim().to_string())
            .unwrap_or(existing.name);
        let address = input.address.or(existing.address);
        let is_active = input.is_active.unwrap_or(existing.is_active);

        let mut tx = self.db.begin().await?;

        let warehouse = sqlx::query_as::<_, Warehouse>(&format!(
            r#"
            UPDATE warehouses
            SET code = $1, name = $2, address = $3, is_active = $4
            WHERE id = $5
            RETURNING {WAREHOUSE_COLUMNS}
            "#
        ))
        .bind(&code)
        .bind(&name)
        .bind(&address)
        .bind(is_active)
        .bind(warehouse_id)
        .fetch_one(&mut *tx)
        .await?;

        audit::record(
            &mut *tx,
            AuditEntry::new(user_id, "update", "warehouse", warehouse_id),
        )
        .await?;

        tx.commit().await?;
        Ok(warehouse)
    }

    /// Delete a warehouse whose locations hold no stock
    pub async fn delete_warehouse(&self, user_id: Uuid, warehouse_id: Uuid) -> AppResult<()> {
        self.find_warehouse(warehouse_id).await?;

        let mut tx = self.db.begin().await?;

        let stocked = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COALESCE(SUM(s.quantity), 0)::bigint
            FROM stock s
            JOIN locations l ON l.id = s.location_id
            WHERE l.warehouse_id = $1
            "#,
        )
        .bind(warehouse_id)
        .fetch_one(&mut *tx)
        .await?;

        if stocked > 0 {
            return Err(AppError::conflict(
                "warehouse",
                format!("Warehouse still holds {} unit(s) of stock", stocked),
            ));
        }

        // Empty stock rows and locations go with the warehouse
        sqlx::query(
            "DELETE FROM stock WHERE location_id IN (SELECT id FROM locations WHERE warehouse_id = $1)",
        )
        .bind(warehouse_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM locations WHERE warehouse_id = $1")
            .bind(warehouse_id)
            .execute(&mut *tx)
            .await
            .map_err(referenced("warehouse"))?;

        sqlx::query("DELETE FROM warehouses WHERE id = $1")
            .bind(warehouse_id)
            .execute(&mut *tx)
            .await?;

        audit::record(
            &mut *tx,
            AuditEntry::new(user_id, "delete", "warehouse", warehouse_id),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(warehouse_id = %warehouse_id, "Warehouse deleted");
        Ok(())
    }

    // ========================================================================
    // Locations
    // ========================================================================

    pub async fn list_locations(&self, warehouse_id: Uuid) -> AppResult<Vec<Location>> {
        let locations = sqlx::query_as::<_, Location>(&format!(
            "SELECT {LOCATION_COLUMNS} FROM locations WHERE warehouse_id = $1 ORDER BY code ASC"
        ))
        .bind(warehouse_id)
        .fetch_all(&self.db)
        .await?;

        Ok(locations)
    }

    async fn find_location(&self, warehouse_id: Uuid, location_id: Uuid) -> AppResult<Location> {
        sqlx::query_as::<_, Location>(&format!(
            "SELECT {LOCATION_COLUMNS} FROM locations WHERE id = $1 AND warehouse_id = $2"
        ))
        .bind(location_id)
        .bind(warehouse_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Location".to_string()))
    }

    pub async fn create_location(
        &self,
        user_id: Uuid,
        warehouse_id: Uuid,
        input: CreateLocationInput,
    ) -> AppResult<Location> {
        input.validate()?;
        self.find_warehouse(warehouse_id).await?;
        self.ensure_location_code_available(warehouse_id, &input.code, None)
            .await?;

        let mut tx = self.db.begin().await?;

        let location = sqlx::query_as::<_, Location>(&format!(
            r#"
            INSERT INTO locations (warehouse_id, code, name, description)
            VALUES ($1, $2, $3, $4)
            RETURNING {LOCATION_COLUMNS}
            "#
        ))
        .bind(warehouse_id)
        .bind(&input.code)
        .bind(input.name.trim())
        .bind(&input.description)
        .fetch_one(&mut *tx)
        .await?;

        audit::record(
            &mut *tx,
            AuditEntry::new(user_id, "create", "location", location.id).with_details(
                serde_json::json!({ "warehouse_id": warehouse_id, "code": location.code }),
            ),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(location_id = %location.id, warehouse_id = %warehouse_id, "Location created");
        Ok(location)
    }

    pub async fn update_location(
        &self,
        user_id: Uuid,
        warehouse_id: Uuid,
        location_id: Uuid,
        input: UpdateLocationInput,
    ) -> AppResult<Location> {
        input.validate()?;
        let existing = self.find_location(warehouse_id, location_id).await?;

        if let Some(ref code) = input.code {
            self.ensure_location_code_available(warehouse_id, code, Some(location_id))
                .await?;
        }

        let code = input.code.unwrap_or(existing.code);
        let name = input
            .name
            .map(|n| n.trim().to_string())
            .unwrap_or(existing.name);
        let description = input.description.or(existing.description);
        let is_active = input.is_active.unwrap_or(existing.is_active);

        let mut tx = self.db.begin().await?;

        let location = sqlx::query_as::<_, Location>(&format!(
            r#"
            UPDATE locations
            SET code = $1, name = $2, description = $3, is_active = $4
            WHERE id = $5
            RETURNING {LOCATION_COLUMNS}
            "#
        ))
        .bind(&code)
        .bind(&name)
        .bind(&description)
        .bind(is_active)
        .bind(location_id)
        .fetch_one(&mut *tx)
        .await?;

        audit::record(
            &mut *tx,
            AuditEntry::new(user_id, "update", "location", location_id),
        )
        .await?;

        tx.commit().await?;
        Ok(location)
    }

    /// Delete a location that holds no stock
    pub async fn delete_location(
        &self,
        user_id: Uuid,
        warehouse_id: Uuid,
        location_id: Uuid,
    ) -> AppResult<()> {
        self.find_location(warehouse_id, location_id).await?;

        let mut tx = self.db.begin().await?;

        let stocked = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(quantity), 0)::bigint FROM stock WHERE location_id = $1",
        )
        .bind(location_id)
        .fetch_one(&mut *tx)
        .await?;

        if stocked > 0 {
            return Err(AppError::conflict(
                "location",
                format!("Location still holds {} unit(s) of stock", stocked),
            ));
        }

        sqlx::query("DELETE FROM stock WHERE location_id = $1")
            .bind(location_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM locations WHERE id = $1")
            .bind(location_id)
            .execute(&mut *tx)
            .await
            .map_err(referenced("location"))?;

        audit::record(
            &mut *tx,
            AuditEntry::new(user_id, "delete", "location", location_id),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(location_id = %location_id, "Location deleted");
        Ok(())
    }

    async fn ensure_warehouse_code_available(
        &self,
        code: &str,
        exclude: Option<Uuid>,
    ) -> AppResult<()> {
        let duplicate = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM warehouses WHERE code = $1 AND ($2::uuid IS NULL OR id != $2))",
        )
        .bind(code)
        .bind(exclude)
        .fetch_one(&self.db)
        .await?;

        if duplicate {
            return Err(AppError::DuplicateEntry("code".to_string()));
        }
        Ok(())
    }

    async fn ensure_location_code_available(
        &self,
        warehouse_id: Uuid,
        code: &str,
        exclude: Option<Uuid>,
    ) -> AppResult<()> {
        let duplicate = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM locations
                WHERE warehouse_id = $1 AND code = $2 AND ($3::uuid IS NULL OR id != $3)
            )
            "#,
        )
        .bind(warehouse_id)
        .bind(code)
        .bind(exclude)
        .fetch_one(&self.db)
        .await?;

        if duplicate {
            return Err(AppError::DuplicateEntry("code".to_string()));
        }
        Ok(())
    }
}

/// Movement history or orders still point at the location
fn referenced(resource: &'static str) -> impl Fn(sqlx::Error) -> AppError {
    move |err| match &err {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => AppError::conflict(
            resource,
            format!("The {} is referenced by stock history or orders", resource),
        ),
        _ => AppError::DatabaseError(err),
    }
}
