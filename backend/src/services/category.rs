//! Product category management

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::audit::{self, AuditEntry};

/// Category service
#[derive(Clone)]
pub struct CategoryService {
    db: PgPool,
}

/// Product category
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a category
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryInput {
    #[validate(
        length(min = 1, max = 100, message = "Name must be 1-100 characters"),
        custom = "shared::not_blank_rule"
    )]
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
}

/// Input for updating a category
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCategoryInput {
    #[validate(
        length(min = 1, max = 100, message = "Name must be 1-100 characters"),
        custom = "shared::not_blank_rule"
    )]
    pub name: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
}

const CATEGORY_COLUMNS: &str = "id, name, description, parent_id, created_at, updated_at";

impl CategoryService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List all categories ordered by name
    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name ASC"
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(categories)
    }

    pub async fn get_category(&self, category_id: Uuid) -> AppResult<Category> {
        sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"
        ))
        .bind(category_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Category".to_string()))
    }

    /// Create a new category
    pub async fn create_category(
        &self,
        user_id: Uuid,
        input: CreateCategoryInput,
    ) -> AppResult<Category> {
        input.validate()?;
        let name = input.name.trim();

        self.ensure_name_available(name, None).await?;
        if let Some(parent_id) = input.parent_id {
            self.get_category(parent_id).await?;
        }

        let mut tx = self.db.begin().await?;

        let category = sqlx::query_as::<_, Category>(&format!(
            r#"
            INSERT INTO categories (name, description, parent_id)
            VALUES ($1, $2, $3)
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(name)
        .bind(&input.description)
        .bind(input.parent_id)
        .fetch_one(&mut *tx)
        .await?;

        audit::record(
            &mut *tx,
            AuditEntry::new(user_id, "create", "category", category.id)
                .with_details(serde_json::json!({ "name": category.name })),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(category_id = %category.id, "Category created");
        Ok(category)
    }

    /// Update a category
    pub async fn update_category(
        &self,
        user_id: Uuid,
        category_id: Uuid,
        input: UpdateCategoryInput,
    ) -> AppResult<Category> {
        input.validate()?;
        let existing = self.get_category(category_id).await?;

        if let Some(ref name) = input.name {
            self.ensure_name_available(name.trim(), Some(category_id))
                .await?;
        }
        if let Some(parent_id) = input.parent_id {
            if parent_id == category_id {
                return Err(AppError::validation(
                    "parent_id",
                    "A category cannot be its own parent",
                ));
            }
            self.get_category(parent_id).await?;
        }

        let name = input
            .name
            .map(|n| n.trim().to_string())
            .unwrap_or(existing.name);
        let description = input.description.or(existing.description);
        let parent_id = input.parent_id.or(existing.parent_id);

        let mut tx = self.db.begin().await?;

        let category = sqlx::query_as::<_, Category>(&format!(
            r#"
            UPDATE categories
            SET name = $1, description = $2, parent_id = $3
            WHERE id = $4
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(&name)
        .bind(&description)
        .bind(parent_id)
        .bind(category_id)
        .fetch_one(&mut *tx)
        .await?;

        audit::record(
            &mut *tx,
            AuditEntry::new(user_id, "update", "category", category_id),
        )
        .await?;

        tx.commit().await?;
        Ok(category)
    }

    /// Delete a category that no product references
    pub async fn delete_category(&self, user_id: Uuid, category_id: Uuid) -> AppResult<()> {
        self.get_category(category_id).await?;

        let product_count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM products WHERE category_id = $1",
        )
        .bind(category_id)
        .fetch_one(&self.db)
        .await?;

        if product_count > 0 {
            return Err(AppError::conflict(
                "category",
                format!("Category is used by {} product(s)", product_count),
            ));
        }

        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(category_id)
            .execute(&mut *tx)
            .await?;

        audit::record(
            &mut *tx,
            AuditEntry::new(user_id, "delete", "category", category_id),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(category_id = %category_id, "Category deleted");
        Ok(())
    }

    async fn ensure_name_available(&self, name: &str, exclude: Option<Uuid>) -> AppResult<()> {
        let duplicate = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE LOWER(name) = LOWER($1) AND ($2::uuid IS NULL OR id != $2))",
        )
        .bind(name)
        .bind(exclude)
        .fetch_one(&self.db)
        .await?;

        if duplicate {
            return Err(AppError::DuplicateEntry("name".to_string()));
        }
        Ok(())
    }
}
