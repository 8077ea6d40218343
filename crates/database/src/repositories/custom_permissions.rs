use crate::error::Result;
use mero_models::custom_permission::DEFAULT_CATEGORY;
use mero_models::{CreateCustomPermission, CustomPermission, UpdateCustomPermission};
use sqlx::PgPool;
use uuid::Uuid;

/// Permissions owned by a single organization. Every query is scoped by
/// `organization_id`; a row of another tenant behaves as if it did not exist.
#[derive(Clone)]
pub struct CustomPermissionRepository {
    pool: PgPool,
}

impl CustomPermissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        organization_id: Uuid,
        permission: &CreateCustomPermission,
        created_by: Uuid,
    ) -> Result<CustomPermission> {
        let created = sqlx::query_as::<_, CustomPermission>(
            r#"
            INSERT INTO custom_permissions
                (organization_id, name, slug, description, category, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(&permission.name)
        .bind(&permission.slug)
        .bind(&permission.description)
        .bind(permission.category.as_deref().unwrap_or(DEFAULT_CATEGORY))
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    pub async fn find_by_id(&self, organization_id: Uuid, id: i32) -> Result<Option<CustomPermission>> {
        let permission = sqlx::query_as::<_, CustomPermission>(
            "SELECT * FROM custom_permissions WHERE id = $1 AND organization_id = $2",
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(permission)
    }

    pub async fn slug_exists(&self, organization_id: Uuid, slug: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM custom_permissions WHERE organization_id = $1 AND slug = LOWER($2))",
        )
        .bind(organization_id)
        .bind(slug)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// All custom permissions of the organization, optionally in one category
    pub async fn list(
        &self,
        organization_id: Uuid,
        category: Option<&str>,
    ) -> Result<Vec<CustomPermission>> {
        let permissions = sqlx::query_as::<_, CustomPermission>(
            r#"
            SELECT * FROM custom_permissions
            WHERE organization_id = $1
              AND ($2::VARCHAR IS NULL OR category = $2)
            ORDER BY category, slug
            "#,
        )
        .bind(organization_id)
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        Ok(permissions)
    }

    /// Apply the fields present in `update`. `None` when the row does not exist
    pub async fn update(
        &self,
        organization_id: Uuid,
        id: i32,
        update: &UpdateCustomPermission,
    ) -> Result<Option<CustomPermission>> {
        let mut query_builder =
            sqlx::QueryBuilder::new("UPDATE custom_permissions SET updated_at = NOW()");

        let mut has_updates = false;

        if let Some(ref name) = update.name {
            query_builder.push(", name = ");
            query_builder.push_bind(name);
            has_updates = true;
        }

        if let Some(ref description) = update.description {
            query_builder.push(", description = ");
            query_builder.push_bind(description);
            has_updates = true;
        }

        if let Some(ref category) = update.category {
            query_builder.push(", category = ");
            query_builder.push_bind(category);
            has_updates = true;
        }

        if let Some(is_active) = update.is_active {
            query_builder.push(", is_active = ");
            query_builder.push_bind(is_active);
            has_updates = true;
        }

        if !has_updates {
            return self.find_by_id(organization_id, id).await;
        }

        query_builder.push(" WHERE id = ");
        query_builder.push_bind(id);
        query_builder.push(" AND organization_id = ");
        query_builder.push_bind(organization_id);
        query_builder.push(" RETURNING *");

        let permission = query_builder
            .build_query_as::<CustomPermission>()
            .fetch_optional(&self.pool)
            .await?;

        Ok(permission)
    }

    pub async fn delete(&self, organization_id: Uuid, id: i32) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM custom_permissions WHERE id = $1 AND organization_id = $2")
                .bind(id)
                .bind(organization_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Only run with database available
    async fn test_rows_are_invisible_to_other_organizations() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPool::connect(&url).await.expect("Failed to connect to database");
        let repo = CustomPermissionRepository::new(pool);

        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        let created = repo
            .create(
                owner,
                &CreateCustomPermission {
                    name: "Archive boards".to_string(),
                    slug: "boards.archive".to_string(),
                    description: None,
                    category: None,
                },
                Uuid::new_v4(),
            )
            .await
            .expect("Failed to create custom permission");
        assert_eq!(created.category, DEFAULT_CATEGORY);

        assert!(repo.slug_exists(owner, "Boards.Archive").await.expect("Query failed"));
        assert!(!repo.slug_exists(other, "boards.archive").await.expect("Query failed"));
        assert!(repo.find_by_id(other, created.id).await.expect("Query failed").is_none());
        assert!(!repo.delete(other, created.id).await.expect("Query failed"));

        assert!(repo.delete(owner, created.id).await.expect("Query failed"));
    }
}
