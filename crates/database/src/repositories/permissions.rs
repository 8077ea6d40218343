use crate::error::Result;
use mero_models::{Permission, TimeBasedPermission};
use sqlx::PgPool;

#[derive(Clone)]
pub struct PermissionRepository {
    pool: PgPool,
}

impl PermissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<Permission>> {
        let permission = sqlx::query_as::<_, Permission>(
            "SELECT id, name, slug, description, category, created_at FROM permissions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(permission)
    }

    /// Whether the platform catalogue already defines `slug`
    pub async fn slug_exists(&self, slug: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM permissions WHERE slug = LOWER($1))",
        )
        .bind(slug)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}

pub struct NewTimeBasedPermission<'a> {
    pub role_id: i32,
    pub permission_id: i32,
    pub starts_at: chrono::DateTime<chrono::Utc>,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub granted_by: uuid::Uuid,
    pub reason: Option<&'a str>,
}

#[derive(Clone)]
pub struct TimeBasedPermissionRepository {
    pool: PgPool,
}

impl TimeBasedPermissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, grant: NewTimeBasedPermission<'_>) -> Result<TimeBasedPermission> {
        let created = sqlx::query_as::<_, TimeBasedPermission>(
            r#"
            INSERT INTO time_based_permissions
                (role_id, permission_id, starts_at, expires_at, is_active, granted_by, reason)
            VALUES ($1, $2, $3, $4, TRUE, $5, $6)
            RETURNING *
            "#,
        )
        .bind(grant.role_id)
        .bind(grant.permission_id)
        .bind(grant.starts_at)
        .bind(grant.expires_at)
        .bind(grant.granted_by)
        .bind(grant.reason)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<TimeBasedPermission>> {
        let grant = sqlx::query_as::<_, TimeBasedPermission>(
            "SELECT * FROM time_based_permissions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(grant)
    }

    /// An active grant for the same role and permission whose window intersects [starts_at, expires_at)
    pub async fn find_overlapping(
        &self,
        role_id: i32,
        permission_id: i32,
        starts_at: chrono::DateTime<chrono::Utc>,
        expires_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<Option<TimeBasedPermission>> {
        let grant = sqlx::query_as::<_, TimeBasedPermission>(
            r#"
            SELECT * FROM time_based_permissions
            WHERE role_id = $1
              AND permission_id = $2
              AND is_active = TRUE
              AND starts_at < $4
              AND expires_at > $3
            LIMIT 1
            "#,
        )
        .bind(role_id)
        .bind(permission_id)
        .bind(starts_at)
        .bind(expires_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(grant)
    }

    /// Grants on roles owned by the organization, optionally narrowed to one role
    pub async fn list_for_organization(
        &self,
        organization_id: uuid::Uuid,
        role_id: Option<i32>,
    ) -> Result<Vec<TimeBasedPermission>> {
        let grants = sqlx::query_as::<_, TimeBasedPermission>(
            r#"
            SELECT t.*
            FROM time_based_permissions t
            INNER JOIN roles r ON r.id = t.role_id
            WHERE r.organization_id = $1
              AND ($2::INTEGER IS NULL OR t.role_id = $2)
            ORDER BY t.starts_at DESC
            "#,
        )
        .bind(organization_id)
        .bind(role_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(grants)
    }

    pub async fn deactivate(&self, id: i32) -> Result<bool> {
        let result = sqlx::query("UPDATE time_based_permissions SET is_active = FALSE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Flip every active grant whose window has closed; returns how many were touched
    pub async fn deactivate_expired(&self) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE time_based_permissions SET is_active = FALSE WHERE is_active = TRUE AND expires_at <= NOW()",
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
