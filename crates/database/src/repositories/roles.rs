use crate::error::Result;
use mero_models::Role;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct RoleRepository {
    pool: PgPool,
}

impl RoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Live role owned by the organization. System roles never match.
    pub async fn find_in_organization(
        &self,
        id: i32,
        organization_id: Uuid,
    ) -> Result<Option<Role>> {
        let role = sqlx::query_as::<_, Role>(
            r#"
            SELECT id, organization_id, app_id, name, slug, description,
                   is_system_role, is_organization_owner, is_default, is_active,
                   created_at, updated_at
            FROM roles
            WHERE id = $1 AND organization_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(role)
    }

    /// Permission slugs granted to a role, including time-based grants active right now.
    ///
    /// Returns `None` when the role does not exist so callers can tell
    /// "no grants" apart from "dangling role reference".
    pub async fn permission_slugs(&self, role_id: i32) -> Result<Option<Vec<String>>> {
        let mut tx = self.pool.begin().await?;

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM roles WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(role_id)
        .fetch_one(&mut *tx)
        .await?;

        if !exists {
            tx.rollback().await?;
            return Ok(None);
        }

        let slugs: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT p.slug
            FROM role_permissions rp
            INNER JOIN permissions p ON p.id = rp.permission_id
            WHERE rp.role_id = $1
            UNION
            SELECT p.slug
            FROM time_based_permissions t
            INNER JOIN permissions p ON p.id = t.permission_id
            WHERE t.role_id = $1
              AND t.is_active = TRUE
              AND t.starts_at <= NOW()
              AND t.expires_at > NOW()
            "#,
        )
        .bind(role_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(slugs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Only run with database available
    async fn test_unknown_role_has_no_permission_set() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPool::connect(&url).await.expect("Failed to connect to database");
        let repo = RoleRepository::new(pool);

        let slugs = repo.permission_slugs(i32::MAX).await.expect("Query failed");
        assert!(slugs.is_none());
    }

    async fn insert_permission(pool: &PgPool, slug: &str) -> i32 {
        sqlx::query_scalar(
            "INSERT INTO permissions (name, slug, category) VALUES ($1, $1, 'test') RETURNING id",
        )
        .bind(slug)
        .fetch_one(pool)
        .await
        .expect("Failed to insert permission")
    }

    #[tokio::test]
    #[ignore] // Only run with database available
    async fn test_permission_set_includes_only_live_time_grants() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPool::connect(&url).await.expect("Failed to connect to database");
        let repo = RoleRepository::new(pool.clone());

        let suffix = Uuid::new_v4().simple().to_string();
        let direct = format!("direct.{}", suffix);
        let active = format!("active.{}", suffix);
        let expired = format!("expired.{}", suffix);

        let role_id: i32 = sqlx::query_scalar(
            "INSERT INTO roles (organization_id, name, slug) VALUES ($1, 'Editor', 'editor') RETURNING id",
        )
        .bind(Uuid::new_v4())
        .fetch_one(&pool)
        .await
        .expect("Failed to insert role");

        let direct_id = insert_permission(&pool, &direct).await;
        let active_id = insert_permission(&pool, &active).await;
        let expired_id = insert_permission(&pool, &expired).await;

        sqlx::query("INSERT INTO role_permissions (role_id, permission_id) VALUES ($1, $2)")
            .bind(role_id)
            .bind(direct_id)
            .execute(&pool)
            .await
            .expect("Failed to insert role permission");

        // The expired grant is still flagged active: only the window excludes it
        sqlx::query(
            r#"
            INSERT INTO time_based_permissions (role_id, permission_id, starts_at, expires_at, is_active)
            VALUES ($1, $2, NOW() - INTERVAL '1 hour', NOW() + INTERVAL '1 hour', TRUE),
                   ($1, $3, NOW() - INTERVAL '2 hours', NOW() - INTERVAL '1 hour', TRUE)
            "#,
        )
        .bind(role_id)
        .bind(active_id)
        .bind(expired_id)
        .execute(&pool)
        .await
        .expect("Failed to insert time-based grants");

        let slugs = repo
            .permission_slugs(role_id)
            .await
            .expect("Query failed")
            .expect("Role should exist");

        sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(role_id)
            .execute(&pool)
            .await
            .expect("Failed to clean up role");
        sqlx::query("DELETE FROM permissions WHERE id = ANY($1)")
            .bind(vec![direct_id, active_id, expired_id])
            .execute(&pool)
            .await
            .expect("Failed to clean up permissions");

        assert!(slugs.contains(&direct));
        assert!(slugs.contains(&active));
        assert!(!slugs.contains(&expired));
        assert_eq!(slugs.len(), 2);
    }
}
