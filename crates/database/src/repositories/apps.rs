use crate::error::Result;
use mero_models::{App, UserAppAccess};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppRepository {
    pool: PgPool,
}

impl AppRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Look up an app by its unique slug
    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<App>> {
        let app = sqlx::query_as::<_, App>(
            "SELECT id, slug, name, is_active, created_at FROM apps WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(app)
    }
}

#[derive(Clone)]
pub struct AppAccessRepository {
    pool: PgPool,
}

impl AppAccessRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Active access record of a user for one app inside one organization
    pub async fn find_active(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
        app_id: i32,
    ) -> Result<Option<UserAppAccess>> {
        let access = sqlx::query_as::<_, UserAppAccess>(
            r#"
            SELECT id, user_id, organization_id, app_id, role_id, is_active, granted_at
            FROM user_app_access
            WHERE user_id = $1
              AND organization_id = $2
              AND app_id = $3
              AND is_active = TRUE
            ORDER BY granted_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(organization_id)
        .bind(app_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(access)
    }
}
