use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Sub-application inside an organization that can carry its own role assignments
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct App {
    pub id: i32,
    pub slug: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Per-app access record. A non-null `role_id` overrides the member's base role
/// for requests scoped to `app_id`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserAppAccess {
    pub id: i32,
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub app_id: i32,
    pub role_id: Option<i32>,
    pub is_active: bool,
    pub granted_at: DateTime<Utc>,
}
