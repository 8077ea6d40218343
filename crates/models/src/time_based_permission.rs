use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Temporary grant of one permission to one role
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TimeBasedPermission {
    pub id: i32,
    pub role_id: i32,
    pub permission_id: i32,
    pub starts_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    pub granted_by: Option<Uuid>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GrantTimeBasedPermission {
    #[validate(range(min = 1))]
    pub role_id: i32,

    #[validate(range(min = 1))]
    pub permission_id: i32,

    pub starts_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,

    #[validate(length(max = 500))]
    pub reason: Option<String>,
}
