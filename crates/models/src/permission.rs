use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Permission {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

/// Permission slugs referenced from code. The full catalogue is seeded by migration.
pub mod slugs {
    pub const ROLES_VIEW: &str = "roles.view";
    pub const ROLES_MANAGE: &str = "roles.manage";
    pub const AUDIT_VIEW: &str = "audit.view";
}
