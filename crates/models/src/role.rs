use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A named bundle of permission grants.
///
/// `organization_id` is `None` for system roles shared by every organization,
/// `app_id` is set for roles that only make sense inside one app.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: i32,
    pub organization_id: Option<Uuid>,
    pub app_id: Option<i32>,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub is_system_role: bool,
    /// Owners bypass granular permission checks entirely
    pub is_organization_owner: bool,
    pub is_default: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    /// Whether the role is owned by `organization_id`. System roles are
    /// shared by every tenant and belong to none of them.
    pub fn belongs_to(&self, organization_id: Uuid) -> bool {
        self.organization_id == Some(organization_id)
    }
}
