use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::role::Role;

/// Lifecycle of a membership. Rows are never deleted, only moved between states.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "organization_member_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Active,
    Inactive,
    Pending,
}

impl std::fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemberStatus::Active => write!(f, "active"),
            MemberStatus::Inactive => write!(f, "inactive"),
            MemberStatus::Pending => write!(f, "pending"),
        }
    }
}

/// Organization member (user to organization join carrying the base role)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OrganizationMember {
    pub id: Uuid,
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub role_id: i32,
    pub status: MemberStatus,
    pub joined_at: DateTime<Utc>,
}

/// Membership joined with its role, as returned by the active-membership lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipWithRole {
    pub member: OrganizationMember,
    pub role: Role,
}

impl MembershipWithRole {
    pub fn is_owner(&self) -> bool {
        self.role.is_organization_owner
    }
}
