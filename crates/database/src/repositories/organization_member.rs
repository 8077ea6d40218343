use crate::error::Result;
use chrono::{DateTime, Utc};
use mero_models::{MemberStatus, MembershipWithRole, OrganizationMember, Role};
use sqlx::PgPool;
use uuid::Uuid;

/// Flat row for the membership and role join
#[derive(sqlx::FromRow)]
struct MembershipRoleRow {
    member_id: Uuid,
    user_id: Uuid,
    organization_id: Uuid,
    role_id: i32,
    status: MemberStatus,
    joined_at: DateTime<Utc>,
    role_organization_id: Option<Uuid>,
    role_app_id: Option<i32>,
    role_name: String,
    role_slug: String,
    role_description: Option<String>,
    is_system_role: bool,
    is_organization_owner: bool,
    is_default: bool,
    role_is_active: bool,
    role_created_at: DateTime<Utc>,
    role_updated_at: DateTime<Utc>,
}

impl From<MembershipRoleRow> for MembershipWithRole {
    fn from(row: MembershipRoleRow) -> Self {
        Self {
            member: OrganizationMember {
                id: row.member_id,
                user_id: row.user_id,
                organization_id: row.organization_id,
                role_id: row.role_id,
                status: row.status,
                joined_at: row.joined_at,
            },
            role: Role {
                id: row.role_id,
                organization_id: row.role_organization_id,
                app_id: row.role_app_id,
                name: row.role_name,
                slug: row.role_slug,
                description: row.role_description,
                is_system_role: row.is_system_role,
                is_organization_owner: row.is_organization_owner,
                is_default: row.is_default,
                is_active: row.role_is_active,
                created_at: row.role_created_at,
                updated_at: row.role_updated_at,
            },
        }
    }
}

#[derive(Clone)]
pub struct OrganizationMemberRepository {
    pool: PgPool,
}

impl OrganizationMemberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Active membership of `user_id` in `organization_id`, joined to its role.
    /// A membership whose role was soft-deleted is treated as absent.
    ///
    /// Served by `idx_organization_members_lookup` in a single round trip.
    pub async fn find_active_with_role(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<MembershipWithRole>> {
        let row = sqlx::query_as::<_, MembershipRoleRow>(
            r#"
            SELECT
                om.id AS member_id,
                om.user_id,
                om.organization_id,
                om.role_id,
                om.status,
                om.joined_at,
                r.organization_id AS role_organization_id,
                r.app_id AS role_app_id,
                r.name AS role_name,
                r.slug AS role_slug,
                r.description AS role_description,
                r.is_system_role,
                r.is_organization_owner,
                r.is_default,
                r.is_active AS role_is_active,
                r.created_at AS role_created_at,
                r.updated_at AS role_updated_at
            FROM organization_members om
            INNER JOIN roles r ON r.id = om.role_id
            WHERE om.user_id = $1
              AND om.organization_id = $2
              AND om.status = 'active'
              AND r.deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(MembershipWithRole::from))
    }
}
