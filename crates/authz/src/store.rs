//! Read interfaces the permission guard depends on, plus the audit write path.
//!
//! The Postgres repositories from `mero-database` implement every trait here;
//! unit tests substitute mocks.

use crate::error::{AuditWriteError, AuthzError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mero_database::{
    AppAccessRepository, AppRepository, AuditRepository, CustomPermissionRepository,
    DatabaseError, NewTimeBasedPermission, OrganizationMemberRepository, PermissionRepository,
    RoleRepository, TimeBasedPermissionRepository,
};
use mero_models::{
    CreateAuditLog, CreateCustomPermission, CustomPermission, GrantTimeBasedPermission,
    MembershipWithRole, Role, TimeBasedPermission, UpdateCustomPermission, UserAppAccess,
};
use sqlx::PgPool;
use uuid::Uuid;

/// Active membership lookup
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// The unique active membership joined to its role, in a single lookup
    async fn find_active_membership(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<MembershipWithRole>>;
}

/// Registry of apps (scopes) addressable by slug
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AppRegistry: Send + Sync {
    async fn resolve_app_slug(&self, slug: &str) -> Result<Option<i32>>;
}

/// Per-app role overrides
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AppAccessStore: Send + Sync {
    async fn find_active_access(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
        app_id: i32,
    ) -> Result<Option<UserAppAccess>>;
}

/// Permission slugs granted to a role
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RolePermissionStore: Send + Sync {
    /// `None` when the role does not exist
    async fn permission_slugs(&self, role_id: i32) -> Result<Option<Vec<String>>>;
}

/// Append-only audit destination
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, entry: CreateAuditLog) -> std::result::Result<(), AuditWriteError>;
}

#[async_trait]
impl MembershipStore for OrganizationMemberRepository {
    async fn find_active_membership(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<MembershipWithRole>> {
        Ok(self.find_active_with_role(user_id, organization_id).await?)
    }
}

#[async_trait]
impl AppRegistry for AppRepository {
    async fn resolve_app_slug(&self, slug: &str) -> Result<Option<i32>> {
        Ok(self.find_by_slug(slug).await?.map(|app| app.id))
    }
}

#[async_trait]
impl AppAccessStore for AppAccessRepository {
    async fn find_active_access(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
        app_id: i32,
    ) -> Result<Option<UserAppAccess>> {
        Ok(self.find_active(user_id, organization_id, app_id).await?)
    }
}

#[async_trait]
impl RolePermissionStore for RoleRepository {
    async fn permission_slugs(&self, role_id: i32) -> Result<Option<Vec<String>>> {
        Ok(RoleRepository::permission_slugs(self, role_id).await?)
    }
}

#[async_trait]
impl AuditSink for AuditRepository {
    async fn append(&self, entry: CreateAuditLog) -> std::result::Result<(), AuditWriteError> {
        self.create(&entry).await?;
        Ok(())
    }
}

/// Persistence used by the time-based grant service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// A live role owned by the organization; system roles are never returned
    async fn find_role(&self, role_id: i32, organization_id: Uuid) -> Result<Option<Role>>;

    async fn permission_exists(&self, permission_id: i32) -> Result<bool>;

    async fn find_overlapping(
        &self,
        role_id: i32,
        permission_id: i32,
        starts_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<TimeBasedPermission>>;

    async fn create_grant(
        &self,
        grant: GrantTimeBasedPermission,
        granted_by: Uuid,
    ) -> Result<TimeBasedPermission>;

    async fn find_grant(&self, grant_id: i32) -> Result<Option<TimeBasedPermission>>;

    async fn list_grants(
        &self,
        organization_id: Uuid,
        role_id: Option<i32>,
    ) -> Result<Vec<TimeBasedPermission>>;

    async fn deactivate_grant(&self, grant_id: i32) -> Result<bool>;

    async fn deactivate_expired(&self) -> Result<u64>;
}

/// `GrantStore` over the Postgres repositories
#[derive(Clone)]
pub struct PgGrantStore {
    roles: RoleRepository,
    permissions: PermissionRepository,
    grants: TimeBasedPermissionRepository,
}

impl PgGrantStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            roles: RoleRepository::new(pool.clone()),
            permissions: PermissionRepository::new(pool.clone()),
            grants: TimeBasedPermissionRepository::new(pool),
        }
    }
}

#[async_trait]
impl GrantStore for PgGrantStore {
    async fn find_role(&self, role_id: i32, organization_id: Uuid) -> Result<Option<Role>> {
        Ok(self.roles.find_in_organization(role_id, organization_id).await?)
    }

    async fn permission_exists(&self, permission_id: i32) -> Result<bool> {
        Ok(self.permissions.find_by_id(permission_id).await?.is_some())
    }

    async fn find_overlapping(
        &self,
        role_id: i32,
        permission_id: i32,
        starts_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<TimeBasedPermission>> {
        Ok(self
            .grants
            .find_overlapping(role_id, permission_id, starts_at, expires_at)
            .await?)
    }

    async fn create_grant(
        &self,
        grant: GrantTimeBasedPermission,
        granted_by: Uuid,
    ) -> Result<TimeBasedPermission> {
        let created = self
            .grants
            .create(NewTimeBasedPermission {
                role_id: grant.role_id,
                permission_id: grant.permission_id,
                starts_at: grant.starts_at,
                expires_at: grant.expires_at,
                granted_by,
                reason: grant.reason.as_deref(),
            })
            .await?;
        Ok(created)
    }

    async fn find_grant(&self, grant_id: i32) -> Result<Option<TimeBasedPermission>> {
        Ok(self.grants.find_by_id(grant_id).await?)
    }

    async fn list_grants(
        &self,
        organization_id: Uuid,
        role_id: Option<i32>,
    ) -> Result<Vec<TimeBasedPermission>> {
        Ok(self.grants.list_for_organization(organization_id, role_id).await?)
    }

    async fn deactivate_grant(&self, grant_id: i32) -> Result<bool> {
        Ok(self.grants.deactivate(grant_id).await?)
    }

    async fn deactivate_expired(&self) -> Result<u64> {
        Ok(self.grants.deactivate_expired().await?)
    }
}

/// Persistence used by the custom permission service. Every method is scoped
/// to one organization.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CustomPermissionStore: Send + Sync {
    async fn find_custom(&self, organization_id: Uuid, id: i32) -> Result<Option<CustomPermission>>;

    /// Whether `slug` is already used by the platform catalogue or by one of
    /// the organization's own permissions
    async fn slug_taken(&self, organization_id: Uuid, slug: &str) -> Result<bool>;

    async fn create_custom(
        &self,
        organization_id: Uuid,
        permission: CreateCustomPermission,
        created_by: Uuid,
    ) -> Result<CustomPermission>;

    async fn list_custom(
        &self,
        organization_id: Uuid,
        category: Option<String>,
    ) -> Result<Vec<CustomPermission>>;

    async fn update_custom(
        &self,
        organization_id: Uuid,
        id: i32,
        changes: UpdateCustomPermission,
    ) -> Result<Option<CustomPermission>>;

    async fn delete_custom(&self, organization_id: Uuid, id: i32) -> Result<bool>;
}

/// `CustomPermissionStore` over the Postgres repositories
#[derive(Clone)]
pub struct PgCustomPermissionStore {
    catalogue: PermissionRepository,
    custom: CustomPermissionRepository,
}

impl PgCustomPermissionStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            catalogue: PermissionRepository::new(pool.clone()),
            custom: CustomPermissionRepository::new(pool),
        }
    }
}

#[async_trait]
impl CustomPermissionStore for PgCustomPermissionStore {
    async fn find_custom(&self, organization_id: Uuid, id: i32) -> Result<Option<CustomPermission>> {
        Ok(self.custom.find_by_id(organization_id, id).await?)
    }

    async fn slug_taken(&self, organization_id: Uuid, slug: &str) -> Result<bool> {
        let (in_catalogue, in_organization) = tokio::try_join!(
            self.catalogue.slug_exists(slug),
            self.custom.slug_exists(organization_id, slug),
        )?;
        Ok(in_catalogue || in_organization)
    }

    async fn create_custom(
        &self,
        organization_id: Uuid,
        permission: CreateCustomPermission,
        created_by: Uuid,
    ) -> Result<CustomPermission> {
        match self.custom.create(organization_id, &permission, created_by).await {
            Ok(created) => Ok(created),
            // A concurrent create won the (organization_id, slug) unique constraint
            Err(DatabaseError::ConnectionError(sqlx::Error::Database(e)))
                if e.is_unique_violation() =>
            {
                Err(AuthzError::Conflict(format!(
                    "Permission slug '{}' already exists",
                    permission.slug
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list_custom(
        &self,
        organization_id: Uuid,
        category: Option<String>,
    ) -> Result<Vec<CustomPermission>> {
        Ok(self.custom.list(organization_id, category.as_deref()).await?)
    }

    async fn update_custom(
        &self,
        organization_id: Uuid,
        id: i32,
        changes: UpdateCustomPermission,
    ) -> Result<Option<CustomPermission>> {
        Ok(self.custom.update(organization_id, id, &changes).await?)
    }

    async fn delete_custom(&self, organization_id: Uuid, id: i32) -> Result<bool> {
        Ok(self.custom.delete(organization_id, id).await?)
    }
}
