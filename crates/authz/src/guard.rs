use crate::audit::{denial_entry, AuditDispatcher};
use crate::context::{Principal, RequestContext, ScopeSelector};
use crate::error::{AuthzError, Result};
use crate::permission_set::PermissionSet;
use crate::store::{AppAccessStore, AppRegistry, MembershipStore, RolePermissionStore};
use mero_models::MembershipWithRole;
use serde::Serialize;
use std::sync::Arc;

/// Outcome of an allowed check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Decision {
    /// The operation declares no required permissions
    NotRequired,
    /// The caller's base role is flagged organization-owner
    OwnerBypass,
    /// Every required slug is granted by the effective role
    Granted { role_id: i32 },
}

/// What a principal can do inside an organization, optionally narrowed to an app scope
#[derive(Debug, Clone)]
pub enum Access {
    Owner {
        membership: MembershipWithRole,
    },
    Member {
        membership: MembershipWithRole,
        role_id: i32,
        permissions: PermissionSet,
    },
}

impl Access {
    pub fn membership(&self) -> &MembershipWithRole {
        match self {
            Access::Owner { membership } | Access::Member { membership, .. } => membership,
        }
    }

    pub fn is_owner(&self) -> bool {
        matches!(self, Access::Owner { .. })
    }

    /// Effective role id. Owners keep their base role.
    pub fn role_id(&self) -> i32 {
        match self {
            Access::Owner { membership } => membership.member.role_id,
            Access::Member { role_id, .. } => *role_id,
        }
    }

    /// Assembled permissions; `None` for owners, whose set is never computed
    pub fn permissions(&self) -> Option<&PermissionSet> {
        match self {
            Access::Owner { .. } => None,
            Access::Member { permissions, .. } => Some(permissions),
        }
    }
}

/// Authorization gate run in front of every guarded operation
#[derive(Clone)]
pub struct PermissionGuard {
    memberships: Arc<dyn MembershipStore>,
    apps: Arc<dyn AppRegistry>,
    app_access: Arc<dyn AppAccessStore>,
    roles: Arc<dyn RolePermissionStore>,
    audit: AuditDispatcher,
}

impl PermissionGuard {
    pub fn new(
        memberships: Arc<dyn MembershipStore>,
        apps: Arc<dyn AppRegistry>,
        app_access: Arc<dyn AppAccessStore>,
        roles: Arc<dyn RolePermissionStore>,
        audit: AuditDispatcher,
    ) -> Self {
        Self {
            memberships,
            apps,
            app_access,
            roles,
            audit,
        }
    }

    /// Decide whether the request may run an operation requiring every slug in `required`.
    ///
    /// A denial appends one critical audit entry before returning
    /// `InsufficientPermissions`. The audit write is best effort and never
    /// changes the result.
    pub async fn authorize(&self, ctx: &RequestContext, required: &[String]) -> Result<Decision> {
        if required.is_empty() {
            return Ok(Decision::NotRequired);
        }

        let principal = ctx.principal.ok_or(AuthzError::NotAuthenticated)?;

        let (membership, role_id, permissions) = match self.resolve(&principal, &ctx.scope).await? {
            Access::Owner { membership } => {
                tracing::debug!(
                    user_id = %principal.user_id,
                    organization_id = %principal.organization_id,
                    role_id = membership.member.role_id,
                    "Organization owner bypasses permission check"
                );
                return Ok(Decision::OwnerBypass);
            }
            Access::Member {
                membership,
                role_id,
                permissions,
            } => (membership, role_id, permissions),
        };

        let missing: Vec<String> = permissions
            .missing(required)
            .into_iter()
            .map(str::to_string)
            .collect();

        if missing.is_empty() {
            return Ok(Decision::Granted { role_id });
        }

        tracing::warn!(
            user_id = %principal.user_id,
            organization_id = %principal.organization_id,
            base_role_id = membership.member.role_id,
            role_id,
            endpoint = %ctx.meta.endpoint,
            method = %ctx.meta.method,
            missing = ?missing,
            "Permission denied"
        );

        self.audit
            .record(denial_entry(&principal, required, &permissions, &missing, &ctx.meta))
            .await;

        Err(AuthzError::InsufficientPermissions { missing })
    }

    /// Membership lookup, owner short-circuit, scope resolution and permission assembly
    pub async fn resolve(&self, principal: &Principal, scope: &ScopeSelector) -> Result<Access> {
        let slug = match (scope.app_id, scope.app_slug.as_deref()) {
            (None, Some(slug)) => Some(slug),
            _ => None,
        };

        let (membership, resolved_app_id) = tokio::try_join!(
            self.memberships
                .find_active_membership(principal.user_id, principal.organization_id),
            async {
                match slug {
                    Some(slug) => self.apps.resolve_app_slug(slug).await,
                    None => Ok(None),
                }
            },
        )?;

        let membership = membership.ok_or(AuthzError::NotAMember)?;

        if membership.is_owner() {
            return Ok(Access::Owner { membership });
        }

        let app_id = scope.app_id.or(resolved_app_id);
        if let (Some(slug), None) = (slug, app_id) {
            tracing::warn!(
                app_slug = %slug,
                user_id = %principal.user_id,
                organization_id = %principal.organization_id,
                "Unknown app slug, falling back to organization role"
            );
        }

        let role_id = self.effective_role(principal, &membership, app_id).await?;
        let permissions = self.assemble(role_id).await?;

        Ok(Access::Member {
            membership,
            role_id,
            permissions,
        })
    }

    async fn effective_role(
        &self,
        principal: &Principal,
        membership: &MembershipWithRole,
        app_id: Option<i32>,
    ) -> Result<i32> {
        let base = membership.member.role_id;
        let Some(app_id) = app_id else {
            return Ok(base);
        };

        let access = self
            .app_access
            .find_active_access(principal.user_id, principal.organization_id, app_id)
            .await?;

        match access.filter(|a| a.is_active).and_then(|a| a.role_id) {
            Some(role_id) => {
                tracing::debug!(app_id, base_role_id = base, role_id, "App role override applied");
                Ok(role_id)
            }
            None => Ok(base),
        }
    }

    async fn assemble(&self, role_id: i32) -> Result<PermissionSet> {
        let slugs = self
            .roles
            .permission_slugs(role_id)
            .await?
            .ok_or(AuthzError::RoleNotFound(role_id))?;

        Ok(slugs.into_iter().collect())
    }
}
