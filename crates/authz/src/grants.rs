use crate::audit::AuditDispatcher;
use crate::context::Principal;
use crate::error::{AuthzError, Result};
use crate::store::GrantStore;
use chrono::{DateTime, Utc};
use mero_models::audit::actions;
use mero_models::{AuditLogBuilder, GrantTimeBasedPermission, TimeBasedPermission};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Check a grant window against the current time
pub fn validate_window(
    starts_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<()> {
    if starts_at >= expires_at {
        return Err(AuthzError::Validation(
            "starts_at must be before expires_at".to_string(),
        ));
    }
    if starts_at < now {
        return Err(AuthzError::Validation(
            "starts_at cannot be in the past".to_string(),
        ));
    }
    Ok(())
}

/// Temporary permission grants on organization roles.
///
/// Callers are expected to have passed the permission guard for the
/// operation (`roles.manage` for mutations, `roles.view` for listing).
#[derive(Clone)]
pub struct TimeBasedGrantService {
    store: Arc<dyn GrantStore>,
    audit: AuditDispatcher,
}

impl TimeBasedGrantService {
    pub fn new(store: Arc<dyn GrantStore>, audit: AuditDispatcher) -> Self {
        Self { store, audit }
    }

    pub async fn grant(
        &self,
        actor: &Principal,
        request: GrantTimeBasedPermission,
    ) -> Result<TimeBasedPermission> {
        self.grant_at(actor, request, Utc::now()).await
    }

    async fn grant_at(
        &self,
        actor: &Principal,
        request: GrantTimeBasedPermission,
        now: DateTime<Utc>,
    ) -> Result<TimeBasedPermission> {
        request
            .validate()
            .map_err(|e| AuthzError::Validation(e.to_string()))?;
        validate_window(request.starts_at, request.expires_at, now)?;

        let organization_id = actor.organization_id;

        if !self.owns_role(request.role_id, organization_id).await? {
            return Err(AuthzError::NotFound(format!(
                "Role {} not found in this organization",
                request.role_id
            )));
        }

        if !self.store.permission_exists(request.permission_id).await? {
            return Err(AuthzError::NotFound(format!(
                "Permission {} not found",
                request.permission_id
            )));
        }

        if let Some(existing) = self
            .store
            .find_overlapping(
                request.role_id,
                request.permission_id,
                request.starts_at,
                request.expires_at,
            )
            .await?
        {
            return Err(AuthzError::Conflict(format!(
                "Overlapping time-based permission already exists (id {})",
                existing.id
            )));
        }

        let grant = self.store.create_grant(request, actor.user_id).await?;

        tracing::info!(
            grant_id = grant.id,
            role_id = grant.role_id,
            permission_id = grant.permission_id,
            expires_at = %grant.expires_at,
            "Time-based permission granted"
        );

        self.audit
            .record(
                AuditLogBuilder::new(organization_id, actions::TIME_BASED_PERMISSION_GRANTED)
                    .user(actor.user_id)
                    .entity("time_based_permission", grant.id.to_string())
                    .new_values(json!({
                        "role_id": grant.role_id,
                        "permission_id": grant.permission_id,
                        "starts_at": grant.starts_at,
                        "expires_at": grant.expires_at,
                        "reason": grant.reason,
                    }))
                    .build(),
            )
            .await;

        Ok(grant)
    }

    pub async fn list(
        &self,
        organization_id: Uuid,
        role_id: Option<i32>,
    ) -> Result<Vec<TimeBasedPermission>> {
        self.store.list_grants(organization_id, role_id).await
    }

    pub async fn revoke(&self, actor: &Principal, grant_id: i32) -> Result<TimeBasedPermission> {
        let grant = self
            .store
            .find_grant(grant_id)
            .await?
            .ok_or_else(|| AuthzError::NotFound(format!("Time-based permission {} not found", grant_id)))?;

        // Grants on another organization's role are invisible, not forbidden
        if !self.owns_role(grant.role_id, actor.organization_id).await? {
            return Err(AuthzError::NotFound(format!(
                "Time-based permission {} not found",
                grant_id
            )));
        }

        self.store.deactivate_grant(grant_id).await?;

        self.audit
            .record(
                AuditLogBuilder::new(actor.organization_id, actions::TIME_BASED_PERMISSION_REVOKED)
                    .user(actor.user_id)
                    .entity("time_based_permission", grant_id.to_string())
                    .old_values(json!({ "is_active": grant.is_active }))
                    .new_values(json!({ "is_active": false }))
                    .build(),
            )
            .await;

        Ok(TimeBasedPermission {
            is_active: false,
            ..grant
        })
    }

    /// Grants may only touch roles the organization owns. System roles are
    /// shared across tenants, so a grant on one would leak to all of them.
    async fn owns_role(&self, role_id: i32, organization_id: Uuid) -> Result<bool> {
        Ok(self
            .store
            .find_role(role_id, organization_id)
            .await?
            .is_some_and(|role| role.belongs_to(organization_id)))
    }

    /// Flip grants whose window has closed. Returns the number deactivated.
    pub async fn deactivate_expired(&self) -> Result<u64> {
        let count = self.store.deactivate_expired().await?;
        if count > 0 {
            tracing::info!(count, "Deactivated expired time-based permissions");
        }
        Ok(count)
    }
}
