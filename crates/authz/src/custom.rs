use crate::audit::AuditDispatcher;
use crate::context::Principal;
use crate::error::{AuthzError, Result};
use crate::store::CustomPermissionStore;
use mero_models::audit::actions;
use mero_models::{
    AuditLogBuilder, CreateCustomPermission, CustomPermission, UpdateCustomPermission,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Organization-defined permissions.
///
/// Callers are expected to have passed the permission guard for the
/// operation (`roles.manage` for mutations, `roles.view` for listing).
#[derive(Clone)]
pub struct CustomPermissionService {
    store: Arc<dyn CustomPermissionStore>,
    audit: AuditDispatcher,
}

impl CustomPermissionService {
    pub fn new(store: Arc<dyn CustomPermissionStore>, audit: AuditDispatcher) -> Self {
        Self { store, audit }
    }

    pub async fn create(
        &self,
        actor: &Principal,
        request: CreateCustomPermission,
    ) -> Result<CustomPermission> {
        let request = request.normalized();
        request
            .validate()
            .map_err(|e| AuthzError::Validation(e.to_string()))?;

        let organization_id = actor.organization_id;

        if self.store.slug_taken(organization_id, &request.slug).await? {
            return Err(AuthzError::Conflict(format!(
                "Permission slug '{}' already exists",
                request.slug
            )));
        }

        let permission = self
            .store
            .create_custom(organization_id, request, actor.user_id)
            .await?;

        tracing::info!(
            permission_id = permission.id,
            slug = %permission.slug,
            "Custom permission created"
        );

        self.audit
            .record(
                AuditLogBuilder::new(organization_id, actions::CUSTOM_PERMISSION_CREATED)
                    .user(actor.user_id)
                    .entity("custom_permission", permission.id.to_string())
                    .new_values(snapshot(&permission))
                    .build(),
            )
            .await;

        Ok(permission)
    }

    pub async fn list(
        &self,
        organization_id: Uuid,
        category: Option<String>,
    ) -> Result<Vec<CustomPermission>> {
        self.store.list_custom(organization_id, category).await
    }

    pub async fn update(
        &self,
        actor: &Principal,
        id: i32,
        changes: UpdateCustomPermission,
    ) -> Result<CustomPermission> {
        changes
            .validate()
            .map_err(|e| AuthzError::Validation(e.to_string()))?;

        let organization_id = actor.organization_id;
        let existing = self
            .store
            .find_custom(organization_id, id)
            .await?
            .ok_or_else(|| not_found(id))?;

        let updated = self
            .store
            .update_custom(organization_id, id, changes)
            .await?
            .ok_or_else(|| not_found(id))?;

        self.audit
            .record(
                AuditLogBuilder::new(organization_id, actions::CUSTOM_PERMISSION_UPDATED)
                    .user(actor.user_id)
                    .entity("custom_permission", id.to_string())
                    .old_values(snapshot(&existing))
                    .new_values(snapshot(&updated))
                    .build(),
            )
            .await;

        Ok(updated)
    }

    pub async fn delete(&self, actor: &Principal, id: i32) -> Result<()> {
        let organization_id = actor.organization_id;
        let existing = self
            .store
            .find_custom(organization_id, id)
            .await?
            .ok_or_else(|| not_found(id))?;

        if !self.store.delete_custom(organization_id, id).await? {
            return Err(not_found(id));
        }

        tracing::info!(permission_id = id, slug = %existing.slug, "Custom permission deleted");

        self.audit
            .record(
                AuditLogBuilder::new(organization_id, actions::CUSTOM_PERMISSION_DELETED)
                    .user(actor.user_id)
                    .entity("custom_permission", id.to_string())
                    .old_values(snapshot(&existing))
                    .build(),
            )
            .await;

        Ok(())
    }
}

fn not_found(id: i32) -> AuthzError {
    AuthzError::NotFound(format!("Custom permission {} not found", id))
}

fn snapshot(permission: &CustomPermission) -> serde_json::Value {
    json!({
        "name": permission.name,
        "slug": permission.slug,
        "description": permission.description,
        "category": permission.category,
        "is_active": permission.is_active,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditMode;
    use crate::store::{MockAuditSink, MockCustomPermissionStore};
    use chrono::Utc;
    use mockall::predicate::eq;

    fn actor() -> Principal {
        Principal {
            user_id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
        }
    }

    fn stored(id: i32, organization_id: Uuid, slug: &str) -> CustomPermission {
        let now = Utc::now();
        CustomPermission {
            id,
            organization_id,
            name: "Archive boards".to_string(),
            slug: slug.to_string(),
            description: None,
            category: "custom".to_string(),
            is_active: true,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn create_request(slug: &str) -> CreateCustomPermission {
        CreateCustomPermission {
            name: "Archive boards".to_string(),
            slug: slug.to_string(),
            description: Some("Move boards to the archive".to_string()),
            category: None,
        }
    }

    fn service(store: MockCustomPermissionStore, audit: MockAuditSink) -> CustomPermissionService {
        CustomPermissionService::new(
            Arc::new(store),
            AuditDispatcher::new(Arc::new(audit), AuditMode::Inline),
        )
    }

    #[tokio::test]
    async fn test_create_lowercases_slug_and_audits() {
        let actor = actor();
        let org = actor.organization_id;

        let mut store = MockCustomPermissionStore::new();
        store
            .expect_slug_taken()
            .withf(move |o, slug| *o == org && slug == "boards.archive")
            .times(1)
            .returning(|_, _| Ok(false));
        store
            .expect_create_custom()
            .withf(move |o, req, by| *o == org && req.slug == "boards.archive" && *by == actor.user_id)
            .times(1)
            .returning(|o, req, _| Ok(stored(11, o, &req.slug)));

        let mut audit = MockAuditSink::new();
        audit
            .expect_append()
            .withf(|entry| {
                entry.action == "custom_permission.created"
                    && entry.entity_id.as_deref() == Some("11")
            })
            .times(1)
            .returning(|_| Ok(()));

        let created = service(store, audit)
            .create(&actor, create_request("Boards.Archive"))
            .await
            .unwrap();
        assert_eq!(created.slug, "boards.archive");
    }

    #[tokio::test]
    async fn test_create_duplicate_slug_is_conflict() {
        let mut store = MockCustomPermissionStore::new();
        store
            .expect_slug_taken()
            .times(1)
            .returning(|_, _| Ok(true));
        store.expect_create_custom().never();

        let mut audit = MockAuditSink::new();
        audit.expect_append().never();

        let err = service(store, audit)
            .create(&actor(), create_request("boards.view"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_create_invalid_slug_skips_store() {
        let err = service(MockCustomPermissionStore::new(), MockAuditSink::new())
            .create(&actor(), create_request("boards archive"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_records_old_and_new_values() {
        let actor = actor();
        let org = actor.organization_id;

        let mut store = MockCustomPermissionStore::new();
        store
            .expect_find_custom()
            .with(eq(org), eq(11))
            .times(1)
            .returning(|o, id| Ok(Some(stored(id, o, "boards.archive"))));
        store
            .expect_update_custom()
            .times(1)
            .returning(|o, id, changes| {
                let mut updated = stored(id, o, "boards.archive");
                updated.name = changes.name.unwrap_or(updated.name);
                Ok(Some(updated))
            });

        let mut audit = MockAuditSink::new();
        audit
            .expect_append()
            .withf(|entry| {
                entry.action == "custom_permission.updated"
                    && entry.old_values.as_ref().is_some_and(|v| v["name"] == "Archive boards")
                    && entry.new_values.as_ref().is_some_and(|v| v["name"] == "Shelve boards")
            })
            .times(1)
            .returning(|_| Ok(()));

        let updated = service(store, audit)
            .update(
                &actor,
                11,
                UpdateCustomPermission {
                    name: Some("Shelve boards".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Shelve boards");
    }

    #[tokio::test]
    async fn test_update_of_other_tenant_row_is_not_found() {
        let mut store = MockCustomPermissionStore::new();
        store.expect_find_custom().times(1).returning(|_, _| Ok(None));
        store.expect_update_custom().never();

        let err = service(store, MockAuditSink::new())
            .update(&actor(), 11, UpdateCustomPermission::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_removes_and_audits() {
        let actor = actor();

        let mut store = MockCustomPermissionStore::new();
        store
            .expect_find_custom()
            .times(1)
            .returning(|o, id| Ok(Some(stored(id, o, "boards.archive"))));
        store
            .expect_delete_custom()
            .with(eq(actor.organization_id), eq(11))
            .times(1)
            .returning(|_, _| Ok(true));

        let mut audit = MockAuditSink::new();
        audit
            .expect_append()
            .withf(|entry| {
                entry.action == "custom_permission.deleted"
                    && entry.old_values.as_ref().is_some_and(|v| v["slug"] == "boards.archive")
            })
            .times(1)
            .returning(|_| Ok(()));

        service(store, audit).delete(&actor, 11).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let mut store = MockCustomPermissionStore::new();
        store.expect_find_custom().times(1).returning(|_, _| Ok(None));
        store.expect_delete_custom().never();

        let err = service(store, MockAuditSink::new())
            .delete(&actor(), 11)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::NotFound(_)));
    }
}
