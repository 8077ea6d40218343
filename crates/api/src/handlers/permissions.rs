use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use mero_authz::ScopeSelector;
use mero_models::{
    CreateCustomPermission, CustomPermission, GrantTimeBasedPermission, TimeBasedPermission,
    UpdateCustomPermission,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct MyPermissionsResponse {
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub email: String,
    pub role_id: i32,
    pub base_role_id: i32,
    pub is_owner: bool,
    /// Empty for owners, who are not subject to granular checks
    pub permissions: Vec<String>,
}

/// Effective permissions of the caller, optionally scoped to an app
/// GET /api/permissions/me?appId=..|appSlug=..
pub async fn my_permissions(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<MyPermissionsResponse>, ApiError> {
    let principal = auth_user.principal;
    let scope = ScopeSelector::from_sources(&HashMap::new(), &query, None);

    let access = state.guard.resolve(&principal, &scope).await?;

    Ok(Json(MyPermissionsResponse {
        user_id: principal.user_id,
        organization_id: principal.organization_id,
        email: auth_user.email,
        role_id: access.role_id(),
        base_role_id: access.membership().member.role_id,
        is_owner: access.is_owner(),
        permissions: access.permissions().map(|p| p.to_vec()).unwrap_or_default(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct ListGrantsQuery {
    pub role_id: Option<i32>,
}

/// List time-based grants on the organization's roles
/// GET /api/permissions/time-based
pub async fn list_time_based(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Query(params): Query<ListGrantsQuery>,
) -> Result<Json<Vec<TimeBasedPermission>>, ApiError> {
    let grants = state
        .grants
        .list(auth_user.principal.organization_id, params.role_id)
        .await?;

    Ok(Json(grants))
}

/// Grant a permission to a role for a bounded window
/// POST /api/permissions/time-based
pub async fn grant_time_based(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Json(request): Json<GrantTimeBasedPermission>,
) -> Result<(StatusCode, Json<TimeBasedPermission>), ApiError> {
    let grant = state.grants.grant(&auth_user.principal, request).await?;

    Ok((StatusCode::CREATED, Json(grant)))
}

/// Revoke a time-based grant
/// DELETE /api/permissions/time-based/:id
pub async fn revoke_time_based(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> Result<Json<TimeBasedPermission>, ApiError> {
    let grant = state.grants.revoke(&auth_user.principal, id).await?;

    Ok(Json(grant))
}

#[derive(Debug, Deserialize)]
pub struct ListCustomQuery {
    pub category: Option<String>,
}

/// List the organization's custom permissions
/// GET /api/permissions/custom
pub async fn list_custom(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Query(params): Query<ListCustomQuery>,
) -> Result<Json<Vec<CustomPermission>>, ApiError> {
    let permissions = state
        .custom_permissions
        .list(auth_user.principal.organization_id, params.category)
        .await?;

    Ok(Json(permissions))
}

/// Define a permission owned by the organization
/// POST /api/permissions/custom
pub async fn create_custom(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Json(request): Json<CreateCustomPermission>,
) -> Result<(StatusCode, Json<CustomPermission>), ApiError> {
    let permission = state
        .custom_permissions
        .create(&auth_user.principal, request)
        .await?;

    Ok((StatusCode::CREATED, Json(permission)))
}

/// PUT /api/permissions/custom/:id
pub async fn update_custom(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateCustomPermission>,
) -> Result<Json<CustomPermission>, ApiError> {
    let permission = state
        .custom_permissions
        .update(&auth_user.principal, id, request)
        .await?;

    Ok(Json(permission))
}

/// DELETE /api/permissions/custom/:id
pub async fn delete_custom(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    state
        .custom_permissions
        .delete(&auth_user.principal, id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
