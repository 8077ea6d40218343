use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use mero_authz::{AuthzError, RequestContext, ScopeSelector};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckPermissionsQuery {
    /// Comma-separated permission slugs
    pub permissions: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CheckPermissionsResponse {
    pub allowed: bool,
    pub missing: Vec<String>,
}

pub fn parse_permission_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Check the caller's permissions inside an app
/// GET /api/apps/:app_slug/permissions/check?permissions=a,b
pub async fn check_permissions(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(app_slug): Path<String>,
    Query(params): Query<CheckPermissionsQuery>,
) -> Result<Json<CheckPermissionsResponse>, ApiError> {
    let required = parse_permission_list(&params.permissions);
    if required.is_empty() {
        return Err(ApiError::BadRequest(
            "At least one permission is required".to_string(),
        ));
    }

    let ctx = ctx.with_scope(ScopeSelector::app_slug(app_slug));

    match state.guard.authorize(&ctx, &required).await {
        Ok(_) => Ok(Json(CheckPermissionsResponse {
            allowed: true,
            missing: Vec::new(),
        })),
        Err(AuthzError::InsufficientPermissions { missing }) => {
            Ok(Json(CheckPermissionsResponse {
                allowed: false,
                missing,
            }))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_permission_list() {
        assert_eq!(
            parse_permission_list(" boards.view, boards.create,,"),
            vec!["boards.view".to_string(), "boards.create".to_string()]
        );
        assert!(parse_permission_list(" , ").is_empty());
    }
}
