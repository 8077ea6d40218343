use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use mero_models::{AuditLog, AuditLogQuery, AuditSeverity};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::AppState;

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct QueryAuditLogsRequest {
    pub action: Option<String>,
    pub user_id: Option<Uuid>,
    pub severity: Option<AuditSeverity>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl QueryAuditLogsRequest {
    pub fn into_query(self, organization_id: Uuid) -> AuditLogQuery {
        let mut query = AuditLogQuery::new(organization_id);
        query.action = self.action.filter(|a| !a.is_empty());
        query.user_id = self.user_id;
        query.severity = self.severity;
        query.from_date = self.from;
        query.to_date = self.to;
        query.page = self.page.unwrap_or(1).max(1);
        query.limit = self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        query
    }
}

#[derive(Debug, Serialize)]
pub struct AuditLogsResponse {
    pub logs: Vec<AuditLog>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

/// Query the organization's audit trail
/// GET /api/audit-logs
pub async fn query_audit_logs(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Query(params): Query<QueryAuditLogsRequest>,
) -> Result<Json<AuditLogsResponse>, ApiError> {
    let query = params.into_query(auth_user.principal.organization_id);

    let (logs, total) = tokio::try_join!(
        state.audit_logs.query(&query),
        state.audit_logs.count(&query),
    )?;

    Ok(Json(AuditLogsResponse {
        logs,
        total,
        page: query.page,
        limit: query.limit,
    }))
}

/// Get a specific audit log by ID
/// GET /api/audit-logs/:id
pub async fn get_audit_log(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<AuditLog>, ApiError> {
    let log = state
        .audit_logs
        .get_by_id(auth_user.principal.organization_id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Audit log not found".to_string()))?;

    Ok(Json(log))
}
