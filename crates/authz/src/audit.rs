use crate::context::{Principal, RequestMeta};
use crate::permission_set::PermissionSet;
use crate::store::AuditSink;
use mero_models::audit::actions;
use mero_models::{AuditLogBuilder, AuditSeverity, CreateAuditLog};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// How audit entries are written relative to the request that produced them
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditMode {
    /// Awaited before the response is produced; failures are logged
    #[default]
    Inline,
    /// Spawned on the runtime, off the response path
    Background,
}

/// Best-effort audit writer.
///
/// `record` never fails: a write error is logged and dropped, so it cannot
/// change the outcome of the request that triggered it.
#[derive(Clone)]
pub struct AuditDispatcher {
    sink: Arc<dyn AuditSink>,
    mode: AuditMode,
}

impl AuditDispatcher {
    pub fn new(sink: Arc<dyn AuditSink>, mode: AuditMode) -> Self {
        Self { sink, mode }
    }

    pub async fn record(&self, entry: CreateAuditLog) {
        match self.mode {
            AuditMode::Inline => write_entry(self.sink.as_ref(), entry).await,
            AuditMode::Background => {
                let sink = Arc::clone(&self.sink);
                tokio::spawn(async move {
                    write_entry(sink.as_ref(), entry).await;
                });
            }
        }
    }
}

async fn write_entry(sink: &dyn AuditSink, entry: CreateAuditLog) {
    let action = entry.action.clone();
    if let Err(e) = sink.append(entry).await {
        tracing::error!(action = %action, error = %e, "Failed to write audit log entry");
    }
}

/// Audit entry for a denied permission check
pub fn denial_entry(
    principal: &Principal,
    required: &[String],
    granted: &PermissionSet,
    missing: &[String],
    meta: &RequestMeta,
) -> CreateAuditLog {
    AuditLogBuilder::new(principal.organization_id, actions::UNAUTHORIZED_ACCESS_ATTEMPT)
        .user(principal.user_id)
        .entity("permission", required.join(","))
        .new_values(json!({
            "requested_permissions": required,
            "user_permissions": granted.to_vec(),
            "endpoint": meta.endpoint,
            "method": meta.method,
        }))
        .ip_address(meta.ip.clone())
        .user_agent(meta.user_agent.clone())
        .metadata(json!({ "missing_permissions": missing }))
        .severity(AuditSeverity::Critical)
        .build()
}
