use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Default)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AuditSeverity {
    #[default]
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for AuditSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditSeverity::Info => write!(f, "info"),
            AuditSeverity::Warning => write!(f, "warning"),
            AuditSeverity::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for AuditSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(AuditSeverity::Info),
            "warning" => Ok(AuditSeverity::Warning),
            "critical" => Ok(AuditSeverity::Critical),
            _ => Err(format!("Invalid audit severity: {}", s)),
        }
    }
}

/// Append-only audit record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditLog {
    pub id: i64,
    pub organization_id: Option<Uuid>,
    pub user_id: Option<Uuid>,

    pub action: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,

    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,

    pub ip_address: Option<String>,
    pub user_agent: Option<String>,

    pub metadata: Option<serde_json::Value>,
    pub severity: AuditSeverity,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateAuditLog {
    pub organization_id: Option<Uuid>,
    pub user_id: Option<Uuid>,

    pub action: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,

    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,

    pub ip_address: Option<String>,
    pub user_agent: Option<String>,

    pub metadata: Option<serde_json::Value>,
    pub severity: AuditSeverity,
}

/// Filters for listing an organization's audit trail
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AuditLogQuery {
    pub organization_id: Uuid,
    pub action: Option<String>,
    pub user_id: Option<Uuid>,
    pub severity: Option<AuditSeverity>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    #[validate(range(min = 1))]
    pub page: i64,
    #[validate(range(min = 1, max = 100))]
    pub limit: i64,
}

impl AuditLogQuery {
    pub fn new(organization_id: Uuid) -> Self {
        Self {
            organization_id,
            action: None,
            user_id: None,
            severity: None,
            from_date: None,
            to_date: None,
            page: 1,
            limit: 20,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1) * self.limit
    }
}

pub struct AuditLogBuilder {
    log: CreateAuditLog,
}

impl AuditLogBuilder {
    pub fn new(organization_id: Uuid, action: impl Into<String>) -> Self {
        Self {
            log: CreateAuditLog {
                organization_id: Some(organization_id),
                user_id: None,
                action: action.into(),
                entity_type: None,
                entity_id: None,
                old_values: None,
                new_values: None,
                ip_address: None,
                user_agent: None,
                metadata: None,
                severity: AuditSeverity::Info,
            },
        }
    }

    pub fn user(mut self, user_id: Uuid) -> Self {
        self.log.user_id = Some(user_id);
        self
    }

    pub fn entity(mut self, entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        self.log.entity_type = Some(entity_type.into());
        self.log.entity_id = Some(entity_id.into());
        self
    }

    pub fn old_values(mut self, values: serde_json::Value) -> Self {
        self.log.old_values = Some(values);
        self
    }

    pub fn new_values(mut self, values: serde_json::Value) -> Self {
        self.log.new_values = Some(values);
        self
    }

    pub fn ip_address(mut self, ip: Option<String>) -> Self {
        self.log.ip_address = ip;
        self
    }

    pub fn user_agent(mut self, ua: Option<String>) -> Self {
        self.log.user_agent = ua;
        self
    }

    pub fn metadata(mut self, data: serde_json::Value) -> Self {
        self.log.metadata = Some(data);
        self
    }

    pub fn severity(mut self, severity: AuditSeverity) -> Self {
        self.log.severity = severity;
        self
    }

    pub fn build(self) -> CreateAuditLog {
        self.log
    }
}

// Common action names
pub mod actions {
    pub const UNAUTHORIZED_ACCESS_ATTEMPT: &str = "unauthorized_access_attempt";
    pub const TIME_BASED_PERMISSION_GRANTED: &str = "time_based_permission.granted";
    pub const TIME_BASED_PERMISSION_REVOKED: &str = "time_based_permission.revoked";
    pub const CUSTOM_PERMISSION_CREATED: &str = "custom_permission.created";
    pub const CUSTOM_PERMISSION_UPDATED: &str = "custom_permission.updated";
    pub const CUSTOM_PERMISSION_DELETED: &str = "custom_permission.deleted";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults_to_info() {
        let org = Uuid::new_v4();
        let log = AuditLogBuilder::new(org, "role.updated").build();
        assert_eq!(log.organization_id, Some(org));
        assert_eq!(log.severity, AuditSeverity::Info);
        assert!(log.metadata.is_none());
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!("CRITICAL".parse::<AuditSeverity>().unwrap(), AuditSeverity::Critical);
        assert!("loud".parse::<AuditSeverity>().is_err());
    }

    #[test]
    fn test_query_offset() {
        let mut query = AuditLogQuery::new(Uuid::new_v4());
        assert_eq!(query.offset(), 0);
        query.page = 3;
        query.limit = 25;
        assert_eq!(query.offset(), 50);
    }
}
