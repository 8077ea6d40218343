use crate::error::Result;
use mero_models::{AuditLog, AuditLogQuery, CreateAuditLog};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

const AUDIT_COLUMNS: &str = r#"
    id, organization_id, user_id,
    action, entity_type, entity_id,
    old_values, new_values,
    ip_address, user_agent,
    metadata, severity,
    created_at
"#;

#[derive(Clone)]
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new audit log entry (immutable, append-only)
    pub async fn create(&self, log: &CreateAuditLog) -> Result<AuditLog> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            INSERT INTO audit_logs (
                organization_id, user_id,
                action, entity_type, entity_id,
                old_values, new_values,
                ip_address, user_agent,
                metadata, severity
            )
            "#,
        );

        builder.push_values(std::iter::once(log), |mut row, log| {
            row.push_bind(log.organization_id)
                .push_bind(log.user_id)
                .push_bind(&log.action)
                .push_bind(&log.entity_type)
                .push_bind(&log.entity_id)
                .push_bind(&log.old_values)
                .push_bind(&log.new_values)
                .push_bind(&log.ip_address)
                .push_bind(&log.user_agent)
                .push_bind(&log.metadata)
                .push_bind(log.severity.to_string());
        });
        builder.push(" RETURNING ");
        builder.push(AUDIT_COLUMNS);

        let audit_log = builder
            .build_query_as::<AuditLog>()
            .fetch_one(&self.pool)
            .await?;

        Ok(audit_log)
    }

    /// Query audit logs with filters, most recent first
    pub async fn query(&self, query: &AuditLogQuery) -> Result<Vec<AuditLog>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT ");
        builder.push(AUDIT_COLUMNS);
        builder.push(" FROM audit_logs WHERE organization_id = ");
        builder.push_bind(query.organization_id);
        push_filters(&mut builder, query);

        builder.push(" ORDER BY created_at DESC LIMIT ");
        builder.push_bind(query.limit);
        builder.push(" OFFSET ");
        builder.push_bind(query.offset());

        let logs = builder
            .build_query_as::<AuditLog>()
            .fetch_all(&self.pool)
            .await?;

        Ok(logs)
    }

    /// Number of rows matching the query's filters (paging ignored)
    pub async fn count(&self, query: &AuditLogQuery) -> Result<i64> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM audit_logs WHERE organization_id = ");
        builder.push_bind(query.organization_id);
        push_filters(&mut builder, query);

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    pub async fn get_by_id(&self, organization_id: Uuid, id: i64) -> Result<Option<AuditLog>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT ");
        builder.push(AUDIT_COLUMNS);
        builder.push(" FROM audit_logs WHERE organization_id = ");
        builder.push_bind(organization_id);
        builder.push(" AND id = ");
        builder.push_bind(id);

        let log = builder
            .build_query_as::<AuditLog>()
            .fetch_optional(&self.pool)
            .await?;

        Ok(log)
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &AuditLogQuery) {
    if let Some(action) = &query.action {
        builder.push(" AND action = ");
        builder.push_bind(action.clone());
    }

    if let Some(user_id) = query.user_id {
        builder.push(" AND user_id = ");
        builder.push_bind(user_id);
    }

    if let Some(severity) = query.severity {
        builder.push(" AND severity = ");
        builder.push_bind(severity.to_string());
    }

    if let Some(from_date) = query.from_date {
        builder.push(" AND created_at >= ");
        builder.push_bind(from_date);
    }

    if let Some(to_date) = query.to_date {
        builder.push(" AND created_at <= ");
        builder.push_bind(to_date);
    }
}
