use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection};

use crate::entities::audit_log;
use crate::error::Result;
use crate::{AuditRecord, AuditSink};

/// Appends rows to `audit_logs`. Both engine kinds share the table and are
/// told apart by the `engine` column.
pub struct AuditStore {
    db: DatabaseConnection,
}

impl AuditStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn connect(db_url: &str, run_migrations: bool) -> Result<Self> {
        let db = super::connect(db_url, run_migrations).await?;
        Ok(Self::new(db))
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl AuditSink for AuditStore {
    async fn record(&self, record: &AuditRecord) -> Result<()> {
        let id = oxrule_common::id::next_id();
        let am = audit_log::ActiveModel {
            id: Set(id.clone()),
            tenant_id: Set(record.tenant_id.clone()),
            service_name: Set(record.service_name.clone()),
            project_id: Set(record.project_id.clone()),
            event_type: Set(record.event_type.clone()),
            timestamp: Set(record.timestamp.clone()),
            event_json: Set(record.event_json.clone()),
            used_rules: Set(serde_json::to_string(&record.used_rules)?),
            used_actions: Set(serde_json::to_string(&record.used_actions)?),
            language: Set(record.language.clone()),
            engine: Set(record.engine.to_string()),
            created_at: Set(Utc::now().fixed_offset()),
        };
        am.insert(&self.db).await?;
        tracing::debug!(
            id = %id,
            tenant_id = %record.tenant_id,
            service_name = %record.service_name,
            rules = record.used_rules.len(),
            "Audit row written"
        );
        Ok(())
    }
}
