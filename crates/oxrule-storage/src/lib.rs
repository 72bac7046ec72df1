//! Relational side of the rule engine: the read-only rule repository and the
//! best-effort audit sink, both on SeaORM.
//!
//! The engine only reads rules. They are authored elsewhere and looked up by
//! scope; [`store::RuleStore`] returns the enabled rules of one engine kind.
//! Audit rows are written by [`store::AuditStore`] for events that matched
//! at least one rule.

pub mod entities;
pub mod error;
pub mod store;


use async_trait::async_trait;
use oxrule_common::types::{Action, EngineKind, Event, Rule, RuleScope, UsedRule};
use serde::Serialize;

pub use error::{Result, StorageError};
pub use store::{AuditStore, RuleStore};

/// Authoritative source of rules for a scope.
#[async_trait]
pub trait RuleRepository: Send + Sync {
    /// Returns every rule of the configured engine kind scoped to
    /// `(tenant, service, project)`, ordered by id. An empty vector means the
    /// scope has no rules.
    ///
    /// # Errors
    ///
    /// Fails when the database cannot be queried. Individual rows that fail
    /// to decode are skipped, not reported.
    async fn find_rules(&self, scope: &RuleScope) -> Result<Vec<Rule>>;
}

/// Destination of audit rows.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: &AuditRecord) -> Result<()>;
}

/// One audit row: the evaluated event plus what it triggered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRecord {
    pub tenant_id: String,
    pub service_name: String,
    pub project_id: String,
    pub event_type: String,
    pub timestamp: String,
    /// The event as evaluated, including `repeat_count`.
    pub event_json: String,
    pub used_rules: Vec<UsedRule>,
    pub used_actions: Vec<Action>,
    pub language: String,
    pub engine: EngineKind,
}

impl AuditRecord {
    pub fn new(
        event: &Event,
        engine: EngineKind,
        used_rules: Vec<UsedRule>,
        used_actions: Vec<Action>,
    ) -> Result<Self> {
        Ok(Self {
            tenant_id: event.tenant_id.clone(),
            service_name: event.service_name.clone(),
            project_id: event.project_id.clone(),
            event_type: event.event_type.clone(),
            timestamp: event.timestamp.clone(),
            event_json: serde_json::to_string(event)?,
            used_rules,
            used_actions,
            language: event.language.clone(),
            engine,
        })
    }
}
