use async_trait::async_trait;
use oxrule_common::types::{Action, EngineKind, LogicNode, Rule, RuleScope};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

use crate::entities::{rule, service};
use crate::error::{Result, StorageError};
use crate::RuleRepository;

/// Read-only view over the `services` and `rules` tables for one engine
/// kind.
pub struct RuleStore {
    db: DatabaseConnection,
    engine: EngineKind,
}

impl RuleStore {
    pub fn new(db: DatabaseConnection, engine: EngineKind) -> Self {
        Self { db, engine }
    }

    pub async fn connect(db_url: &str, engine: EngineKind, run_migrations: bool) -> Result<Self> {
        let db = super::connect(db_url, run_migrations).await?;
        Ok(Self::new(db, engine))
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

fn to_rule(m: rule::Model, scope: &RuleScope) -> Result<Rule> {
    let decode = |reason: serde_json::Error| StorageError::Decode {
        entity: "rule",
        id: m.id.to_string(),
        reason: reason.to_string(),
    };
    let actions: Vec<Action> = serde_json::from_str(&m.actions_json).map_err(decode)?;
    let root_node: LogicNode = serde_json::from_str(&m.root_node_json).map_err(decode)?;
    Ok(Rule {
        id: m.id.to_string(),
        tenant_id: m.tenant_id,
        service_name: scope.service_name.clone(),
        name: m.name,
        actions,
        root_node,
    })
}

#[async_trait]
impl RuleRepository for RuleStore {
    async fn find_rules(&self, scope: &RuleScope) -> Result<Vec<Rule>> {
        let rows = rule::Entity::find()
            .inner_join(service::Entity)
            .filter(service::Column::TenantId.eq(scope.tenant_id.as_str()))
            .filter(service::Column::ServiceName.eq(scope.service_name.as_str()))
            .filter(service::Column::ProjectId.eq(scope.project_id.as_str()))
            .filter(rule::Column::Engine.eq(self.engine.as_str()))
            .filter(rule::Column::Enabled.eq(true))
            .order_by_asc(rule::Column::Id)
            .all(&self.db)
            .await?;

        let total = rows.len();
        let rules: Vec<Rule> = rows
            .into_iter()
            .filter_map(|m| match to_rule(m, scope) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    tracing::warn!(scope = %scope, error = %e, "Skipping undecodable rule");
                    None
                }
            })
            .collect();

        tracing::debug!(
            scope = %scope,
            engine = %self.engine,
            total,
            loaded = rules.len(),
            "Loaded rules from repository"
        );
        Ok(rules)
    }
}
