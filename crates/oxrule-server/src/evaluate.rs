use crate::error::Result;
use oxrule_cache::RuleCache;
use oxrule_common::types::{Action, EngineKind, Event, Rule, RuleScope, UsedRule};
use oxrule_engine::{evaluate_rule, ConditionEvaluator};
use oxrule_notify::{AlertDispatcher, DispatchReport};
use oxrule_storage::{AuditRecord, AuditSink, RuleRepository};
use std::sync::Arc;

/// What happened to one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationOutcome {
    pub rules_evaluated: usize,
    pub matched: Vec<UsedRule>,
    pub dispatch: DispatchReport,
    pub audited: bool,
}

/// Per-event use case: resolve the scope's rules, evaluate every one of
/// them, dispatch the actions of the matches and audit the event if anything
/// matched.
pub struct RuleEvaluator {
    engine: EngineKind,
    cache: Arc<dyn RuleCache>,
    repository: Arc<dyn RuleRepository>,
    conditions: ConditionEvaluator,
    dispatcher: AlertDispatcher,
    audit: Arc<dyn AuditSink>,
}

impl RuleEvaluator {
    pub fn new(
        engine: EngineKind,
        cache: Arc<dyn RuleCache>,
        repository: Arc<dyn RuleRepository>,
        conditions: ConditionEvaluator,
        dispatcher: AlertDispatcher,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            engine,
            cache,
            repository,
            conditions,
            dispatcher,
            audit,
        }
    }

    pub fn engine(&self) -> EngineKind {
        self.engine
    }

    /// Runs one event through the pipeline.
    ///
    /// # Errors
    ///
    /// Only a repository failure on a cache miss is returned; the caller must
    /// leave the message uncommitted.
    pub async fn evaluate(&self, mut event: Event) -> Result<EvaluationOutcome> {
        let scope = event.scope();
        let rules = self.resolve_rules(&scope).await?;

        let mut outcome = EvaluationOutcome {
            rules_evaluated: rules.len(),
            ..Default::default()
        };
        let mut actions: Vec<Action> = Vec::new();

        // Every rule is evaluated so all matches contribute actions.
        for rule in &rules {
            if evaluate_rule(&self.conditions, &mut event, rule).await {
                tracing::info!(
                    rule_id = %rule.id,
                    rule_name = %rule.name,
                    scope = %scope,
                    "Rule matched"
                );
                outcome.matched.push(UsedRule::from(rule));
                actions.extend(rule.actions.iter().cloned());
            }
        }

        if outcome.matched.is_empty() {
            tracing::debug!(scope = %scope, rules = rules.len(), "No rule matched");
            return Ok(outcome);
        }

        outcome.dispatch = self.dispatcher.dispatch(&event, &actions).await;
        tracing::info!(
            scope = %scope,
            matched = outcome.matched.len(),
            sent = outcome.dispatch.sent,
            failed = outcome.dispatch.failed,
            dropped = outcome.dispatch.dropped,
            "Actions dispatched"
        );

        outcome.audited = self.write_audit(&event, &outcome.matched, actions).await;
        Ok(outcome)
    }

    async fn resolve_rules(&self, scope: &RuleScope) -> Result<Vec<Rule>> {
        if let Some(rules) = self.cache.get_rules(scope).await {
            return Ok(rules);
        }
        let rules = self.repository.find_rules(scope).await?;
        self.cache.set_rules(scope, &rules).await;
        Ok(rules)
    }

    async fn write_audit(&self, event: &Event, matched: &[UsedRule], actions: Vec<Action>) -> bool {
        let record = match AuditRecord::new(event, self.engine, matched.to_vec(), actions) {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(error = %e, "Failed to build audit record");
                return false;
            }
        };
        match self.audit.record(&record).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    tenant_id = %record.tenant_id,
                    service_name = %record.service_name,
                    error = %e,
                    "Failed to write audit log"
                );
                false
            }
        }
    }
}
