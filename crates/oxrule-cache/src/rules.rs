use crate::key_segment;
use crate::store::KvStore;
use async_trait::async_trait;
use oxrule_common::types::{EngineKind, Rule, RuleScope};
use std::sync::Arc;
use std::time::Duration;

/// Read-through cache of the rule set for one scope.
///
/// `None` from [`RuleCache::get_rules`] means "not cached" and sends the
/// caller to the repository; `Some(vec![])` is a cached empty rule set.
#[async_trait]
pub trait RuleCache: Send + Sync {
    /// Looks up the cached rules for `scope`. Lookup or decode failures are
    /// logged and reported as a miss.
    async fn get_rules(&self, scope: &RuleScope) -> Option<Vec<Rule>>;

    /// Stores `rules` for `scope`. Failures are logged and otherwise ignored.
    async fn set_rules(&self, scope: &RuleScope, rules: &[Rule]);
}

/// [`RuleCache`] storing each scope's rules as one JSON blob with a fixed
/// TTL under `rules-{engine}:{tenant}:{service}:{project}`, with `:` and `%`
/// escaped inside each part.
pub struct KvRuleCache {
    store: Arc<dyn KvStore>,
    engine: EngineKind,
    ttl: Duration,
}

impl KvRuleCache {
    pub fn new(store: Arc<dyn KvStore>, engine: EngineKind, ttl: Duration) -> Self {
        Self { store, engine, ttl }
    }

    pub fn key(&self, scope: &RuleScope) -> String {
        format!(
            "rules-{}:{}:{}:{}",
            self.engine,
            key_segment(&scope.tenant_id),
            key_segment(&scope.service_name),
            key_segment(&scope.project_id)
        )
    }
}

#[async_trait]
impl RuleCache for KvRuleCache {
    async fn get_rules(&self, scope: &RuleScope) -> Option<Vec<Rule>> {
        let key = self.key(scope);
        let blob = match self.store.get(&key).await {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                tracing::debug!(key = %key, "Rule cache miss");
                return None;
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Rule cache lookup failed, falling back to repository");
                return None;
            }
        };

        match serde_json::from_str::<Vec<Rule>>(&blob) {
            Ok(rules) => {
                tracing::debug!(key = %key, count = rules.len(), "Rule cache hit");
                Some(rules)
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cached rule set is undecodable, ignoring");
                None
            }
        }
    }

    async fn set_rules(&self, scope: &RuleScope, rules: &[Rule]) {
        let key = self.key(scope);
        let blob = match serde_json::to_string(rules) {
            Ok(blob) => blob,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to encode rule set for cache");
                return;
            }
        };
        if let Err(e) = self.store.set_ex(&key, &blob, self.ttl).await {
            tracing::warn!(key = %key, error = %e, "Failed to write rule cache");
        }
    }
}
