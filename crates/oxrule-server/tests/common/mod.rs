#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use oxrule_cache::{KvRepeatCounter, KvRuleCache, MemoryStore};
use oxrule_common::types::{
    Action, ActionType, Condition, EngineKind, Event, LogicNode, Operator, Rule, RuleScope,
};
use oxrule_engine::ConditionEvaluator;
use oxrule_notify::{AlertDispatcher, ChannelTopics, OutboundPublisher};
use oxrule_server::evaluate::RuleEvaluator;
use oxrule_storage::{AuditRecord, AuditSink, RuleRepository, StorageError};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Rule repository backed by a map, counting lookups. Lookups can be held
/// open until [`CountingRepository::release`] is called.
#[derive(Default)]
pub struct CountingRepository {
    rules: Mutex<HashMap<RuleScope, Vec<Rule>>>,
    calls: AtomicUsize,
    failing: AtomicBool,
    held: AtomicBool,
    released: Notify,
}

impl CountingRepository {
    pub fn insert(&self, scope: RuleScope, rules: Vec<Rule>) {
        self.rules.lock().unwrap().insert(scope, rules);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn hold(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.held.store(false, Ordering::SeqCst);
        self.released.notify_waiters();
    }
}

#[async_trait]
impl RuleRepository for CountingRepository {
    async fn find_rules(&self, scope: &RuleScope) -> oxrule_storage::Result<Vec<Rule>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        loop {
            let released = self.released.notified();
            if !self.held.load(Ordering::SeqCst) {
                break;
            }
            released.await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Db(sea_orm::DbErr::Custom(
                "connection refused".into(),
            )));
        }
        Ok(self
            .rules
            .lock()
            .unwrap()
            .get(scope)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct RecordingAudit {
    records: Mutex<Vec<AuditRecord>>,
    failing: AtomicBool,
}

impl RecordingAudit {
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl AuditSink for RecordingAudit {
    async fn record(&self, record: &AuditRecord) -> oxrule_storage::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Db(sea_orm::DbErr::Custom("disk full".into())));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Outbound publisher keeping every message, with per-topic failure
/// injection.
#[derive(Default)]
pub struct RecordingPublisher {
    sent: Mutex<Vec<(String, String)>>,
    failing_topics: Mutex<HashSet<String>>,
}

impl RecordingPublisher {
    pub fn fail_topic(&self, topic: &str) {
        self.failing_topics.lock().unwrap().insert(topic.to_string());
    }

    pub fn messages(&self, topic: &str) -> Vec<Value> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, payload)| serde_json::from_str(payload).unwrap())
            .collect()
    }

    pub fn total(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl OutboundPublisher for RecordingPublisher {
    async fn publish(&self, topic: &str, payload: &str) -> Result<()> {
        if self.failing_topics.lock().unwrap().contains(topic) {
            anyhow::bail!("write to {topic} rejected");
        }
        self.sent
            .lock()
            .unwrap()
            .push((topic.to_string(), payload.to_string()));
        Ok(())
    }
}

/// A fully wired evaluator over in-memory collaborators.
pub struct TestEngine {
    pub kv: Arc<MemoryStore>,
    pub cache: Arc<KvRuleCache>,
    pub repository: Arc<CountingRepository>,
    pub audit: Arc<RecordingAudit>,
    pub publisher: Arc<RecordingPublisher>,
    pub evaluator: Arc<RuleEvaluator>,
}

pub fn build_engine(engine: EngineKind) -> TestEngine {
    let kv = Arc::new(MemoryStore::new());
    let cache = Arc::new(KvRuleCache::new(kv.clone(), engine, Duration::from_secs(60)));
    let counter = Arc::new(KvRepeatCounter::new(kv.clone(), engine));
    let repository = Arc::new(CountingRepository::default());
    let audit = Arc::new(RecordingAudit::default());
    let publisher = Arc::new(RecordingPublisher::default());
    let dispatcher = AlertDispatcher::new(publisher.clone(), ChannelTopics::default());

    let evaluator = Arc::new(RuleEvaluator::new(
        engine,
        cache.clone(),
        repository.clone(),
        ConditionEvaluator::new(counter),
        dispatcher,
        audit.clone(),
    ));

    TestEngine {
        kv,
        cache,
        repository,
        audit,
        publisher,
        evaluator,
    }
}

pub fn scope() -> RuleScope {
    RuleScope::new("42", "checkout", "7")
}

pub fn make_event(latency_ms: i64) -> Event {
    let fields = json!({ "latency_ms": latency_ms });
    Event {
        tenant_id: "42".into(),
        service_name: "checkout".into(),
        project_id: "7".into(),
        environment: "prod".into(),
        event_type: "error".into(),
        error_message: "upstream timeout".into(),
        timestamp: "2024-05-01T10:00:00Z".into(),
        language: "go".into(),
        fields: fields.as_object().cloned().unwrap(),
        ..Default::default()
    }
}

pub fn make_rule(id: &str, root: LogicNode, actions: Vec<Action>) -> Rule {
    Rule {
        id: id.into(),
        tenant_id: "42".into(),
        service_name: "checkout".into(),
        name: format!("rule {id}"),
        actions,
        root_node: root,
    }
}

pub fn latency_rule(id: &str, threshold: i64, actions: Vec<Action>) -> Rule {
    make_rule(
        id,
        LogicNode::and(
            vec![Condition::new("fields.latency_ms", Operator::Gt, json!(threshold))],
            vec![],
        ),
        actions,
    )
}

pub fn mail_action() -> Action {
    Action::new(ActionType::Email, &[("email", "ops@example.com")])
}

pub fn chat_action() -> Action {
    Action::new(ActionType::Discord, &[("channel_id", "c-1")])
}

/// Polls `condition` until it holds or a few seconds pass.
pub async fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..300 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
