use crate::config::EngineConfig;
use crate::evaluate::RuleEvaluator;
use crate::worker::{IngestWorker, WorkerStats};
use anyhow::{Context, Result};
use oxrule_cache::{KvRepeatCounter, KvRuleCache, KvStore, RedisStore};
use oxrule_engine::ConditionEvaluator;
use oxrule_notify::AlertDispatcher;
use oxrule_storage::{AuditStore, RuleStore};
use oxrule_stream::{PartitionReader, RedisPublisher, RedisStreamLog};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Connects every collaborator named in `config` and assembles the
/// evaluator. Any connection failure here is fatal for the process.
pub async fn build_evaluator(config: &EngineConfig) -> Result<Arc<RuleEvaluator>> {
    let kv: Arc<dyn KvStore> = Arc::new(
        RedisStore::connect(&config.redis.url)
            .await
            .context("failed to connect to key-value store")?,
    );
    let cache = Arc::new(KvRuleCache::new(kv.clone(), config.engine, config.rules_ttl()));
    let counter = Arc::new(KvRepeatCounter::new(kv, config.engine));

    let rules = RuleStore::connect(
        &config.database.rules_url,
        config.engine,
        config.database.run_migrations,
    )
    .await
    .context("failed to connect to rule database")?;
    let audit = AuditStore::connect(&config.database.audit_url, config.database.run_migrations)
        .await
        .context("failed to connect to audit database")?;

    let publisher = RedisPublisher::connect(&config.stream.url)
        .await
        .context("failed to connect outbound publisher")?;
    let dispatcher = AlertDispatcher::new(Arc::new(publisher), config.dispatch.clone());

    Ok(Arc::new(RuleEvaluator::new(
        config.engine,
        cache,
        Arc::new(rules),
        ConditionEvaluator::new(counter),
        dispatcher,
        Arc::new(audit),
    )))
}

/// Opens the source topic and returns one reader per partition.
pub async fn open_source(config: &EngineConfig) -> Result<RedisStreamLog> {
    let options = config.stream_options();
    tracing::info!(
        topic = %options.topic,
        partitions = options.partitions,
        owned = ?options.owned_partitions(),
        group = %options.group,
        consumer = %options.consumer,
        "Opening source topic"
    );
    RedisStreamLog::connect(&config.stream.url, options)
        .await
        .context("failed to open source topic")
}

/// Spawns one worker task per reader.
pub fn spawn_workers<R>(
    readers: Vec<R>,
    evaluator: Arc<RuleEvaluator>,
    retry_backoff: Duration,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<WorkerStats>>
where
    R: PartitionReader + 'static,
{
    readers
        .into_iter()
        .map(|reader| {
            let worker = IngestWorker::new(reader, evaluator.clone(), retry_backoff, shutdown.clone());
            tokio::spawn(worker.run())
        })
        .collect()
}

/// Waits for every worker and sums their stats.
pub async fn join_workers(handles: Vec<JoinHandle<WorkerStats>>) -> WorkerStats {
    let mut total = WorkerStats::default();
    for handle in handles {
        match handle.await {
            Ok(stats) => {
                total.committed += stats.committed;
                total.skipped += stats.skipped;
                total.failed += stats.failed;
            }
            Err(e) => tracing::error!(error = %e, "Ingest worker panicked"),
        }
    }
    total
}
