mod common;

use async_trait::async_trait;
use common::*;
use oxrule_common::types::EngineKind;
use oxrule_server::app::{join_workers, spawn_workers};
use oxrule_server::worker::WorkerStats;
use oxrule_stream::{LogMessage, MemoryLog, MemoryPartitionReader, PartitionReader, StreamError};
use std::time::Duration;
use tokio::sync::watch;

const BACKOFF: Duration = Duration::from_millis(20);

fn event_json(latency_ms: i64) -> String {
    serde_json::to_string(&make_event(latency_ms)).unwrap()
}

/// Reader whose first `rejected` commits fail, as when the acknowledgement
/// never reaches the log.
struct RejectingReader {
    inner: MemoryPartitionReader,
    rejected: u32,
}

#[async_trait]
impl PartitionReader for RejectingReader {
    fn partition(&self) -> u32 {
        self.inner.partition()
    }

    async fn poll(&mut self) -> oxrule_stream::Result<Option<LogMessage>> {
        self.inner.poll().await
    }

    async fn commit(&mut self, message: &LogMessage) -> oxrule_stream::Result<()> {
        if self.rejected > 0 {
            self.rejected -= 1;
            return Err(StreamError::UnknownMessage {
                partition: message.partition,
                id: message.id.clone(),
            });
        }
        self.inner.commit(message).await
    }

    fn rewind(&mut self) {
        self.inner.rewind();
    }
}

#[tokio::test]
async fn evaluated_messages_are_committed() {
    let engine = build_engine(EngineKind::Errors);
    engine
        .repository
        .insert(scope(), vec![latency_rule("1", 300, vec![mail_action()])]);
    let log = MemoryLog::new(2);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handles = spawn_workers(log.readers(), engine.evaluator.clone(), BACKOFF, shutdown_rx);

    log.append(0, event_json(450));
    log.append(1, event_json(100));
    log.append(1, event_json(500));

    assert!(wait_for(|| log.pending(0) == 0 && log.pending(1) == 0).await);
    assert_eq!(log.committed(1), vec!["0", "1"]);
    assert_eq!(engine.publisher.messages("mail-alert-topic").len(), 2);

    shutdown_tx.send(true).unwrap();
    let stats = join_workers(handles).await;
    assert_eq!(stats.committed, 3);
}

#[tokio::test]
async fn partial_dispatch_failure_still_commits() {
    let engine = build_engine(EngineKind::Errors);
    engine.repository.insert(
        scope(),
        vec![latency_rule("1", 300, vec![mail_action(), chat_action()])],
    );
    engine.publisher.fail_topic("mail-alert-topic");
    let log = MemoryLog::new(1);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handles = spawn_workers(log.readers(), engine.evaluator.clone(), BACKOFF, shutdown_rx);

    let id = log.append(0, event_json(450));
    assert!(wait_for(|| log.pending(0) == 0).await);
    assert_eq!(log.deliveries(0, &id), 1);
    assert_eq!(engine.publisher.messages("chat-alert-topic").len(), 1);

    shutdown_tx.send(true).unwrap();
    assert_eq!(join_workers(handles).await.committed, 1);
}

#[tokio::test]
async fn undecodable_message_is_skipped_without_commit() {
    let engine = build_engine(EngineKind::Errors);
    let log = MemoryLog::new(1);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handles = spawn_workers(log.readers(), engine.evaluator.clone(), BACKOFF, shutdown_rx);

    log.append(0, "{not json");
    log.append(0, event_json(10));

    assert!(wait_for(|| log.committed(0) == vec!["1".to_string()]).await);
    assert_eq!(log.pending(0), 1);
    assert_eq!(log.deliveries(0, "0"), 1);

    shutdown_tx.send(true).unwrap();
    let stats = join_workers(handles).await;
    assert_eq!(
        stats,
        WorkerStats {
            committed: 1,
            skipped: 1,
            failed: 0
        }
    );
}

#[tokio::test]
async fn failed_evaluation_is_redelivered_until_it_succeeds() {
    let engine = build_engine(EngineKind::Errors);
    engine
        .repository
        .insert(scope(), vec![latency_rule("1", 300, vec![mail_action()])]);
    engine.repository.set_failing(true);
    let log = MemoryLog::new(1);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handles = spawn_workers(log.readers(), engine.evaluator.clone(), BACKOFF, shutdown_rx);

    let id = log.append(0, event_json(450));
    assert!(wait_for(|| log.deliveries(0, &id) >= 2).await);
    assert!(log.committed(0).is_empty());
    assert_eq!(engine.publisher.total(), 0);

    engine.repository.set_failing(false);
    assert!(wait_for(|| log.pending(0) == 0).await);
    assert_eq!(engine.publisher.messages("mail-alert-topic").len(), 1);

    shutdown_tx.send(true).unwrap();
    let stats = join_workers(handles).await;
    assert_eq!(stats.committed, 1);
    assert!(stats.failed >= 1);
}

#[tokio::test]
async fn partition_order_survives_a_redelivery() {
    let engine = build_engine(EngineKind::Errors);
    engine
        .repository
        .insert(scope(), vec![latency_rule("1", 0, vec![mail_action()])]);
    engine.repository.set_failing(true);
    let log = MemoryLog::new(1);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handles = spawn_workers(log.readers(), engine.evaluator.clone(), BACKOFF, shutdown_rx);

    for latency in [1, 2, 3] {
        log.append(0, event_json(latency));
    }
    assert!(wait_for(|| log.deliveries(0, "0") >= 2).await);
    engine.repository.set_failing(false);

    assert!(wait_for(|| engine.publisher.total() == 3).await);
    let latencies: Vec<i64> = engine
        .publisher
        .messages("mail-alert-topic")
        .iter()
        .map(|m| m["event"]["fields"]["latency_ms"].as_i64().unwrap())
        .collect();
    assert_eq!(latencies, vec![1, 2, 3]);
    assert_eq!(log.committed(0), vec!["0", "1", "2"]);

    shutdown_tx.send(true).unwrap();
    join_workers(handles).await;
}

#[tokio::test]
async fn shutdown_stops_idle_workers() {
    let engine = build_engine(EngineKind::Errors);
    let log = MemoryLog::new(3).with_block(Duration::from_secs(30));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handles = spawn_workers(log.readers(), engine.evaluator.clone(), BACKOFF, shutdown_rx);

    shutdown_tx.send(true).unwrap();
    let stats = tokio::time::timeout(Duration::from_secs(5), join_workers(handles))
        .await
        .unwrap();
    assert_eq!(stats, WorkerStats::default());
}

#[tokio::test]
async fn shutdown_interrupts_retry_backoff() {
    let engine = build_engine(EngineKind::Errors);
    engine.repository.set_failing(true);
    let log = MemoryLog::new(1);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handles = spawn_workers(
        log.readers(),
        engine.evaluator.clone(),
        Duration::from_secs(600),
        shutdown_rx,
    );

    log.append(0, event_json(450));
    assert!(wait_for(|| engine.repository.calls() >= 1).await);

    shutdown_tx.send(true).unwrap();
    let stats = tokio::time::timeout(Duration::from_secs(5), join_workers(handles))
        .await
        .unwrap();
    assert_eq!(stats.failed, 1);
    assert_eq!(log.pending(0), 1);
}

#[tokio::test]
async fn shutdown_lets_the_event_in_flight_finish_and_commit() {
    let engine = build_engine(EngineKind::Errors);
    engine
        .repository
        .insert(scope(), vec![latency_rule("1", 300, vec![mail_action()])]);
    engine.repository.hold();
    let log = MemoryLog::new(1);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handles = spawn_workers(log.readers(), engine.evaluator.clone(), BACKOFF, shutdown_rx);

    log.append(0, event_json(450));
    assert!(wait_for(|| engine.repository.calls() >= 1).await);

    shutdown_tx.send(true).unwrap();
    tokio::time::sleep(BACKOFF * 3).await;
    assert!(handles.iter().all(|h| !h.is_finished()));
    assert!(log.committed(0).is_empty());

    engine.repository.release();
    let stats = tokio::time::timeout(Duration::from_secs(5), join_workers(handles))
        .await
        .unwrap();
    assert_eq!(stats.committed, 1);
    assert_eq!(log.committed(0), vec!["0"]);
    assert_eq!(log.pending(0), 0);
    assert_eq!(engine.publisher.messages("mail-alert-topic").len(), 1);
}

#[tokio::test]
async fn rejected_commit_is_retried_after_redelivery() {
    let engine = build_engine(EngineKind::Errors);
    engine
        .repository
        .insert(scope(), vec![latency_rule("1", 300, vec![mail_action()])]);
    let log = MemoryLog::new(1);
    let reader = RejectingReader {
        inner: log.reader(0),
        rejected: 1,
    };
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handles = spawn_workers(vec![reader], engine.evaluator.clone(), BACKOFF, shutdown_rx);

    let first = log.append(0, event_json(450));
    let second = log.append(0, event_json(500));

    assert!(wait_for(|| log.pending(0) == 0).await);
    assert_eq!(log.deliveries(0, &first), 2);
    assert_eq!(log.deliveries(0, &second), 1);
    assert_eq!(log.committed(0), vec![first.clone(), second.clone()]);

    let latencies: Vec<i64> = engine
        .publisher
        .messages("mail-alert-topic")
        .iter()
        .map(|m| m["event"]["fields"]["latency_ms"].as_i64().unwrap())
        .collect();
    assert_eq!(latencies, vec![450, 450, 500]);

    shutdown_tx.send(true).unwrap();
    assert_eq!(join_workers(handles).await.committed, 2);
}
