use crate::evaluate::RuleEvaluator;
use oxrule_common::types::Event;
use oxrule_stream::{LogMessage, PartitionReader};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Counters reported by a worker when it stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub committed: u64,
    /// Undecodable messages, skipped and left uncommitted.
    pub skipped: u64,
    /// Evaluations that failed and were left for redelivery.
    pub failed: u64,
}

/// Serial consumer of one partition.
///
/// A message is committed only after its evaluation succeeds. When either
/// the evaluation or the commit fails, the worker backs off and rewinds, so
/// the message is delivered again before anything newer.
pub struct IngestWorker<R> {
    reader: R,
    evaluator: Arc<RuleEvaluator>,
    retry_backoff: Duration,
    shutdown: watch::Receiver<bool>,
    stats: WorkerStats,
}

impl<R: PartitionReader> IngestWorker<R> {
    pub fn new(
        reader: R,
        evaluator: Arc<RuleEvaluator>,
        retry_backoff: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            reader,
            evaluator,
            retry_backoff,
            shutdown,
            stats: WorkerStats::default(),
        }
    }

    /// Consumes until the shutdown flag is raised. The message in hand is
    /// always finished first.
    pub async fn run(mut self) -> WorkerStats {
        let partition = self.reader.partition();
        tracing::info!(partition, engine = %self.evaluator.engine(), "Ingest worker started");

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            let polled = tokio::select! {
                changed = self.shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                polled = self.reader.poll() => polled,
            };

            match polled {
                Ok(Some(message)) => self.handle(message).await,
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(partition, error = %e, "Failed to read from message log");
                    self.back_off().await;
                }
            }
        }

        tracing::info!(
            partition,
            committed = self.stats.committed,
            skipped = self.stats.skipped,
            failed = self.stats.failed,
            "Ingest worker stopped"
        );
        self.stats
    }

    async fn handle(&mut self, message: LogMessage) {
        let event: Event = match serde_json::from_str(&message.payload) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(
                    partition = message.partition,
                    id = %message.id,
                    error = %e,
                    "Skipping undecodable event"
                );
                self.stats.skipped += 1;
                return;
            }
        };

        match self.evaluator.evaluate(event).await {
            Ok(_) => match self.reader.commit(&message).await {
                Ok(()) => self.stats.committed += 1,
                Err(e) => {
                    tracing::error!(
                        partition = message.partition,
                        id = %message.id,
                        error = %e,
                        "Failed to commit message, evaluating it again"
                    );
                    self.back_off().await;
                }
            },
            Err(e) => {
                tracing::error!(
                    partition = message.partition,
                    id = %message.id,
                    error = %e,
                    "Evaluation failed, message left for redelivery"
                );
                self.stats.failed += 1;
                self.back_off().await;
            }
        }
    }

    /// Waits out the retry backoff (cut short by shutdown) and rewinds to
    /// the oldest uncommitted message.
    async fn back_off(&mut self) {
        tokio::select! {
            _ = tokio::time::sleep(self.retry_backoff) => {}
            _ = self.shutdown.changed() => {}
        }
        self.reader.rewind();
    }
}
