//! Partitioned, at-least-once message log with consumer-group semantics.
//!
//! A topic with `N` partitions is stored as the Redis streams
//! `{topic}:0` .. `{topic}:{N-1}`. Each engine worker owns one
//! [`PartitionReader`]; a message stays pending in the consumer group until
//! it is committed, and [`PartitionReader::rewind`] makes the reader deliver
//! its pending messages again, in order, before any new ones.
//!
//! Partitions are split between engine instances by index: instance `i` of
//! `n` reads every partition `p` with `p % n == i`, so no partition ever has
//! two readers.

pub mod error;
pub mod memory;
pub mod redis_log;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use std::time::Duration;

pub use error::{Result, StreamError};
pub use memory::{MemoryLog, MemoryPartitionReader};
pub use redis_log::{RedisPartitionReader, RedisPublisher, RedisStreamLog};

/// One delivered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    pub partition: u32,
    /// Position in the partition, e.g. a Redis stream entry id.
    pub id: String,
    pub payload: String,
}

/// Consumer-group reader bound to one partition.
#[async_trait]
pub trait PartitionReader: Send {
    fn partition(&self) -> u32;

    /// Next message in partition order. Waits up to the configured block
    /// timeout and returns `None` if nothing arrived.
    async fn poll(&mut self) -> Result<Option<LogMessage>>;

    /// Marks `message` as processed; it will not be delivered again.
    async fn commit(&mut self, message: &LogMessage) -> Result<()>;

    /// Forgets buffered messages so the next polls start again from the
    /// oldest uncommitted one.
    fn rewind(&mut self);
}

/// Where a topic lives and how it is read.
#[derive(Debug, Clone)]
pub struct StreamOptions {
    pub topic: String,
    pub partitions: u32,
    pub group: String,
    pub consumer: String,
    pub block: Duration,
    pub batch_size: usize,
    /// This instance's index among `instance_count` engine instances.
    pub instance_index: u32,
    pub instance_count: u32,
}

impl StreamOptions {
    /// Partitions read by this instance, in ascending order.
    pub fn owned_partitions(&self) -> Vec<u32> {
        let count = self.instance_count.max(1);
        (0..self.partitions)
            .filter(|p| p % count == self.instance_index)
            .collect()
    }
}

/// Stream key of one partition of `topic`.
pub fn partition_key(topic: &str, partition: u32) -> String {
    format!("{topic}:{partition}")
}
