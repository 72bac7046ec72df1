use crate::error::Result;
use crate::{partition_key, LogMessage, PartitionReader, StreamOptions};
use async_trait::async_trait;
use oxrule_notify::OutboundPublisher;
use redis::aio::ConnectionManager;
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use std::collections::VecDeque;

/// A topic's partitions on Redis Streams, read through one consumer group.
pub struct RedisStreamLog {
    client: redis::Client,
    options: StreamOptions,
}

impl RedisStreamLog {
    /// Opens the log and creates the consumer group on every partition that
    /// does not have it yet.
    pub async fn connect(url: &str, options: StreamOptions) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let log = Self { client, options };
        log.ensure_groups().await?;
        Ok(log)
    }

    pub fn options(&self) -> &StreamOptions {
        &self.options
    }

    async fn ensure_groups(&self) -> Result<()> {
        let mut conn = ConnectionManager::new(self.client.clone()).await?;
        for partition in 0..self.options.partitions {
            let key = partition_key(&self.options.topic, partition);
            let created: redis::RedisResult<()> = conn
                .xgroup_create_mkstream(&key, &self.options.group, "0")
                .await;
            match created {
                Ok(()) => {
                    tracing::info!(stream = %key, group = %self.options.group, "Created consumer group")
                }
                Err(e) if e.code() == Some("BUSYGROUP") => {
                    tracing::debug!(stream = %key, group = %self.options.group, "Consumer group exists")
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// One reader per partition this instance owns. Each gets its own
    /// connection since `XREADGROUP ... BLOCK` holds the connection while it
    /// waits.
    pub async fn readers(&self) -> Result<Vec<RedisPartitionReader>> {
        let owned = self.options.owned_partitions();
        let mut readers = Vec::with_capacity(owned.len());
        for partition in owned {
            let conn = ConnectionManager::new(self.client.clone()).await?;
            readers.push(RedisPartitionReader::new(conn, partition, &self.options));
        }
        Ok(readers)
    }
}

/// Consumer-group reader for one stream key.
///
/// Starts by draining this consumer's pending entries (`XREADGROUP ... 0`)
/// so messages delivered before a crash or a failed evaluation come back
/// first, then reads new entries with `>`.
pub struct RedisPartitionReader {
    conn: ConnectionManager,
    partition: u32,
    key: String,
    group: String,
    consumer: String,
    block_ms: usize,
    batch_size: usize,
    buffer: VecDeque<LogMessage>,
    pending_cursor: Option<String>,
}

impl RedisPartitionReader {
    fn new(conn: ConnectionManager, partition: u32, options: &StreamOptions) -> Self {
        Self {
            conn,
            partition,
            key: partition_key(&options.topic, partition),
            group: options.group.clone(),
            consumer: options.consumer.clone(),
            block_ms: usize::try_from(options.block.as_millis())
                .unwrap_or(usize::MAX)
                .max(1),
            batch_size: options.batch_size.max(1),
            buffer: VecDeque::new(),
            pending_cursor: Some("0".to_string()),
        }
    }

    /// Appends the reply's entries to the buffer; returns the last id seen.
    fn buffer_reply(&mut self, reply: Option<StreamReadReply>) -> Option<String> {
        let mut last = None;
        for stream in reply.map(|r| r.keys).unwrap_or_default() {
            for entry in stream.ids {
                // Trimmed entries come back from the pending list without fields.
                let payload = entry.get::<String>("payload").unwrap_or_default();
                last = Some(entry.id.clone());
                self.buffer.push_back(LogMessage {
                    partition: self.partition,
                    id: entry.id,
                    payload,
                });
            }
        }
        last
    }
}

#[async_trait]
impl PartitionReader for RedisPartitionReader {
    fn partition(&self) -> u32 {
        self.partition
    }

    async fn poll(&mut self) -> Result<Option<LogMessage>> {
        if let Some(message) = self.buffer.pop_front() {
            return Ok(Some(message));
        }

        if let Some(cursor) = self.pending_cursor.clone() {
            let options = StreamReadOptions::default()
                .group(&self.group, &self.consumer)
                .count(self.batch_size);
            let reply: Option<StreamReadReply> = self
                .conn
                .xread_options(&[self.key.as_str()], &[cursor.as_str()], &options)
                .await?;
            match self.buffer_reply(reply) {
                Some(last) => {
                    tracing::debug!(stream = %self.key, pending = self.buffer.len(), "Redelivering pending entries");
                    self.pending_cursor = Some(last);
                    return Ok(self.buffer.pop_front());
                }
                None => self.pending_cursor = None,
            }
        }

        let options = StreamReadOptions::default()
            .group(&self.group, &self.consumer)
            .count(self.batch_size)
            .block(self.block_ms);
        let reply: Option<StreamReadReply> = self
            .conn
            .xread_options(&[self.key.as_str()], &[">"], &options)
            .await?;
        self.buffer_reply(reply);
        Ok(self.buffer.pop_front())
    }

    async fn commit(&mut self, message: &LogMessage) -> Result<()> {
        let _: i64 = self
            .conn
            .xack(&self.key, &self.group, &[message.id.as_str()])
            .await?;
        Ok(())
    }

    fn rewind(&mut self) {
        self.buffer.clear();
        self.pending_cursor = Some("0".to_string());
    }
}

/// Publishes outbound alert messages as `XADD {topic} * payload <json>`.
#[derive(Clone)]
pub struct RedisPublisher {
    conn: ConnectionManager,
}

impl RedisPublisher {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl OutboundPublisher for RedisPublisher {
    async fn publish(&self, topic: &str, payload: &str) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        let id: String = conn.xadd(topic, "*", &[("payload", payload)]).await?;
        tracing::debug!(topic = %topic, id = %id, "Published outbound message");
        Ok(())
    }
}
