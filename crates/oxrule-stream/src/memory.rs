use crate::error::{Result, StreamError};
use crate::{LogMessage, PartitionReader};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Default)]
struct PartitionState {
    payloads: Vec<String>,
    acked: Vec<bool>,
    deliveries: Vec<u32>,
}

struct Shared {
    partitions: Mutex<Vec<PartitionState>>,
    appended: Notify,
}

/// In-process partitioned log with the delivery rules of a single-consumer
/// group: entries stay pending until committed and a rewind redelivers
/// them in order.
#[derive(Clone)]
pub struct MemoryLog {
    shared: Arc<Shared>,
    block: Duration,
}

impl MemoryLog {
    pub fn new(partitions: u32) -> Self {
        let states = (0..partitions).map(|_| PartitionState::default()).collect();
        Self {
            shared: Arc::new(Shared {
                partitions: Mutex::new(states),
                appended: Notify::new(),
            }),
            block: Duration::from_millis(50),
        }
    }

    /// How long an empty poll waits for an append.
    pub fn with_block(mut self, block: Duration) -> Self {
        self.block = block;
        self
    }

    /// Appends a message and returns its id. Panics if `partition` is out of
    /// range.
    pub fn append(&self, partition: u32, payload: impl Into<String>) -> String {
        let id = {
            let mut partitions = lock(&self.shared);
            let state = &mut partitions[partition as usize];
            state.payloads.push(payload.into());
            state.acked.push(false);
            state.deliveries.push(0);
            (state.payloads.len() - 1).to_string()
        };
        self.shared.appended.notify_waiters();
        id
    }

    pub fn reader(&self, partition: u32) -> MemoryPartitionReader {
        MemoryPartitionReader {
            shared: self.shared.clone(),
            partition,
            next: 0,
            block: self.block,
        }
    }

    pub fn readers(&self) -> Vec<MemoryPartitionReader> {
        let count = lock(&self.shared).len() as u32;
        (0..count).map(|p| self.reader(p)).collect()
    }

    /// Ids committed on `partition`, in log order.
    pub fn committed(&self, partition: u32) -> Vec<String> {
        let partitions = lock(&self.shared);
        partitions[partition as usize]
            .acked
            .iter()
            .enumerate()
            .filter(|(_, acked)| **acked)
            .map(|(i, _)| i.to_string())
            .collect()
    }

    /// Number of uncommitted entries on `partition`.
    pub fn pending(&self, partition: u32) -> usize {
        let partitions = lock(&self.shared);
        partitions[partition as usize]
            .acked
            .iter()
            .filter(|acked| !**acked)
            .count()
    }

    /// How many times entry `id` of `partition` has been delivered.
    pub fn deliveries(&self, partition: u32, id: &str) -> u32 {
        let partitions = lock(&self.shared);
        id.parse::<usize>()
            .ok()
            .and_then(|i| partitions[partition as usize].deliveries.get(i).copied())
            .unwrap_or(0)
    }
}

fn lock(shared: &Shared) -> MutexGuard<'_, Vec<PartitionState>> {
    shared.partitions.lock().unwrap_or_else(|e| e.into_inner())
}

pub struct MemoryPartitionReader {
    shared: Arc<Shared>,
    partition: u32,
    next: usize,
    block: Duration,
}

impl MemoryPartitionReader {
    fn take_next(&mut self) -> Option<LogMessage> {
        let mut partitions = lock(&self.shared);
        let state = partitions.get_mut(self.partition as usize)?;
        let index = (self.next..state.payloads.len()).find(|&i| !state.acked[i])?;
        state.deliveries[index] += 1;
        self.next = index + 1;
        Some(LogMessage {
            partition: self.partition,
            id: index.to_string(),
            payload: state.payloads[index].clone(),
        })
    }
}

#[async_trait]
impl PartitionReader for MemoryPartitionReader {
    fn partition(&self) -> u32 {
        self.partition
    }

    async fn poll(&mut self) -> Result<Option<LogMessage>> {
        if let Some(message) = self.take_next() {
            return Ok(Some(message));
        }
        let _ = tokio::time::timeout(self.block, self.shared.appended.notified()).await;
        Ok(self.take_next())
    }

    async fn commit(&mut self, message: &LogMessage) -> Result<()> {
        let unknown = || StreamError::UnknownMessage {
            partition: self.partition,
            id: message.id.clone(),
        };
        let index: usize = message.id.parse().map_err(|_| unknown())?;
        let mut partitions = lock(&self.shared);
        let state = partitions
            .get_mut(self.partition as usize)
            .ok_or_else(unknown)?;
        match state.acked.get_mut(index) {
            Some(acked) if index < self.next => {
                *acked = true;
                Ok(())
            }
            _ => Err(unknown()),
        }
    }

    fn rewind(&mut self) {
        self.next = 0;
    }
}
