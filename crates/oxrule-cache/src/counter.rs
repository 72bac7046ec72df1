use crate::key_segment;
use crate::store::KvStore;
use anyhow::Result;
use async_trait::async_trait;
use oxrule_common::types::{EngineKind, Event, Rule};
use oxrule_engine::RepeatCounter;
use std::sync::Arc;
use std::time::Duration;

/// Fixed-window repeat counter on the key-value store's atomic increment.
///
/// The first increment of a key returns 1 and arms the window in the same
/// atomic step; later increments keep the original expiry, so the count
/// resets only when the key expires. A burst straddling the boundary is
/// split across two windows.
pub struct KvRepeatCounter {
    store: Arc<dyn KvStore>,
    engine: EngineKind,
}

impl KvRepeatCounter {
    pub fn new(store: Arc<dyn KvStore>, engine: EngineKind) -> Self {
        Self { store, engine }
    }

    pub fn key(&self, event: &Event, rule: &Rule) -> String {
        format!(
            "repeat-{}:{}:{}:{}:{}",
            self.engine,
            key_segment(&rule.id),
            key_segment(&event.tenant_id),
            key_segment(&event.service_name),
            key_segment(&event.environment)
        )
    }
}

#[async_trait]
impl RepeatCounter for KvRepeatCounter {
    async fn count_in_window(&self, event: &Event, rule: &Rule, window_minutes: u32) -> Result<i64> {
        let key = self.key(event, rule);
        let window = Duration::from_secs(u64::from(window_minutes) * 60);
        let count = self.store.incr_in_window(&key, window).await?;
        if count == 1 {
            tracing::debug!(key = %key, window_minutes, "Opened repeat window");
        }
        Ok(count)
    }
}
