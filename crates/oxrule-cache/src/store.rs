use crate::error::{CacheError, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Minimal key-value surface shared by the rule cache and the repeat
/// counter.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value and expiring
    /// it after `ttl`.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Atomically increments the integer at `key` and returns the
    /// post-increment value.
    ///
    /// A fresh key starts at 1 and expires after `window`. A key that has no
    /// expiry is given one in the same step, so a counter can never outlive
    /// its window. Later increments keep the running expiry.
    async fn incr_in_window(&self, key: &str, window: Duration) -> Result<i64>;
}

const INCR_IN_WINDOW: &str = r"
local n = redis.call('INCR', KEYS[1])
if n == 1 or redis.call('TTL', KEYS[1]) == -1 then
  redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return n
";

/// Redis-backed store. The connection manager reconnects on its own and is
/// cloned per command, so one instance is shared by every worker.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    incr_in_window: redis::Script,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::info!(url = %url, "Connected to key-value store");
        Ok(Self::from_manager(conn))
    }

    pub fn from_manager(conn: ConnectionManager) -> Self {
        Self {
            conn,
            incr_in_window: redis::Script::new(INCR_IN_WINDOW),
        }
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.get(key).await?)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, ttl.as_secs().max(1)).await?;
        Ok(())
    }

    async fn incr_in_window(&self, key: &str, window: Duration) -> Result<i64> {
        let mut conn = self.conn.clone();
        let count: i64 = self
            .incr_in_window
            .key(key)
            .arg(window.as_secs().max(1))
            .invoke_async(&mut conn)
            .await?;
        Ok(count)
    }
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// In-process store with the same expiry semantics as Redis.
///
/// Time is read from the tokio clock so tests can pause and advance it.
/// [`MemoryStore::set_unavailable`] makes every call fail, simulating an
/// unreachable server.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, MemoryEntry>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Remaining time-to-live of a live key; `None` when the key is absent
    /// or has no expiry.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let entries = self.lock();
        let entry = entries.get(key).filter(|e| e.is_live(now))?;
        entry.expires_at.map(|at| at - now)
    }

    /// Stores `value` with no expiry, like a plain `SET`.
    pub fn set(&self, key: &str, value: &str) {
        self.lock().insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at: None,
            },
        );
    }

    pub fn contains_key(&self, key: &str) -> bool {
        let now = Instant::now();
        self.lock().get(key).is_some_and(|e| e.is_live(now))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, MemoryEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("memory store switched off".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.check_available()?;
        let now = Instant::now();
        Ok(self
            .lock()
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone()))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.check_available()?;
        self.lock().insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn incr_in_window(&self, key: &str, window: Duration) -> Result<i64> {
        self.check_available()?;
        let now = Instant::now();
        let mut entries = self.lock();
        let entry = entries
            .entry(key.to_string())
            .and_modify(|e| {
                if !e.is_live(now) {
                    e.value = "0".into();
                    e.expires_at = None;
                }
            })
            .or_insert_with(|| MemoryEntry {
                value: "0".into(),
                expires_at: None,
            });
        let current: i64 = entry
            .value
            .parse()
            .map_err(|_| CacheError::NotAnInteger { key: key.to_string() })?;
        let next = current + 1;
        entry.value = next.to_string();
        if entry.expires_at.is_none() {
            entry.expires_at = Some(now + window);
        }
        Ok(next)
    }
}
