use snowflake::SnowflakeIdBucket;
use std::sync::{Mutex, MutexGuard};

const DEFAULT_WORKER: (i32, i32) = (1, 1);

static AUDIT_IDS: Mutex<Option<SnowflakeIdBucket>> = Mutex::new(None);

fn bucket() -> MutexGuard<'static, Option<SnowflakeIdBucket>> {
    AUDIT_IDS.lock().unwrap_or_else(|e| e.into_inner())
}

/// Sets the worker identity used for audit row ids.
///
/// `machine_id` and `node_id` must each be in `0..32`. Engine instances
/// writing to the same audit table need distinct pairs.
pub fn init(machine_id: i32, node_id: i32) {
    *bucket() = Some(SnowflakeIdBucket::new(machine_id, node_id));
}

/// Next audit row id, as decimal text. Falls back to worker `(1, 1)` when
/// [`init`] was never called.
pub fn next_id() -> String {
    let mut guard = bucket();
    let (machine, node) = DEFAULT_WORKER;
    guard
        .get_or_insert_with(|| SnowflakeIdBucket::new(machine, node))
        .get_id()
        .to_string()
}
