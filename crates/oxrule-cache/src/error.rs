/// Errors raised by key-value store operations.
///
/// Callers in this crate absorb them: a rule-cache failure reads as a miss
/// and a counter failure fails the `repeat_over` condition closed.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache: redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Cache: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cache: value at '{key}' is not an integer")]
    NotAnInteger { key: String },

    #[error("Cache: store unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, CacheError>;
