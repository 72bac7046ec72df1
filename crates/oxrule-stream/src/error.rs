/// Errors raised by the message log.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("Stream: redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A commit named a message this reader never delivered.
    #[error("Stream: unknown message id '{id}' on partition {partition}")]
    UnknownMessage { partition: u32, id: String },
}

pub type Result<T> = std::result::Result<T, StreamError>;
