use oxrule_storage::StorageError;

/// Failure of one event's orchestration. The message is left uncommitted
/// and will be redelivered.
///
/// Cache, counter, dispatch and audit failures never surface here; they are
/// logged where they happen.
#[derive(Debug, thiserror::Error)]
pub enum EvaluateError {
    #[error("Evaluate: rule repository unavailable: {0}")]
    Repository(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, EvaluateError>;
