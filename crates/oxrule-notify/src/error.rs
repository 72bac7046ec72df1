/// Errors raised while dispatching a single action.
///
/// # Examples
///
/// ```rust
/// use oxrule_notify::error::NotifyError;
///
/// let err = NotifyError::Publish {
///     topic: "mail-alert-topic".to_string(),
///     reason: "connection reset".to_string(),
/// };
/// assert!(err.to_string().contains("mail-alert-topic"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The outbound message could not be encoded.
    #[error("Notify: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The outbound topic rejected the message.
    #[error("Notify: publish to '{topic}' failed: {reason}")]
    Publish { topic: String, reason: String },
}

/// Convenience `Result` alias for notification operations.
pub type Result<T> = std::result::Result<T, NotifyError>;
