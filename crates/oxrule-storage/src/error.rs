/// Errors that can occur within the storage layer.
///
/// # Examples
///
/// ```rust
/// use oxrule_storage::error::StorageError;
///
/// let err = StorageError::Decode {
///     entity: "rule",
///     id: "17".to_string(),
///     reason: "missing field `operator`".to_string(),
/// };
/// assert!(err.to_string().contains("rule"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Connection, query or migration failure reported by SeaORM.
    #[error("Storage: database error: {0}")]
    Db(#[from] sea_orm::DbErr),

    /// JSON serialization failure while building a row.
    #[error("Storage: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A stored JSON column could not be decoded into the domain model.
    #[error("Storage: undecodable {entity} (id={id}): {reason}")]
    Decode {
        entity: &'static str,
        id: String,
        reason: String,
    },
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
