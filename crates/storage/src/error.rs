/// All errors that can be returned by a WorkflowStore implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// Optimistic concurrency conflict — another writer committed to this
    /// entity after the caller read it. The expected version no longer
    /// matches the stored one.
    #[error("concurrent conflict on {entity_id}: expected version {expected_version}")]
    ConcurrentConflict {
        entity_id: String,
        expected_version: i64,
    },

    /// No record exists with the given id.
    #[error("entity not found: {entity_id}")]
    NotFound { entity_id: String },

    /// A record with this id (or, for orders, this source request) already
    /// exists.
    #[error("entity already exists: {entity_id}")]
    AlreadyExists { entity_id: String },

    /// A backend-specific failure (connection, serialization, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}
