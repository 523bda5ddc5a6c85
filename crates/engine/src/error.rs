use ivrflow_core::Role;
use ivrflow_storage::StorageError;

/// All errors the workflow engine surfaces to callers.
///
/// Every variant names the entity and (where it applies) the attempted
/// operation, so a presentation layer can render role-appropriate
/// messages without inspecting internals. On any error the targeted
/// entity is unchanged: no partial audit entry, no status change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    /// The attempted edge is not in the transition graph. Never worth
    /// retrying.
    #[error("invalid transition on {entity_id}: {from} -> {to}")]
    InvalidTransition {
        entity_id: String,
        from: String,
        to: String,
    },

    /// The actor's role lacks the capability for this operation.
    #[error("actor {actor_id} ({role}) not authorized for {operation} on {entity_id}")]
    Unauthorized {
        entity_id: String,
        actor_id: String,
        role: Role,
        operation: String,
    },

    /// The operation requires a prior state that does not hold.
    #[error("precondition failed for {operation} on {entity_id}: {reason}")]
    PreconditionFailed {
        entity_id: String,
        operation: String,
        reason: String,
    },

    /// A concurrent writer committed first. Safe to retry after
    /// re-reading current state; the engine itself never retries.
    #[error("concurrent conflict on {entity_id} during {operation}")]
    Conflict {
        entity_id: String,
        operation: String,
    },

    /// Unknown entity id.
    #[error("entity not found: {entity_id}")]
    NotFound { entity_id: String },

    /// A backend-specific storage failure.
    #[error("storage failure during {operation}: {source}")]
    Storage {
        operation: String,
        #[source]
        source: StorageError,
    },
}

impl WorkflowError {
    /// Map a storage error into the caller-facing taxonomy, tagging it
    /// with the operation that hit it.
    pub(crate) fn from_storage(err: StorageError, operation: &str) -> Self {
        match err {
            StorageError::ConcurrentConflict { entity_id, .. } => WorkflowError::Conflict {
                entity_id,
                operation: operation.to_string(),
            },
            StorageError::AlreadyExists { entity_id } => WorkflowError::Conflict {
                entity_id,
                operation: operation.to_string(),
            },
            StorageError::NotFound { entity_id } => WorkflowError::NotFound { entity_id },
            e @ StorageError::Backend(_) => WorkflowError::Storage {
                operation: operation.to_string(),
                source: e,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_mapping_carries_operation() {
        let err = WorkflowError::from_storage(
            StorageError::ConcurrentConflict {
                entity_id: "ivr-1".to_string(),
                expected_version: 3,
            },
            "transition",
        );
        assert_eq!(
            err,
            WorkflowError::Conflict {
                entity_id: "ivr-1".to_string(),
                operation: "transition".to_string(),
            }
        );
    }

    #[test]
    fn already_exists_maps_to_conflict() {
        let err = WorkflowError::from_storage(
            StorageError::AlreadyExists {
                entity_id: "ivr-1".to_string(),
            },
            "create_order_from_ivr",
        );
        assert!(matches!(err, WorkflowError::Conflict { .. }));
    }

    #[test]
    fn not_found_passes_through() {
        let err = WorkflowError::from_storage(
            StorageError::NotFound {
                entity_id: "ord-1".to_string(),
            },
            "advance_order_status",
        );
        assert_eq!(
            err,
            WorkflowError::NotFound {
                entity_id: "ord-1".to_string()
            }
        );
    }
}
