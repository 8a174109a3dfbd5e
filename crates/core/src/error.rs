use crate::store::StoreError;
use crate::types::ArchiveId;

/// Domain error taxonomy for soft delete, restore, and sweep operations.
///
/// Every failure is surfaced to the caller as a typed variant; nothing is
/// retried internally. `InconsistentState` is the one variant that signals
/// a condition requiring operator reconciliation rather than a retry.
#[derive(Debug, thiserror::Error)]
pub enum RecycleError {
    /// The caller referenced an entity type that is not in the registry.
    /// The set of valid types is fixed at startup, so this is a programmer
    /// error, not a user-facing condition.
    #[error("unknown entity type: {0}")]
    UnknownEntityType(String),

    /// An archive payload must capture at least one column.
    #[error("archive payload must not be empty")]
    EmptyPayload,

    /// The archive insert failed; nothing was written, the live row is
    /// untouched. Safe to retry.
    #[error("archive write failed: {0}")]
    ArchiveWriteFailed(#[source] StoreError),

    /// The live-row delete failed and the freshly written archive record
    /// was rolled back. Safe to retry.
    #[error("deletion failed: {0}")]
    DeletionFailed(#[source] StoreError),

    /// An orphaned archive record exists (the archive write succeeded but
    /// neither the live delete nor the compensating rollback completed, or
    /// a restored row's archive record could not be removed). Carries both
    /// ids so an operator can reconcile manually.
    #[error("inconsistent state for {entity_type}/{entity_id}: archive record {archive_id}: {message}")]
    InconsistentState {
        archive_id: ArchiveId,
        entity_type: String,
        entity_id: String,
        message: String,
    },

    /// Reinsertion into the origin table failed. The archive record is
    /// preserved so the caller may inspect or retry.
    #[error("restore failed: {0}")]
    RestoreFailed(#[source] StoreError),

    /// The id does not exist in the expected store.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// A row store error outside the delete/restore compensation paths
    /// (lookups, listings).
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Convenience alias for core operation results.
pub type RecycleResult<T> = Result<T, RecycleError>;
