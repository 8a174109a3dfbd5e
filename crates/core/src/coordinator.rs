//! Archive-then-delete orchestration.
//!
//! `soft_delete` is the single logical operation behind every delete
//! button: snapshot the row into the archive, then delete the original.
//! The archive write is always observable before the delete takes effect;
//! on a delete failure the freshly written archive record is rolled back
//! so no orphaned archive entry is left behind.

use std::sync::Arc;

use crate::archive::{ArchiveRecord, ArchiveStore};
use crate::error::{RecycleError, RecycleResult};
use crate::registry::EntityRegistry;
use crate::store::RowStore;
use crate::types::Row;

pub struct DeletionCoordinator {
    store: Arc<dyn RowStore>,
    registry: Arc<EntityRegistry>,
    archive: ArchiveStore,
}

impl DeletionCoordinator {
    pub fn new(store: Arc<dyn RowStore>, registry: Arc<EntityRegistry>) -> Self {
        let archive = ArchiveStore::new(store.clone(), registry.clone());
        Self {
            store,
            registry,
            archive,
        }
    }

    /// Soft-delete entity `id` of `entity_type`, archiving `payload` (the
    /// full row as currently known to the caller) attributed to `actor_id`.
    ///
    /// Ordering: a live-row pre-check, then the archive write, then a
    /// conditional delete of the live row. A concurrent deleter that wins
    /// the race is detected by the conditional delete reporting no row; in
    /// that case this call's own archive record is rolled back and the
    /// caller gets `NotFound`, so duplicate archive records never persist.
    pub async fn soft_delete(
        &self,
        entity_type: &str,
        id: &str,
        payload: Row,
        actor_id: Option<String>,
    ) -> RecycleResult<ArchiveRecord> {
        self.registry.lookup(entity_type)?;

        // Pre-check: a second soft delete of an already-deleted id must
        // fail without writing a duplicate archive record.
        if self.store.get(entity_type, id).await?.is_none() {
            return Err(RecycleError::NotFound {
                entity: "row",
                id: id.to_string(),
            });
        }

        let record = self.archive.write(entity_type, payload, actor_id).await?;

        match self.store.delete_if_exists(entity_type, id).await {
            Ok(true) => {
                tracing::info!(
                    entity_type,
                    entity_id = id,
                    archive_id = %record.id,
                    "soft delete completed"
                );
                Ok(record)
            }
            Ok(false) => {
                // Raced: the row vanished between pre-check and delete.
                self.rollback(&record, entity_type, id, "row already deleted")
                    .await?;
                Err(RecycleError::NotFound {
                    entity: "row",
                    id: id.to_string(),
                })
            }
            Err(err) => {
                tracing::warn!(
                    entity_type,
                    entity_id = id,
                    archive_id = %record.id,
                    error = %err,
                    "live-row delete failed, rolling back archive record"
                );
                self.rollback(&record, entity_type, id, "delete failed")
                    .await?;
                Err(RecycleError::DeletionFailed(err))
            }
        }
    }

    /// Best-effort removal of a just-written archive record. If even the
    /// rollback fails, an orphaned archive record exists and the condition
    /// is escalated rather than silently corrected.
    async fn rollback(
        &self,
        record: &ArchiveRecord,
        entity_type: &str,
        id: &str,
        reason: &str,
    ) -> RecycleResult<()> {
        match self.archive.remove_if_exists(record.id).await {
            Ok(_) => Ok(()),
            Err(err) => {
                tracing::error!(
                    entity_type,
                    entity_id = id,
                    archive_id = %record.id,
                    error = %err,
                    "archive rollback failed, orphaned archive record"
                );
                Err(RecycleError::InconsistentState {
                    archive_id: record.id,
                    entity_type: entity_type.to_string(),
                    entity_id: id.to_string(),
                    message: format!("{reason}; archive rollback failed: {err}"),
                })
            }
        }
    }
}
