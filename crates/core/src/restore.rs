//! Restoration of archived rows into their origin tables.

use std::sync::Arc;

use crate::archive::{strip_excluded, ArchiveStore};
use crate::error::{RecycleError, RecycleResult};
use crate::registry::EntityRegistry;
use crate::store::RowStore;
use crate::types::{ArchiveId, Row};

/// Outcome of a successful restore.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Restored {
    pub entity_type: String,
    /// The cleaned payload as reinserted (excluded relation keys removed).
    pub row: Row,
}

pub struct RestorationEngine {
    store: Arc<dyn RowStore>,
    registry: Arc<EntityRegistry>,
    archive: ArchiveStore,
}

impl RestorationEngine {
    pub fn new(store: Arc<dyn RowStore>, registry: Arc<EntityRegistry>) -> Self {
        let archive = ArchiveStore::new(store.clone(), registry.clone());
        Self {
            store,
            registry,
            archive,
        }
    }

    /// Reinsert the archived payload into its origin table, stripping the
    /// registry-excluded relation keys first.
    ///
    /// Failure semantics:
    /// - missing record: `NotFound`, nothing touched;
    /// - reinsert failure (id collision, dangling parent reference):
    ///   `RestoreFailed` carrying the store error, archive record kept so
    ///   the caller may inspect or retry — collisions are never resolved
    ///   by overwriting;
    /// - reinsert succeeded but the archive record could not be removed:
    ///   `InconsistentState`, since the row now lives in both stores.
    pub async fn restore(&self, archive_id: ArchiveId) -> RecycleResult<Restored> {
        let record = self.archive.load(archive_id).await?;
        let policy = self.registry.lookup(&record.entity_type)?;
        let cleaned = strip_excluded(&record.payload, &policy.excluded_fields_on_restore);

        self.store
            .insert(&record.entity_type, cleaned.clone())
            .await
            .map_err(RecycleError::RestoreFailed)?;

        // The record has served its purpose.
        if let Err(err) = self.archive.remove_if_exists(record.id).await {
            tracing::error!(
                archive_id = %record.id,
                entity_type = %record.entity_type,
                error = %err,
                "row restored but archive record removal failed"
            );
            return Err(RecycleError::InconsistentState {
                archive_id: record.id,
                entity_type: record.entity_type.clone(),
                entity_id: record.entity_id().unwrap_or_default(),
                message: format!("restored but archive record not removed: {err}"),
            });
        }

        tracing::info!(
            archive_id = %record.id,
            entity_type = %record.entity_type,
            "archive record restored"
        );
        Ok(Restored {
            entity_type: record.entity_type,
            row: cleaned,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ARCHIVE_TABLE;
    use crate::coordinator::DeletionCoordinator;
    use crate::store::memory::MemoryRowStore;
    use crate::store::testing::FailingStore;
    use assert_matches::assert_matches;
    use crate::store::StoreError;
    use serde_json::{json, Value};
    use uuid::Uuid;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn invoice_row() -> Row {
        row(&[
            ("id", json!("inv-1")),
            ("saleAmount", json!(500)),
            ("users", json!({"id": "u1", "email": "a@b.com"})),
        ])
    }

    fn engine_on(store: Arc<dyn RowStore>) -> RestorationEngine {
        RestorationEngine::new(store, Arc::new(EntityRegistry::standard()))
    }

    #[tokio::test]
    async fn test_restore_strips_joined_relation() {
        let store = Arc::new(MemoryRowStore::new());
        let archive = ArchiveStore::new(store.clone(), Arc::new(EntityRegistry::standard()));
        let record = archive
            .write("invoice", invoice_row(), Some("admin-1".into()))
            .await
            .unwrap();

        let restored = engine_on(store.clone()).restore(record.id).await.unwrap();

        // The joined `users` object must not reach the origin table.
        let expected = row(&[("id", json!("inv-1")), ("saleAmount", json!(500))]);
        assert_eq!(restored.row, expected);
        assert_eq!(
            store.get("invoice", "inv-1").await.unwrap().unwrap(),
            expected
        );
        // The archive record is gone.
        assert_eq!(store.row_count(ARCHIVE_TABLE).await, 0);
    }

    #[tokio::test]
    async fn test_restore_missing_record_is_not_found() {
        let store = Arc::new(MemoryRowStore::new());
        let err = engine_on(store).restore(Uuid::new_v4()).await.unwrap_err();
        assert_matches!(err, RecycleError::NotFound { entity: "archive record", .. });
    }

    #[tokio::test]
    async fn test_restore_collision_preserves_archive_record() {
        let store = Arc::new(MemoryRowStore::new());
        let archive = ArchiveStore::new(store.clone(), Arc::new(EntityRegistry::standard()));
        let record = archive.write("invoice", invoice_row(), None).await.unwrap();
        // The original id still exists in the live table.
        store.insert("invoice", invoice_row()).await.unwrap();

        let err = engine_on(store.clone()).restore(record.id).await.unwrap_err();

        assert_matches!(err, RecycleError::RestoreFailed(StoreError::Conflict { .. }));
        // Record kept for retry or inspection.
        assert_eq!(store.row_count(ARCHIVE_TABLE).await, 1);
    }

    #[tokio::test]
    async fn test_restore_then_redelete_is_exclusion_stable() {
        let store = Arc::new(MemoryRowStore::new());
        let registry = Arc::new(EntityRegistry::standard());
        let archive = ArchiveStore::new(store.clone(), registry.clone());
        let coordinator = DeletionCoordinator::new(store.clone(), registry.clone());
        let engine = RestorationEngine::new(store.clone(), registry);

        // Archive the joined row, restore it, then soft-delete and restore
        // again: the second cycle's payload is the cleaned first payload.
        let first = archive.write("invoice", invoice_row(), None).await.unwrap();
        let restored = engine.restore(first.id).await.unwrap();

        let second = coordinator
            .soft_delete("invoice", "inv-1", restored.row.clone(), None)
            .await
            .unwrap();
        assert_eq!(second.payload, restored.row);

        let restored_again = engine.restore(second.id).await.unwrap();
        assert_eq!(restored_again.row, restored.row);
    }

    #[tokio::test]
    async fn test_restore_with_failing_archive_removal_is_inconsistent() {
        let store = Arc::new(FailingStore::new());
        let registry = Arc::new(EntityRegistry::standard());
        let archive = ArchiveStore::new(store.clone(), registry.clone());
        let record = archive.write("invoice", invoice_row(), None).await.unwrap();
        store.fail_deletes_on(ARCHIVE_TABLE).await;

        let err = RestorationEngine::new(store.clone(), registry)
            .restore(record.id)
            .await
            .unwrap_err();

        assert_matches!(err, RecycleError::InconsistentState { .. });
        // The row was restored; the stale archive record is detectable.
        assert!(store.inner.get("invoice", "inv-1").await.unwrap().is_some());
        assert_eq!(store.inner.row_count(ARCHIVE_TABLE).await, 1);
    }
}
