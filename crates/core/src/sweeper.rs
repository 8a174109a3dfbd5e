//! Retention policy evaluation over the archive store.
//!
//! The sweeper only ever removes archive records; it never touches the
//! origin tables. There is no in-process schedule: callers invoke
//! `sweep(now)` on demand (cron, admin endpoint).

use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;

use crate::archive::ArchiveStore;
use crate::error::RecycleResult;
use crate::registry::EntityRegistry;
use crate::store::RowStore;
use crate::types::{ArchiveId, Timestamp};

/// Result of one sweep pass.
#[derive(Debug, Default, Serialize)]
pub struct SweepReport {
    pub purged_count: u64,
    pub errors: Vec<SweepError>,
}

/// One failed purge (or expiry query) within a sweep.
#[derive(Debug, Serialize)]
pub struct SweepError {
    /// Absent when the expiry listing itself failed for an entity type.
    pub archive_id: Option<ArchiveId>,
    pub entity_type: String,
    pub message: String,
}

pub struct RetentionSweeper {
    registry: Arc<EntityRegistry>,
    archive: ArchiveStore,
}

impl RetentionSweeper {
    pub fn new(store: Arc<dyn RowStore>, registry: Arc<EntityRegistry>) -> Self {
        let archive = ArchiveStore::new(store, registry.clone());
        Self { registry, archive }
    }

    /// Purge every archive record older than its entity type's retention
    /// window: `now - archived_at > retention_days`, strictly.
    ///
    /// Each record's purge is independent; a failure is recorded in the
    /// report and does not block the rest of the pass.
    pub async fn sweep(&self, now: Timestamp) -> RecycleResult<SweepReport> {
        let mut report = SweepReport::default();

        for (entity_type, policy) in self.registry.iter() {
            let cutoff = now - Duration::days(i64::from(policy.retention_days));
            let expired = match self.archive.expired(entity_type, cutoff).await {
                Ok(records) => records,
                Err(err) => {
                    report.errors.push(SweepError {
                        archive_id: None,
                        entity_type: entity_type.to_string(),
                        message: err.to_string(),
                    });
                    continue;
                }
            };

            for record in expired {
                match self.archive.remove_if_exists(record.id).await {
                    Ok(true) => report.purged_count += 1,
                    // Concurrently removed; nothing to count.
                    Ok(false) => {}
                    Err(err) => {
                        tracing::warn!(
                            archive_id = %record.id,
                            entity_type,
                            error = %err,
                            "retention purge failed for record"
                        );
                        report.errors.push(SweepError {
                            archive_id: Some(record.id),
                            entity_type: entity_type.to_string(),
                            message: err.to_string(),
                        });
                    }
                }
            }
        }

        tracing::info!(
            purged = report.purged_count,
            errors = report.errors.len(),
            "retention sweep finished"
        );
        Ok(report)
    }
}
