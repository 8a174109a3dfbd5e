//! Archive records and the archive store.
//!
//! An archive record is the durable snapshot of a deleted row: the full
//! original payload, the origin entity type, and who deleted it. Records
//! are written exactly once at deletion time and are immutable until they
//! are removed by a restore, a manual purge, or the retention sweeper.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{RecycleError, RecycleResult};
use crate::registry::EntityRegistry;
use crate::store::{id_to_string, Filter, OrderBy, RowStore, StoreError};
use crate::types::{ArchiveId, Row, Timestamp};

/// Table holding archive records in the row store.
pub const ARCHIVE_TABLE: &str = "archive_records";

/// Durable snapshot of a deleted row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveRecord {
    pub id: ArchiveId,
    /// Key into the entity registry; names the origin table.
    pub entity_type: String,
    /// The full original row, captured at the moment of deletion.
    pub payload: Row,
    /// Who performed the deletion; `None` when system-initiated.
    pub actor_id: Option<String>,
    /// Set once at archive time, never mutated.
    pub archived_at: Timestamp,
}

impl ArchiveRecord {
    /// The `id` column of the archived payload, if present.
    pub fn entity_id(&self) -> Option<String> {
        self.payload.get("id").and_then(id_to_string)
    }

    /// Serialize into the `archive_records` row shape.
    pub fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("id".into(), Value::String(self.id.to_string()));
        row.insert("entity_type".into(), Value::String(self.entity_type.clone()));
        row.insert("payload".into(), Value::Object(self.payload.clone()));
        row.insert(
            "actor_id".into(),
            self.actor_id.clone().map(Value::String).unwrap_or(Value::Null),
        );
        row.insert(
            "archived_at".into(),
            Value::String(self.archived_at.to_rfc3339()),
        );
        row
    }

    /// Parse an `archive_records` row. A malformed row indicates archive
    /// store corruption and surfaces as a backend error.
    pub fn from_row(row: &Row) -> Result<Self, StoreError> {
        let corrupt = |what: &str| StoreError::Backend(format!("malformed archive record: {what}"));

        let id = row
            .get("id")
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| corrupt("id"))?;
        let entity_type = row
            .get("entity_type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| corrupt("entity_type"))?
            .to_string();
        let payload = row
            .get("payload")
            .and_then(|v| v.as_object())
            .ok_or_else(|| corrupt("payload"))?
            .clone();
        let actor_id = match row.get("actor_id") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(_) => return Err(corrupt("actor_id")),
        };
        let archived_at = row
            .get("archived_at")
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|ts| ts.with_timezone(&Utc))
            .ok_or_else(|| corrupt("archived_at"))?;

        Ok(Self {
            id,
            entity_type,
            payload,
            actor_id,
            archived_at,
        })
    }
}

/// Remove the registry-excluded relation keys from an archived payload,
/// producing a row safe to reinsert into the origin table.
pub fn strip_excluded(payload: &Row, excluded: &BTreeSet<String>) -> Row {
    payload
        .iter()
        .filter(|(key, _)| !excluded.contains(*key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// One page of archive records plus the total count across pages.
#[derive(Debug, Clone, Serialize)]
pub struct ArchivePage {
    pub records: Vec<ArchiveRecord>,
    pub total_count: u64,
}

/// Archive-record persistence on top of the [`RowStore`].
///
/// `write` is the single creation path for archive records and enforces
/// the creation invariants (registered entity type, non-empty payload).
#[derive(Clone)]
pub struct ArchiveStore {
    store: Arc<dyn RowStore>,
    registry: Arc<EntityRegistry>,
}

impl ArchiveStore {
    pub fn new(store: Arc<dyn RowStore>, registry: Arc<EntityRegistry>) -> Self {
        Self { store, registry }
    }

    /// Snapshot a doomed row into a new archive record.
    ///
    /// On successful return the record is durably persisted; on failure
    /// nothing was written.
    pub async fn write(
        &self,
        entity_type: &str,
        payload: Row,
        actor_id: Option<String>,
    ) -> RecycleResult<ArchiveRecord> {
        self.registry.lookup(entity_type)?;
        if payload.is_empty() {
            return Err(RecycleError::EmptyPayload);
        }

        let record = ArchiveRecord {
            id: Uuid::new_v4(),
            entity_type: entity_type.to_string(),
            payload,
            actor_id,
            archived_at: Utc::now(),
        };

        self.store
            .insert(ARCHIVE_TABLE, record.to_row())
            .await
            .map_err(RecycleError::ArchiveWriteFailed)?;

        tracing::debug!(
            archive_id = %record.id,
            entity_type,
            "archive record written"
        );
        Ok(record)
    }

    /// Load a record by id, failing with `NotFound` if absent.
    pub async fn load(&self, id: ArchiveId) -> RecycleResult<ArchiveRecord> {
        let row = self
            .store
            .get(ARCHIVE_TABLE, &id.to_string())
            .await?
            .ok_or_else(|| RecycleError::NotFound {
                entity: "archive record",
                id: id.to_string(),
            })?;
        Ok(ArchiveRecord::from_row(&row)?)
    }

    /// Permanently remove a record, failing with `NotFound` if absent.
    pub async fn remove(&self, id: ArchiveId) -> RecycleResult<()> {
        match self.store.delete(ARCHIVE_TABLE, &id.to_string()).await {
            Ok(()) => Ok(()),
            Err(StoreError::NotFound { .. }) => Err(RecycleError::NotFound {
                entity: "archive record",
                id: id.to_string(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    /// Permanently remove a record; `Ok(false)` if it was already gone.
    pub async fn remove_if_exists(&self, id: ArchiveId) -> Result<bool, StoreError> {
        self.store.delete_if_exists(ARCHIVE_TABLE, &id.to_string()).await
    }

    /// Page through archive records, newest first, optionally filtered by
    /// entity type.
    pub async fn page(
        &self,
        entity_type: Option<&str>,
        offset: u64,
        limit: u64,
    ) -> RecycleResult<ArchivePage> {
        let mut filters = Vec::new();
        if let Some(et) = entity_type {
            self.registry.lookup(et)?;
            filters.push(Filter::Eq("entity_type".into(), Value::String(et.into())));
        }

        let page = self
            .store
            .select_page(
                ARCHIVE_TABLE,
                &filters,
                &OrderBy::desc("archived_at"),
                offset,
                limit,
            )
            .await?;

        let records = page
            .rows
            .iter()
            .map(ArchiveRecord::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ArchivePage {
            records,
            total_count: page.total_count,
        })
    }

    /// All records of one entity type archived strictly before `cutoff`.
    pub async fn expired(
        &self,
        entity_type: &str,
        cutoff: Timestamp,
    ) -> Result<Vec<ArchiveRecord>, StoreError> {
        let filters = [
            Filter::Eq("entity_type".into(), Value::String(entity_type.into())),
            Filter::Before("archived_at".into(), cutoff),
        ];
        let page = self
            .store
            .select_page(
                ARCHIVE_TABLE,
                &filters,
                &OrderBy::asc("archived_at"),
                0,
                u64::MAX,
            )
            .await?;
        page.rows.iter().map(ArchiveRecord::from_row).collect()
    }
}
