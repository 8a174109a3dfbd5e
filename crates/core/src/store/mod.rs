//! Boundary interface to the underlying row store.
//!
//! The service treats persistence as an opaque row store exposing
//! single-row insert/update/delete and paged selects. Operations are
//! atomic at the single-row level only; no multi-row transactions are
//! assumed, which is why the deletion coordinator implements its own
//! compensating two-step logic.

use async_trait::async_trait;
use serde_json::Value;

use crate::types::{Row, RowId, Timestamp};

pub mod memory;
#[cfg(test)]
pub mod testing;

/// Errors surfaced by a row store implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No row with the given id exists in the table.
    #[error("no row with id {id} in table {table}")]
    NotFound { table: String, id: String },

    /// A uniqueness or referential constraint was violated.
    #[error("constraint violation in table {table}: {message}")]
    Conflict { table: String, message: String },

    /// Connectivity or any other backend failure.
    #[error("row store backend error: {0}")]
    Backend(String),
}

/// A single AND-ed filter clause for paged selects.
#[derive(Debug, Clone)]
pub enum Filter {
    /// Column equals the given JSON value.
    Eq(String, Value),
    /// Timestamp column is strictly before the given instant.
    Before(String, Timestamp),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

/// Ordering for paged selects.
#[derive(Debug, Clone)]
pub struct OrderBy {
    pub column: String,
    pub direction: SortDir,
}

impl OrderBy {
    pub fn asc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            direction: SortDir::Asc,
        }
    }

    pub fn desc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            direction: SortDir::Desc,
        }
    }
}

/// One page of rows plus the total match count across all pages.
#[derive(Debug, Clone)]
pub struct Page {
    pub rows: Vec<Row>,
    pub total_count: u64,
}

/// The persistence boundary consumed by the core.
///
/// Implementations: [`memory::MemoryRowStore`] (in-process, for tests and
/// DB-less development) and `rbin_db::PgRowStore` (Postgres).
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Insert a row, generating an id when the row carries none. Fails
    /// with [`StoreError::Conflict`] if the id already exists.
    async fn insert(&self, table: &str, row: Row) -> Result<RowId, StoreError>;

    /// Apply a partial column patch to an existing row.
    async fn update(&self, table: &str, id: &str, patch: Row) -> Result<(), StoreError>;

    /// Delete a row, failing with [`StoreError::NotFound`] if absent.
    async fn delete(&self, table: &str, id: &str) -> Result<(), StoreError>;

    /// Conditional delete: returns whether a row was removed. This is the
    /// primitive that lets callers distinguish "already gone" from a
    /// backend failure without a racy pre-read.
    async fn delete_if_exists(&self, table: &str, id: &str) -> Result<bool, StoreError>;

    /// Fetch a single row by id.
    async fn get(&self, table: &str, id: &str) -> Result<Option<Row>, StoreError>;

    /// Paged select with AND-ed filters, ordering, and a total count.
    async fn select_page(
        &self,
        table: &str,
        filters: &[Filter],
        order: &OrderBy,
        offset: u64,
        limit: u64,
    ) -> Result<Page, StoreError>;

    /// Backend reachability probe. Defaults to healthy for stores with no
    /// external connection.
    async fn health(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Render a JSON id value as the canonical string form used in `id`
/// comparisons (UUID text keys and numeric keys both occur in practice).
pub fn id_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
