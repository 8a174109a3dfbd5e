//! Fault-injecting [`RowStore`] wrapper for exercising compensation paths.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::store::memory::MemoryRowStore;
use crate::store::{Filter, OrderBy, Page, RowStore, StoreError};
use crate::types::{Row, RowId};

/// Wraps a [`MemoryRowStore`] and fails selected operations on demand.
#[derive(Default)]
pub struct FailingStore {
    pub inner: MemoryRowStore,
    fail_deletes: Mutex<HashSet<String>>,
    fail_delete_ids: Mutex<HashSet<(String, String)>>,
    fail_inserts: Mutex<HashSet<String>>,
    miss_deletes: Mutex<HashSet<String>>,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every delete (conditional or not) against `table`.
    pub async fn fail_deletes_on(&self, table: &str) {
        self.fail_deletes.lock().await.insert(table.to_string());
    }

    /// Fail deletes of one specific row only.
    pub async fn fail_delete_of(&self, table: &str, id: &str) {
        self.fail_delete_ids
            .lock()
            .await
            .insert((table.to_string(), id.to_string()));
    }

    /// Fail every insert into `table`.
    pub async fn fail_inserts_on(&self, table: &str) {
        self.fail_inserts.lock().await.insert(table.to_string());
    }

    /// Make conditional deletes against `table` report that no row was
    /// removed, as if a concurrent deleter had already won the race.
    pub async fn miss_deletes_on(&self, table: &str) {
        self.miss_deletes.lock().await.insert(table.to_string());
    }

    async fn check_delete(&self, table: &str, id: &str) -> Result<(), StoreError> {
        let by_table = self.fail_deletes.lock().await.contains(table);
        let by_id = self
            .fail_delete_ids
            .lock()
            .await
            .contains(&(table.to_string(), id.to_string()));
        if by_table || by_id {
            Err(StoreError::Backend(format!(
                "injected delete failure for {table}/{id}"
            )))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RowStore for FailingStore {
    async fn insert(&self, table: &str, row: Row) -> Result<RowId, StoreError> {
        if self.fail_inserts.lock().await.contains(table) {
            return Err(StoreError::Backend(format!(
                "injected insert failure for {table}"
            )));
        }
        self.inner.insert(table, row).await
    }

    async fn update(&self, table: &str, id: &str, patch: Row) -> Result<(), StoreError> {
        self.inner.update(table, id, patch).await
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), StoreError> {
        self.check_delete(table, id).await?;
        self.inner.delete(table, id).await
    }

    async fn delete_if_exists(&self, table: &str, id: &str) -> Result<bool, StoreError> {
        self.check_delete(table, id).await?;
        if self.miss_deletes.lock().await.contains(table) {
            return Ok(false);
        }
        self.inner.delete_if_exists(table, id).await
    }

    async fn get(&self, table: &str, id: &str) -> Result<Option<Row>, StoreError> {
        self.inner.get(table, id).await
    }

    async fn select_page(
        &self,
        table: &str,
        filters: &[Filter],
        order: &OrderBy,
        offset: u64,
        limit: u64,
    ) -> Result<Page, StoreError> {
        self.inner.select_page(table, filters, order, offset, limit).await
    }
}
