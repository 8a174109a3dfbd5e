//! In-process [`RowStore`] backed by per-table maps.
//!
//! Used by the test suites and by local development without a database.
//! Semantics mirror the Postgres binding: string ids, conflict on
//! duplicate insert, strict-before timestamp filters.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::DateTime;
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::store::{id_to_string, Filter, OrderBy, Page, RowStore, SortDir, StoreError};
use crate::types::{Row, RowId};

#[derive(Default)]
pub struct MemoryRowStore {
    tables: Mutex<HashMap<String, Vec<Row>>>,
}

impl MemoryRowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently in `table`. Test convenience.
    pub async fn row_count(&self, table: &str) -> usize {
        self.tables
            .lock()
            .await
            .get(table)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

fn row_id(row: &Row) -> Option<String> {
    row.get("id").and_then(id_to_string)
}

fn matches(row: &Row, filter: &Filter) -> bool {
    match filter {
        Filter::Eq(column, value) => row.get(column) == Some(value),
        Filter::Before(column, cutoff) => match row.get(column) {
            Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
                .map(|ts| ts.with_timezone(&chrono::Utc) < *cutoff)
                .unwrap_or(false),
            _ => false,
        },
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl RowStore for MemoryRowStore {
    async fn insert(&self, table: &str, row: Row) -> Result<RowId, StoreError> {
        let mut tables = self.tables.lock().await;
        let rows = tables.entry(table.to_string()).or_default();

        let mut row = row;
        let id = match row_id(&row) {
            Some(id) => {
                if rows.iter().any(|r| row_id(r).as_deref() == Some(&id)) {
                    return Err(StoreError::Conflict {
                        table: table.to_string(),
                        message: format!("duplicate id {id}"),
                    });
                }
                id
            }
            None => {
                let id = Uuid::new_v4().to_string();
                row.insert("id".to_string(), Value::String(id.clone()));
                id
            }
        };

        rows.push(row);
        Ok(id)
    }

    async fn update(&self, table: &str, id: &str, patch: Row) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        let rows = tables.entry(table.to_string()).or_default();
        let row = rows
            .iter_mut()
            .find(|r| row_id(r).as_deref() == Some(id))
            .ok_or_else(|| StoreError::NotFound {
                table: table.to_string(),
                id: id.to_string(),
            })?;
        for (key, value) in patch {
            row.insert(key, value);
        }
        Ok(())
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), StoreError> {
        if self.delete_if_exists(table, id).await? {
            Ok(())
        } else {
            Err(StoreError::NotFound {
                table: table.to_string(),
                id: id.to_string(),
            })
        }
    }

    async fn delete_if_exists(&self, table: &str, id: &str) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        let rows = tables.entry(table.to_string()).or_default();
        let before = rows.len();
        rows.retain(|r| row_id(r).as_deref() != Some(id));
        Ok(rows.len() < before)
    }

    async fn get(&self, table: &str, id: &str) -> Result<Option<Row>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .get(table)
            .and_then(|rows| rows.iter().find(|r| row_id(r).as_deref() == Some(id)))
            .cloned())
    }

    async fn select_page(
        &self,
        table: &str,
        filters: &[Filter],
        order: &OrderBy,
        offset: u64,
        limit: u64,
    ) -> Result<Page, StoreError> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<Row> = tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|r| filters.iter().all(|f| matches(r, f)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        rows.sort_by(|a, b| {
            let ord = compare_values(a.get(&order.column), b.get(&order.column));
            match order.direction {
                SortDir::Asc => ord,
                SortDir::Desc => ord.reverse(),
            }
        });

        let total_count = rows.len() as u64;
        let rows = rows
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();

        Ok(Page { rows, total_count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_insert_generates_id_when_absent() {
        let store = MemoryRowStore::new();
        let id = store.insert("users", row(&[("email", json!("a@b.com"))])).await.unwrap();
        let fetched = store.get("users", &id).await.unwrap().unwrap();
        assert_eq!(fetched["email"], json!("a@b.com"));
        assert_eq!(fetched["id"], json!(id));
    }

    #[tokio::test]
    async fn test_insert_duplicate_id_conflicts() {
        let store = MemoryRowStore::new();
        store
            .insert("users", row(&[("id", json!("u1"))]))
            .await
            .unwrap();
        let err = store
            .insert("users", row(&[("id", json!("u1"))]))
            .await
            .unwrap_err();
        assert_matches!(err, StoreError::Conflict { .. });
    }

    #[tokio::test]
    async fn test_delete_missing_row_is_not_found() {
        let store = MemoryRowStore::new();
        let err = store.delete("users", "ghost").await.unwrap_err();
        assert_matches!(err, StoreError::NotFound { .. });
        assert!(!store.delete_if_exists("users", "ghost").await.unwrap());
    }

    #[tokio::test]
    async fn test_update_patches_columns() {
        let store = MemoryRowStore::new();
        store
            .insert("users", row(&[("id", json!("u1")), ("status", json!("active"))]))
            .await
            .unwrap();
        store
            .update("users", "u1", row(&[("status", json!("banned"))]))
            .await
            .unwrap();
        let fetched = store.get("users", "u1").await.unwrap().unwrap();
        assert_eq!(fetched["status"], json!("banned"));
    }

    #[tokio::test]
    async fn test_select_page_filters_orders_and_paginates() {
        let store = MemoryRowStore::new();
        for (id, status, rank) in [("a", "open", 3), ("b", "open", 1), ("c", "closed", 2), ("d", "open", 2)] {
            store
                .insert(
                    "tickets",
                    row(&[("id", json!(id)), ("status", json!(status)), ("rank", json!(rank))]),
                )
                .await
                .unwrap();
        }

        let page = store
            .select_page(
                "tickets",
                &[Filter::Eq("status".into(), json!("open"))],
                &OrderBy::desc("rank"),
                0,
                2,
            )
            .await
            .unwrap();
        assert_eq!(page.total_count, 3);
        assert_eq!(page.rows.len(), 2);
        assert_eq!(page.rows[0]["id"], json!("a"));
    }

    #[tokio::test]
    async fn test_before_filter_is_strict() {
        let store = MemoryRowStore::new();
        let cutoff: crate::types::Timestamp = "2026-08-01T00:00:00Z".parse().unwrap();
        for (id, at) in [
            ("old", "2026-07-31T23:59:59Z"),
            ("boundary", "2026-08-01T00:00:00Z"),
            ("new", "2026-08-02T00:00:00Z"),
        ] {
            store
                .insert("events", row(&[("id", json!(id)), ("at", json!(at))]))
                .await
                .unwrap();
        }

        let page = store
            .select_page(
                "events",
                &[Filter::Before("at".into(), cutoff)],
                &OrderBy::asc("at"),
                0,
                10,
            )
            .await
            .unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.rows[0]["id"], json!("old"));
    }
}
