//! Postgres implementation of the core `RowStore` boundary.
//!
//! Rows travel as JSONB in both directions (`jsonb_populate_record` on the
//! way in, `to_jsonb` on the way out) so the store stays schema-generic
//! across the entity tables. Table names are interpolated into SQL only
//! after a whitelist check against the entity registry; column names only
//! after an identifier-charset check.

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use rbin_core::archive::ARCHIVE_TABLE;
use rbin_core::registry::EntityRegistry;
use rbin_core::store::{Filter, OrderBy, Page, RowStore, SortDir, StoreError};
use rbin_core::types::{Row, RowId};

use crate::DbPool;

pub struct PgRowStore {
    pool: DbPool,
    allowed_tables: Vec<String>,
}

impl PgRowStore {
    /// Build a store restricted to the registry's entity tables plus the
    /// archive table.
    pub fn new(pool: DbPool, registry: &EntityRegistry) -> Self {
        let mut allowed_tables: Vec<String> =
            registry.iter().map(|(et, _)| et.to_string()).collect();
        allowed_tables.push(ARCHIVE_TABLE.to_string());
        Self {
            pool,
            allowed_tables,
        }
    }

    fn check_table(&self, table: &str) -> Result<(), StoreError> {
        if self.allowed_tables.iter().any(|t| t.as_str() == table) {
            Ok(())
        } else {
            Err(StoreError::Backend(format!(
                "table {table} is not in the allowed set"
            )))
        }
    }
}

/// Reject anything that is not a plain lowercase SQL identifier, so column
/// names from filters and patches can be interpolated safely.
fn check_ident(ident: &str) -> Result<(), StoreError> {
    let mut chars = ident.chars();
    let head_ok = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if head_ok && ident.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(StoreError::Backend(format!(
            "invalid SQL identifier: {ident:?}"
        )))
    }
}

/// Classify a sqlx error into the store error taxonomy.
///
/// Postgres class 23 (integrity constraint violation) maps to `Conflict`;
/// everything else is an opaque backend failure.
fn classify(err: sqlx::Error, table: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) => {
            let code = db_err.code();
            if code.as_deref().map(|c| c.starts_with("23")).unwrap_or(false) {
                return StoreError::Conflict {
                    table: table.to_string(),
                    message: db_err.to_string(),
                };
            }
            StoreError::Backend(err.to_string())
        }
        _ => StoreError::Backend(err.to_string()),
    }
}

fn row_from_jsonb(value: Value) -> Result<Row, StoreError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Backend(format!(
            "expected JSON object row, got {other}"
        ))),
    }
}

fn where_clause(filters: &[Filter], first_bind: usize) -> Result<String, StoreError> {
    let mut parts = Vec::new();
    for (i, filter) in filters.iter().enumerate() {
        let n = first_bind + i;
        let part = match filter {
            Filter::Eq(column, _) => {
                check_ident(column)?;
                format!("to_jsonb(t) -> '{column}' = ${n}")
            }
            Filter::Before(column, _) => {
                check_ident(column)?;
                format!("t.{column} < ${n}")
            }
        };
        parts.push(part);
    }
    Ok(if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    })
}

#[async_trait]
impl RowStore for PgRowStore {
    async fn insert(&self, table: &str, row: Row) -> Result<RowId, StoreError> {
        self.check_table(table)?;

        let mut row = row;
        let id = match row.get("id").and_then(rbin_core::store::id_to_string) {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4().to_string();
                row.insert("id".to_string(), Value::String(id.clone()));
                id
            }
        };

        let sql = format!(
            "INSERT INTO {table} SELECT * FROM jsonb_populate_record(NULL::{table}, $1)"
        );
        sqlx::query(&sql)
            .bind(Value::Object(row))
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, table))?;
        Ok(id)
    }

    async fn update(&self, table: &str, id: &str, patch: Row) -> Result<(), StoreError> {
        self.check_table(table)?;
        if patch.is_empty() {
            return Ok(());
        }
        for column in patch.keys() {
            check_ident(column)?;
        }
        let columns = patch.keys().cloned().collect::<Vec<_>>().join(", ");

        let sql = format!(
            "UPDATE {table} t SET ({columns}) = \
             (SELECT {columns} FROM jsonb_populate_record(to_jsonb(t), $2)) \
             WHERE t.id::text = $1"
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(Value::Object(patch))
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, table))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                table: table.to_string(),
                id: id.to_string(),
            });
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
        self.check_table(table)?;
        let sql = format!("DELETE FROM {table} WHERE id::text = $1");
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, table))?;
        Ok(result.rows_affected() > 0)
    }

    async fn get(&self, table: &str, id: &str) -> Result<Option<Row>, StoreError> {
        self.check_table(table)?;
        let sql = format!("SELECT to_jsonb(t) FROM {table} t WHERE t.id::text = $1");
        let found: Option<(Value,)> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify(e, table))?;
        found.map(|(value,)| row_from_jsonb(value)).transpose()
    }

    async fn select_page(
        &self,
        table: &str,
        filters: &[Filter],
        order: &OrderBy,
        offset: u64,
        limit: u64,
    ) -> Result<Page, StoreError> {
        self.check_table(table)?;
        check_ident(&order.column)?;
        let direction = match order.direction {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        };
        let where_sql = where_clause(filters, 1)?;
        let offset_bind = filters.len() + 1;
        let limit_bind = filters.len() + 2;

        let rows_sql = format!(
            "SELECT to_jsonb(t) FROM {table} t{where_sql} \
             ORDER BY t.{order_col} {direction} OFFSET ${offset_bind} LIMIT ${limit_bind}",
            order_col = order.column,
        );
        let mut rows_query = sqlx::query_as::<_, (Value,)>(&rows_sql);
        for filter in filters {
            rows_query = match filter {
                Filter::Eq(_, value) => rows_query.bind(value.clone()),
                Filter::Before(_, ts) => rows_query.bind(*ts),
            };
        }
        let rows_query = rows_query
            .bind(offset.min(i64::MAX as u64) as i64)
            .bind(limit.min(i64::MAX as u64) as i64);
        let raw_rows = rows_query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| classify(e, table))?;
        let rows = raw_rows
            .into_iter()
            .map(|(value,)| row_from_jsonb(value))
            .collect::<Result<Vec<_>, _>>()?;

        let count_sql = format!("SELECT COUNT(*) FROM {table} t{where_sql}");
        let mut count_query = sqlx::query_as::<_, (i64,)>(&count_sql);
        for filter in filters {
            count_query = match filter {
                Filter::Eq(_, value) => count_query.bind(value.clone()),
                Filter::Before(_, ts) => count_query.bind(*ts),
            };
        }
        let (total_count,) = count_query
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(e, table))?;

        Ok(Page {
            rows,
            total_count: total_count.max(0) as u64,
        })
    }

    async fn health(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}
