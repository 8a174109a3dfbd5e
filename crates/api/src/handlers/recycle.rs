//! Handlers for soft deletion and the recycle bin.
//!
//! Translates the dashboard's UI actions (delete button, bin listing,
//! restore, permanent delete, retention sweep) into the core entry
//! points. All failures surface as typed JSON errors; nothing is retried
//! here.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use rbin_core::archive::{ArchivePage, ArchiveRecord};
use rbin_core::error::RecycleError;
use rbin_core::store::RowStore;
use rbin_core::sweeper::SweepReport;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 100;

/// Query parameters for the recycle bin listing.
#[derive(Debug, Deserialize)]
pub struct RecycleQuery {
    /// Optional entity type filter (e.g. "invoice", "users").
    #[serde(rename = "type")]
    pub entity_type: Option<String>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

/// Identity of the deleting user, forwarded by the dashboard after its own
/// auth check. Absent for system-initiated deletes.
fn actor_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-actor-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// DELETE /api/v1/entities/{entity_type}/{id}
///
/// Soft delete: snapshot the live row into the recycle bin, then delete
/// it. Returns 404 if the row does not exist (including a repeat delete of
/// the same id), 400 for an unregistered entity type.
pub async fn soft_delete_entity(
    State(state): State<AppState>,
    Path((entity_type, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> AppResult<Json<serde_json::Value>> {
    // Validate the type before touching the store so an unknown name never
    // reaches a table lookup.
    state.registry.lookup(&entity_type)?;

    let row = state
        .store
        .get(&entity_type, &id)
        .await?
        .ok_or_else(|| {
            AppError::Recycle(RecycleError::NotFound {
                entity: "row",
                id: id.clone(),
            })
        })?;

    let record = state
        .coordinator()
        .soft_delete(&entity_type, &id, row, actor_id(&headers))
        .await?;

    Ok(Json(serde_json::json!({
        "deleted": true,
        "entity_type": entity_type,
        "id": id,
        "archive_id": record.id,
    })))
}

/// GET /api/v1/recycle
///
/// Paginated listing of archived rows, newest first, optionally filtered
/// by entity type. Rejects a `limit` above `MAX_PAGE_SIZE` rather than
/// silently clamping it.
pub async fn list_recycle(
    State(state): State<AppState>,
    Query(params): Query<RecycleQuery>,
) -> AppResult<Json<ArchivePage>> {
    let offset = params.offset.unwrap_or(0);
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    if limit > MAX_PAGE_SIZE {
        return Err(AppError::BadRequest(format!(
            "limit must be at most {MAX_PAGE_SIZE}"
        )));
    }
    let page = state
        .archive()
        .page(params.entity_type.as_deref(), offset, limit)
        .await?;
    Ok(Json(page))
}

/// GET /api/v1/recycle/{id} -- single archive record (the bin's detail view).
pub async fn get_recycle_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ArchiveRecord>> {
    let record = state.archive().load(id).await?;
    Ok(Json(record))
}

/// POST /api/v1/recycle/{id}/restore
///
/// Reinsert the archived row into its origin table (minus the
/// registry-excluded relation keys) and drop the archive record. Returns
/// 409 if the original id still exists in the live table.
pub async fn restore(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let restored = state.restoration().restore(id).await?;
    Ok(Json(serde_json::json!({
        "restored": true,
        "entity_type": restored.entity_type,
        "row": restored.row,
    })))
}

/// DELETE /api/v1/recycle/{id} -- permanently purge one archive record.
pub async fn purge_one(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.archive().remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/recycle/sweep
///
/// On-demand retention sweep: purge every archive record older than its
/// entity type's retention window and report per-record failures.
pub async fn sweep(State(state): State<AppState>) -> AppResult<Json<SweepReport>> {
    let report = state.sweeper().sweep(Utc::now()).await?;
    Ok(Json(report))
}
