pub mod health;

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /entities/{entity_type}/{id}    DELETE  soft delete into the bin
///
/// /recycle                        GET     paginated bin listing
/// /recycle/sweep                  POST    on-demand retention sweep
/// /recycle/{id}                   GET     archive record detail
/// /recycle/{id}                   DELETE  permanent purge
/// /recycle/{id}/restore           POST    restore into origin table
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/entities/{entity_type}/{id}",
            delete(handlers::recycle::soft_delete_entity),
        )
        .route("/recycle", get(handlers::recycle::list_recycle))
        .route("/recycle/sweep", post(handlers::recycle::sweep))
        .route(
            "/recycle/{id}",
            get(handlers::recycle::get_recycle_record).delete(handlers::recycle::purge_one),
        )
        .route("/recycle/{id}/restore", post(handlers::recycle::restore))
}
