//! Content collection endpoints (admin surface).
//!
//! Generic CRUD over the site's auxiliary collections (news, jobs, training
//! images, gallery). Records are free-form JSON; the console owns their
//! shape, the server only stores and identifies them.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post, put},
};
use beacon_common::{AppError, AppResult};
use beacon_store::repositories::ContentCollection;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::{extractors::AdminUser, middleware::AppState, response::ApiResponse};

/// Create content router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{collection}", get(list_records))
        .route("/{collection}", post(add_record))
        .route("/{collection}/{id}", put(update_record))
        .route("/{collection}/{id}", delete(remove_record))
}

fn resolve(slug: &str) -> AppResult<ContentCollection> {
    ContentCollection::from_slug(slug)
        .ok_or_else(|| AppError::NotFound(format!("Unknown content collection: {slug}")))
}

/// List records response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordListResponse {
    pub records: Vec<Value>,
    pub total: u64,
}

/// List all records in a collection, newest first.
async fn list_records(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> AppResult<ApiResponse<RecordListResponse>> {
    let collection = resolve(&collection)?;
    let records = state.content_repo.list(collection).await?;
    let total = records.len() as u64;

    Ok(ApiResponse::ok(RecordListResponse { records, total }))
}

/// Add a record to a collection. The server assigns the ID.
async fn add_record(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Json(record): Json<Value>,
) -> AppResult<ApiResponse<Value>> {
    let collection = resolve(&collection)?;

    info!(collection = ?collection, "Adding content record");

    let record = state.content_repo.add(collection, record).await?;

    Ok(ApiResponse::ok(record))
}

/// Replace a record's fields, keeping its ID.
async fn update_record(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    Json(record): Json<Value>,
) -> AppResult<ApiResponse<Value>> {
    let collection = resolve(&collection)?;

    info!(collection = ?collection, record_id = %id, "Updating content record");

    let record = state.content_repo.update(collection, &id, record).await?;

    Ok(ApiResponse::ok(record))
}

/// Remove a record from a collection.
async fn remove_record(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> AppResult<ApiResponse<()>> {
    let collection = resolve(&collection)?;

    info!(collection = ?collection, record_id = %id, "Removing content record");

    state.content_repo.remove(collection, &id).await?;

    Ok(ApiResponse::ok(()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_rejects_unknown_slug() {
        assert!(resolve("news").is_ok());
        assert!(resolve("training-images").is_ok());
        assert!(matches!(resolve("blog"), Err(AppError::NotFound(_))));
    }
}
