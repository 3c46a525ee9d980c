//! Entity collection routes
//!
//! Every entity gets the same five routes under `/{table}`.

use axum::{
    Json, Router,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    routing::get,
};
use bookshelf_db::Entity;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::state::AppState;

fn record_request<E: Entity>(operation: &'static str) {
    metrics::counter!(
        "bookshelf_requests_total",
        "resource" => E::TABLE,
        "operation" => operation
    )
    .increment(1);
}

/// GET /{table}
async fn list<E: Entity>(State(state): State<AppState>) -> Result<Json<Vec<E>>, ApiError> {
    record_request::<E>("list");
    let records = state.db.repository::<E>().list().await?;
    debug!("Listed {} {}", records.len(), E::TABLE);
    Ok(Json(records))
}

/// GET /{table}/{id}
async fn get_one<E: Entity>(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<E>, ApiError> {
    record_request::<E>("get");
    let Path(id) = path?;
    let record = state.db.repository::<E>().get(id).await?;
    Ok(Json(record))
}

/// POST /{table}
async fn create<E: Entity>(
    State(state): State<AppState>,
    body: Result<Json<E>, JsonRejection>,
) -> Result<Json<E>, ApiError> {
    record_request::<E>("create");
    let Json(record) = body?;
    let created = state.db.repository::<E>().create(record).await?;
    info!("Created {} {}", E::KIND, created.id());
    Ok(Json(created))
}

/// PUT /{table}/{id}
///
/// Replies with the body exactly as submitted, whether or not a row matched.
async fn update<E: Entity>(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    record_request::<E>("update");
    let Path(id) = path?;
    let Json(submitted) = body?;
    let changes: E::Changes = serde_json::from_value(submitted.clone())
        .map_err(|e| ApiError::BadRequest(format!("Invalid {} fields: {}", E::KIND, e)))?;

    let affected = state.db.repository::<E>().update(id, &changes).await?;
    if affected == 0 {
        warn!("Update of {} {} changed no rows", E::KIND, id);
    } else {
        info!("Updated {} {}", E::KIND, id);
    }
    Ok(Json(submitted))
}

/// DELETE /{table}/{id}
async fn remove<E: Entity>(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<String, ApiError> {
    record_request::<E>("delete");
    let Path(id) = path?;

    let affected = state.db.repository::<E>().delete(id).await?;
    if affected > 0 {
        info!("Deleted {} {}", E::KIND, id);
    } else {
        debug!("Delete of {} {} matched no rows", E::KIND, id);
    }
    Ok(format!("{} {} deleted", E::KIND, id))
}

/// Create the routes for one entity
pub fn routes<E: Entity>() -> Router<AppState> {
    let collection = format!("/{}", E::TABLE);
    let member = format!("/{}/{{id}}", E::TABLE);

    Router::new()
        .route(&collection, get(list::<E>).post(create::<E>))
        .route(
            &member,
            get(get_one::<E>).put(update::<E>).delete(remove::<E>),
        )
}
