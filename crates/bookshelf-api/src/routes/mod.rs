//! API routes

mod health;
pub mod metrics;
mod resources;

use axum::{Router, http::Uri};
use bookshelf_db::{Author, Book, Genre};
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::{AppState, MetricsHandle};

/// Unmatched paths get the same JSON error shape as everything else
async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {}", uri.path()))
}

/// Create the main router
pub fn create_router(state: AppState, metrics_handle: Option<Arc<MetricsHandle>>) -> Router {
    let mut router = Router::new()
        // Health check
        .merge(health::routes())
        // Entity collections
        .merge(resources::routes::<Author>())
        .merge(resources::routes::<Genre>())
        .merge(resources::routes::<Book>())
        .with_state(state);

    // Add metrics endpoint if handle is provided
    if let Some(handle) = metrics_handle {
        router = router.merge(metrics::routes(handle));
    }

    router.fallback(not_found)
}
