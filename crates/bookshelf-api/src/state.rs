//! Application state

use bookshelf_db::Database;
use metrics_exporter_prometheus::PrometheusHandle;

/// Handle used to render the Prometheus exposition
pub type MetricsHandle = PrometheusHandle;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}
