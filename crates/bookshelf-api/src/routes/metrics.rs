//! Prometheus metrics endpoint
//!
//! Mounted outside the application state: it only needs the recorder handle.

use axum::{
    Router,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};
use std::sync::Arc;

use crate::state::MetricsHandle;

/// Content type of the Prometheus text exposition format
const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Routes serving the recorder behind `handle`
pub fn routes(handle: Arc<MetricsHandle>) -> Router {
    Router::new()
        .route("/metrics", get(scrape))
        .with_state(handle)
}

/// GET /metrics
async fn scrape(State(handle): State<Arc<MetricsHandle>>) -> Response {
    // Drop histogram samples that fell out of their summary windows
    handle.run_upkeep();
    (
        [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
        handle.render(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_scrape_renders_recorded_counters() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, || {
            metrics::counter!("bookshelf_requests_total", "resource" => "books", "operation" => "list")
                .increment(2);
        });

        let response = routes(Arc::new(handle))
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            EXPOSITION_CONTENT_TYPE
        );

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("bookshelf_requests_total"));
        assert!(text.contains("resource=\"books\""));
    }
}
