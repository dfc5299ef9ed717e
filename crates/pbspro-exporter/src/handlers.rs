//! HTTP request handlers: scrape endpoint, health check and landing page.

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use tracing::{debug, error, warn};

use pbspro_core::retriever::Retriever;
use pbspro_core::sink::CONTENT_TYPE;
use pbspro_core::{PrometheusSink, SUBSYSTEM};

use crate::state::{AppState, LARGE_SCRAPE_SAMPLES, release_memory_to_os};

// ============================================================
// Health
// ============================================================

pub(crate) async fn handle_health() -> &'static str {
    "ok"
}

// ============================================================
// Landing page
// ============================================================

pub(crate) async fn handle_index<R>(State(state): State<AppState<R>>) -> Html<String> {
    Html(format!(
        "<html>\n\
         <head><title>PBS Pro Exporter</title></head>\n\
         <body>\n\
         <h1>PBS Pro Exporter</h1>\n\
         <p>Version {}</p>\n\
         <p><a href=\"{}\">Metrics</a></p>\n\
         </body>\n\
         </html>\n",
        pbspro_core::VERSION,
        state.telemetry_path
    ))
}

// ============================================================
// Scrape
// ============================================================

/// Runs one collection cycle and renders it.
///
/// Partial and failed cycles still answer 200; their state is visible in
/// the `scrape_*` self-metrics.
pub(crate) async fn handle_metrics<R: Retriever>(State(state): State<AppState<R>>) -> Response {
    let mut sink =
        PrometheusSink::new(&*state.namespace, SUBSYSTEM).with_max_samples(state.max_samples);
    let report = state.collector.collect(&mut sink).await;
    if let Err(e) = sink.record_cycle(&report) {
        warn!(error = %e, "failed to record scrape self-metrics");
    }

    let body = sink.encode();
    let samples = sink.len();
    drop(sink);
    if samples > LARGE_SCRAPE_SAMPLES {
        release_memory_to_os();
        debug!(samples, "memory released after large scrape");
    }

    match body {
        Ok(text) => ([(header::CONTENT_TYPE, CONTENT_TYPE)], text).into_response(),
        Err(e) => {
            error!(error = %e, "failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to encode metrics: {}\n", e),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    use pbspro_core::retriever::mock::MockRetriever;
    use pbspro_core::{Category, Collector, CollectorConfig};

    use super::*;

    fn app(retriever: MockRetriever) -> Router {
        crate::router(AppState::new(Collector::new(
            retriever,
            CollectorConfig::default(),
        )))
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Option<String>, String) {
        let response = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn metrics_exposes_the_cluster() {
        let (status, content_type, body) = get(app(MockRetriever::typical_cluster()), "/metrics").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some(CONTENT_TYPE));
        let total = body
            .lines()
            .find(|l| l.starts_with("pbspro_qstat_server_total_jobs{"))
            .unwrap();
        assert!(total.contains("ServerName=\"headnode\""));
        assert!(total.ends_with(" 42"));
        assert!(body.contains("pbspro_scrape_category_success{category=\"node\"} 1"));
    }

    #[tokio::test]
    async fn failed_cycle_still_answers_ok() {
        let (status, _, body) = get(
            app(MockRetriever::typical_cluster().refuse_connections()),
            "/metrics",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(!body.contains("pbspro_qstat_"));
        for category in Category::ALL {
            let line = format!("pbspro_scrape_category_success{{category=\"{}\"}} 0", category);
            assert!(body.contains(&line), "missing {line}");
        }
    }

    #[tokio::test]
    async fn node_failure_is_reported_per_category() {
        let retriever = MockRetriever::typical_cluster().fail_query(Category::Node, "pbsnodes failed");
        let (status, _, body) = get(app(retriever), "/metrics").await;

        assert_eq!(status, StatusCode::OK);
        assert!(!body.contains("pbspro_qstat_node_pcpus"));
        assert!(body.contains("pbspro_qstat_jobs_priority"));
        assert!(body.contains("pbspro_scrape_category_success{category=\"node\"} 0"));
    }

    #[tokio::test]
    async fn custom_namespace_and_path() {
        let state = AppState::new(Collector::new(
            MockRetriever::typical_cluster(),
            CollectorConfig::default(),
        ))
        .with_namespace("hpc")
        .with_telemetry_path("/scrape");
        let app = crate::router(state);

        let (status, _, body) = get(app.clone(), "/scrape").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("hpc_qstat_queue_total_jobs{"));

        let (status, _, _) = get(app.clone(), "/metrics").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, _, index) = get(app, "/").await;
        assert!(index.contains("href=\"/scrape\""));
    }

    #[tokio::test]
    async fn health_and_index() {
        let (status, _, body) = get(app(MockRetriever::default()), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");

        let (status, _, body) = get(app(MockRetriever::default()), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("href=\"/metrics\""));
    }
}
