use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use prometheus::{Registry, TextEncoder};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Router exposing the registry at `GET /metrics` in Prometheus text format.
pub fn metrics_router(registry: Registry) -> Router {
    Router::new()
        .route("/metrics", get(serve_metrics))
        .with_state(registry)
}

async fn serve_metrics(State(registry): State<Registry>) -> impl IntoResponse {
    let encoder = TextEncoder::new();
    match encoder.encode_to_string(&registry.gather()) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Serve the scrape endpoint until cancellation.
pub async fn serve(addr: &str, registry: Registry, ctx: CancellationToken) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", addr))?;

    info!(addr = %addr, "metrics endpoint listening");

    axum::serve(listener, metrics_router(registry))
        .with_graceful_shutdown(ctx.cancelled_owned())
        .await
        .context("metrics server error")?;

    info!("metrics endpoint stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PrometheusMetricsSink;
    use collector_domain::MetricsSink;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_metrics_route_renders_counters() {
        let registry = Registry::new();
        let sink = PrometheusMetricsSink::new(&registry);
        sink.events_processed("facebook");

        let router = metrics_router(registry);
        let response = router
            .oneshot(
                axum::http::Request::builder()
                    .uri("/metrics")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("events_processed_total"));
        assert!(text.contains("source=\"facebook\""));
    }
}
