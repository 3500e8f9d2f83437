use std::{borrow::Cow, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use log::{debug, error, info};
use prometheus::{Encoder, TextEncoder, proto::MetricFamily};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::{
    ExporterConfig, MetricsCollector, ReleaseClient, ReleasesCollector, Repository, StdResult,
};

const LANDING_PAGE: &str = r#"<html>
<head><title>GitHub Releases Exporter</title></head>
<body>
<h1>GitHub Releases Exporter</h1>
<p><a href="/metrics">Metrics</a></p>
<form action="/probe" method="get">
<input type="text" name="target" placeholder="owner/name">
<input type="submit" value="Probe">
</form>
</body>
</html>
"#;

#[derive(Clone)]
struct ServerState {
    collector: Arc<dyn MetricsCollector>,
    client: Arc<dyn ReleaseClient>,
}

#[derive(Debug, Deserialize)]
struct ProbeParams {
    target: Option<String>,
}

#[derive(Debug)]
struct ApiError {
    status_code: StatusCode,
    message: Cow<'static, str>,
}

impl ApiError {
    #[inline]
    fn bad_request(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            status_code: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    #[inline]
    fn internal(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            status_code: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code, self.message).into_response()
    }
}

fn encode(families: &[MetricFamily]) -> Result<Response, ApiError> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(families, &mut buffer).map_err(|e| {
        error!("Failed to encode metrics: {e}");
        ApiError::internal("failed to encode metrics")
    })?;

    Ok((
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response())
}

async fn landing() -> Html<&'static str> {
    Html(LANDING_PAGE)
}

async fn metrics(State(state): State<ServerState>) -> Result<Response, ApiError> {
    let families = state.collector.collect().await.map_err(|e| {
        error!("Failed to collect metrics: {e:#}");
        ApiError::internal("failed to collect metrics")
    })?;

    encode(&families)
}

async fn probe(
    State(state): State<ServerState>,
    Query(params): Query<ProbeParams>,
) -> Result<Response, ApiError> {
    let target = params
        .target
        .filter(|target| !target.is_empty())
        .ok_or_else(|| ApiError::bad_request("target parameter is missing"))?;
    let repository = target
        .parse::<Repository>()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    debug!("Probing {repository}");
    let collector =
        ReleasesCollector::try_new(state.client.clone(), ExporterConfig::single(repository))
            .map_err(|e| {
                error!("Failed to create probe collector: {e:#}");
                ApiError::internal("failed to create collector")
            })?;
    let families = collector.collect().await.map_err(|e| {
        error!("Failed to probe {target}: {e:#}");
        ApiError::internal("failed to collect metrics")
    })?;

    encode(&families)
}

/// Serves the landing page, the `/metrics` endpoint and the `/probe` endpoint.
pub struct MetricsServer {
    /// The collector behind `/metrics`.
    collector: Arc<dyn MetricsCollector>,

    /// The client shared by the per-request `/probe` collectors.
    client: Arc<dyn ReleaseClient>,
}

impl MetricsServer {
    /// Creates a new `MetricsServer` instance.
    pub fn new(collector: Arc<dyn MetricsCollector>, client: Arc<dyn ReleaseClient>) -> Self {
        Self { collector, client }
    }

    fn build_router(&self) -> Router {
        Router::new()
            .route("/", get(landing))
            .route("/metrics", get(metrics))
            .route("/probe", get(probe))
            .with_state(ServerState {
                collector: self.collector.clone(),
                client: self.client.clone(),
            })
    }

    /// Listens on the given address until the shutdown token is cancelled.
    pub async fn serve(&self, bind: SocketAddr, shutdown: CancellationToken) -> StdResult<()> {
        let listener = TcpListener::bind(bind)
            .await
            .with_context(|| format!("Failed to bind {bind}"))?;
        info!("Listening on http://{bind}");

        axum::serve(listener, self.build_router())
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                info!("Metrics server shutting down...");
            })
            .await
            .context("Metrics server crashed")
    }
}
