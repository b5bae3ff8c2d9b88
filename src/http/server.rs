//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, body limit, request ID, concurrency)
//! - Bind server to listener
//! - Forward transcription uploads to the upstream STT service
//! - Map every failure to exactly one terminal response

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, FromRequest, Multipart, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Semaphore};
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::error::{Outcome, ProxyError};
use crate::http::request::{self, MakeRequestUuid, X_REQUEST_ID};
use crate::http::response::{content_disposition, download_filename, relay};
use crate::lifecycle::shutdown;
use crate::observability::metrics;
use crate::upstream::{resolve_endpoint, UpstreamClient};

/// Route accepting transcription uploads.
pub const TRANSCRIBE_PATH: &str = "/api/stt";

/// Liveness route.
pub const HEALTH_PATH: &str = "/health";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub upstream: UpstreamClient,
    /// Bounds concurrent transcriptions; excess requests wait for a slot.
    pub transcription_slots: Arc<Semaphore>,
}

/// HTTP server for the transcription proxy.
pub struct HttpServer {
    router: Router,
    config: Arc<ProxyConfig>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, reqwest::Error> {
        let config = Arc::new(config);
        let upstream = UpstreamClient::new(&config.upstream)?;

        let state = AppState {
            config: config.clone(),
            upstream,
            transcription_slots: Arc::new(Semaphore::new(config.listener.max_concurrent_requests)),
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route(TRANSCRIBE_PATH, post(transcribe_handler))
            .route(HEALTH_PATH, get(health_handler))
            .with_state(state)
            // The tower-http limit below governs multipart bodies instead
            .layer(DefaultBodyLimit::disable())
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                        tracing::info_span!(
                            "request",
                            method = %req.method(),
                            uri = %req.uri(),
                            request_id = %request::request_id(req)
                        )
                    }))
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                    .layer(RequestBodyLimitLayer::new(config.limits.max_upload_bytes)),
            )
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            endpoint_env = %self.config.upstream.endpoint_env,
            upstream_timeout_secs = self.config.upstream.timeout_secs,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::notified(shutdown_rx))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Transcription handler.
///
/// `Received → Validating → Forwarding → {Relaying | TimedOut | Failed}`;
/// whatever happens, exactly one response leaves here.
async fn transcribe_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request::request_id(&request);

    let (outcome, response) = match forward(&state, request, &request_id).await {
        Ok(response) => (Outcome::Relayed, response),
        Err(e) => {
            let outcome = e.outcome();
            match outcome {
                Outcome::Rejected => {
                    tracing::debug!(request_id = %request_id, error = %e, "Upload rejected");
                }
                Outcome::TimedOut => {
                    tracing::warn!(request_id = %request_id, error = %e, "Upstream timed out, request cancelled");
                }
                Outcome::Failed | Outcome::Relayed => {
                    tracing::error!(request_id = %request_id, error = %e, "Transcription proxy error");
                }
            }
            (outcome, e.into_response())
        }
    };

    metrics::record_request(outcome, response.status().as_u16(), start_time);
    response
}

async fn forward(
    state: &AppState,
    request: Request<Body>,
    request_id: &str,
) -> Result<Response, ProxyError> {
    let _slot = state.transcription_slots.acquire().await?;

    // Configuration is checked before the body is touched
    let endpoint = resolve_endpoint(&state.config.upstream.endpoint_env)?;

    let mut multipart = Multipart::from_request(request, &()).await?;
    let upload = request::read_upload(&mut multipart).await?;

    let filename = download_filename(upload.file.filename(), &upload.response_format);
    let disposition = content_disposition(&filename)?;

    tracing::debug!(
        request_id = %request_id,
        upstream = %endpoint,
        bytes = upload.file.data.len(),
        response_format = %upload.response_format,
        "Forwarding upload"
    );
    metrics::record_upload(upload.file.data.len());

    let upstream = state.upstream.transcribe(endpoint, upload, request_id).await?;

    tracing::info!(
        request_id = %request_id,
        status = %upstream.status(),
        filename = %filename,
        "Relaying upstream response"
    );

    relay(upstream, disposition)
}

#[derive(Serialize)]
struct HealthStatus {
    status: &'static str,
    version: &'static str,
    upstream_configured: bool,
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let upstream_configured = resolve_endpoint(&state.config.upstream.endpoint_env).is_ok();

    (
        StatusCode::OK,
        Json(HealthStatus {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
            upstream_configured,
        }),
    )
}
