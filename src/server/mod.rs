//! HTTP servers
//!
//! ```text
//!                ┌──────────────────────────────┐
//!  GET /{metric} │ main listener                │
//! ──────────────▶│ rate limit ─▶ MetricPipeline │──▶ JSON / SVG
//!                └──────────────────────────────┘
//!                ┌──────────────────────────────┐
//!  /healthz      │ health listener              │
//! ──────────────▶│ liveness, readiness, metrics │──▶ text
//!                └──────────────────────────────┘
//! ```
//!
//! Both listeners stop accepting when the shutdown token is cancelled and
//! then drain open connections for up to [`SHUTDOWN_GRACE`].

pub mod health;
pub mod params;
pub mod ratelimit;

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::{HeaderValue, ALLOW, CONTENT_TYPE, RETRY_AFTER};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::Result;
use crate::metrics::ServeMetrics;
use crate::pipeline::{MetricPipeline, MetricRequest, RenderedResponse};

pub use health::HealthCheck;
pub use params::RequestParams;
pub use ratelimit::{Decision, RateLimitConfig, RateLimitKey, RateLimiter};

/// How long open connections may take to finish after shutdown.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";

// =============================================================================
// Main Server
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct ServerOptions {
    /// Deadline for reading request headers
    pub read_timeout: Option<Duration>,
    /// Deadline for producing a response
    pub write_timeout: Option<Duration>,
    /// Log one line per served request
    pub access_log: bool,
}

/// Shared state of the main listener.
#[derive(Debug)]
pub struct AppState {
    pipeline: MetricPipeline,
    limiter: Option<RateLimiter>,
    options: ServerOptions,
}

impl AppState {
    pub fn new(pipeline: MetricPipeline, limiter: Option<RateLimiter>, options: ServerOptions) -> Self {
        Self {
            pipeline,
            limiter,
            options,
        }
    }
}

/// Serve metric requests until `shutdown` is cancelled.
///
/// Readiness is raised once accepting and dropped when draining starts.
pub async fn serve_metrics(
    listener: TcpListener,
    state: Arc<AppState>,
    health: Arc<HealthCheck>,
    shutdown: CancellationToken,
) -> Result<()> {
    info!(addr = ?listener.local_addr().ok(), "Metric server listening");

    let read_timeout = state.options.read_timeout;
    let handler = move |req, peer| handle_metric(state.clone(), req, peer);

    health.set_ready(true);
    let draining = move || health.set_ready(false);

    serve_connections("metrics", listener, read_timeout, shutdown, handler, draining).await
}

async fn handle_metric(state: Arc<AppState>, req: Request<Incoming>, peer: SocketAddr) -> Response<Full<Bytes>> {
    let started = Instant::now();
    let params = RequestParams::from_uri(req.uri());
    let span = info_span!(
        "request",
        method = %req.method(),
        path = %req.uri().path(),
        metric = %params.metric,
        format = %params.format,
        request_id = %Uuid::new_v4(),
    );

    async move {
        let request = MetricRequest::new(params.metric, &params.format, &params.style);
        let pipeline = &state.pipeline;
        let mut retry_after = None;

        let rendered = if req.method() != Method::GET && req.method() != Method::HEAD {
            warn!("Method not allowed");
            RenderedResponse::error(&request.metric, "Method Not Allowed", StatusCode::METHOD_NOT_ALLOWED)
        } else if let Some(Decision::Limited { retry_after: wait }) = state
            .limiter
            .as_ref()
            .map(|limiter| limiter.check(&limiter.key_for(req.headers(), peer.ip())))
        {
            warn!(client = %peer, "Rate limit exceeded");
            retry_after = Some(wait.as_secs().max(1));
            RenderedResponse::error(&request.metric, "Too Many Requests", StatusCode::TOO_MANY_REQUESTS)
        } else {
            match state.options.write_timeout {
                Some(deadline) => tokio::time::timeout(deadline, pipeline.handle(&request))
                    .await
                    .unwrap_or_else(|_| {
                        error!(timeout_ms = deadline.as_millis() as u64, "Write deadline exceeded");
                        RenderedResponse::error(&request.metric, "Timeout", StatusCode::GATEWAY_TIMEOUT)
                    }),
                None => pipeline.handle(&request).await,
            }
        };

        let elapsed = started.elapsed();
        pipeline.metrics().observe_request(
            pipeline.metric_label(&request.metric),
            request.format.as_str(),
            request.style.as_str(),
            rendered.status.as_u16(),
            elapsed,
        );

        if state.options.access_log {
            info!(
                status = rendered.status.as_u16(),
                elapsed_ms = elapsed.as_millis() as u64,
                remote = %peer,
                "Served request"
            );
        }

        let mut response = into_response(rendered.status, HeaderValue::from_static(rendered.content_type), rendered.body);
        if rendered.status == StatusCode::METHOD_NOT_ALLOWED {
            response.headers_mut().insert(ALLOW, HeaderValue::from_static("GET, HEAD"));
        }
        if let Some(secs) = retry_after {
            response.headers_mut().insert(RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
    .instrument(span)
    .await
}

// =============================================================================
// Health Server
// =============================================================================

/// Serve liveness, readiness and self-metrics until `shutdown` is cancelled.
pub async fn serve_health(
    listener: TcpListener,
    health: Arc<HealthCheck>,
    metrics: Arc<ServeMetrics>,
    shutdown: CancellationToken,
) -> Result<()> {
    info!(addr = ?listener.local_addr().ok(), "Health server listening");

    let handler = move |req: Request<Incoming>, _peer: SocketAddr| {
        let response = health_response(&health, &metrics, req.uri().path());
        async move { response }
    };

    serve_connections("health", listener, None, shutdown, handler, || {}).await
}

fn health_response(health: &HealthCheck, metrics: &ServeMetrics, path: &str) -> Response<Full<Bytes>> {
    let flag = |up: bool| {
        if up {
            text(StatusCode::OK, "OK")
        } else {
            text(StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable")
        }
    };

    match path {
        // Answering at all is proof of liveness
        "/healthz" | "/-/health" => flag(true),
        "/readyz" | "/-/ready" => flag(health.is_ready()),
        "/metrics" => match metrics.encode() {
            Ok((content_type, body)) => into_response(
                StatusCode::OK,
                HeaderValue::from_str(&content_type).unwrap_or_else(|_| HeaderValue::from_static(CONTENT_TYPE_TEXT)),
                Bytes::from(body),
            ),
            Err(e) => {
                error!(error = %e, "Failed to encode metrics");
                text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Error")
            }
        },
        _ => text(StatusCode::NOT_FOUND, "Not Found"),
    }
}

// =============================================================================
// Connection Handling
// =============================================================================

/// Accept loop shared by both listeners. `on_drain` runs once accepting stops.
async fn serve_connections<H, F, D>(
    name: &'static str,
    listener: TcpListener,
    read_timeout: Option<Duration>,
    shutdown: CancellationToken,
    handler: H,
    on_drain: D,
) -> Result<()>
where
    H: Fn(Request<Incoming>, SocketAddr) -> F + Clone + Send + Sync + 'static,
    F: Future<Output = Response<Full<Bytes>>> + Send + 'static,
    D: FnOnce(),
{
    let mut builder = http1::Builder::new();
    builder.timer(TokioTimer::new());
    if let Some(timeout) = read_timeout {
        builder.header_read_timeout(timeout);
    }

    let graceful = GracefulShutdown::new();

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(server = name, error = %e, "Failed to accept connection");
                    continue;
                }
            },
            _ = shutdown.cancelled() => break,
        };

        let handler = handler.clone();
        let service = service_fn(move |req| {
            let response = handler(req, peer);
            async move { Ok::<_, Infallible>(response.await) }
        });

        let conn = graceful.watch(builder.serve_connection(TokioIo::new(stream), service));
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(server = name, error = %e, "Connection closed with error");
            }
        });
    }

    drop(listener);
    on_drain();
    info!(server = name, "Draining connections");

    tokio::select! {
        _ = graceful.shutdown() => info!(server = name, "All connections closed"),
        _ = tokio::time::sleep(SHUTDOWN_GRACE) => {
            warn!(server = name, "Timed out waiting for connections to close")
        }
    }

    Ok(())
}

fn into_response(status: StatusCode, content_type: HeaderValue, body: Bytes) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response.headers_mut().insert(CONTENT_TYPE, content_type);
    response
}

fn text(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    into_response(status, HeaderValue::from_static(CONTENT_TYPE_TEXT), Bytes::from_static(body.as_bytes()))
}
