//! kromgo
//!
//! Serves pre-configured Prometheus queries as badges.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            kromgo                               │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐    ┌──────────────┐    ┌──────────────┐       │
//! │  │    Metric    │───▶│   Pipeline   │───▶│  Prometheus  │       │
//! │  │    Server    │    │              │    │    Client    │       │
//! │  └──────────────┘    └──────────────┘    └──────────────┘       │
//! │  ┌──────────────┐                                               │
//! │  │    Health    │  /healthz /readyz /metrics                    │
//! │  │    Server    │                                               │
//! │  └──────────────┘                                               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use kromgo::adapters::{PrometheusClient, PrometheusConfig, SvgBadgeRenderer};
use kromgo::config::{KromgoConfig, DEFAULT_CONFIG_PATH};
use kromgo::metrics::ServeMetrics;
use kromgo::pipeline::MetricPipeline;
use kromgo::server::{
    self, AppState, HealthCheck, RateLimitConfig, RateLimitKey, RateLimiter, ServerOptions,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// kromgo - Prometheus query results as shields.io badges
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(long, env = "CONFIG_PATH", default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Print the JSON Schema of the configuration file and exit
    #[arg(long)]
    jsonschema: bool,

    /// Prometheus server URL, overrides the configuration file
    #[arg(long, env = "PROMETHEUS_URL")]
    prometheus_url: Option<String>,

    /// Metric server host
    #[arg(long, env = "SERVER_HOST", default_value = "localhost")]
    server_host: String,

    /// Metric server port
    #[arg(long, env = "SERVER_PORT", default_value = "8080")]
    server_port: u16,

    /// Health server host
    #[arg(long, env = "HEALTH_HOST", default_value = "localhost")]
    health_host: String,

    /// Health server port
    #[arg(long, env = "HEALTH_PORT", default_value = "8888")]
    health_port: u16,

    /// Header read timeout in seconds (0 disables)
    #[arg(long, env = "SERVER_READ_TIMEOUT_SECS", default_value = "0")]
    server_read_timeout_secs: u64,

    /// Response deadline in seconds (0 disables)
    #[arg(long, env = "SERVER_WRITE_TIMEOUT_SECS", default_value = "0")]
    server_write_timeout_secs: u64,

    /// Log every served request
    #[arg(long, env = "SERVER_LOGGING")]
    server_logging: bool,

    /// Prometheus query timeout in seconds
    #[arg(long, env = "QUERY_TIMEOUT_SECS", default_value = "30")]
    query_timeout_secs: u64,

    /// Enable request rate limiting
    #[arg(long, env = "RATELIMIT_ENABLE")]
    ratelimit_enable: bool,

    /// Share one rate limit bucket between all clients
    #[arg(long, env = "RATELIMIT_ALL")]
    ratelimit_all: bool,

    /// Key rate limits by X-Real-IP / X-Forwarded-For
    #[arg(long, env = "RATELIMIT_BY_REAL_IP")]
    ratelimit_by_real_ip: bool,

    /// Requests allowed per window
    #[arg(long, env = "RATELIMIT_REQUEST_LIMIT", default_value = "100")]
    ratelimit_request_limit: u32,

    /// Rate limit window length in seconds
    #[arg(long, env = "RATELIMIT_WINDOW_LENGTH_SECS", default_value = "60")]
    ratelimit_window_length_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

impl Args {
    fn rate_limiter(&self) -> anyhow::Result<Option<RateLimiter>> {
        if !self.ratelimit_enable {
            return Ok(None);
        }
        anyhow::ensure!(
            self.ratelimit_request_limit > 0,
            "RATELIMIT_REQUEST_LIMIT must be greater than zero"
        );
        anyhow::ensure!(
            self.ratelimit_window_length_secs > 0,
            "RATELIMIT_WINDOW_LENGTH_SECS must be greater than zero"
        );

        let key = if self.ratelimit_all {
            RateLimitKey::All
        } else if self.ratelimit_by_real_ip {
            RateLimitKey::RealIp
        } else {
            RateLimitKey::PeerIp
        };

        Ok(Some(RateLimiter::new(RateLimitConfig {
            key,
            request_limit: self.ratelimit_request_limit,
            window: Duration::from_secs(self.ratelimit_window_length_secs),
        })))
    }

    fn server_options(&self) -> ServerOptions {
        let secs = |s: u64| (s > 0).then(|| Duration::from_secs(s));
        ServerOptions {
            read_timeout: secs(self.server_read_timeout_secs),
            write_timeout: secs(self.server_write_timeout_secs),
            access_log: self.server_logging,
        }
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.jsonschema {
        println!("{}", KromgoConfig::json_schema()?);
        return Ok(());
    }

    let config = KromgoConfig::load(&args.config)
        .with_context(|| format!("failed to load configuration from {}", args.config))?;

    init_logging(&args, config.debug);

    let catalog = config.catalog().context("invalid metric configuration")?;
    let prometheus_url = config.prometheus_url(args.prometheus_url.as_deref())?;

    info!("Starting kromgo");
    info!("  Config: {}", args.config);
    info!("  Metrics: {}", catalog.len());
    info!("  Prometheus URL: {}", prometheus_url);
    info!("  Rate limiting: {}", args.ratelimit_enable);

    let client = PrometheusClient::new(PrometheusConfig {
        prometheus_url,
        query_timeout: Duration::from_secs(args.query_timeout_secs),
    })?;

    if let Err(e) = client.health_check().await {
        warn!("Prometheus health check failed: {}", e);
        warn!("Continuing anyway - queries will fail until Prometheus is reachable");
    } else {
        info!("Prometheus connection healthy");
    }

    let metrics = Arc::new(ServeMetrics::new()?);
    let pipeline = MetricPipeline::new(
        Arc::new(catalog),
        Arc::new(client),
        Some(Arc::new(SvgBadgeRenderer::from_config(&config.badge))),
        metrics.clone(),
    );
    let state = Arc::new(AppState::new(pipeline, args.rate_limiter()?, args.server_options()));
    let health = Arc::new(HealthCheck::new());
    let shutdown = CancellationToken::new();

    let server_addr = format!("{}:{}", args.server_host, args.server_port);
    let server_listener = TcpListener::bind(&server_addr)
        .await
        .with_context(|| format!("failed to bind metric server to {}", server_addr))?;

    let health_addr = format!("{}:{}", args.health_host, args.health_port);
    let health_listener = TcpListener::bind(&health_addr)
        .await
        .with_context(|| format!("failed to bind health server to {}", health_addr))?;

    let health_server = tokio::spawn(server::serve_health(
        health_listener,
        health.clone(),
        metrics,
        shutdown.clone(),
    ));
    let metric_server = tokio::spawn(server::serve_metrics(
        server_listener,
        state,
        health,
        shutdown.clone(),
    ));

    if let Err(e) = wait_for_signal().await {
        error!("Failed to listen for shutdown signals: {}", e);
    }
    info!("Shutting down");
    shutdown.cancel();

    for (name, handle) in [("metric", metric_server), ("health", health_server)] {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("{} server error: {}", name, e),
            Err(e) => error!("{} server task failed: {}", name, e),
        }
    }

    info!("Shutdown complete");
    Ok(())
}

// =============================================================================
// Signals
// =============================================================================

#[cfg(unix)]
async fn wait_for_signal() -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    let mut hangup = signal(SignalKind::hangup())?;
    let mut quit = signal(SignalKind::quit())?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = terminate.recv() => {}
        _ = hangup.recv() => {}
        _ = quit.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_signal() -> anyhow::Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args, debug: bool) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let level = if debug && level < Level::DEBUG {
        Level::DEBUG
    } else {
        level
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "reqwest=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
