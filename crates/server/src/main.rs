// Printworks server
// Decision: One explicitly constructed pool, shared with handlers through the router state
// Decision: Graceful shutdown stops accepting connections first, then drains the pool

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use printworks_core::telemetry::{init_telemetry, TelemetryConfig};
use printworks_core::{ChromiumLauncher, Printer};
use printworks_pool::{Pool, PoolError};
use printworks_server::{build_app, ApiKeys, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Optional .env file; real environment variables take precedence
    let _ = dotenvy::dotenv();

    // Initialize telemetry with OpenTelemetry support
    // Configure via environment variables:
    // - OTEL_SERVICE_NAME: Service name (default: "printworks-server")
    // - OTEL_EXPORTER_OTLP_ENDPOINT: OTLP endpoint (e.g., "http://localhost:4317")
    // - RUST_LOG: Log filter (default: "printworks=debug,tower_http=debug")
    let mut telemetry_config = TelemetryConfig::from_env();
    if telemetry_config.service_name == "printworks" {
        telemetry_config.service_name = "printworks-server".to_string();
    }
    telemetry_config.service_version = Some(env!("CARGO_PKG_VERSION").to_string());

    // Keep the guard alive for the lifetime of the application
    let _telemetry_guard = init_telemetry(telemetry_config);

    let config = ServerConfig::parse();
    config.validate().context("Invalid configuration")?;

    tracing::info!("printworks-server starting...");

    let keys = ApiKeys::new(&config.keys);
    if keys.is_enabled() {
        tracing::info!(keys = keys.len(), "Bearer key authentication enabled");
    } else {
        tracing::warn!("No API keys configured, authentication disabled");
    }

    let chromium = config.chromium_config();
    tracing::info!(
        executable = %chromium.executable.display(),
        tmp_dir = %chromium.tmp_dir.display(),
        "Using Chromium engine"
    );

    let pool_config = config.pool_config()?;
    tracing::info!(
        max_workers = pool_config.max_workers,
        priority_levels = pool_config.priority_levels,
        acquire_timeout_ms = pool_config.acquire_timeout.as_millis() as u64,
        "Worker pool configured"
    );
    let pool = Pool::new(ChromiumLauncher::new(chromium), pool_config)
        .context("Failed to create worker pool")?;
    let printer = Printer::new(pool.clone(), config.render_settings());

    if !config.api_prefix.is_empty() {
        tracing::info!(prefix = %config.api_prefix, "API prefix configured");
    }
    let app = build_app(Arc::new(printer), keys, &config.api_prefix);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    tracing::info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("HTTP server stopped, draining worker pool");
    match pool.drain().await {
        Ok(()) => tracing::info!("Worker pool drained"),
        Err(PoolError::DrainTimeout { busy }) => {
            tracing::warn!(busy, "Drain timed out with workers still busy")
        }
        Err(e) => tracing::warn!(error = %e, "Drain failed"),
    }

    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}
