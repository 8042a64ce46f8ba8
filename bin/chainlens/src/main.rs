//! chainlens - command-line client for the explorer data layer.
//!
//! Wires the GraphQL executor, the configured entity sources and the
//! runtime spec cache into an [`ExplorerService`], then runs one query.

mod cli;
mod commands;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};
use url::Url;

use chainlens_adapters::{DictionarySpecSource, SourceRegistry};
use chainlens_core::error::{DataError, DomainError};
use chainlens_core::metrics::init_metrics;
use chainlens_core::services::{ExplorerService, RuntimeSpecCache};
use chainlens_graphql::{ClientConfig, HttpExecutor};
use chainlens_substrate::{Ss58Codec, ScaleMetadataDecoder};

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs);

    // Prometheus metrics exporter (optional - failures don't crash the app)
    if let Some(port) = cli.metrics_port {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
        match PrometheusBuilder::new().with_http_listener(addr).install() {
            Ok(()) => {
                init_metrics();
                info!("📊 Metrics: http://{}/metrics", addr);
            }
            Err(e) => {
                warn!("⚠️  Failed to start metrics exporter: {}. Continuing without metrics.", e);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Backends
    // ─────────────────────────────────────────────────────────────────────────
    let selection = cli.backends.selection();
    let mut config = ClientConfig {
        timeout: Duration::from_secs(cli.timeout_secs),
        ..ClientConfig::default()
    };
    for (backend, url) in cli.endpoints.configured() {
        debug!(%backend, url = %mask_credentials(url), "Endpoint configured");
        config = config.with_endpoint(backend, url.clone());
    }
    for backend in selection.required_backends() {
        if config.endpoint(backend).is_none() {
            warn!(%backend, "⚠️  No endpoint configured, queries to this backend will fail");
        }
    }

    let executor = Arc::new(HttpExecutor::new(config).context("Failed to build HTTP client")?);
    let addresses = Arc::new(Ss58Codec);
    let registry = SourceRegistry::build(&selection, executor.clone(), addresses.clone())?;

    // ─────────────────────────────────────────────────────────────────────────
    // Explorer service
    // ─────────────────────────────────────────────────────────────────────────
    let specs = Arc::new(RuntimeSpecCache::new(
        Arc::new(DictionarySpecSource::new(executor)),
        Arc::new(ScaleMetadataDecoder),
    ));
    let explorer = Arc::new(ExplorerService::new(Arc::new(registry), specs, addresses));

    // ─────────────────────────────────────────────────────────────────────────
    // Run
    // ─────────────────────────────────────────────────────────────────────────
    if let Err(e) = commands::run(explorer, cli.command, cli.with_metadata).await {
        report(&e);
        std::process::exit(1);
    }
    Ok(())
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries command output
    if json {
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }
}

/// Print a failure the way the user should read it.
fn report(e: &anyhow::Error) {
    let invalid_input = e.chain().any(|cause| {
        if let Some(data) = cause.downcast_ref::<DataError>() {
            return data.is_invalid_input();
        }
        matches!(
            cause.downcast_ref::<DomainError>(),
            Some(DomainError::InvalidPagination(_) | DomainError::InvalidFilter(_))
        )
    });

    if invalid_input {
        eprintln!("Invalid input: {:#}", e);
    } else {
        error!(error = %format!("{:#}", e), "Query failed");
        eprintln!("Unexpected error: {:#}", e);
    }
}

fn mask_credentials(url: &Url) -> String {
    let mut url = url.clone();
    if url.password().is_some() {
        let _ = url.set_password(Some("****"));
    }
    url.to_string()
}

pub(crate) async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("⚠️  Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("⚠️  Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
