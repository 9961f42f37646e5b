//! CaseDesk console
//!
//! Interactive text front end for the case-analysis backend.
//! Handles:
//! - Configuration and observability setup
//! - Reading commands from stdin
//! - Applying backend completions as they arrive
//! - Re-rendering the current view after every change

use anyhow::Context;
use casedesk_common::{
    config::{AppConfig, ObservabilityConfig},
    metrics::{self, BACKEND_BUCKETS, METRICS_PREFIX},
    CaseBackend, HttpCaseClient,
};
use casedesk_dashboard::{console, Dashboard, Event};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{self, BufReader};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    init_tracing(&config.observability);
    info!(
        service = %config.observability.service_name,
        "Starting CaseDesk v{}",
        casedesk_common::VERSION
    );

    config.validate()?;
    init_metrics(&config.observability)?;

    let client = HttpCaseClient::from_config(&config)?;
    info!(backend = %client.base_url(), "Using case backend");

    let backend: Arc<dyn CaseBackend> = Arc::new(client);
    let (mut dashboard, mut completions) = Dashboard::new(backend);

    dashboard.dispatch(Event::Refresh);

    // Ctrl+C exits at once; closed stdin lets in-flight commands finish first
    console::run(
        &mut dashboard,
        &mut completions,
        BufReader::new(io::stdin()),
        &mut std::io::stdout(),
        shutdown_signal(),
    )
    .await?;

    info!(in_flight = dashboard.in_flight(), "Shutting down");
    Ok(())
}

/// Logs go to stderr; stdout carries the rendered views
fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn init_metrics(config: &ObservabilityConfig) -> anyhow::Result<()> {
    if config.metrics_port > 0 {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
        PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Full(format!("{}_backend_request_duration_seconds", METRICS_PREFIX)),
                BACKEND_BUCKETS,
            )?
            .with_http_listener(addr)
            .install()
            .context("Failed to start metrics exporter")?;
        info!(%addr, "Prometheus exporter listening");
    }
    metrics::register_metrics();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, starting shutdown...");
}
