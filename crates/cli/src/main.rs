//! Order relay daemon entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Load configuration** from the environment and validate it into an
//!    immutable [`relay::ListenerConfig`].
//! 2. **Wire observability**: JSON `tracing` output, plus an OpenTelemetry
//!    OTLP span exporter when enabled.
//! 3. **Construct infrastructure**: the HTTP forwarder, the Application
//!    Insights reporter (only when a telemetry key is set), and the Event Hubs
//!    connector, and inject them into a [`listener::Listener`].
//! 4. **Run** the receive loop until SIGINT/SIGTERM.
//!
//! Exits non-zero if configuration is invalid or the receiver cannot be opened.

mod config;
mod telemetry;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::config::ServiceConfig;
use crate::telemetry::{init_telemetry, shutdown_telemetry, TelemetryConfig};

use insights::ApplicationInsightsReporter;
use listener::{EventHubConnector, Listener};
use relay::{ListenerConfig, MessageHandler, TelemetryReporter};
use webhook::HttpForwarder;

#[tokio::main]
async fn main() {
    let service_config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let tracer_provider = match init_telemetry(&TelemetryConfig {
        service_name: service_config.otel_service_name.clone(),
        otel_endpoint: service_config.otel_endpoint.clone(),
        otel_enabled: service_config.otel_enabled,
        log_level: service_config.log_level.clone(),
    }) {
        Ok(provider) => provider,
        Err(e) => {
            eprintln!("Failed to initialize telemetry: {}", e);
            std::process::exit(1);
        }
    };

    let outcome = run(&service_config).await;

    if let Err(e) = &outcome {
        error!(error = ?e, "Event listener failed to start");
    }
    shutdown_telemetry(tracer_provider);

    if outcome.is_err() {
        std::process::exit(1);
    }
}

async fn run(service_config: &ServiceConfig) -> Result<()> {
    let config = ListenerConfig::from_raw(service_config.listener_settings())
        .context("Invalid listener configuration")?;
    info!(
        otel_enabled = service_config.otel_enabled,
        config = ?config,
        "Starting event listener"
    );

    let forwarder = HttpForwarder::new(config.process_endpoint(), config.forward_timeout())
        .context("Failed to create forwarder")?;

    let telemetry: Option<Arc<dyn TelemetryReporter>> = match config.insights_key() {
        Some(key) => {
            let reporter =
                ApplicationInsightsReporter::new(key, Some(config.source().to_string()))
                    .context("Failed to create telemetry reporter")?;
            info!(
                ingestion_endpoint = %reporter.key().ingestion_endpoint(),
                "Telemetry enabled"
            );
            Some(Arc::new(reporter) as Arc<dyn TelemetryReporter>)
        }
        None => {
            info!("Telemetry disabled: no INSIGHTSKEY configured");
            None
        }
    };

    let handler = Arc::new(MessageHandler::new(
        config.source().clone(),
        Arc::new(forwarder),
        telemetry,
    ));

    let connector =
        EventHubConnector::from_config(&config).context("Invalid event hub settings")?;
    let mut listener = Listener::new(Arc::new(connector), handler, config.partition().clone());

    let receiver = listener
        .connect()
        .await
        .context("Failed to open event hub receiver")?;

    tokio::select! {
        summary = listener.receive(receiver) => {
            info!(summary = ?summary, "Receiver closed");
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received, stopping event listener");
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
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
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
