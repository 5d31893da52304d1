//! Tollgate scrape server binary.
//!
//! # Usage
//!
//! ```bash
//! tollgate --service-name catalog --port 9090 --log-level info
//! ```
//!
//! Environment variables can also be used:
//! - `TOLLGATE_SERVICE_NAME`: Metric namespace for the instrumented service
//! - `TOLLGATE_PORT`: Port to listen on
//! - `TOLLGATE_TOP_MODELS_LIMIT`: Models tracked before collapsing to `other`
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)

use tokio::sync::watch;
use tollgate::config::Config;
use tollgate::observability::tracing::init_tracing;
use tollgate::server::run_server;

/// Print startup banner with version and configuration.
fn print_banner(config: &Config) {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!(
        r#"
  Tollgate v{} - Service Telemetry Gateway

  Configuration:
    Service:        {}
    Address:        {}:{}
    Top Models:     {}
    Reset Interval: {}s

  Press Ctrl+C to shutdown gracefully.
"#,
        version,
        config.service_name,
        config.host,
        config.port,
        config.top_models_limit,
        config.model_reset_interval_secs,
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse configuration from CLI arguments and environment
    let config = Config::parse_args();

    // Initialize tracing/logging
    init_tracing(&config.log_level);

    // Print startup banner
    print_banner(&config);

    // Create shutdown signal channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Spawn signal handler task
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm =
                signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

            tokio::select! {
                _ = ctrl_c => {
                    tracing::info!("Received SIGINT (Ctrl+C), initiating shutdown...");
                }
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, initiating shutdown...");
                }
            }
        }

        #[cfg(not(unix))]
        {
            ctrl_c.await.expect("failed to listen for ctrl+c");
            tracing::info!("Received Ctrl+C, initiating shutdown...");
        }

        let _ = shutdown_tx.send(true);
    });

    // Run the server
    run_server(config, shutdown_rx).await?;

    tracing::info!("Tollgate shutdown complete");
    Ok(())
}
