//! Configuration parsing for the Tollgate scrape server.
//!
//! Supports:
//! - CLI arguments via clap
//! - Environment variable overrides
//! - Sensible defaults for quick start

use clap::Parser;

/// Tollgate: service telemetry with bounded cardinality and network gating.
#[derive(Parser, Debug, Clone)]
#[command(name = "tollgate")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Name of the instrumented service, used as the metric namespace
    #[arg(long, env = "TOLLGATE_SERVICE_NAME", default_value = "catalog")]
    pub service_name: String,

    /// Host address to bind to
    #[arg(long, env = "TOLLGATE_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "TOLLGATE_PORT", default_value_t = 9090)]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Number of models tracked individually before collapsing into `other`
    #[arg(long, env = "TOLLGATE_TOP_MODELS_LIMIT", default_value_t = 20)]
    pub top_models_limit: usize,

    /// Seconds between model frequency-table resets
    #[arg(
        long,
        env = "TOLLGATE_MODEL_RESET_INTERVAL_SECS",
        default_value_t = 3600
    )]
    pub model_reset_interval_secs: u64,
}

impl Config {
    /// Parse configuration from CLI arguments and environment.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "catalog".into(),
            host: "0.0.0.0".into(),
            port: 9090,
            log_level: "info".into(),
            top_models_limit: 20,
            model_reset_interval_secs: 3600,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 9090);
        assert_eq!(config.service_name, "catalog");
        assert_eq!(config.top_models_limit, 20);
        assert_eq!(config.model_reset_interval_secs, 3600);
    }
}
