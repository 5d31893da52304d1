//! Tollgate: request and query telemetry with bounded cardinality.
//!
//! Tollgate instruments a service's HTTP and database traffic with Prometheus
//! metrics and gates the scrape endpoint to the internal network.
//!
//! # Architecture
//!
//! - **Best-Effort**: metric recording never disturbs the request it observes
//! - **Bounded Cardinality**: endpoint templating plus top-N model limiting
//! - **Network-Gated**: CIDR allow-list in front of the scrape endpoint
//! - **Observable**: structured logging via `tracing`
//!
//! # Modules
//!
//! - [`config`]: CLI and environment configuration
//! - [`netguard`]: CIDR matching and the internal-network guard
//! - [`observability`]: HTTP and database query collectors
//! - [`server`]: scrape server setup and lifecycle

// Lint configuration
#![warn(clippy::all)]
#![allow(
    clippy::module_name_repetitions, // observability::http::HttpMetrics is fine
    clippy::must_use_candidate,      // Not all functions need #[must_use]
    clippy::missing_errors_doc,      // Error docs can be verbose
    clippy::missing_panics_doc       // Panic docs can be verbose
)]

pub mod config;
pub mod netguard;
pub mod observability;
pub mod server;
