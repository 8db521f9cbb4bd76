//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Retry executor, circuit breakers, registry produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Every resilient call runs in a span carrying its service and call ID
//! - Metrics are cheap and silently dropped when no exporter is installed

pub mod logging;
pub mod metrics;
