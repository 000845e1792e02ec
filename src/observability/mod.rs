//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Shell, middleware and handlers produce:
//!     → logging.rs (Logger service → tracing events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → tracing-subscriber fmt layer (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - One Logger is mapped globally; handlers receive it by injection
//! - Request ID is mapped into every context for correlation
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;

pub use logging::{init_tracing, Logger};
