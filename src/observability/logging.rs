//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Provide the `Logger` service mapped at global scope
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Log level configurable via config and `RUST_LOG`
//! - `Logger` is a thin prefix-carrying front over tracing, so handlers can
//!   ask for it like any other service

use std::fmt::Display;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Prefix used by the default logger.
pub const DEFAULT_PREFIX: &str = "[pipework]";

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level. Calling this twice is harmless.
pub fn init_tracing(config: &ObservabilityConfig) {
    let level = config.log_level.to_ascii_lowercase();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pipework={level},tower_http={level}")));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Logger service available to handlers and the application shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logger {
    prefix: String,
}

impl Logger {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn debug(&self, message: impl Display) {
        tracing::debug!(logger = %self.prefix, "{}", message);
    }

    pub fn info(&self, message: impl Display) {
        tracing::info!(logger = %self.prefix, "{}", message);
    }

    pub fn warn(&self, message: impl Display) {
        tracing::warn!(logger = %self.prefix, "{}", message);
    }

    pub fn error(&self, message: impl Display) {
        tracing::error!(logger = %self.prefix, "{}", message);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}
