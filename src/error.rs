//! Error taxonomy for the dispatch engine.
//!
//! # Design Decisions
//! - Registration mistakes surface at setup time (`ConfigurationError`)
//! - Resolution and handler failures are `Fault`s that propagate out of the
//!   request; the core never recovers them itself
//! - Transport failures are `ServeError` and end the process in the binary

use thiserror::Error;

use crate::config::loader::ConfigError;

/// A handler parameter could not be resolved from the container chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InjectError {
    /// No mapping for the type in the request or global container.
    #[error("unresolved dependency: {type_name}")]
    Unresolved { type_name: &'static str },

    /// The request context was requested after its request finished.
    #[error("request context is no longer alive")]
    ContextGone,
}

impl InjectError {
    /// Unresolved dependency for `T`.
    pub fn unresolved<T: ?Sized>() -> Self {
        Self::Unresolved {
            type_name: std::any::type_name::<T>(),
        }
    }
}

/// A value registered as a handler is not callable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("handler must be a callable, got {type_name}")]
    NotCallable { type_name: String },
}

/// Fatal failure of a single request.
#[derive(Debug, Error)]
pub enum Fault {
    /// Parameter resolution failed; the handler body never ran.
    #[error(transparent)]
    Inject(#[from] InjectError),

    /// The cursor moved past the action while a handler was being fetched.
    #[error("invalid handler index {index} for chain of {len} middleware")]
    InvalidIndex { index: usize, len: usize },

    /// A handler returned an integer that is not an HTTP status code.
    #[error("invalid status code {0}")]
    InvalidStatus(i64),

    /// A handler returned an error.
    #[error("handler failed: {0}")]
    Handler(Box<dyn std::error::Error + Send + Sync>),

    /// A handler panicked and the panic was caught by recovery.
    #[error("handler panicked: {0}")]
    Panic(String),
}

impl Fault {
    /// Wrap an arbitrary handler error.
    pub fn handler<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Handler(err.into())
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Fault::Inject(_) => "unresolved_dependency",
            Fault::InvalidIndex { .. } => "invalid_index",
            Fault::InvalidStatus(_) => "invalid_status",
            Fault::Handler(_) => "handler",
            Fault::Panic(_) => "panic",
        }
    }
}

impl From<String> for Fault {
    fn from(msg: String) -> Self {
        Self::Handler(msg.into())
    }
}

impl From<&str> for Fault {
    fn from(msg: &str) -> Self {
        Self::Handler(msg.into())
    }
}

impl From<std::io::Error> for Fault {
    fn from(err: std::io::Error) -> Self {
        Self::Handler(Box::new(err))
    }
}

/// Listening or serving failed.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}
