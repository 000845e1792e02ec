//! Pipework: per-request dependency injection and middleware dispatch.
//!
//! Handlers are plain closures whose parameters are resolved by type from a
//! request-scoped container that reads through to the application's global
//! one. Middleware run in registration order, may stop the chain by writing a
//! response, and may wrap everything after them by calling `Context::next`.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod inject;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use dispatch::{Context, ReturnHandler, ReturnValue, ReturnValues};
pub use error::{ConfigurationError, Fault, InjectError, ServeError};
pub use http::{Application, BufferedResponse, Environment, Request, ResponseWriter};
pub use inject::{handler, Handler, Inject, Injector};
pub use lifecycle::Shutdown;
pub use observability::Logger;
pub use routing::Router;
