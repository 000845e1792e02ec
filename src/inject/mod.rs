//! Service container subsystem.
//!
//! # Data Flow
//! ```text
//! Setup:
//!     Application::map / map_to
//!     → global Injector (TypeId → Arc<T>)
//!
//! Per request:
//!     child Injector (request, response writer, context, request id)
//!     → parent link to the global Injector (read-through on miss)
//!
//! Invocation:
//!     Handler (params recorded at registration)
//!     → each parameter resolved via Inject::inject
//!     → body called only if every parameter resolved
//!     → ReturnValues handed back uninterpreted
//! ```
//!
//! # Design Decisions
//! - Keys are `TypeId`s, values are `Arc<T>` so `T` may be a trait object
//! - A child mapping shadows the parent; the parent is never written through
//! - Handlers are plain closures; their signature is captured by `IntoHandler`
//!   once, at registration, instead of being reflected on per call

pub mod handler;
pub mod injector;

pub use handler::{handler, Handler, Inject, IntoHandler, Prebuilt};
pub use injector::Injector;
