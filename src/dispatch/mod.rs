//! Per-request handler chain dispatch.
//!
//! # Data Flow
//! ```text
//! Application::serve_http
//!     → Context::new (child container seeded with request values)
//!     → Context::run, cursor = 0
//!         → handler[cursor] resolved + invoked through the child container
//!         → return values → ReturnHandler → response writer
//!         → cursor + 1
//!         → stop once the response is written or the action has run
//! ```
//!
//! # Design Decisions
//! - Single mutable cursor owned by the context; `run` and `next` share it
//! - `next` is a plain nested call, not a yield to a scheduler
//! - Faults are returned, never swallowed; recovery is a middleware concern

pub mod context;
pub mod returns;

pub use context::Context;
pub use returns::{
    DefaultReturnHandler, IntoReturnValue, IntoReturnValues, ReturnHandler, ReturnValue,
    ReturnValues,
};
