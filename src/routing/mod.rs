//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Action invoked with (Context, Arc<Request>)
//!     → router.rs (ordered route scan)
//!     → matcher.rs (evaluate match conditions)
//!     → matched Handler invoked via the request container
//!     → return values → ReturnHandler
//! ```
//!
//! # Design Decisions
//! - Routes are registered before serving and immutable at runtime
//! - No pattern syntax (exact path or prefix only)
//! - Deterministic: first match wins

pub mod matcher;
pub mod router;

pub use matcher::{AndMatcher, HostMatcher, Matcher, MethodMatcher, PathMatcher, PathPrefixMatcher};
pub use router::Router;
