//! Stock middleware handlers.
//!
//! Both are ordinary handlers resolved through the request container and
//! rely on `Context::next` to run code after the rest of the chain.

pub mod logger;
pub mod recovery;

pub use logger::logger;
pub use recovery::recovery;
