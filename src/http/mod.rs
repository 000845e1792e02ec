//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum fallback, body buffering, blocking worker)
//!     → Application::serve_http
//!         → request.rs (request id, client address)
//!         → dispatch::Context (middleware → action)
//!         → response.rs (buffered writer, written flag)
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{client_addr, RemoteAddr, Request, RequestId, X_REQUEST_ID};
pub use response::{BufferedResponse, ResponseWriter};
pub use server::{Application, Environment};
