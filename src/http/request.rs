//! Request-scoped values seeded into every context.
//!
//! # Responsibilities
//! - Define the request type handlers receive (`Arc<Request>`)
//! - Carry the peer address collected by the transport adapter
//! - Assign a request ID (reusing an incoming `x-request-id` when present)
//! - Work out the client address for logging

use axum::body::Bytes;
use std::fmt;
use std::net::SocketAddr;
use uuid::Uuid;

/// Header used for request ID propagation.
pub const X_REQUEST_ID: &str = "x-request-id";

/// A fully buffered inbound request.
pub type Request = axum::http::Request<Bytes>;

/// Peer address of the connection, stored in request extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteAddr(pub SocketAddr);

/// Identifier of one request, mapped into its context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a fresh UUID v4 request ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Reuse the caller's `x-request-id`, or generate one.
    pub fn from_request(req: &Request) -> Self {
        req.headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(|v| Self(v.to_string()))
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Client address: `X-Real-IP`, then `X-Forwarded-For`, then the peer.
pub fn client_addr(req: &Request) -> String {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    header("x-real-ip")
        .or_else(|| header("x-forwarded-for"))
        .or_else(|| {
            req.extensions()
                .get::<RemoteAddr>()
                .map(|RemoteAddr(addr)| addr.to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}
