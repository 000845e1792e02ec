//! Response sink consumed by the dispatch core.
//!
//! # Responsibilities
//! - Expose a monotonic "written" signal to the chain
//! - Buffer status, headers and body until the chain returns
//! - Convert the buffered result into an axum response
//!
//! # Design Decisions
//! - The first status or body byte sets `written`; it never resets
//! - Status and header changes after that are ignored with a warning
//! - Further body writes append

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::Response;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Write side of a response, as seen by handlers.
pub trait ResponseWriter: Send + Sync {
    /// Send the status line. Only the first call has an effect.
    fn write_header(&self, status: StatusCode);

    /// Append to the body, sending a `200` status first if none was sent.
    fn write(&self, data: &[u8]) -> usize;

    /// Set a header; ignored once the response is written.
    fn insert_header(&self, name: HeaderName, value: HeaderValue);

    /// Status sent so far (`200` if none).
    fn status(&self) -> StatusCode;

    /// Whether a status or any body byte has been sent.
    fn written(&self) -> bool;

    /// Body bytes written so far.
    fn size(&self) -> usize;
}

#[derive(Debug)]
struct ResponseState {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    written: bool,
}

impl Default for ResponseState {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
            written: false,
        }
    }
}

/// In-memory response writer used by the application shell.
#[derive(Debug, Default)]
pub struct BufferedResponse {
    state: Mutex<ResponseState>,
}

impl BufferedResponse {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ResponseState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the body written so far.
    pub fn body(&self) -> Vec<u8> {
        self.state().body.clone()
    }

    /// Value of a header set so far.
    pub fn header(&self, name: &HeaderName) -> Option<HeaderValue> {
        self.state().headers.get(name).cloned()
    }

    /// Take the buffered output as a response, leaving this writer empty.
    pub fn take_response(&self) -> Response {
        let state = std::mem::take(&mut *self.state());
        let mut response = Response::new(Body::from(state.body));
        *response.status_mut() = state.status;
        *response.headers_mut() = state.headers;
        response
    }
}

impl ResponseWriter for BufferedResponse {
    fn write_header(&self, status: StatusCode) {
        let mut state = self.state();
        if state.written {
            tracing::warn!(
                current = %state.status,
                ignored = %status,
                "Superfluous write_header call"
            );
            return;
        }
        state.status = status;
        state.written = true;
    }

    fn write(&self, data: &[u8]) -> usize {
        let mut state = self.state();
        state.written = true;
        state.body.extend_from_slice(data);
        data.len()
    }

    fn insert_header(&self, name: HeaderName, value: HeaderValue) {
        let mut state = self.state();
        if state.written {
            tracing::warn!(header = %name, "Header set after response was written");
            return;
        }
        state.headers.insert(name, value);
    }

    fn status(&self) -> StatusCode {
        self.state().status
    }

    fn written(&self) -> bool {
        self.state().written
    }

    fn size(&self) -> usize {
        self.state().body.len()
    }
}
