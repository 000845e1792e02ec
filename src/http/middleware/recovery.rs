//! Recovery middleware.
//! Turns faults and panics from later handlers into a 500 response.

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, StatusCode};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::dispatch::Context;
use crate::error::Fault;
use crate::http::server::Environment;
use crate::http::ResponseWriter;
use crate::inject::{handler, Handler};
use crate::observability::{metrics, Logger};

const BODY: &str = "Internal Server Error";

/// Middleware that runs the rest of the chain and recovers any fault.
///
/// If nothing was written yet it answers `500`. Outside production the body
/// also carries the fault message.
pub fn recovery() -> Handler {
    handler(
        |ctx: Context,
         res: Arc<dyn ResponseWriter>,
         log: Arc<Logger>,
         env: Option<Arc<Environment>>| {
            let fault = match panic::catch_unwind(AssertUnwindSafe(|| ctx.next())) {
                Ok(Ok(())) => return,
                Ok(Err(fault)) => fault,
                Err(payload) => Fault::Panic(panic_message(payload.as_ref())),
            };

            metrics::record_fault(fault.kind());
            log.error(format_args!("PANIC: {}", fault));

            if res.written() {
                return;
            }
            res.insert_header(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
            res.write_header(StatusCode::INTERNAL_SERVER_ERROR);
            match env {
                Some(env) if !env.is_production() => {
                    res.write(format!("{}\n\n{}", BODY, fault).as_bytes());
                }
                _ => {
                    res.write(BODY.as_bytes());
                }
            }
        },
    )
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
