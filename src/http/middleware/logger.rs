//! Request logging middleware.
//! Logs each request on the way in and its outcome on the way out.

use std::sync::Arc;
use std::time::Instant;

use crate::dispatch::Context;
use crate::error::Fault;
use crate::http::request::{client_addr, Request, RequestId};
use crate::http::ResponseWriter;
use crate::inject::{handler, Handler};
use crate::observability::{metrics, Logger};

/// Middleware that logs `Started ...` before and `Completed ...` after the
/// rest of the chain.
pub fn logger() -> Handler {
    handler(
        |ctx: Context,
         req: Arc<Request>,
         res: Arc<dyn ResponseWriter>,
         log: Arc<Logger>,
         id: Option<Arc<RequestId>>|
         -> Result<(), Fault> {
            let start = Instant::now();
            let request_id = id.map(|id| id.to_string()).unwrap_or_default();

            log.info(format_args!(
                "Started {} {} for {} {}",
                req.method(),
                req.uri().path(),
                client_addr(&req),
                request_id
            ));

            ctx.next()?;

            let status = res.status();
            log.info(format_args!(
                "Completed {} {} in {:?}",
                status.as_u16(),
                status.canonical_reason().unwrap_or(""),
                start.elapsed()
            ));
            metrics::record_request(req.method().as_str(), status.as_u16(), start);
            Ok(())
        },
    )
}
