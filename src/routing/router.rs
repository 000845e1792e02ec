//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store routes in registration order
//! - Look up the first route matching a request
//! - Invoke the matched handler through the request's container
//!
//! # Design Decisions
//! - Immutable once handed to the application (shared via `Arc`)
//! - O(n) scan; first match wins
//! - No match falls back to the not-found handler, else a plain 404

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method, StatusCode};

use crate::dispatch::Context;
use crate::error::Fault;
use crate::http::Request;
use crate::inject::{Handler, IntoHandler};
use crate::routing::matcher::{AndMatcher, Matcher, MethodMatcher, PathMatcher, PathPrefixMatcher};

const NOT_FOUND_BODY: &str = "404 page not found";

#[derive(Debug)]
struct Route {
    matcher: Box<dyn Matcher>,
    handler: Handler,
}

/// Ordered list of routes used as an application's action.
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<Route>,
    not_found: Option<Handler>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route with an arbitrary matcher.
    pub fn route<Args, H>(&mut self, matcher: impl Matcher + 'static, h: H) -> &mut Self
    where
        H: IntoHandler<Args>,
    {
        self.routes.push(Route {
            matcher: Box::new(matcher),
            handler: h.into_handler(),
        });
        self
    }

    /// Add a route for `method` on the exact `path`.
    pub fn on<Args, H>(&mut self, method: Method, path: &str, h: H) -> &mut Self
    where
        H: IntoHandler<Args>,
    {
        let matchers: Vec<Box<dyn Matcher>> = vec![
            Box::new(MethodMatcher::new(method)),
            Box::new(PathMatcher::new(path)),
        ];
        let matcher = AndMatcher::new(matchers);
        self.route(matcher, h)
    }

    pub fn get<Args, H: IntoHandler<Args>>(&mut self, path: &str, h: H) -> &mut Self {
        self.on(Method::GET, path, h)
    }

    pub fn post<Args, H: IntoHandler<Args>>(&mut self, path: &str, h: H) -> &mut Self {
        self.on(Method::POST, path, h)
    }

    pub fn put<Args, H: IntoHandler<Args>>(&mut self, path: &str, h: H) -> &mut Self {
        self.on(Method::PUT, path, h)
    }

    pub fn delete<Args, H: IntoHandler<Args>>(&mut self, path: &str, h: H) -> &mut Self {
        self.on(Method::DELETE, path, h)
    }

    /// Any method on the exact `path`.
    pub fn any<Args, H: IntoHandler<Args>>(&mut self, path: &str, h: H) -> &mut Self {
        self.route(PathMatcher::new(path), h)
    }

    /// Any method on paths starting with `prefix`.
    pub fn prefix<Args, H: IntoHandler<Args>>(&mut self, prefix: &str, h: H) -> &mut Self {
        self.route(PathPrefixMatcher::new(prefix), h)
    }

    /// Handler used when no route matches.
    pub fn not_found<Args, H: IntoHandler<Args>>(&mut self, h: H) -> &mut Self {
        self.not_found = Some(h.into_handler());
        self
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// First route handler matching `req`.
    pub fn match_request(&self, req: &Request) -> Option<&Handler> {
        self.routes
            .iter()
            .find(|route| route.matcher.matches(req))
            .map(|route| &route.handler)
    }

    /// Dispatch `req` within `ctx`.
    ///
    /// The matched handler resolves its parameters from the request container
    /// and its return values go through the mapped return handler.
    pub fn handle(&self, ctx: &Context, req: &Request) -> Result<(), Fault> {
        let handler = match self.match_request(req).or(self.not_found.as_ref()) {
            Some(handler) => handler,
            None => {
                tracing::debug!(method = %req.method(), path = req.uri().path(), "No route matched");
                let res = ctx.response();
                res.insert_header(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
                res.write_header(StatusCode::NOT_FOUND);
                res.write(NOT_FOUND_BODY.as_bytes());
                return Ok(());
            }
        };

        let values = handler.call(ctx.injector())?;
        if ctx.written() {
            return Ok(());
        }
        ctx.apply_returns(values)
    }
}
