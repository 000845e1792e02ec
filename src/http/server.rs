//! Application shell and HTTP server setup.
//!
//! # Responsibilities
//! - Hold the global container, middleware list and action
//! - Validate handler registrations as they happen
//! - Create one `Context` per request and run its chain
//! - Adapt the application to an axum router and serve it
//!
//! # Design Decisions
//! - Setup methods take `&mut self`; serving freezes the application
//!   behind an `Arc`, so registrations cannot change under live traffic
//! - The chain is synchronous and runs on Tokio's blocking pool
//! - A fault that escapes the chain is logged and answered with a bare 500

use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use std::any::Any;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::{loader::server_from_env, AppConfig};
use crate::dispatch::{Context, DefaultReturnHandler, ReturnHandler};
use crate::error::{ConfigurationError, Fault, ServeError};
use crate::http::middleware;
use crate::http::request::{RemoteAddr, Request, RequestId, X_REQUEST_ID};
use crate::http::response::{BufferedResponse, ResponseWriter};
use crate::inject::{handler, Handler, Injector, IntoHandler};
use crate::lifecycle::signals::shutdown_signal;
use crate::observability::{metrics, Logger};
use crate::routing::Router;

/// Name of the environment the application runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment(pub String);

impl Environment {
    pub fn is_production(&self) -> bool {
        self.0 == "production"
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self("development".to_string())
    }
}

/// The top-level web application.
///
/// Values mapped with [`Application::map`] are visible to every handler of
/// every request.
pub struct Application {
    injector: Arc<Injector>,
    handlers: Arc<[Handler]>,
    action: Handler,
    logger: Arc<Logger>,
    env: Arc<Environment>,
    max_body_bytes: usize,
}

impl Application {
    /// Bare application: default logger and return handler, no middleware,
    /// and an action that does nothing.
    pub fn new() -> Self {
        let defaults = AppConfig::default();
        let logger = Arc::new(Logger::default());
        let env = Arc::new(Environment(defaults.environment));

        let injector = Injector::new();
        injector.map_to::<Logger>(Arc::clone(&logger));
        injector.map_to::<Environment>(Arc::clone(&env));
        injector.map_to::<dyn ReturnHandler>(Arc::new(DefaultReturnHandler));

        Self {
            injector: Arc::new(injector),
            handlers: Arc::from(Vec::new()),
            action: handler(|| ()),
            logger,
            env,
            max_body_bytes: defaults.limits.max_body_bytes,
        }
    }

    /// Application with request logging, recovery and `router` as the action.
    /// The router is also mapped as a service.
    pub fn classic(router: Router) -> Self {
        let mut app = Self::new();
        app.use_handler(middleware::logger());
        app.use_handler(middleware::recovery());

        let router = Arc::new(router);
        app.map_to::<Router>(Arc::clone(&router));
        app.action(move |ctx: Context, req: Arc<Request>| router.handle(&ctx, &req));
        app
    }

    /// Apply environment name and limits from `config`.
    pub fn configure(&mut self, config: &AppConfig) {
        self.env = Arc::new(Environment(config.environment.clone()));
        self.injector.map_to::<Environment>(Arc::clone(&self.env));
        self.max_body_bytes = config.limits.max_body_bytes;
    }

    /// Replace the whole middleware list.
    pub fn handlers(&mut self, handlers: impl IntoIterator<Item = Handler>) {
        self.handlers = handlers.into_iter().collect();
    }

    /// Append a middleware. Middleware run in the order they are added.
    pub fn use_handler<Args, H: IntoHandler<Args>>(&mut self, h: H) {
        let mut handlers = self.handlers.to_vec();
        handlers.push(h.into_handler());
        self.handlers = handlers.into();
    }

    /// Append a dynamically typed middleware, rejecting anything that is not
    /// a [`Handler`].
    pub fn use_value<V: Any + Send + Sync>(&mut self, value: V) -> Result<(), ConfigurationError> {
        let h = Handler::try_from_value(value)?;
        self.use_handler(h);
        Ok(())
    }

    /// Set the handler that runs after all middleware.
    pub fn action<Args, H: IntoHandler<Args>>(&mut self, h: H) {
        self.action = h.into_handler();
    }

    /// Set a dynamically typed action, rejecting anything that is not a
    /// [`Handler`].
    pub fn action_value<V: Any + Send + Sync>(&mut self, value: V) -> Result<(), ConfigurationError> {
        self.action = Handler::try_from_value(value)?;
        Ok(())
    }

    /// Replace the logger, both for the shell and for handlers.
    pub fn logger(&mut self, logger: Logger) {
        self.logger = Arc::new(logger);
        self.injector.map_to::<Logger>(Arc::clone(&self.logger));
    }

    /// Map a service at global scope.
    pub fn map<T: Send + Sync + 'static>(&mut self, value: T) {
        self.injector.map(value);
    }

    /// Map a service at global scope under an explicit type.
    pub fn map_to<I: ?Sized + Send + Sync + 'static>(&mut self, value: Arc<I>) {
        self.injector.map_to::<I>(value);
    }

    /// The global container.
    pub fn injector(&self) -> &Arc<Injector> {
        &self.injector
    }

    /// Registered middleware, in order.
    pub fn middleware(&self) -> &[Handler] {
        &self.handlers
    }

    pub fn env(&self) -> &str {
        &self.env.0
    }

    /// Run the chain for one request and return what it wrote.
    ///
    /// A fault not handled by any middleware is returned to the caller.
    pub fn serve_http(&self, request: Request) -> Result<Response, Fault> {
        let response = Arc::new(BufferedResponse::new());
        let ctx = self.create_context(request, Arc::clone(&response));
        ctx.run()?;
        Ok(response.take_response())
    }

    fn create_context(&self, request: Request, response: Arc<BufferedResponse>) -> Context {
        let request_id = RequestId::from_request(&request);
        if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
            response.insert_header(axum::http::HeaderName::from_static(X_REQUEST_ID), value);
        }

        let ctx = Context::new(
            Arc::clone(&self.injector),
            Arc::clone(&self.handlers),
            self.action.clone(),
            response,
        );
        ctx.map(request);
        ctx.map(request_id);
        ctx
    }

    /// Freeze the application into an axum router.
    pub fn into_router(self) -> axum::Router {
        axum::Router::new()
            .fallback(dispatch)
            .with_state(Arc::new(self))
            .layer(TraceLayer::new_for_http())
    }

    /// Serve on `PORT` (default 3000) and `HOST` until Ctrl+C.
    pub async fn run(self) -> Result<(), ServeError> {
        let server = server_from_env()?;
        self.run_on_addr(&server.address()).await
    }

    /// Serve on `addr` until Ctrl+C.
    pub async fn run_on_addr(self, addr: &str) -> Result<(), ServeError> {
        let listener = TcpListener::bind(addr).await.map_err(|source| ServeError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` fires.
    pub async fn run_with_shutdown(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServeError> {
        self.serve(listener, async move {
            let _ = shutdown.recv().await;
        })
        .await
    }

    async fn serve<F>(self, listener: TcpListener, signal: F) -> Result<(), ServeError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        let logger = self
            .injector
            .get::<Logger>()
            .unwrap_or_else(|_| Arc::clone(&self.logger));
        logger.info(format_args!("listening on {} ({})", addr, self.env()));

        let app = self
            .into_router()
            .into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(signal)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

impl Default for Application {
    fn default() -> Self {
        Self::new()
    }
}

/// Fallback handler bridging axum to the synchronous chain.
async fn dispatch(
    State(app): State<Arc<Application>>,
    request: axum::extract::Request,
) -> Response {
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let (mut parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, app.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read request body");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };
    if let Some(addr) = remote {
        parts.extensions.insert(RemoteAddr(addr));
    }
    let request = Request::from_parts(parts, bytes);

    let worker = Arc::clone(&app);
    match tokio::task::spawn_blocking(move || worker.serve_http(request)).await {
        Ok(Ok(response)) => response,
        Ok(Err(fault)) => {
            metrics::record_fault(fault.kind());
            tracing::error!(error = %fault, "Unhandled fault in handler chain");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(e) => {
            metrics::record_fault("panic");
            tracing::error!(error = %e, "Request worker panicked");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
