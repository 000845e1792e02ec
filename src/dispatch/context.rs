//! Request context and the handler chain state machine.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use crate::dispatch::{ReturnHandler, ReturnValues};
use crate::error::{Fault, InjectError};
use crate::http::ResponseWriter;
use crate::inject::{Handler, Inject, Injector, IntoHandler};

/// Per-request state behind a [`Context`] handle.
struct ContextInner {
    injector: Injector,
    handlers: Arc<[Handler]>,
    action: Handler,
    response: Arc<dyn ResponseWriter>,
    /// Index of the handler running now or next. `handlers.len()` is the
    /// action; `handlers.len() + 1` means the chain is exhausted.
    cursor: AtomicUsize,
}

/// Weak self-reference stored in the request container.
struct ContextRef(Weak<ContextInner>);

/// Handle to the state of one in-flight request.
///
/// Cloning is cheap. Handlers receive a `Context` by declaring it as a
/// parameter and use it to map request-scoped values or to run the rest of
/// the chain early with [`Context::next`].
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    /// Create a context whose container reads through to `parent`.
    ///
    /// The context maps itself and `response` (as `dyn ResponseWriter`) into
    /// its own container.
    pub fn new(
        parent: Arc<Injector>,
        handlers: Arc<[Handler]>,
        action: Handler,
        response: Arc<dyn ResponseWriter>,
    ) -> Self {
        let inner = Arc::new_cyclic(|weak| {
            let injector = Injector::child_of(parent);
            injector.map(ContextRef(weak.clone()));
            injector.map_to::<dyn ResponseWriter>(Arc::clone(&response));
            ContextInner {
                injector,
                handlers,
                action,
                response,
                cursor: AtomicUsize::new(0),
            }
        });
        Self { inner }
    }

    /// The request-scoped container.
    pub fn injector(&self) -> &Injector {
        &self.inner.injector
    }

    /// Map a value for the rest of this request.
    pub fn map<T: Send + Sync + 'static>(&self, value: T) {
        self.inner.injector.map(value);
    }

    /// Map a value under an explicit type for the rest of this request.
    pub fn map_to<I: ?Sized + Send + Sync + 'static>(&self, value: Arc<I>) {
        self.inner.injector.map_to::<I>(value);
    }

    /// Resolve a value from the request container or the global one.
    pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, InjectError> {
        self.inner.injector.get::<T>()
    }

    /// Invoke a handler against the request container.
    pub fn invoke<Args, H: IntoHandler<Args>>(&self, handler: H) -> Result<ReturnValues, Fault> {
        self.inner.injector.invoke(handler)
    }

    /// The response writer this context was created with.
    pub fn response(&self) -> &Arc<dyn ResponseWriter> {
        &self.inner.response
    }

    /// Whether any status or body has been written for this request.
    pub fn written(&self) -> bool {
        self.inner.response.written()
    }

    /// Current cursor position.
    pub fn cursor(&self) -> usize {
        self.inner.cursor.load(Ordering::SeqCst)
    }

    /// Run the remaining handlers, then return to the caller.
    ///
    /// Middleware call this to do work after everything after them, including
    /// the action, has finished. Calling it again once the chain is exhausted
    /// does nothing.
    pub fn next(&self) -> Result<(), Fault> {
        let last = self.inner.handlers.len() + 1;
        let _ = self
            .inner
            .cursor
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| Some((c + 1).min(last)));
        self.run()
    }

    /// Drive the chain from the current cursor.
    ///
    /// Stops as soon as the response reports written or the action has run.
    pub fn run(&self) -> Result<(), Fault> {
        let len = self.inner.handlers.len();
        loop {
            if self.written() {
                tracing::trace!(cursor = self.cursor(), "Response written, chain stopped");
                return Ok(());
            }

            let index = self.cursor();
            if index > len {
                return Ok(());
            }

            let handler = self.handler_at(index)?;
            tracing::trace!(index, handler = handler.name(), "Invoking handler");
            let values = handler.call(&self.inner.injector)?;
            // A handler that wrote to the response itself keeps its output.
            if !self.written() {
                self.apply_returns(values)?;
            }

            // A handler that called next() has already moved the cursor on.
            let _ = self.inner.cursor.compare_exchange(
                index,
                index + 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            );
        }
    }

    /// Hand return values to the mapped [`ReturnHandler`].
    pub fn apply_returns(&self, values: ReturnValues) -> Result<(), Fault> {
        let return_handler = self.get::<dyn ReturnHandler>()?;
        return_handler.handle(self, values)
    }

    fn handler_at(&self, index: usize) -> Result<&Handler, Fault> {
        let len = self.inner.handlers.len();
        match index.cmp(&len) {
            std::cmp::Ordering::Less => Ok(&self.inner.handlers[index]),
            std::cmp::Ordering::Equal => Ok(&self.inner.action),
            std::cmp::Ordering::Greater => Err(Fault::InvalidIndex { index, len }),
        }
    }
}

impl Inject for Context {
    fn inject(injector: &Injector) -> Result<Self, InjectError> {
        let handle = injector
            .get::<ContextRef>()
            .map_err(|_| InjectError::unresolved::<Context>())?;
        handle
            .0
            .upgrade()
            .map(|inner| Context { inner })
            .ok_or(InjectError::ContextGone)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("cursor", &self.cursor())
            .field("handlers", &self.inner.handlers.len())
            .field("written", &self.written())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::DefaultReturnHandler;
    use crate::http::BufferedResponse;
    use crate::inject::handler;
    use std::sync::Mutex;

    type Trace = Arc<Mutex<Vec<String>>>;

    fn global() -> Arc<Injector> {
        let injector = Injector::new();
        injector.map_to::<dyn ReturnHandler>(Arc::new(DefaultReturnHandler));
        Arc::new(injector)
    }

    fn context(handlers: Vec<Handler>, action: Handler) -> (Context, Arc<BufferedResponse>) {
        let response = Arc::new(BufferedResponse::new());
        let ctx = Context::new(global(), handlers.into(), action, response.clone());
        (ctx, response)
    }

    fn step(trace: &Trace, name: &'static str) -> Handler {
        let trace = Arc::clone(trace);
        handler(move || trace.lock().unwrap().push(name.to_string()))
    }

    #[test]
    fn test_action_runs_after_all_middleware() {
        let trace: Trace = Arc::default();
        let (ctx, _) = context(
            vec![step(&trace, "a"), step(&trace, "b"), step(&trace, "c")],
            step(&trace, "action"),
        );

        ctx.run().unwrap();

        assert_eq!(*trace.lock().unwrap(), ["a", "b", "c", "action"]);
        assert_eq!(ctx.cursor(), 4);
    }

    #[test]
    fn test_empty_chain_runs_action() {
        let trace: Trace = Arc::default();
        let (ctx, _) = context(vec![], step(&trace, "action"));

        ctx.run().unwrap();

        assert_eq!(*trace.lock().unwrap(), ["action"]);
    }

    #[test]
    fn test_written_response_stops_chain() {
        let trace: Trace = Arc::default();
        let (ctx, response) = context(
            vec![step(&trace, "a"), handler(|| "early"), step(&trace, "c")],
            step(&trace, "action"),
        );

        ctx.run().unwrap();

        assert_eq!(*trace.lock().unwrap(), ["a"]);
        assert!(response.written());
        assert_eq!(ctx.cursor(), 2);
    }

    #[test]
    fn test_next_wraps_remaining_handlers() {
        let trace: Trace = Arc::default();
        let outer = {
            let trace = Arc::clone(&trace);
            handler(move |ctx: Context| -> Result<(), Fault> {
                trace.lock().unwrap().push("before".into());
                ctx.next()?;
                trace.lock().unwrap().push("after".into());
                Ok(())
            })
        };
        let (ctx, _) = context(vec![outer, step(&trace, "inner")], step(&trace, "action"));

        ctx.run().unwrap();

        assert_eq!(
            *trace.lock().unwrap(),
            ["before", "inner", "action", "after"]
        );
    }

    #[test]
    fn test_write_then_next_runs_nothing_more() {
        let trace: Trace = Arc::default();
        let writer = handler(|ctx: Context, res: Arc<dyn ResponseWriter>| ctx_write(&ctx, &res));
        let (ctx, _) = context(vec![writer, step(&trace, "b")], step(&trace, "action"));

        ctx.run().unwrap();

        assert!(trace.lock().unwrap().is_empty());
    }

    fn ctx_write(ctx: &Context, res: &Arc<dyn ResponseWriter>) -> Result<(), Fault> {
        res.write(b"done");
        ctx.next()
    }

    #[test]
    fn test_direct_write_skips_return_values() {
        let (ctx, response) = context(
            vec![],
            handler(|res: Arc<dyn ResponseWriter>| {
                res.write(b"direct");
                "returned"
            }),
        );

        ctx.run().unwrap();

        assert_eq!(response.body(), b"direct");
    }

    #[test]
    fn test_value_returned_after_next_is_dropped() {
        let outer = handler(|ctx: Context| -> Result<&'static str, Fault> {
            ctx.next()?;
            Ok("tail")
        });
        let (ctx, response) = context(vec![outer], handler(|| (201, "action")));

        ctx.run().unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::CREATED);
        assert_eq!(response.body(), b"action");
    }

    #[test]
    fn test_next_after_exhaustion_is_noop() {
        let trace: Trace = Arc::default();
        let action = {
            let trace = Arc::clone(&trace);
            handler(move |ctx: Context| -> Result<(), Fault> {
                trace.lock().unwrap().push("action".into());
                ctx.next()?;
                ctx.next()
            })
        };
        let (ctx, _) = context(vec![], action);

        ctx.run().unwrap();

        assert_eq!(*trace.lock().unwrap(), ["action"]);
        assert_eq!(ctx.cursor(), 1);
    }

    #[test]
    fn test_unresolved_dependency_is_fatal() {
        struct Missing;
        let trace: Trace = Arc::default();
        let (ctx, _) = context(
            vec![handler(|_m: Arc<Missing>| {})],
            step(&trace, "action"),
        );

        let err = ctx.run().unwrap_err();

        assert!(matches!(err, Fault::Inject(InjectError::Unresolved { .. })));
        assert!(trace.lock().unwrap().is_empty());
    }

    #[test]
    fn test_values_mapped_by_middleware_reach_action() {
        struct User(&'static str);
        let (ctx, response) = context(
            vec![handler(|ctx: Context| ctx.map(User("ada")))],
            handler(|user: Arc<User>| format!("hello {}", user.0)),
        );

        ctx.run().unwrap();

        assert_eq!(response.body(), "hello ada".as_bytes());
    }

    #[test]
    fn test_context_resolves_itself() {
        let (ctx, _) = context(vec![], handler(|| ()));
        let resolved = Context::inject(ctx.injector()).unwrap();
        assert!(Arc::ptr_eq(&resolved.inner, &ctx.inner));
    }

    #[test]
    fn test_handler_past_action_is_invalid() {
        let (ctx, _) = context(vec![], handler(|| ()));
        assert!(matches!(
            ctx.handler_at(2),
            Err(Fault::InvalidIndex { index: 2, len: 0 })
        ));
    }
}
