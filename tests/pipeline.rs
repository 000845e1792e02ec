//! End-to-end behavior of the handler chain through `Application::serve_http`.

mod common;

use axum::body::Bytes;
use axum::http::StatusCode;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use common::{body_string, get, Trace};
use pipework::config::AppConfig;
use pipework::http::middleware::{logger, recovery};
use pipework::{
    handler, Application, ConfigurationError, Context, Fault, InjectError, Request, ResponseWriter,
    ReturnHandler, ReturnValue, ReturnValues, Router,
};

fn step(trace: &Trace, name: &'static str) -> pipework::Handler {
    let trace = trace.clone();
    handler(move || trace.push(name))
}

#[test]
fn test_action_runs_once_after_all_middleware() {
    for n in 0..5 {
        let trace = Trace::default();
        let mut app = Application::new();
        for _ in 0..n {
            app.use_handler(step(&trace, "mw"));
        }
        app.action(step(&trace, "action"));

        app.serve_http(get("/")).unwrap();

        let steps = trace.steps();
        assert_eq!(steps.len(), n + 1);
        assert_eq!(steps.last().map(String::as_str), Some("action"));
        assert_eq!(steps.iter().filter(|s| *s == "action").count(), 1);
    }
}

#[tokio::test]
async fn test_early_write_stops_chain() {
    let trace = Trace::default();
    let mut app = Application::new();
    app.use_handler(step(&trace, "first"));
    app.use_handler(|| (401, "denied"));
    app.use_handler(step(&trace, "third"));
    app.action(step(&trace, "action"));

    let response = app.serve_http(get("/")).unwrap();

    assert_eq!(trace.steps(), ["first"]);
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_string(response).await, "denied");
}

#[tokio::test]
async fn test_bytes_only_writes_body_without_status() {
    let mut app = Application::new();
    app.action(|| Bytes::from_static(b"\x00raw"));

    let response = app.serve_http(get("/")).unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "\u{0}raw");
}

#[tokio::test]
async fn test_status_and_body_tuple() {
    let mut app = Application::new();
    app.action(|| (404, "not found"));

    let response = app.serve_http(get("/")).unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(response).await, "not found");
}

#[test]
fn test_unresolved_dependency_propagates() {
    struct Database;

    let ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran);
    let mut app = Application::new();
    app.action(move |_db: Arc<Database>| flag.store(true, Ordering::SeqCst));

    let err = app.serve_http(get("/")).unwrap_err();

    assert!(matches!(err, Fault::Inject(InjectError::Unresolved { .. })));
    assert!(!ran.load(Ordering::SeqCst));
}

#[test]
fn test_next_runs_rest_of_chain_first() {
    for later in 0..3 {
        let trace = Trace::default();
        let mut app = Application::new();
        let outer = trace.clone();
        app.use_handler(move |ctx: Context| -> Result<(), Fault> {
            outer.push("before");
            ctx.next()?;
            outer.push("after");
            Ok(())
        });
        for _ in 0..later {
            app.use_handler(step(&trace, "mw"));
        }
        app.action(step(&trace, "action"));

        app.serve_http(get("/")).unwrap();

        let steps = trace.steps();
        assert_eq!(steps.first().map(String::as_str), Some("before"));
        assert_eq!(steps.last().map(String::as_str), Some("after"));
        assert_eq!(steps[steps.len() - 2], "action");
        assert_eq!(steps.len(), later + 3);
    }
}

#[test]
fn test_request_values_do_not_leak_between_requests() {
    struct User(&'static str);

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let mut app = Application::new();
    app.use_handler(|ctx: Context, req: Arc<Request>| {
        if req.uri().path() == "/login" {
            ctx.map(User("ada"));
        }
    });
    app.action(move |user: Option<Arc<User>>| {
        if let Some(user) = user {
            assert_eq!(user.0, "ada");
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    app.serve_http(get("/login")).unwrap();
    app.serve_http(get("/other")).unwrap();

    assert_eq!(seen.load(Ordering::SeqCst), 1);
    assert!(!app.injector().contains::<User>());
}

#[tokio::test]
async fn test_global_service_reaches_handlers() {
    struct Greeting(&'static str);

    let mut app = Application::new();
    app.map(Greeting("hello"));
    app.action(|g: Arc<Greeting>| g.0);

    let response = app.serve_http(get("/")).unwrap();
    assert_eq!(body_string(response).await, "hello");
}

#[test]
fn test_non_callable_registration_fails_immediately() {
    let mut app = Application::new();

    let err = app.use_value(String::from("handler")).unwrap_err();
    assert!(matches!(err, ConfigurationError::NotCallable { .. }));
    assert!(app.action_value(42_u8).is_err());
}

#[tokio::test]
async fn test_recovery_turns_panic_into_500() {
    let mut app = Application::new();
    app.use_handler(recovery());
    app.action(|| -> &'static str { panic!("kaboom") });

    let response = app.serve_http(get("/")).unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_string(response).await;
    assert!(body.starts_with("Internal Server Error"));
    assert!(body.contains("kaboom"));
}

#[tokio::test]
async fn test_recovery_hides_details_in_production() {
    struct Missing;

    let mut config = AppConfig::default();
    config.environment = "production".into();
    let mut app = Application::new();
    app.configure(&config);
    app.use_handler(recovery());
    app.action(|_m: Arc<Missing>| ());

    let response = app.serve_http(get("/")).unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_string(response).await, "Internal Server Error");
}

#[tokio::test]
async fn test_recovery_keeps_response_already_written() {
    let mut app = Application::new();
    app.use_handler(recovery());
    app.action(|res: Arc<dyn ResponseWriter>| -> Result<(), Fault> {
        res.write(b"partial");
        Err(Fault::handler("late failure"))
    });

    let response = app.serve_http(get("/")).unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "partial");
}

#[tokio::test]
async fn test_custom_return_handler() {
    struct Shouting;

    impl ReturnHandler for Shouting {
        fn handle(&self, ctx: &Context, values: ReturnValues) -> Result<(), Fault> {
            for value in values {
                if let ReturnValue::Text(text) = value {
                    ctx.response().write(text.to_uppercase().as_bytes());
                }
            }
            Ok(())
        }
    }

    let mut app = Application::new();
    app.map_to::<dyn ReturnHandler>(Arc::new(Shouting));
    app.action(|| "quiet");

    let response = app.serve_http(get("/")).unwrap();
    assert_eq!(body_string(response).await, "QUIET");
}

#[tokio::test]
async fn test_classic_application() {
    let mut router = Router::new();
    router.get("/hi", || "hi there");

    let app = Application::classic(router);
    assert_eq!(app.middleware().len(), 2);
    assert!(app.injector().contains::<Router>());

    let response = app.serve_http(get("/hi")).unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "hi there");

    let response = app.serve_http(get("/nope")).unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(response).await, "404 page not found");
}

#[tokio::test]
async fn test_logger_and_recovery_together() {
    let mut app = Application::new();
    app.use_handler(logger());
    app.use_handler(recovery());
    app.action(|| -> Result<&'static str, Fault> { Err(Fault::handler("boom")) });

    let response = app.serve_http(get("/")).unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_direct_write_wins_over_returned_body() {
    let mut app = Application::new();
    app.action(|res: Arc<dyn ResponseWriter>| {
        res.write(b"direct");
        "returned"
    });

    let response = app.serve_http(get("/")).unwrap();

    assert_eq!(body_string(response).await, "direct");
}

#[tokio::test]
async fn test_middleware_value_after_next_not_appended() {
    let mut app = Application::new();
    app.use_handler(|ctx: Context| -> Result<&'static str, Fault> {
        ctx.next()?;
        Ok("mw-tail")
    });
    app.action(|| (201, "action"));

    let response = app.serve_http(get("/")).unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_string(response).await, "action");
}

#[tokio::test]
async fn test_route_that_writes_ignores_its_return_value() {
    let mut router = Router::new();
    router.get("/", |res: Arc<dyn ResponseWriter>| {
        res.write_header(StatusCode::ACCEPTED);
        res.write(b"A");
        "B"
    });
    let app = Application::classic(router);

    let response = app.serve_http(get("/")).unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(body_string(response).await, "A");
}
