//! Pipework demo server.
//!
//! ```text
//!   Client Request
//!       → axum fallback (body collected, chain moved to blocking pool)
//!       → Context (request container → global container)
//!       → logger → recovery → Router action → route handler
//!       → ReturnHandler → BufferedResponse
//!   Client Response
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use pipework::config::{self, AppConfig};
use pipework::observability::{self, metrics};
use pipework::{Application, Fault, Logger, Request, Router};

#[derive(Parser)]
#[command(name = "pipework")]
#[command(about = "Demo server for the pipework dispatch engine", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Interface to bind (overrides config and HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides config and PORT)
    #[arg(short, long)]
    port: Option<u16>,
}

/// Greeting mapped at global scope.
struct Greeting(String);

fn routes() -> Router {
    let mut router = Router::new();
    router
        .get("/", || "Hello world!")
        .get("/hello", |greeting: Arc<Greeting>, req: Arc<Request>| {
            let name = req
                .uri()
                .query()
                .and_then(|q| q.strip_prefix("name="))
                .unwrap_or("stranger");
            format!("{}, {}!", greeting.0, name)
        })
        .get("/health", || serde_json::json!({ "status": "ok" }))
        .post("/echo", |req: Arc<Request>| (201, req.body().clone()))
        .get("/teapot", || (418, "I'm a teapot"))
        .get("/panic", |log: Arc<Logger>| -> &'static str {
            log.warn("about to panic");
            panic!("demo panic");
        })
        .get("/fail", || -> Result<&'static str, Fault> {
            Err(Fault::handler("demo failure"))
        });
    router
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => AppConfig::default(),
    };
    config::apply_env_overrides(&mut config)?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Err(errors) = config::validate_config(&config) {
        for e in &errors {
            eprintln!("config error: {}", e);
        }
        return Err(config::ConfigError::Validation(errors).into());
    }

    observability::init_tracing(&config.observability);
    tracing::info!("pipework v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let mut app = Application::classic(routes());
    app.configure(&config);
    app.map(Greeting("Hello".to_string()));

    app.run_on_addr(&config.server.address()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
