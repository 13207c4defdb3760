//! treeline server.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────────────────┐
//!                  │                        TREELINE                          │
//!                  │                                                          │
//!  Browser GET     │  ┌─────────┐   ┌──────────┐   ┌───────────┐              │
//!  ────────────────┼─▶│  http   │──▶│ routing  │──▶│  render   │              │
//!                  │  │ server  │   │ matcher  │   │ pipeline  │              │
//!                  │  └─────────┘   └────▲─────┘   └─────┬─────┘              │
//!                  │                     │               │                    │
//!                  │               ┌─────┴─────┐   ┌─────▼─────┐              │
//!                  │               │RouteTable │   │ injector  │              │
//!                  │               │(ArcSwap)  │   │ head/body │              │
//!                  │               └─────▲─────┘   └─────┬─────┘              │
//!  Streamed HTML   │                     │               │                    │
//!  ◀───────────────┼─────────────────────┼───────────────┘                    │
//!                  │               ┌─────┴─────┐                              │
//!                  │               │  watcher  │◀── app/ (development)        │
//!                  │               └───────────┘                              │
//!                  └──────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use treeline::config::{self, RenderMode, TreelineConfig};
use treeline::lifecycle::{spawn_signal_handler, Shutdown};
use treeline::observability::{logging, metrics};
use treeline::render::FragmentLoader;
use treeline::routing::{RouteTable, RouteWatcher};
use treeline::HttpServer;

#[derive(Debug, Parser)]
#[command(name = "treeline", version, about = "Serve a directory-routed application")]
struct Args {
    /// Path to treeline.toml. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Root of the route tree (overrides routes.app_dir).
    #[arg(long)]
    app_dir: Option<PathBuf>,

    /// Listen address (overrides server.bind_address).
    #[arg(short, long)]
    bind: Option<String>,

    /// Production posture: hashed unit ids, generic error pages, no watcher.
    #[arg(long)]
    production: bool,
}

fn load_config(args: &Args) -> Result<TreelineConfig, config::ConfigError> {
    let mut config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => TreelineConfig::default(),
    };
    if let Some(app_dir) = &args.app_dir {
        config.routes.app_dir = app_dir.clone();
    }
    if let Some(bind) = &args.bind {
        config.server.bind_address = bind.clone();
    }
    if args.production {
        config.render.mode = RenderMode::Production;
    }
    config::validate_config(&config).map_err(config::ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(&args)?;

    logging::init_logging(&config.observability, config.log_format())?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "treeline starting");
    tracing::info!(
        bind_address = %config.server.bind_address,
        app_dir = %config.routes.app_dir.display(),
        mode = ?config.render.mode,
        request_timeout_secs = config.server.request_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: std::net::SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let routes = Arc::new(RouteTable::load(
        &config.routes.app_dir,
        config.build_options(),
    )?);
    for pattern in routes.current().routes() {
        tracing::info!(route = %pattern, "Route registered");
    }

    let shutdown = Shutdown::new();
    spawn_signal_handler(&shutdown);

    // Kept alive for the lifetime of the server
    let _watcher = if config.watch_enabled() {
        let watcher = RouteWatcher::new(
            Arc::clone(&routes),
            Duration::from_millis(config.routes.debounce_ms),
        );
        Some(watcher.run(shutdown.subscribe())?)
    } else {
        None
    };

    let loader = Arc::new(FragmentLoader::new(config.is_production()));

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config, routes, loader);
    server.run(listener, shutdown.signaled()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
