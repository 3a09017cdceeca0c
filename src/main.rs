//! Portal proxy server.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                 PORTAL PROXY                  │
//!   Browser / SDK        │                                               │
//!   ─────────────────────┼─▶ request id ─▶ trace ─▶ proxy handler        │
//!     GET /_layouts/     │                           │                   │
//!       tokenhtml        │                           ├─ token path ──────┼──▶ upstream token
//!     ANY /_api/*        │                           │                   │     fragment
//!                        │                           └─ Forwarder        │
//!                        │                               rewrite URL     │
//!                        │                               allow-list hdrs │
//!                        │                               body (mutating) │
//!                        │                               deadline ───────┼──▶ upstream data API
//!   ◀────────────────────┼── status + allow-listed headers + payload ◀───┼───
//!                        │                                               │
//!                        │   config (TOML, hot reload) · logging ·       │
//!                        │   metrics · graceful shutdown                 │
//!                        └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use portal_proxy::config::{load_config, watcher::ConfigWatcher, ProxyConfig};
use portal_proxy::http::HttpServer;
use portal_proxy::lifecycle::{signals, Shutdown};
use portal_proxy::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "portal-proxy")]
#[command(about = "Authenticated reverse proxy for the portal data API", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Watch the configuration file and apply changes without a restart.
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };

    logging::init(&config.observability);
    tracing::info!("portal-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        prefix = %config.proxy.prefix,
        upstream = %config.upstream.base_url,
        upstream_timeout_secs = config.timeouts.upstream_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let (config_updates, _watcher) = match (&args.config, args.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (updates, Some(watcher.run()?))
        }
        _ => {
            let (_, updates) = mpsc::unbounded_channel();
            (updates, None)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(config)?;
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
