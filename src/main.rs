//! API gateway runtime (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────────┐
//!                         │                      GATEWAY                          │
//!                         │                                                       │
//!   plugin data file ─────┼─▶ watcher ─▶ subscriber ─▶ cache dispatcher           │
//!                         │                                   │ atomic install    │
//!                         │                                   ▼                   │
//!                         │                          ┌────────────────┐           │
//!                         │                          │  ActiveCache   │           │
//!                         │                          │ (config, store)│           │
//!                         │                          └───────┬────────┘           │
//!                         │                                  │ snapshot per req   │
//!   Client Request ───────┼─▶ server ─▶ request id ─▶ cache layer ─▶ upstream ────┼──▶ Upstream
//!   Client Response ◀─────┼── buffer pipeline (capture, store, replay) ◀──────────┼───
//!                         └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use gateway_core::cache::BackendRegistry;
use gateway_core::config::{load_config, GatewayConfig, PluginDataWatcher};
use gateway_core::lifecycle::{shutdown_signal, Shutdown};
use gateway_core::observability::{logging, metrics};
use gateway_core::plugin::{CacheDispatcher, PluginDataSubscriber};
use gateway_core::{GatewayContext, GatewayServer};

#[derive(Parser)]
#[command(name = "gateway-core")]
#[command(about = "API gateway with hot-swappable response caching", long_about = None)]
struct Cli {
    /// Path to the gateway TOML configuration. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init(&config.observability);
    tracing::info!("gateway-core v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        instance = %config.instance.name,
        request_timeout_secs = config.timeouts.request_secs,
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

    let ctx = GatewayContext::new(&config);
    let shutdown = Shutdown::new();

    // Control plane: plugin data events drive the active cache backend.
    let dispatcher = CacheDispatcher::new(ctx.active_cache().clone(), BackendRegistry::with_defaults());
    let mut subscriber = PluginDataSubscriber::new();
    subscriber.register(Arc::new(dispatcher));

    let (_watcher, events) = match &config.control_plane.plugin_data_path {
        Some(path) => {
            let (watcher, events) = PluginDataWatcher::new(Path::new(path));
            let published = watcher.publish_current();
            tracing::info!(path = %path, records = published, "Loaded plugin data");
            (Some(watcher.run()?), events)
        }
        None => {
            tracing::warn!("No plugin data path configured, response cache stays off");
            let (_tx, events) = mpsc::unbounded_channel();
            (None, events)
        }
    };
    let subscriber_task = tokio::spawn(subscriber.run(events, shutdown.subscribe()));

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = GatewayServer::new(&config, ctx, shutdown.token())?;
    let mut server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tokio::select! {
        result = &mut server_task => {
            shutdown.trigger();
            result??;
        }
        _ = shutdown_signal() => {
            shutdown.trigger();
            server_task.await??;
        }
    }

    let _ = subscriber_task.await;
    tracing::info!("Shutdown complete");
    Ok(())
}
