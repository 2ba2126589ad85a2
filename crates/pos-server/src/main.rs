//! POS Server entry point.
//!
//! Loads configuration, restores the record snapshot, then runs the UDP
//! discovery responder and the HTTP/JSON API side by side until Ctrl-C.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()            -- TOML file + CLI overrides
//!  └─ PosStore::load()         -- JSON snapshot (optional)
//!  └─ start services
//!       ├─ DiscoveryResponder  (UDP background thread, port 5001)
//!       └─ HTTP API            (Tokio tasks, port 5000)
//! ```
//!
//! # Usage
//!
//! ```text
//! pos-server [OPTIONS]
//!
//! Options:
//!   --config <PATH>          Config file [default: platform config dir]
//!   --bind <IP>              Bind address for both listeners
//!   --http-port <PORT>       HTTP API port [default: 5000]
//!   --discovery-port <PORT>  Discovery UDP port [default: 5001]
//!   --data-file <PATH>       JSON snapshot file
//! ```

use std::future::Future;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use pos_server::application::store::PosStore;
use pos_server::infrastructure::http::{self, ServerState};
use pos_server::infrastructure::network::discovery::start_discovery_responder;
use pos_server::infrastructure::storage::config::{load_config, ServerConfig};

/// POS system server.
///
/// Answers kiosk discovery broadcasts and serves the HTTP/JSON API.
#[derive(Debug, Parser)]
#[command(name = "pos-server", about = "POS system server", version)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, env = "POS_SERVER_CONFIG")]
    config: Option<PathBuf>,

    /// IP address both listeners bind to.
    #[arg(long, env = "POS_BIND")]
    bind: Option<IpAddr>,

    /// TCP port of the HTTP API.
    #[arg(long, env = "POS_HTTP_PORT")]
    http_port: Option<u16>,

    /// UDP port of the discovery responder.
    #[arg(long, env = "POS_DISCOVERY_PORT")]
    discovery_port: Option<u16>,

    /// JSON snapshot file for users, items, sales, and kiosks.
    #[arg(long, env = "POS_DATA_FILE")]
    data_file: Option<PathBuf>,
}

impl Cli {
    /// Applies CLI/environment overrides on top of the file config.
    fn apply(&self, cfg: &mut ServerConfig) {
        if let Some(bind) = self.bind {
            cfg.network.bind_address = bind;
        }
        if let Some(port) = self.http_port {
            cfg.network.http_port = port;
        }
        if let Some(port) = self.discovery_port {
            cfg.network.discovery_port = port;
        }
        if let Some(path) = &self.data_file {
            cfg.storage.data_file = Some(path.clone());
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut cfg = load_config(cli.config.as_deref()).context("failed to load config")?;
    cli.apply(&mut cfg);

    // Initialise structured logging.  `RUST_LOG` wins over the config file.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.server.log_level)),
        )
        .init();

    info!("POS server starting");

    let store = match &cfg.storage.data_file {
        Some(path) => PosStore::load(path)
            .with_context(|| format!("failed to load snapshot {}", path.display()))?,
        None => {
            warn!("no data file configured; records are kept in memory only");
            PosStore::new()
        }
    };

    // Shutdown flag shared with the discovery thread.
    let running = Arc::new(AtomicBool::new(true));

    // ── Discovery responder ────────────────────────────────────────────────────
    // A failure here degrades discovery but the API stays reachable by address.
    let responder =
        match start_discovery_responder(cfg.network.discovery_addr(), Arc::clone(&running)) {
            Ok(responder) => Some(responder),
            Err(e) => {
                error!("failed to start discovery responder: {e}");
                None
            }
        };

    // ── HTTP API ──────────────────────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(cfg.network.http_addr())
        .await
        .with_context(|| format!("failed to bind HTTP API on {}", cfg.network.http_addr()))?;
    let state = ServerState::new(
        store,
        cfg.storage.data_file.clone(),
        cfg.storage.hash_iterations,
        cfg.network.http_port,
    )
    .into_shared();

    info!("POS server ready.  Press Ctrl-C to exit.");

    let served = http::serve(listener, state, wait_for_shutdown(tokio::signal::ctrl_c())).await;

    running.store(false, Ordering::Relaxed);
    if let Some(responder) = responder {
        responder.join();
    }

    served.context("HTTP API failed")?;
    info!("POS server stopped");
    Ok(())
}

/// Resolves once `signal` fires.  If the signal cannot be listened for, it
/// never resolves and the server runs until killed.
async fn wait_for_shutdown(signal: impl Future<Output = std::io::Result<()>>) {
    match signal.await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            warn!("cannot listen for Ctrl-C, serving until killed: {e}");
            std::future::pending::<()>().await;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
