//! POS Kiosk entry point.
//!
//! Wires the discovery client, HTTP API client, token sources, and the
//! terminal front end into a [`KioskController`], runs discovery once, and
//! then processes operator commands until `quit`.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()                 -- TOML file + CLI overrides
//!  └─ KioskController::start()      -- one discovery broadcast, lock screen
//!  └─ run_console()                 -- one command at a time
//!       ├─ unlock / scan            -> Session/Role Gate
//!       ├─ items / add / checkout   -> HTTP API
//!       └─ retry                    -> discovery again, back to Locked
//! ```
//!
//! Any start-up failure is logged and turned into a non-zero exit code;
//! the process never panics on a configuration or network problem.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pos_kiosk::application::gate::TokenSources;
use pos_kiosk::application::kiosk::KioskController;
use pos_kiosk::application::ports::TokenSource;
use pos_kiosk::infrastructure::api::HttpPosApi;
use pos_kiosk::infrastructure::console::{run_console, ConsoleInput, ConsoleScreen};
use pos_kiosk::infrastructure::discovery::DiscoveryClient;
use pos_kiosk::infrastructure::storage::config::{load_config, KioskConfig};
use pos_kiosk::infrastructure::token_source::{DeviceTokenReader, ManualTokenEntry};

/// POS kiosk terminal.
#[derive(Debug, Parser)]
#[command(name = "pos-kiosk", about = "POS kiosk terminal", version)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, env = "POS_KIOSK_CONFIG")]
    config: Option<PathBuf>,

    /// Id of this kiosk's record on the server.
    #[arg(long, env = "POS_KIOSK_ID")]
    kiosk_id: Option<u32>,

    /// Address the discovery request is sent to.
    #[arg(long, env = "POS_DISCOVERY_TARGET")]
    discovery_target: Option<SocketAddr>,

    /// Character device of the RFID reader.
    #[arg(long, env = "POS_READER_DEVICE")]
    reader_device: Option<PathBuf>,
}

impl Cli {
    fn apply(&self, cfg: &mut KioskConfig) {
        if let Some(id) = self.kiosk_id {
            cfg.kiosk.kiosk_id = id;
        }
        if let Some(target) = self.discovery_target {
            cfg.discovery.target = target;
        }
        if let Some(device) = &self.reader_device {
            cfg.reader.device = Some(device.clone());
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let cfg = match load_config(cli.config.as_deref()) {
        Ok(mut cfg) => {
            cli.apply(&mut cfg);
            cfg
        }
        Err(e) => {
            // Logging is not set up yet.
            eprintln!("pos-kiosk: failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.kiosk.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cfg).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("kiosk stopped: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cfg: KioskConfig) -> anyhow::Result<()> {
    info!(kiosk_id = cfg.kiosk.kiosk_id, "POS kiosk starting");

    let api = HttpPosApi::new(cfg.api.request_timeout()).context("failed to build HTTP client")?;
    let locator = DiscoveryClient::new(cfg.discovery.to_discovery_config());
    let input = ConsoleInput::stdin();

    let hardware = cfg.reader.device.as_ref().map(|device| {
        info!("RFID reader configured at {}", device.display());
        Box::new(DeviceTokenReader::new(device, cfg.reader.read_timeout())) as Box<dyn TokenSource>
    });
    let mut sources = TokenSources::new(hardware, Box::new(ManualTokenEntry::new(input.clone())));

    let mut kiosk = KioskController::new(api, locator, ConsoleScreen, cfg.kiosk.kiosk_id);
    kiosk.start().await;

    run_console(&mut kiosk, &input, &mut sources).await?;

    info!("POS kiosk stopped");
    Ok(())
}
