use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use log::info;
use tokio::runtime::Builder;
use tokio::sync::{RwLock, watch};

use dv_router::config::load_startup_commands;
use dv_router::protocol::{PROTOCOL_PORT, ProtocolEngine};
use dv_router::{Address, RouterState, console};

#[derive(Parser)]
#[command(name = "dv-router")]
struct Cli {
    /// Address this router binds to and identifies itself with.
    address: Address,

    /// Seconds between periodic routing updates.
    period: u64,

    /// Optional startup-command file, one `add <address> <cost>` per line.
    startup: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let rt = Builder::new_multi_thread().enable_all().build()?;

    rt.block_on(async {
        let mut state = RouterState::new(cli.address, Duration::from_secs(cli.period));
        if let Some(path) = &cli.startup {
            load_startup_commands(&mut state, path);
        }
        let state = Arc::new(RwLock::new(state));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let engine = ProtocolEngine::bind(state.clone(), cli.address, shutdown_rx).await?;
        let socket = engine.socket();
        info!(
            "router {} listening on UDP port {PROTOCOL_PORT}, update period {}s",
            cli.address, cli.period
        );

        let (receive_task, periodic_task) = engine.start();

        console::run(state, socket, shutdown_tx).await?;

        receive_task.await?;
        periodic_task.await?;
        Ok(())
    })
}
