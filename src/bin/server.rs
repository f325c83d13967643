//! realm-core-server binary
//!
//! Loads configuration, wires the content catalog, world router, and
//! world-category connection listener, then runs until shutdown.
//!
//! ## Configuration (env / TOML via `config` crate, see `realm_core::config`)

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;

use realm_core::config::{load_runtime_config, Args};
use realm_core::connection::ConnectionServer;
use realm_core::protocol::dispatch::DispatchTable;
use realm_core::protocol::opcodes::{ConnectionCategory, OpcodeTable};
use realm_core::router::WorldRouter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("realm_core=debug".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = load_runtime_config(&args)?;

    tracing::info!(
        listen_addr = %args.listen_addr,
        ai_tick_interval_ms = config.ai_tick_interval_ms,
        combat_timeout_ms = config.combat_timeout_ms,
        "starting realm-core-server",
    );

    let _router = Arc::new(WorldRouter::new());

    let dispatch = DispatchTable::new(OpcodeTable::world());
    let server = ConnectionServer::new(ConnectionCategory::World, dispatch);

    let listener = TcpListener::bind(&args.listen_addr).await?;
    tracing::info!(listen_addr = %args.listen_addr, "listening for world connections");
    server.serve(listener).await?;

    Ok(())
}
