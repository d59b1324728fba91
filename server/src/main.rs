use anyhow::Result;
use clap::Parser;
use streamgate_observability::init_tracing;
use streamgate_server::{AppState, Cli, GatewayConfig, GatewayServerHandle};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = GatewayConfig::load(&cli)?;
    init_tracing(&config.log);

    info!(
        chain_id = config.chain_id,
        rpc_url = %config.rpc_url,
        backend = config.backend.as_str(),
        has_wallet = config.has_wallet(),
        "starting streamgate"
    );

    let listen = config.listen;
    let state = AppState::from_config(config).await?;
    let server = GatewayServerHandle::spawn(listen, state).await?;

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    server.shutdown().await
}
