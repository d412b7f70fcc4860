//! BankLedger Server Binary
//!
//! Serves account creation, balance queries and balance mutations over gRPC.

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bankledger_server::{open_store, BankNode, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting BankLedger server");

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }
    let addr = config.socket_addr().map_err(|e| anyhow::anyhow!(e))?;

    let node_id = config
        .node_id
        .clone()
        .unwrap_or_else(|| format!("bank-{}", uuid::Uuid::new_v4()));

    info!(node_id = %node_id, store = %config.store, "Node ID assigned");

    let store = open_store(&config).await.map_err(|e| {
        error!(error = %e, "Cannot open account store");
        anyhow::anyhow!("Store error: {}", e)
    })?;

    let node = BankNode::new(config, node_id, store);
    node.serve(addr, shutdown_signal()).await?;

    info!("BankLedger server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}
