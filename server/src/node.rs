//! Server node: owns the engine, the lifecycle state and the transport.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::RwLock;
use tonic::transport::server::Router;
use tonic::transport::Server;
use tracing::{info, instrument};

use bankledger_ledger::{
    AccountStore, InMemoryAccountStore, LedgerEngine, MetricsSnapshot, RedisAccountStore,
    StoreError,
};

use crate::config::{ServerConfig, StoreBackend};
use crate::grpc::BankServer;
use crate::service::LedgerService;
use crate::state::ServerState;

/// Open the configured account store. One connection is shared by all requests.
pub async fn open_store(config: &ServerConfig) -> Result<Arc<dyn AccountStore>, StoreError> {
    let store: Arc<dyn AccountStore> = match config.store {
        StoreBackend::Memory => Arc::new(InMemoryAccountStore::new()),
        StoreBackend::Redis => Arc::new(
            RedisAccountStore::connect(&config.redis_url, config.key_prefix.clone()).await?,
        ),
    };
    info!(store = store.name(), "Account store ready");
    Ok(store)
}

/// A running ledger server.
pub struct BankNode {
    /// Configuration.
    config: ServerConfig,
    /// Node ID for logs.
    node_id: String,
    /// Current lifecycle state, shared with the façade.
    state: Arc<RwLock<ServerState>>,
    /// Ledger engine.
    engine: Arc<LedgerEngine>,
}

impl BankNode {
    /// Create a node over an open store.
    pub fn new(config: ServerConfig, node_id: String, store: Arc<dyn AccountStore>) -> Self {
        let engine = Arc::new(LedgerEngine::with_gate_mode(store, config.gate_mode));
        Self {
            config,
            node_id,
            state: Arc::new(RwLock::new(ServerState::Starting)),
            engine,
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn state(&self) -> ServerState {
        *self.state.read()
    }

    pub fn engine(&self) -> Arc<LedgerEngine> {
        Arc::clone(&self.engine)
    }

    /// Check if the node is accepting requests.
    pub fn is_accepting_requests(&self) -> bool {
        self.state().accepts_requests()
    }

    /// The `bank.Bank` tower service.
    pub fn grpc_service(&self) -> BankServer<LedgerService> {
        BankServer::new(LedgerService::new(
            Arc::clone(&self.engine),
            Arc::clone(&self.state),
        ))
    }

    /// Transport with the service mounted and the per-connection limit applied.
    pub fn router(&self) -> Router {
        Server::builder()
            .concurrency_limit_per_connection(self.config.concurrency_limit)
            .add_service(self.grpc_service())
    }

    /// Start accepting requests.
    #[instrument(skip(self), fields(node_id = %self.node_id))]
    pub fn start(&self) {
        *self.state.write() = ServerState::Running;
        info!(gate_mode = %self.engine.gate_mode(), "Node running");
    }

    /// Refuse new requests. In-flight calls finish.
    #[instrument(skip(self), fields(node_id = %self.node_id))]
    pub fn begin_shutdown(&self) {
        *self.state.write() = ServerState::ShuttingDown;
        info!("Node shutting down");
    }

    /// Mark the node stopped and log the final counters.
    #[instrument(skip(self), fields(node_id = %self.node_id))]
    pub fn complete_shutdown(&self) -> MetricsSnapshot {
        *self.state.write() = ServerState::Stopped;
        let snapshot = self.engine.metrics().snapshot();
        info!(
            operations_total = snapshot.operations_total,
            operations_succeeded = snapshot.operations_succeeded,
            operations_failed = snapshot.operations_failed(),
            mutations_committed = snapshot.mutations_committed,
            internal_errors = snapshot.internal_errors,
            "Node stopped"
        );
        snapshot
    }

    /// Serve on `addr` until `shutdown` resolves.
    pub async fn serve<F>(&self, addr: SocketAddr, shutdown: F) -> Result<(), tonic::transport::Error>
    where
        F: Future<Output = ()>,
    {
        let router = self.router();
        self.start();
        info!(node_id = %self.node_id, listen_addr = %addr, "Serving bank.Bank");

        let result = router
            .serve_with_shutdown(addr, async {
                shutdown.await;
                self.begin_shutdown();
            })
            .await;

        self.complete_shutdown();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bankledger_common::{AccountId, AccountType};
    use rust_decimal::Decimal;

    fn memory_config() -> ServerConfig {
        ServerConfig {
            store: StoreBackend::Memory,
            ..ServerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let config = memory_config();
        let store = open_store(&config).await.unwrap();
        let node = BankNode::new(config, "node-1".to_string(), store);
        assert_eq!(node.state(), ServerState::Starting);
        assert!(!node.is_accepting_requests());

        node.start();
        assert!(node.is_accepting_requests());

        let engine = node.engine();
        let id = AccountId::new("A");
        engine
            .create_account(&id, &AccountType::Savings)
            .await
            .unwrap();
        engine.deposit(&id, Decimal::from(5)).await.unwrap();

        node.begin_shutdown();
        assert_eq!(node.state(), ServerState::ShuttingDown);
        let snapshot = node.complete_shutdown();
        assert_eq!(node.state(), ServerState::Stopped);
        assert_eq!(snapshot.mutations_committed, 2);
    }

    #[tokio::test]
    async fn test_gate_mode_follows_config() {
        let config = ServerConfig {
            gate_mode: bankledger_ledger::GateMode::PerAccount,
            ..memory_config()
        };
        let store = open_store(&config).await.unwrap();
        let node = BankNode::new(config, "node-1".to_string(), store);
        assert_eq!(
            node.engine().gate_mode(),
            bankledger_ledger::GateMode::PerAccount
        );
    }
}
