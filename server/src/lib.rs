//! BankLedger Server
//!
//! Serves the `bank.Bank` gRPC service over the ledger engine. The façade
//! converts wire requests, the engine enforces account invariants and the
//! node owns the lifecycle.

pub mod config;
pub mod grpc;
pub mod node;
pub mod service;
pub mod state;

pub use config::{ServerConfig, StoreBackend};
pub use grpc::{Bank, BankServer};
pub use node::{open_store, BankNode};
pub use service::{status_from_error, LedgerService};
pub use state::ServerState;
