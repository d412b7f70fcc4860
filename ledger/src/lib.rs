//! BankLedger Ledger Engine
//!
//! Serializes balance mutations against an external key-value store.
//! Every mutation runs its existence check, validation, read and write
//! inside one critical section guarded by the [`gate::Gate`].

pub mod engine;
pub mod account;
pub mod balance;
pub mod gate;
pub mod metrics;
pub mod store;

pub use engine::LedgerEngine;
pub use account::Account;
pub use balance::{BalanceChange, BalanceChangeType};
pub use gate::{Gate, GateMode};
pub use metrics::{LedgerMetrics, MetricsSnapshot};
pub use store::{AccountStore, InMemoryAccountStore, RedisAccountStore, StoreError};
