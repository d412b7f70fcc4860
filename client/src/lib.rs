//! BankLedger Client Library
//!
//! Programmatic access to a BankLedger server: one async method per RPC,
//! typed receipts on success and [`ClientError`] carrying the status code,
//! outcome message and reported balance on rejection.

pub mod client;
pub mod config;

pub use client::{BankClient, ClientError, Receipt, Result};
pub use config::ClientConfig;
