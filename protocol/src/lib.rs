//! BankLedger Protocol Messages
//!
//! Message types of the `bank.Bank` gRPC service described in
//! `proto/bank.proto`. They are declared with `prost` derives directly so the
//! build needs no protobuf compiler; keep field tags in sync with the file.

pub mod messages;

pub use messages::*;

/// Fully qualified gRPC service name.
pub const SERVICE_NAME: &str = "bank.Bank";

/// Request paths of the service methods.
pub mod methods {
    pub const CREATE_ACCOUNT: &str = "/bank.Bank/CreateAccount";
    pub const GET_BALANCE: &str = "/bank.Bank/GetBalance";
    pub const DEPOSIT: &str = "/bank.Bank/Deposit";
    pub const WITHDRAW: &str = "/bank.Bank/Withdraw";
    pub const CALCULATE_INTEREST: &str = "/bank.Bank/CalculateInterest";
}

/// Status metadata key carrying the last-known balance on rejected calls.
pub const BALANCE_METADATA_KEY: &str = "x-account-balance";
