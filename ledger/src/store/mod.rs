//! Account store adapters.
//!
//! An account is one record keyed by its id with three string fields:
//! `balance` (decimal text), `account_type` and `created_at` (RFC 3339).
//! Adapters translate reads and writes to a backend and hold no business
//! rules; atomicity across calls is the engine's job.

use std::collections::HashMap;

use async_trait::async_trait;
use bankledger_common::{AccountId, AccountType, LedgerError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::account::Account;

pub mod memory;
pub mod redis_store;

pub use self::memory::InMemoryAccountStore;
pub use self::redis_store::RedisAccountStore;

/// Balance field name.
pub const BALANCE_FIELD: &str = "balance";
/// Account type field name.
pub const ACCOUNT_TYPE_FIELD: &str = "account_type";
/// Creation timestamp field name.
pub const CREATED_AT_FIELD: &str = "created_at";

/// Errors raised by store adapters.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend unreachable or command failed.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Record present but a field is missing or cannot be decoded.
    #[error("malformed record for account {account_id}: {reason}")]
    Malformed { account_id: AccountId, reason: String },
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(message) => LedgerError::StoreUnavailable(message),
            StoreError::Malformed { account_id, reason } => {
                LedgerError::StoreCorrupted { account_id, reason }
            }
        }
    }
}

/// Narrow key-value interface the ledger engine runs against.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Backend name, for logs.
    fn name(&self) -> &str;

    /// Check whether a record exists for the id.
    async fn exists(&self, account_id: &AccountId) -> StoreResult<bool>;

    /// Write a new record. The caller has already checked that the id is free.
    async fn create(&self, account: &Account) -> StoreResult<()>;

    /// Read the balance field.
    async fn get_balance(&self, account_id: &AccountId) -> StoreResult<Decimal>;

    /// Overwrite the balance field.
    async fn set_balance(&self, account_id: &AccountId, balance: Decimal) -> StoreResult<()>;

    /// Read the type tag.
    async fn get_account_type(&self, account_id: &AccountId) -> StoreResult<AccountType>;

    /// Read the whole record, `None` if absent.
    async fn get_account(&self, account_id: &AccountId) -> StoreResult<Option<Account>>;
}

/// Field/value pairs for a new record.
pub(crate) fn encode_account(account: &Account) -> Vec<(&'static str, String)> {
    let mut fields = vec![
        (BALANCE_FIELD, account.balance.to_string()),
        (ACCOUNT_TYPE_FIELD, account.account_type.as_str().to_string()),
    ];
    if let Some(created_at) = account.created_at {
        fields.push((CREATED_AT_FIELD, created_at.to_rfc3339()));
    }
    fields
}

pub(crate) fn decode_balance(account_id: &AccountId, raw: Option<&str>) -> StoreResult<Decimal> {
    let raw = raw.ok_or_else(|| StoreError::Malformed {
        account_id: account_id.clone(),
        reason: format!("missing {BALANCE_FIELD} field"),
    })?;
    raw.trim()
        .parse::<Decimal>()
        .map_err(|e| StoreError::Malformed {
            account_id: account_id.clone(),
            reason: format!("unparsable {BALANCE_FIELD} {raw:?}: {e}"),
        })
}

pub(crate) fn decode_account_type(
    account_id: &AccountId,
    raw: Option<&str>,
) -> StoreResult<AccountType> {
    raw.map(AccountType::parse)
        .ok_or_else(|| StoreError::Malformed {
            account_id: account_id.clone(),
            reason: format!("missing {ACCOUNT_TYPE_FIELD} field"),
        })
}

pub(crate) fn decode_account(
    account_id: &AccountId,
    fields: &HashMap<String, String>,
) -> StoreResult<Account> {
    let balance = decode_balance(account_id, fields.get(BALANCE_FIELD).map(String::as_str))?;
    let account_type =
        decode_account_type(account_id, fields.get(ACCOUNT_TYPE_FIELD).map(String::as_str))?;
    let created_at = match fields.get(CREATED_AT_FIELD) {
        Some(raw) => Some(
            DateTime::parse_from_rfc3339(raw)
                .map(|at| at.with_timezone(&Utc))
                .map_err(|e| StoreError::Malformed {
                    account_id: account_id.clone(),
                    reason: format!("unparsable {CREATED_AT_FIELD} {raw:?}: {e}"),
                })?,
        ),
        None => None,
    };

    Ok(Account {
        id: account_id.clone(),
        account_type,
        balance,
        created_at,
    })
}
