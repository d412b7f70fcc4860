//! Error types for ledger operations.

use crate::AccountId;
use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

/// Closed set of outcomes an operation may be rejected with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Account id already present on creation.
    AlreadyExists,
    /// Account id absent.
    NotFound,
    /// Amount, rate or identifier rejected before touching state.
    InvalidArgument,
    /// Withdrawal exceeds the current balance.
    FailedPrecondition,
    /// Store unreachable or holding malformed data.
    Internal,
}

impl ErrorKind {
    /// Stable lowercase name, used as a metrics and log label.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::FailedPrecondition => "failed_precondition",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for ledger operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    /// CreateAccount with an id that is already taken.
    #[error("Account already exists: {account_id}")]
    AccountExists { account_id: AccountId },

    /// Any operation on an id that is not in the store.
    #[error("Account not found: {account_id}")]
    AccountNotFound { account_id: AccountId },

    /// Non-positive amount or rate, unrepresentable value, or bad identifier.
    #[error("Invalid {field} for account {account_id}: {reason}")]
    InvalidArgument {
        account_id: AccountId,
        field: &'static str,
        reason: String,
        /// Balance of the account when the rejection happened, if it exists.
        balance: Option<Decimal>,
    },

    /// Withdrawal larger than the available balance.
    #[error("Insufficient funds in account {account_id}: requested {requested}, available {balance}")]
    InsufficientFunds {
        account_id: AccountId,
        requested: Decimal,
        balance: Decimal,
    },

    /// The store could not be reached or returned an error.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The store holds a record that cannot be decoded.
    #[error("Corrupted record for account {account_id}: {reason}")]
    StoreCorrupted { account_id: AccountId, reason: String },
}

impl LedgerError {
    /// Build an `InvalidArgument` rejection.
    pub fn invalid_argument(
        account_id: &AccountId,
        field: &'static str,
        reason: impl Into<String>,
        balance: Option<Decimal>,
    ) -> Self {
        LedgerError::InvalidArgument {
            account_id: account_id.clone(),
            field,
            reason: reason.into(),
            balance,
        }
    }

    /// Taxonomy entry of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::AccountExists { .. } => ErrorKind::AlreadyExists,
            LedgerError::AccountNotFound { .. } => ErrorKind::NotFound,
            LedgerError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            LedgerError::InsufficientFunds { .. } => ErrorKind::FailedPrecondition,
            LedgerError::StoreUnavailable(_) | LedgerError::StoreCorrupted { .. } => {
                ErrorKind::Internal
            }
        }
    }

    /// Check if a caller may retry the operation unchanged.
    /// The ledger itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::StoreUnavailable(_))
    }

    /// Last-known balance of the account the error refers to.
    ///
    /// `None` when the account does not exist (or its balance could not be read).
    pub fn balance(&self) -> Option<Decimal> {
        match self {
            LedgerError::InvalidArgument { balance, .. } => *balance,
            LedgerError::InsufficientFunds { balance, .. } => Some(*balance),
            _ => None,
        }
    }

    /// Account the error refers to, if any.
    pub fn account_id(&self) -> Option<&AccountId> {
        match self {
            LedgerError::AccountExists { account_id }
            | LedgerError::AccountNotFound { account_id }
            | LedgerError::InvalidArgument { account_id, .. }
            | LedgerError::InsufficientFunds { account_id, .. }
            | LedgerError::StoreCorrupted { account_id, .. } => Some(account_id),
            LedgerError::StoreUnavailable(_) => None,
        }
    }

    /// Get error code for logs and protocol metadata.
    pub fn error_code(&self) -> &'static str {
        match self {
            LedgerError::AccountExists { .. } => "ACCOUNT_EXISTS",
            LedgerError::AccountNotFound { .. } => "ACCOUNT_NOT_FOUND",
            LedgerError::InvalidArgument { .. } => "INVALID_ARGUMENT",
            LedgerError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            LedgerError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            LedgerError::StoreCorrupted { .. } => "STORE_CORRUPTED",
        }
    }
}

/// Result type alias for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
