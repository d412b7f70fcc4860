//! Account definitions for ledger.

use bankledger_common::{AccountId, AccountType};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A ledger account as held in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique account identifier.
    pub id: AccountId,
    /// Account type tag.
    pub account_type: AccountType,
    /// Current balance.
    pub balance: Decimal,
    /// When the account was created. Absent on records written by older servers.
    pub created_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Open a new account with a zero balance.
    pub fn open(id: AccountId, account_type: AccountType) -> Self {
        Self {
            id,
            account_type,
            balance: Decimal::ZERO,
            created_at: Some(Utc::now()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_starts_at_zero() {
        let account = Account::open(AccountId::new("B"), AccountType::Checking);
        assert_eq!(account.balance, Decimal::ZERO);
        assert_eq!(account.account_type.as_str(), "checking");
        assert!(account.created_at.is_some_and(|at| at <= Utc::now()));
    }
}
