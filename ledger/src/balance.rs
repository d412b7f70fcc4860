//! Balance arithmetic.
//!
//! Pure functions computing the next balance for a mutation. They validate
//! the argument and the funds precondition; they never touch the store.

use bankledger_common::{is_positive, AccountId, LedgerError, Result, PERCENT};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Type of balance change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BalanceChangeType {
    /// Funds added by the client.
    Deposit,
    /// Funds removed by the client.
    Withdrawal,
    /// Interest accrued at an annual percentage rate.
    Interest,
}

impl BalanceChangeType {
    /// Name of the argument this change is driven by.
    pub fn argument_name(&self) -> &'static str {
        match self {
            BalanceChangeType::Deposit | BalanceChangeType::Withdrawal => "amount",
            BalanceChangeType::Interest => "annual_interest_rate",
        }
    }

    /// Operation label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            BalanceChangeType::Deposit => "deposit",
            BalanceChangeType::Withdrawal => "withdraw",
            BalanceChangeType::Interest => "calculate_interest",
        }
    }
}

/// A computed balance change, applied or about to be applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceChange {
    /// Account affected.
    pub account_id: AccountId,
    /// Change type.
    pub change_type: BalanceChangeType,
    /// Amount or rate the client supplied.
    pub argument: Decimal,
    /// Absolute amount the balance moved by.
    pub amount: Decimal,
    /// Balance before change.
    pub balance_before: Decimal,
    /// Balance after change.
    pub balance_after: Decimal,
    /// When the change was computed.
    pub timestamp: DateTime<Utc>,
}

impl BalanceChange {
    /// Compute the change of `change_type` driven by `argument` on a balance.
    ///
    /// Rejects non-positive arguments, withdrawals beyond the balance and
    /// results outside the `Decimal` range. Every rejection reports the
    /// unchanged balance.
    pub fn compute(
        account_id: &AccountId,
        change_type: BalanceChangeType,
        argument: Decimal,
        balance_before: Decimal,
    ) -> Result<Self> {
        if !is_positive(argument) {
            return Err(LedgerError::invalid_argument(
                account_id,
                change_type.argument_name(),
                format!("must be positive, got {argument}"),
                Some(balance_before),
            ));
        }

        let overflow = || {
            LedgerError::invalid_argument(
                account_id,
                change_type.argument_name(),
                format!("{argument} would overflow the balance"),
                Some(balance_before),
            )
        };

        let (amount, balance_after) = match change_type {
            BalanceChangeType::Deposit => {
                let after = balance_before.checked_add(argument).ok_or_else(overflow)?;
                (argument, after)
            }
            BalanceChangeType::Withdrawal => {
                if argument > balance_before {
                    return Err(LedgerError::InsufficientFunds {
                        account_id: account_id.clone(),
                        requested: argument,
                        balance: balance_before,
                    });
                }
                (argument, balance_before - argument)
            }
            BalanceChangeType::Interest => {
                let interest = balance_before
                    .checked_mul(argument)
                    .and_then(|scaled| scaled.checked_div(PERCENT))
                    .ok_or_else(overflow)?;
                let after = balance_before.checked_add(interest).ok_or_else(overflow)?;
                (interest, after)
            }
        };

        Ok(Self {
            account_id: account_id.clone(),
            change_type,
            argument,
            amount,
            balance_before,
            balance_after: balance_after.normalize(),
            timestamp: Utc::now(),
        })
    }
}
