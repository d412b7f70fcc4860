//! Protocol message types.

use std::fmt;

use bankledger_common::LedgerError;

/// CreateAccount and GetBalance request.
#[derive(Clone, PartialEq, prost::Message)]
pub struct AccountRequest {
    #[prost(string, tag = "1")]
    pub account_id: String,
    /// Only read by CreateAccount.
    #[prost(string, tag = "2")]
    pub account_type: String,
}

/// CreateAccount response.
#[derive(Clone, PartialEq, prost::Message)]
pub struct AccountResponse {
    #[prost(string, tag = "1")]
    pub account_id: String,
    #[prost(string, tag = "2")]
    pub message: String,
}

/// GetBalance response.
#[derive(Clone, PartialEq, prost::Message)]
pub struct BalanceResponse {
    #[prost(string, tag = "1")]
    pub account_id: String,
    #[prost(double, tag = "2")]
    pub balance: f64,
    #[prost(string, tag = "3")]
    pub message: String,
}

/// Deposit request.
#[derive(Clone, PartialEq, prost::Message)]
pub struct DepositRequest {
    #[prost(string, tag = "1")]
    pub account_id: String,
    #[prost(double, tag = "2")]
    pub amount: f64,
}

/// Withdraw request.
#[derive(Clone, PartialEq, prost::Message)]
pub struct WithdrawRequest {
    #[prost(string, tag = "1")]
    pub account_id: String,
    #[prost(double, tag = "2")]
    pub amount: f64,
}

/// CalculateInterest request. The rate is a percentage.
#[derive(Clone, PartialEq, prost::Message)]
pub struct InterestRequest {
    #[prost(string, tag = "1")]
    pub account_id: String,
    #[prost(double, tag = "2")]
    pub annual_interest_rate: f64,
}

/// Deposit, Withdraw and CalculateInterest response.
#[derive(Clone, PartialEq, prost::Message)]
pub struct TransactionResponse {
    #[prost(string, tag = "1")]
    pub account_id: String,
    #[prost(double, tag = "2")]
    pub balance: f64,
    #[prost(string, tag = "3")]
    pub message: String,
}

/// The fixed vocabulary of the `message` field and of rejection statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeMessage {
    AccountCreated,
    BalanceRetrieved,
    DepositSucceeded,
    WithdrawalSucceeded,
    InterestApplied,
    AccountAlreadyExists,
    AccountNotFound,
    InvalidAccountId,
    InvalidAmount,
    InvalidInterestRate,
    InsufficientFunds,
    InternalError,
    ServiceUnavailable,
}

impl OutcomeMessage {
    /// Every message, in declaration order.
    pub const ALL: [OutcomeMessage; 13] = [
        OutcomeMessage::AccountCreated,
        OutcomeMessage::BalanceRetrieved,
        OutcomeMessage::DepositSucceeded,
        OutcomeMessage::WithdrawalSucceeded,
        OutcomeMessage::InterestApplied,
        OutcomeMessage::AccountAlreadyExists,
        OutcomeMessage::AccountNotFound,
        OutcomeMessage::InvalidAccountId,
        OutcomeMessage::InvalidAmount,
        OutcomeMessage::InvalidInterestRate,
        OutcomeMessage::InsufficientFunds,
        OutcomeMessage::InternalError,
        OutcomeMessage::ServiceUnavailable,
    ];

    /// Text sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeMessage::AccountCreated => "Account created successfully",
            OutcomeMessage::BalanceRetrieved => "Balance retrieved successfully",
            OutcomeMessage::DepositSucceeded => "Deposit successful",
            OutcomeMessage::WithdrawalSucceeded => "Withdrawal successful",
            OutcomeMessage::InterestApplied => "Interest calculated and applied",
            OutcomeMessage::AccountAlreadyExists => "Account already exists",
            OutcomeMessage::AccountNotFound => "Account not found",
            OutcomeMessage::InvalidAccountId => "Account id is invalid",
            OutcomeMessage::InvalidAmount => "Amount must be positive",
            OutcomeMessage::InvalidInterestRate => "Interest rate must be positive",
            OutcomeMessage::InsufficientFunds => "Insufficient funds",
            OutcomeMessage::InternalError => "Internal error",
            OutcomeMessage::ServiceUnavailable => "Service unavailable",
        }
    }

    /// Reverse of [`OutcomeMessage::as_str`].
    pub fn parse(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == text)
    }

    /// Message describing a ledger rejection.
    pub fn from_error(err: &LedgerError) -> Self {
        match err {
            LedgerError::AccountExists { .. } => OutcomeMessage::AccountAlreadyExists,
            LedgerError::AccountNotFound { .. } => OutcomeMessage::AccountNotFound,
            LedgerError::InvalidArgument { field, .. } => match *field {
                "account_id" => OutcomeMessage::InvalidAccountId,
                "annual_interest_rate" => OutcomeMessage::InvalidInterestRate,
                _ => OutcomeMessage::InvalidAmount,
            },
            LedgerError::InsufficientFunds { .. } => OutcomeMessage::InsufficientFunds,
            LedgerError::StoreUnavailable(_) | LedgerError::StoreCorrupted { .. } => {
                OutcomeMessage::InternalError
            }
        }
    }
}

impl fmt::Display for OutcomeMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bankledger_common::AccountId;
    use prost::Message;

    #[test]
    fn test_message_texts_are_distinct() {
        for message in OutcomeMessage::ALL {
            assert_eq!(OutcomeMessage::parse(message.as_str()), Some(message));
        }
        assert_eq!(OutcomeMessage::parse("Great success"), None);
    }

    #[test]
    fn test_from_error() {
        let id = AccountId::new("A");
        let rate = LedgerError::invalid_argument(&id, "annual_interest_rate", "must be positive", None);
        assert_eq!(OutcomeMessage::from_error(&rate), OutcomeMessage::InvalidInterestRate);

        let amount = LedgerError::invalid_argument(&id, "amount", "must be positive", None);
        assert_eq!(OutcomeMessage::from_error(&amount), OutcomeMessage::InvalidAmount);

        let missing = LedgerError::AccountNotFound { account_id: id };
        assert_eq!(OutcomeMessage::from_error(&missing), OutcomeMessage::AccountNotFound);
    }

    #[test]
    fn test_wire_encoding_matches_proto_tags() {
        let request = DepositRequest {
            account_id: "B".to_string(),
            amount: 50.0,
        };
        let bytes = request.encode_to_vec();
        // field 1, length-delimited "B"; field 2, fixed64 50.0
        assert_eq!(&bytes[..3], &[0x0a, 0x01, b'B']);
        assert_eq!(bytes[3], 0x11);
        assert_eq!(&bytes[4..], &50.0f64.to_le_bytes());
        assert_eq!(DepositRequest::decode(bytes.as_slice()).unwrap(), request);
    }
}
