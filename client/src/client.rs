//! Client for the `bank.Bank` service.

use std::fmt;

use rust_decimal::Decimal;
use thiserror::Error;
use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Request, Status};
use tracing::{debug, info, instrument};

use bankledger_common::{from_wire, to_wire, AccountId};
use bankledger_protocol::{
    methods, AccountRequest, AccountResponse, BalanceResponse, DepositRequest, InterestRequest,
    OutcomeMessage, TransactionResponse, WithdrawRequest, BALANCE_METADATA_KEY,
};

use crate::config::ClientConfig;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid server endpoint {url}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// The server answered with a non-OK status.
    #[error("{code:?}: {message}")]
    Rejected {
        code: Code,
        message: String,
        /// Account balance reported with the rejection, if any.
        balance: Option<Decimal>,
    },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ClientError {
    /// Status code of a server rejection.
    pub fn code(&self) -> Option<Code> {
        match self {
            ClientError::Rejected { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Balance reported with a server rejection.
    pub fn balance(&self) -> Option<Decimal> {
        match self {
            ClientError::Rejected { balance, .. } => *balance,
            _ => None,
        }
    }

    /// Outcome message of a server rejection.
    pub fn outcome(&self) -> Option<OutcomeMessage> {
        match self {
            ClientError::Rejected { message, .. } => OutcomeMessage::parse(message),
            _ => None,
        }
    }
}

impl From<Status> for ClientError {
    fn from(status: Status) -> Self {
        let balance = status
            .metadata()
            .get(BALANCE_METADATA_KEY)
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| raw.parse::<Decimal>().ok());
        ClientError::Rejected {
            code: status.code(),
            message: status.message().to_string(),
            balance,
        }
    }
}

/// Result type for client calls.
pub type Result<T> = std::result::Result<T, ClientError>;

/// A successful call.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    /// Account the call addressed.
    pub account_id: AccountId,
    /// Balance after the call. Absent for account creation.
    pub balance: Option<Decimal>,
    /// Outcome text sent by the server.
    pub message: String,
}

impl Receipt {
    /// Parsed outcome message.
    pub fn outcome(&self) -> Option<OutcomeMessage> {
        OutcomeMessage::parse(&self.message)
    }
}

/// Client for a BankLedger server over one multiplexed channel.
///
/// Cloning is cheap; clones share the channel.
#[derive(Clone)]
pub struct BankClient {
    grpc: Grpc<Channel>,
    server_url: String,
}

impl fmt::Debug for BankClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BankClient")
            .field("server_url", &self.server_url)
            .finish_non_exhaustive()
    }
}

impl BankClient {
    /// Connect to the configured server.
    #[instrument(skip(config), fields(server_url = %config.server_url))]
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let invalid = |reason: String| ClientError::InvalidEndpoint {
            url: config.server_url.clone(),
            reason,
        };
        config.validate().map_err(invalid)?;

        let channel = Endpoint::from_shared(config.server_url.clone())
            .map_err(|e| invalid(e.to_string()))?
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .connect()
            .await?;

        info!(server_url = %config.server_url, "Connected to BankLedger server");

        Ok(Self {
            grpc: Grpc::new(channel),
            server_url: config.server_url,
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Create an account with a zero balance.
    #[instrument(skip(self))]
    pub async fn create_account(&self, account_id: &str, account_type: &str) -> Result<Receipt> {
        let response: AccountResponse = self
            .unary(
                methods::CREATE_ACCOUNT,
                AccountRequest {
                    account_id: account_id.to_string(),
                    account_type: account_type.to_string(),
                },
            )
            .await?;

        Ok(Receipt {
            account_id: AccountId::new(response.account_id),
            balance: None,
            message: response.message,
        })
    }

    /// Read the current balance.
    #[instrument(skip(self))]
    pub async fn get_balance(&self, account_id: &str) -> Result<Receipt> {
        let response: BalanceResponse = self
            .unary(
                methods::GET_BALANCE,
                AccountRequest {
                    account_id: account_id.to_string(),
                    account_type: String::new(),
                },
            )
            .await?;

        Ok(Receipt {
            account_id: AccountId::new(response.account_id),
            balance: Some(wire_balance(response.balance)?),
            message: response.message,
        })
    }

    /// Deposit a positive amount.
    #[instrument(skip(self), fields(amount = %amount))]
    pub async fn deposit(&self, account_id: &str, amount: Decimal) -> Result<Receipt> {
        let response = self
            .unary(
                methods::DEPOSIT,
                DepositRequest {
                    account_id: account_id.to_string(),
                    amount: to_wire(amount),
                },
            )
            .await?;
        transaction_receipt(response)
    }

    /// Withdraw a positive amount no larger than the balance.
    #[instrument(skip(self), fields(amount = %amount))]
    pub async fn withdraw(&self, account_id: &str, amount: Decimal) -> Result<Receipt> {
        let response = self
            .unary(
                methods::WITHDRAW,
                WithdrawRequest {
                    account_id: account_id.to_string(),
                    amount: to_wire(amount),
                },
            )
            .await?;
        transaction_receipt(response)
    }

    /// Apply interest at an annual percentage rate.
    #[instrument(skip(self), fields(annual_interest_rate = %annual_interest_rate))]
    pub async fn calculate_interest(
        &self,
        account_id: &str,
        annual_interest_rate: Decimal,
    ) -> Result<Receipt> {
        let response = self
            .unary(
                methods::CALCULATE_INTEREST,
                InterestRequest {
                    account_id: account_id.to_string(),
                    annual_interest_rate: to_wire(annual_interest_rate),
                },
            )
            .await?;
        transaction_receipt(response)
    }

    async fn unary<M, R>(&self, path: &'static str, message: M) -> Result<R>
    where
        M: prost::Message + Send + Sync + 'static,
        R: prost::Message + Default + Send + Sync + 'static,
    {
        let mut grpc = self.grpc.clone();
        grpc.ready().await?;

        debug!(method = path, "Sending request");
        let response = grpc
            .unary(
                Request::new(message),
                PathAndQuery::from_static(path),
                ProstCodec::<M, R>::default(),
            )
            .await?;
        Ok(response.into_inner())
    }
}

fn wire_balance(balance: f64) -> Result<Decimal> {
    from_wire(balance)
        .ok_or_else(|| ClientError::MalformedResponse(format!("balance {balance} is not finite")))
}

fn transaction_receipt(response: TransactionResponse) -> Result<Receipt> {
    Ok(Receipt {
        account_id: AccountId::new(response.account_id),
        balance: Some(wire_balance(response.balance)?),
        message: response.message,
    })
}
