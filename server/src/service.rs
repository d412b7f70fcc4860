//! RPC façade over the ledger engine.
//!
//! Converts wire requests into engine calls and engine outcomes into wire
//! responses or gRPC statuses. Holds no business rules.

use std::sync::Arc;

use parking_lot::RwLock;
use rust_decimal::Decimal;
use tonic::metadata::{Ascii, MetadataValue};
use tonic::{Code, Request, Response, Status};
use tracing::{debug, instrument};

use bankledger_common::{from_wire, to_wire, AccountId, AccountType, ErrorKind, LedgerError};
use bankledger_ledger::{BalanceChange, LedgerEngine};
use bankledger_protocol::{
    AccountRequest, AccountResponse, BalanceResponse, DepositRequest, InterestRequest,
    OutcomeMessage, TransactionResponse, WithdrawRequest, BALANCE_METADATA_KEY,
};

use crate::grpc::Bank;
use crate::state::ServerState;

/// gRPC status code for an error kind.
pub fn status_code(kind: ErrorKind) -> Code {
    match kind {
        ErrorKind::AlreadyExists => Code::AlreadyExists,
        ErrorKind::NotFound => Code::NotFound,
        ErrorKind::InvalidArgument => Code::InvalidArgument,
        ErrorKind::FailedPrecondition => Code::FailedPrecondition,
        ErrorKind::Internal => Code::Internal,
    }
}

/// Build the status returned for a ledger error.
///
/// The message is the outcome text. When the error reports the account's
/// balance it travels as the `x-account-balance` metadata entry.
pub fn status_from_error(err: &LedgerError) -> Status {
    let mut status = Status::new(
        status_code(err.kind()),
        OutcomeMessage::from_error(err).as_str(),
    );
    if let Some(balance) = err.balance() {
        if let Ok(value) = balance.to_string().parse::<MetadataValue<Ascii>>() {
            status.metadata_mut().insert(BALANCE_METADATA_KEY, value);
        }
    }
    status
}

/// The `bank.Bank` implementation.
#[derive(Clone)]
pub struct LedgerService {
    engine: Arc<LedgerEngine>,
    state: Arc<RwLock<ServerState>>,
}

impl LedgerService {
    /// Create a façade sharing the node's engine and state.
    pub fn new(engine: Arc<LedgerEngine>, state: Arc<RwLock<ServerState>>) -> Self {
        Self { engine, state }
    }

    fn ensure_running(&self) -> Result<(), Status> {
        let state = *self.state.read();
        if state.accepts_requests() {
            Ok(())
        } else {
            debug!(state = %state, "Request refused");
            Err(Status::unavailable(OutcomeMessage::ServiceUnavailable.as_str()))
        }
    }
}

/// Convert a wire double into an engine argument.
fn wire_argument(account_id: &AccountId, field: &'static str, value: f64) -> Result<Decimal, Status> {
    from_wire(value).ok_or_else(|| {
        status_from_error(&LedgerError::invalid_argument(
            account_id,
            field,
            format!("{value} is not a representable amount"),
            None,
        ))
    })
}

fn transaction_response(change: &BalanceChange, message: OutcomeMessage) -> TransactionResponse {
    TransactionResponse {
        account_id: change.account_id.to_string(),
        balance: to_wire(change.balance_after),
        message: message.to_string(),
    }
}

#[tonic::async_trait]
impl Bank for LedgerService {
    #[instrument(skip_all, fields(account_id = %request.get_ref().account_id))]
    async fn create_account(
        &self,
        request: Request<AccountRequest>,
    ) -> Result<Response<AccountResponse>, Status> {
        self.ensure_running()?;
        let AccountRequest {
            account_id,
            account_type,
        } = request.into_inner();
        let account_id = AccountId::new(account_id);

        let account = self
            .engine
            .create_account(&account_id, &AccountType::parse(&account_type))
            .await
            .map_err(|e| status_from_error(&e))?;

        Ok(Response::new(AccountResponse {
            account_id: account.id.to_string(),
            message: OutcomeMessage::AccountCreated.to_string(),
        }))
    }

    #[instrument(skip_all, fields(account_id = %request.get_ref().account_id))]
    async fn get_balance(
        &self,
        request: Request<AccountRequest>,
    ) -> Result<Response<BalanceResponse>, Status> {
        self.ensure_running()?;
        let account_id = AccountId::new(request.into_inner().account_id);

        let balance = self
            .engine
            .get_balance(&account_id)
            .await
            .map_err(|e| status_from_error(&e))?;

        Ok(Response::new(BalanceResponse {
            account_id: account_id.to_string(),
            balance: to_wire(balance),
            message: OutcomeMessage::BalanceRetrieved.to_string(),
        }))
    }

    #[instrument(skip_all, fields(account_id = %request.get_ref().account_id))]
    async fn deposit(
        &self,
        request: Request<DepositRequest>,
    ) -> Result<Response<TransactionResponse>, Status> {
        self.ensure_running()?;
        let DepositRequest { account_id, amount } = request.into_inner();
        let account_id = AccountId::new(account_id);
        let amount = wire_argument(&account_id, "amount", amount)?;

        let change = self
            .engine
            .deposit(&account_id, amount)
            .await
            .map_err(|e| status_from_error(&e))?;

        Ok(Response::new(transaction_response(
            &change,
            OutcomeMessage::DepositSucceeded,
        )))
    }

    #[instrument(skip_all, fields(account_id = %request.get_ref().account_id))]
    async fn withdraw(
        &self,
        request: Request<WithdrawRequest>,
    ) -> Result<Response<TransactionResponse>, Status> {
        self.ensure_running()?;
        let WithdrawRequest { account_id, amount } = request.into_inner();
        let account_id = AccountId::new(account_id);
        let amount = wire_argument(&account_id, "amount", amount)?;

        let change = self
            .engine
            .withdraw(&account_id, amount)
            .await
            .map_err(|e| status_from_error(&e))?;

        Ok(Response::new(transaction_response(
            &change,
            OutcomeMessage::WithdrawalSucceeded,
        )))
    }

    #[instrument(skip_all, fields(account_id = %request.get_ref().account_id))]
    async fn calculate_interest(
        &self,
        request: Request<InterestRequest>,
    ) -> Result<Response<TransactionResponse>, Status> {
        self.ensure_running()?;
        let InterestRequest {
            account_id,
            annual_interest_rate,
        } = request.into_inner();
        let account_id = AccountId::new(account_id);
        let rate = wire_argument(&account_id, "annual_interest_rate", annual_interest_rate)?;

        let change = self
            .engine
            .calculate_interest(&account_id, rate)
            .await
            .map_err(|e| status_from_error(&e))?;

        Ok(Response::new(transaction_response(
            &change,
            OutcomeMessage::InterestApplied,
        )))
    }
}
