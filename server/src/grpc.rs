//! gRPC routing for the `bank.Bank` service.
//!
//! [`BankServer`] is a tower service that decodes unary calls with prost
//! and forwards them to a [`Bank`] implementation.

use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};

use bankledger_protocol::{
    methods, AccountRequest, AccountResponse, BalanceResponse, DepositRequest, InterestRequest,
    TransactionResponse, WithdrawRequest, SERVICE_NAME,
};
use tonic::body::BoxBody;
use tonic::codec::ProstCodec;
use tonic::codegen::{http, Body, BoxFuture, Service, StdError};
use tonic::server::{Grpc, NamedService, UnaryService};
use tonic::{Request, Response, Status};

/// Server-side handlers of the `bank.Bank` service.
#[tonic::async_trait]
pub trait Bank: Send + Sync + 'static {
    async fn create_account(
        &self,
        request: Request<AccountRequest>,
    ) -> Result<Response<AccountResponse>, Status>;

    async fn get_balance(
        &self,
        request: Request<AccountRequest>,
    ) -> Result<Response<BalanceResponse>, Status>;

    async fn deposit(
        &self,
        request: Request<DepositRequest>,
    ) -> Result<Response<TransactionResponse>, Status>;

    async fn withdraw(
        &self,
        request: Request<WithdrawRequest>,
    ) -> Result<Response<TransactionResponse>, Status>;

    async fn calculate_interest(
        &self,
        request: Request<InterestRequest>,
    ) -> Result<Response<TransactionResponse>, Status>;
}

/// Tower service routing `bank.Bank` calls to a [`Bank`] implementation.
pub struct BankServer<T> {
    inner: Arc<T>,
}

impl<T: Bank> BankServer<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }
}

impl<T> Clone for BankServer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Bank> NamedService for BankServer<T> {
    const NAME: &'static str = SERVICE_NAME;
}

macro_rules! unary_handler {
    ($name:ident, $request:ty, $response:ty, $method:ident) => {
        struct $name<T>(Arc<T>);

        impl<T: Bank> UnaryService<$request> for $name<T> {
            type Response = $response;
            type Future = BoxFuture<Response<$response>, Status>;

            fn call(&mut self, request: Request<$request>) -> Self::Future {
                let inner = Arc::clone(&self.0);
                Box::pin(async move { inner.$method(request).await })
            }
        }
    };
}

unary_handler!(CreateAccountHandler, AccountRequest, AccountResponse, create_account);
unary_handler!(GetBalanceHandler, AccountRequest, BalanceResponse, get_balance);
unary_handler!(DepositHandler, DepositRequest, TransactionResponse, deposit);
unary_handler!(WithdrawHandler, WithdrawRequest, TransactionResponse, withdraw);
unary_handler!(
    CalculateInterestHandler,
    InterestRequest,
    TransactionResponse,
    calculate_interest
);

impl<T, B> Service<http::Request<B>> for BankServer<T>
where
    T: Bank,
    B: Body + Send + 'static,
    B::Error: Into<StdError> + Send + 'static,
{
    type Response = http::Response<BoxBody>;
    type Error = Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let inner = Arc::clone(&self.inner);
        match req.uri().path() {
            methods::CREATE_ACCOUNT => unary(CreateAccountHandler(inner), req),
            methods::GET_BALANCE => unary(GetBalanceHandler(inner), req),
            methods::DEPOSIT => unary(DepositHandler(inner), req),
            methods::WITHDRAW => unary(WithdrawHandler(inner), req),
            methods::CALCULATE_INTEREST => unary(CalculateInterestHandler(inner), req),
            _ => Box::pin(async { Ok(Status::unimplemented("Unknown method").to_http()) }),
        }
    }
}

fn unary<S, M, B>(handler: S, req: http::Request<B>) -> BoxFuture<http::Response<BoxBody>, Infallible>
where
    S: UnaryService<M> + Send + 'static,
    S::Response: prost::Message + Send + 'static,
    S::Future: Send + 'static,
    M: prost::Message + Default + Send + 'static,
    B: Body + Send + 'static,
    B::Error: Into<StdError> + Send + 'static,
{
    Box::pin(async move {
        let mut grpc = Grpc::new(ProstCodec::<S::Response, M>::default());
        Ok(grpc.unary(handler, req).await)
    })
}
