//! Core ledger engine implementation.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{error, info, instrument, warn};

use bankledger_common::{AccountId, AccountType, ErrorKind, LedgerError, Result};

use crate::account::Account;
use crate::balance::{BalanceChange, BalanceChangeType};
use crate::gate::{Gate, GateMode};
use crate::metrics::LedgerMetrics;
use crate::store::AccountStore;

/// The ledger engine validates and applies balance mutations.
///
/// Every mutation checks existence, validates its argument, reads the
/// balance and writes the new one while holding the gate, so two mutations
/// of the same account never interleave. Failed operations never write.
pub struct LedgerEngine {
    /// Shared store connection.
    store: Arc<dyn AccountStore>,
    /// Serializes mutations.
    gate: Gate,
    /// Operation counters.
    metrics: Arc<LedgerMetrics>,
}

impl LedgerEngine {
    /// Create an engine with a single process-wide gate.
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self::with_gate_mode(store, GateMode::Global)
    }

    /// Create an engine with the given locking strategy.
    pub fn with_gate_mode(store: Arc<dyn AccountStore>, mode: GateMode) -> Self {
        info!(store = store.name(), gate_mode = %mode, "Ledger engine created");
        Self {
            store,
            gate: Gate::new(mode),
            metrics: Arc::new(LedgerMetrics::new()),
        }
    }

    /// Locking strategy in use.
    pub fn gate_mode(&self) -> GateMode {
        self.gate.mode()
    }

    /// Operation counters.
    pub fn metrics(&self) -> Arc<LedgerMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Create an account with a zero balance.
    #[instrument(skip_all, fields(account_id = %account_id, account_type = %account_type))]
    pub async fn create_account(
        &self,
        account_id: &AccountId,
        account_type: &AccountType,
    ) -> Result<Account> {
        self.metrics.operation_started();
        let result = self.open_account(account_id, account_type).await;
        self.record("create_account", &result);
        result
    }

    /// Get the current balance.
    ///
    /// Reads do not take the gate: both store backends read one field
    /// atomically and every writer replaces the balance in a single write, so
    /// a read sees either the old or the new value, never a partial one.
    #[instrument(skip_all, fields(account_id = %account_id))]
    pub async fn get_balance(&self, account_id: &AccountId) -> Result<Decimal> {
        self.metrics.operation_started();
        let result = self.read_balance(account_id).await;
        self.record("get_balance", &result);
        result
    }

    /// Get the whole account record.
    #[instrument(skip_all, fields(account_id = %account_id))]
    pub async fn get_account(&self, account_id: &AccountId) -> Result<Account> {
        validate_account_id(account_id)?;
        self.store
            .get_account(account_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound {
                account_id: account_id.clone(),
            })
    }

    /// Add a positive amount to the balance.
    #[instrument(skip_all, fields(account_id = %account_id, amount = %amount))]
    pub async fn deposit(&self, account_id: &AccountId, amount: Decimal) -> Result<BalanceChange> {
        self.mutate(account_id, BalanceChangeType::Deposit, amount).await
    }

    /// Remove a positive amount no larger than the balance.
    #[instrument(skip_all, fields(account_id = %account_id, amount = %amount))]
    pub async fn withdraw(&self, account_id: &AccountId, amount: Decimal) -> Result<BalanceChange> {
        self.mutate(account_id, BalanceChangeType::Withdrawal, amount).await
    }

    /// Accrue interest: balance grows by `balance * annual_rate / 100`.
    #[instrument(skip_all, fields(account_id = %account_id, annual_rate = %annual_rate))]
    pub async fn calculate_interest(
        &self,
        account_id: &AccountId,
        annual_rate: Decimal,
    ) -> Result<BalanceChange> {
        self.mutate(account_id, BalanceChangeType::Interest, annual_rate)
            .await
    }

    // --- Private methods ---

    async fn open_account(
        &self,
        account_id: &AccountId,
        account_type: &AccountType,
    ) -> Result<Account> {
        validate_account_id(account_id)?;

        let _guard = self.gate.acquire(account_id).await;

        if self.store.exists(account_id).await? {
            return Err(LedgerError::AccountExists {
                account_id: account_id.clone(),
            });
        }

        let account = Account::open(account_id.clone(), account_type.clone());
        self.store.create(&account).await?;
        self.metrics.mutation_committed();

        info!(
            account_id = %account_id,
            account_type = %account_type,
            "Account created"
        );

        Ok(account)
    }

    async fn read_balance(&self, account_id: &AccountId) -> Result<Decimal> {
        validate_account_id(account_id)?;

        if !self.store.exists(account_id).await? {
            return Err(LedgerError::AccountNotFound {
                account_id: account_id.clone(),
            });
        }

        Ok(self.store.get_balance(account_id).await?)
    }

    async fn mutate(
        &self,
        account_id: &AccountId,
        change_type: BalanceChangeType,
        argument: Decimal,
    ) -> Result<BalanceChange> {
        self.metrics.operation_started();
        let result = self.apply(account_id, change_type, argument).await;
        self.record(change_type.as_str(), &result);
        result
    }

    async fn apply(
        &self,
        account_id: &AccountId,
        change_type: BalanceChangeType,
        argument: Decimal,
    ) -> Result<BalanceChange> {
        validate_account_id(account_id)?;

        let _guard = self.gate.acquire(account_id).await;

        if !self.store.exists(account_id).await? {
            return Err(LedgerError::AccountNotFound {
                account_id: account_id.clone(),
            });
        }

        let balance = self.store.get_balance(account_id).await?;
        let change = BalanceChange::compute(account_id, change_type, argument, balance)?;

        self.store
            .set_balance(account_id, change.balance_after)
            .await?;
        self.metrics.mutation_committed();

        info!(
            account_id = %account_id,
            operation = change_type.as_str(),
            amount = %change.amount,
            balance_before = %change.balance_before,
            balance_after = %change.balance_after,
            "Balance updated"
        );

        Ok(change)
    }

    fn record<T>(&self, operation: &'static str, result: &Result<T>) {
        match result {
            Ok(_) => self.metrics.operation_succeeded(),
            Err(e) => {
                self.metrics.operation_failed(e.kind());
                if e.kind() == ErrorKind::Internal {
                    error!(operation, code = e.error_code(), error = %e, "Ledger operation failed");
                } else {
                    warn!(operation, code = e.error_code(), error = %e, "Ledger operation rejected");
                }
            }
        }
    }
}

fn validate_account_id(account_id: &AccountId) -> Result<()> {
    if account_id.is_valid() {
        Ok(())
    } else {
        Err(LedgerError::invalid_argument(
            account_id,
            "account_id",
            "must be non-empty printable text of at most 128 bytes",
            None,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryAccountStore, StoreError, StoreResult, ACCOUNT_TYPE_FIELD};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio_test::{assert_err, assert_ok};

    /// Memory store that yields between calls and can refuse writes.
    #[derive(Default)]
    struct TestStore {
        inner: InMemoryAccountStore,
        fail_writes: AtomicBool,
        fail_all: AtomicBool,
    }

    impl TestStore {
        fn check(&self) -> StoreResult<()> {
            if self.fail_all.load(Ordering::SeqCst) {
                Err(StoreError::Unavailable("connection refused".into()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl AccountStore for TestStore {
        fn name(&self) -> &str {
            "test"
        }

        async fn exists(&self, account_id: &AccountId) -> StoreResult<bool> {
            self.check()?;
            tokio::task::yield_now().await;
            self.inner.exists(account_id).await
        }

        async fn create(&self, account: &Account) -> StoreResult<()> {
            self.check()?;
            self.inner.create(account).await
        }

        async fn get_balance(&self, account_id: &AccountId) -> StoreResult<Decimal> {
            self.check()?;
            let balance = self.inner.get_balance(account_id).await;
            // Widen the read-modify-write window.
            tokio::task::yield_now().await;
            balance
        }

        async fn set_balance(&self, account_id: &AccountId, balance: Decimal) -> StoreResult<()> {
            self.check()?;
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("write timed out".into()));
            }
            self.inner.set_balance(account_id, balance).await
        }

        async fn get_account_type(&self, account_id: &AccountId) -> StoreResult<AccountType> {
            self.check()?;
            self.inner.get_account_type(account_id).await
        }

        async fn get_account(&self, account_id: &AccountId) -> StoreResult<Option<Account>> {
            self.check()?;
            self.inner.get_account(account_id).await
        }
    }

    fn engine_with(mode: GateMode) -> (LedgerEngine, Arc<TestStore>) {
        let store = Arc::new(TestStore::default());
        (LedgerEngine::with_gate_mode(store.clone(), mode), store)
    }

    fn engine() -> (LedgerEngine, Arc<TestStore>) {
        engine_with(GateMode::Global)
    }

    fn id(s: &str) -> AccountId {
        AccountId::new(s)
    }

    #[tokio::test]
    async fn test_round_trip() {
        let (engine, _) = engine();
        let b = id("B");

        let account = assert_ok!(engine.create_account(&b, &AccountType::Checking).await);
        assert_eq!(account.balance, Decimal::ZERO);
        assert_eq!(assert_ok!(engine.get_balance(&b).await), Decimal::ZERO);

        let change = assert_ok!(engine.deposit(&b, Decimal::from(50)).await);
        assert_eq!(change.balance_after, Decimal::from(50));
        assert_eq!(assert_ok!(engine.get_balance(&b).await), Decimal::from(50));
    }

    #[tokio::test]
    async fn test_creation_uniqueness() {
        let (engine, _) = engine();
        let a = id("A");

        assert_ok!(engine.create_account(&a, &AccountType::Savings).await);
        let err = assert_err!(engine.create_account(&a, &AccountType::Checking).await);
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);

        let account = assert_ok!(engine.get_account(&a).await);
        assert_eq!(account.account_type, AccountType::Savings);
        assert_eq!(
            assert_ok!(engine.store.get_account_type(&a).await),
            AccountType::Savings
        );
    }

    #[tokio::test]
    async fn test_unknown_account() {
        let (engine, _) = engine();
        let ghost = id("ghost");

        assert_eq!(
            assert_err!(engine.get_balance(&ghost).await).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            assert_err!(engine.deposit(&ghost, Decimal::from(5)).await).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            assert_err!(engine.withdraw(&ghost, Decimal::from(5)).await).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            assert_err!(engine.calculate_interest(&ghost, Decimal::from(5)).await).kind(),
            ErrorKind::NotFound
        );
        // Existence is checked before the argument.
        let err = assert_err!(engine.deposit(&ghost, Decimal::from(-5)).await);
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.balance(), None);
        assert!(!assert_ok!(engine.store.exists(&ghost).await));
    }

    #[tokio::test]
    async fn test_unknown_account_precedes_bad_argument() {
        let (engine, store) = engine();
        // Any write attempt would surface as an internal error instead.
        store.fail_writes.store(true, Ordering::SeqCst);
        let ghost = id("ghost");

        for err in [
            assert_err!(engine.withdraw(&ghost, Decimal::from(-5)).await),
            assert_err!(engine.withdraw(&ghost, Decimal::ZERO).await),
            assert_err!(engine.calculate_interest(&ghost, Decimal::ZERO).await),
            assert_err!(engine.calculate_interest(&ghost, Decimal::from(-1)).await),
        ] {
            assert_eq!(err.kind(), ErrorKind::NotFound);
            assert_eq!(err.balance(), None);
        }
        assert!(!assert_ok!(engine.store.exists(&ghost).await));

        let snapshot = engine.metrics().snapshot();
        assert_eq!(snapshot.rejected_not_found, 4);
        assert_eq!(snapshot.internal_errors, 0);
        assert_eq!(snapshot.mutations_committed, 0);
    }

    #[tokio::test]
    async fn test_invalid_arguments_leave_balance_unchanged() {
        let (engine, _) = engine();
        let a = id("A");
        assert_ok!(engine.create_account(&a, &AccountType::Savings).await);
        assert_ok!(engine.deposit(&a, Decimal::new(1050, 2)).await);

        for bad in [Decimal::ZERO, Decimal::from(-1)] {
            let err = assert_err!(engine.deposit(&a, bad).await);
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
            assert_eq!(err.balance(), Some(Decimal::new(1050, 2)));

            let err = assert_err!(engine.withdraw(&a, bad).await);
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);

            let err = assert_err!(engine.calculate_interest(&a, bad).await);
            assert!(matches!(
                err,
                LedgerError::InvalidArgument {
                    field: "annual_interest_rate",
                    ..
                }
            ));
        }

        assert_eq!(assert_ok!(engine.get_balance(&a).await), Decimal::new(1050, 2));
    }

    #[tokio::test]
    async fn test_empty_account_id_rejected() {
        let (engine, store) = engine();
        let err = assert_err!(engine.create_account(&id(""), &AccountType::Savings).await);
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(store.inner.is_empty());
    }

    #[tokio::test]
    async fn test_withdraw_boundary() {
        let (engine, _) = engine();
        let a = id("A");
        assert_ok!(engine.create_account(&a, &AccountType::Checking).await);
        assert_ok!(engine.deposit(&a, Decimal::from(80)).await);

        let err = assert_err!(engine.withdraw(&a, Decimal::new(8001, 2)).await);
        assert_eq!(err.kind(), ErrorKind::FailedPrecondition);
        assert_eq!(err.balance(), Some(Decimal::from(80)));
        assert_eq!(assert_ok!(engine.get_balance(&a).await), Decimal::from(80));

        let change = assert_ok!(engine.withdraw(&a, Decimal::from(80)).await);
        assert_eq!(change.balance_after, Decimal::ZERO);
        assert_eq!(assert_ok!(engine.get_balance(&a).await), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_interest() {
        let (engine, _) = engine();
        let a = id("A");
        assert_ok!(engine.create_account(&a, &AccountType::Savings).await);
        assert_ok!(engine.deposit(&a, Decimal::from(100)).await);

        let change = assert_ok!(engine.calculate_interest(&a, Decimal::from(5)).await);
        assert_eq!(change.balance_after, Decimal::from(105));
        assert_eq!(change.amount, Decimal::from(5));
        assert_eq!(assert_ok!(engine.get_balance(&a).await), Decimal::from(105));
    }

    #[tokio::test]
    async fn test_store_failure_is_internal_and_writes_nothing() {
        let (engine, store) = engine();
        let a = id("A");
        assert_ok!(engine.create_account(&a, &AccountType::Savings).await);
        assert_ok!(engine.deposit(&a, Decimal::from(40)).await);

        store.fail_writes.store(true, Ordering::SeqCst);
        let err = assert_err!(engine.deposit(&a, Decimal::from(10)).await);
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(err.is_retryable());
        store.fail_writes.store(false, Ordering::SeqCst);
        assert_eq!(assert_ok!(engine.get_balance(&a).await), Decimal::from(40));

        store.fail_all.store(true, Ordering::SeqCst);
        let err = assert_err!(engine.get_balance(&a).await);
        assert!(matches!(err, LedgerError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn test_corrupted_record_is_internal() {
        let (engine, store) = engine();
        let a = id("corrupt");
        store.inner.insert_raw(
            a.clone(),
            HashMap::from([(ACCOUNT_TYPE_FIELD.to_string(), "savings".to_string())]),
        );

        let err = assert_err!(engine.deposit(&a, Decimal::from(1)).await);
        assert!(matches!(err, LedgerError::StoreCorrupted { .. }));
        assert_eq!(err.kind(), ErrorKind::Internal);
        // Nothing was written over the damaged record.
        assert!(store.inner.get_balance(&a).await.is_err());
    }

    #[tokio::test]
    async fn test_metrics_follow_outcomes() {
        let (engine, _) = engine();
        let a = id("A");
        assert_ok!(engine.create_account(&a, &AccountType::Savings).await);
        assert_err!(engine.create_account(&a, &AccountType::Savings).await);
        assert_err!(engine.withdraw(&a, Decimal::from(1)).await);
        assert_ok!(engine.deposit(&a, Decimal::from(1)).await);

        let snapshot = engine.metrics().snapshot();
        assert_eq!(snapshot.operations_total, 4);
        assert_eq!(snapshot.operations_succeeded, 2);
        assert_eq!(snapshot.mutations_committed, 2);
        assert_eq!(snapshot.rejected_already_exists, 1);
        assert_eq!(snapshot.rejected_failed_precondition, 1);
    }

    async fn concurrent_deposits(mode: GateMode) {
        let (engine, _) = engine_with(mode);
        let engine = Arc::new(engine);
        let c = id("C");
        assert_ok!(engine.create_account(&c, &AccountType::Savings).await);

        let deposits = 200;
        let amount = Decimal::new(250, 2);
        let handles: Vec<_> = (0..deposits)
            .map(|_| {
                let engine = Arc::clone(&engine);
                let c = c.clone();
                tokio::spawn(async move { engine.deposit(&c, amount).await })
            })
            .collect();
        for handle in handles {
            assert_ok!(handle.await.unwrap());
        }

        assert_eq!(
            assert_ok!(engine.get_balance(&c).await),
            amount * Decimal::from(deposits)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_no_lost_updates_global_gate() {
        concurrent_deposits(GateMode::Global).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_no_lost_updates_per_account_gate() {
        concurrent_deposits(GateMode::PerAccount).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_withdrawals_never_overdraw() {
        let (engine, _) = engine_with(GateMode::PerAccount);
        let engine = Arc::new(engine);
        let a = id("A");
        assert_ok!(engine.create_account(&a, &AccountType::Checking).await);
        assert_ok!(engine.deposit(&a, Decimal::from(10)).await);

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let engine = Arc::clone(&engine);
                let a = a.clone();
                tokio::spawn(async move { engine.withdraw(&a, Decimal::from(1)).await })
            })
            .collect();

        let mut succeeded = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(e) => assert_eq!(e.kind(), ErrorKind::FailedPrecondition),
            }
        }

        assert_eq!(succeeded, 10);
        assert_eq!(assert_ok!(engine.get_balance(&a).await), Decimal::ZERO);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_yield_one_account() {
        let (engine, _) = engine();
        let engine = Arc::new(engine);

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let engine = Arc::clone(&engine);
                let account_type = if i % 2 == 0 {
                    AccountType::Savings
                } else {
                    AccountType::Checking
                };
                tokio::spawn(async move { engine.create_account(&id("dup"), &account_type).await })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(e) => assert_eq!(e.kind(), ErrorKind::AlreadyExists),
            }
        }
        assert_eq!(created, 1);
    }
}
