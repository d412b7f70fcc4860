//! In-process account store.

use std::collections::HashMap;

use async_trait::async_trait;
use bankledger_common::{AccountId, AccountType};
use dashmap::DashMap;
use rust_decimal::Decimal;

use super::{
    decode_account, decode_account_type, decode_balance, encode_account, AccountStore,
    StoreResult, ACCOUNT_TYPE_FIELD, BALANCE_FIELD,
};
use crate::account::Account;

/// Account store backed by a concurrent map.
///
/// Records are kept as string fields, exactly as the Redis adapter writes
/// them, so decoding (and corruption handling) behaves the same. Each call
/// touches a single map entry atomically.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    records: DashMap<AccountId, HashMap<String, String>>,
}

impl InMemoryAccountStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a record with raw field values, bypassing encoding.
    pub fn insert_raw(&self, account_id: AccountId, fields: HashMap<String, String>) {
        self.records.insert(account_id, fields);
    }

    /// Number of stored accounts.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the store holds no accounts.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn exists(&self, account_id: &AccountId) -> StoreResult<bool> {
        Ok(self.records.contains_key(account_id))
    }

    async fn create(&self, account: &Account) -> StoreResult<()> {
        let fields = encode_account(account)
            .into_iter()
            .map(|(field, value)| (field.to_string(), value))
            .collect();
        self.records.insert(account.id.clone(), fields);
        Ok(())
    }

    async fn get_balance(&self, account_id: &AccountId) -> StoreResult<Decimal> {
        let record = self.records.get(account_id);
        let raw = record
            .as_ref()
            .and_then(|fields| fields.get(BALANCE_FIELD))
            .map(String::as_str);
        decode_balance(account_id, raw)
    }

    async fn set_balance(&self, account_id: &AccountId, balance: Decimal) -> StoreResult<()> {
        self.records
            .entry(account_id.clone())
            .or_default()
            .insert(BALANCE_FIELD.to_string(), balance.to_string());
        Ok(())
    }

    async fn get_account_type(&self, account_id: &AccountId) -> StoreResult<AccountType> {
        let record = self.records.get(account_id);
        let raw = record
            .as_ref()
            .and_then(|fields| fields.get(ACCOUNT_TYPE_FIELD))
            .map(String::as_str);
        decode_account_type(account_id, raw)
    }

    async fn get_account(&self, account_id: &AccountId) -> StoreResult<Option<Account>> {
        self.records
            .get(account_id)
            .map(|fields| decode_account(account_id, &fields))
            .transpose()
    }
}
