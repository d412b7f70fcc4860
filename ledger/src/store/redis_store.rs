//! Redis-backed account store.
//!
//! Each account is a hash at `<prefix><account_id>`. Single-field reads and
//! writes are atomic on the Redis side, which is what lets balance queries run
//! outside the engine's gate.

use std::collections::HashMap;

use async_trait::async_trait;
use bankledger_common::{AccountId, AccountType};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use rust_decimal::Decimal;
use tracing::{debug, info};

use super::{
    decode_account, decode_account_type, decode_balance, encode_account, AccountStore,
    StoreError, StoreResult, ACCOUNT_TYPE_FIELD, BALANCE_FIELD,
};
use crate::account::Account;

/// Default key prefix for account hashes.
pub const DEFAULT_KEY_PREFIX: &str = "account:";

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Account store over one shared, reconnecting Redis connection.
#[derive(Clone)]
pub struct RedisAccountStore {
    connection: ConnectionManager,
    key_prefix: String,
}

impl RedisAccountStore {
    /// Connect to Redis. The connection is opened once and shared by all calls.
    pub async fn connect(redis_url: &str, key_prefix: impl Into<String>) -> StoreResult<Self> {
        let client = redis::Client::open(redis_url)?;
        let connection = ConnectionManager::new(client).await?;
        let key_prefix = key_prefix.into();

        info!(redis_url = %redis_url, key_prefix = %key_prefix, "Connected to Redis");

        Ok(Self {
            connection,
            key_prefix,
        })
    }

    /// Store key for an account.
    pub fn key(&self, account_id: &AccountId) -> String {
        format!("{}{}", self.key_prefix, account_id)
    }
}

#[async_trait]
impl AccountStore for RedisAccountStore {
    fn name(&self) -> &str {
        "redis"
    }

    async fn exists(&self, account_id: &AccountId) -> StoreResult<bool> {
        let mut conn = self.connection.clone();
        let exists: bool = conn.exists(self.key(account_id)).await?;
        Ok(exists)
    }

    async fn create(&self, account: &Account) -> StoreResult<()> {
        let mut conn = self.connection.clone();
        let key = self.key(&account.id);
        let fields = encode_account(account);
        conn.hset_multiple::<_, _, _, ()>(&key, &fields).await?;
        debug!(key = %key, "Account record written");
        Ok(())
    }

    async fn get_balance(&self, account_id: &AccountId) -> StoreResult<Decimal> {
        let mut conn = self.connection.clone();
        let raw: Option<String> = conn.hget(self.key(account_id), BALANCE_FIELD).await?;
        decode_balance(account_id, raw.as_deref())
    }

    async fn set_balance(&self, account_id: &AccountId, balance: Decimal) -> StoreResult<()> {
        let mut conn = self.connection.clone();
        conn.hset::<_, _, _, ()>(self.key(account_id), BALANCE_FIELD, balance.to_string())
            .await?;
        Ok(())
    }

    async fn get_account_type(&self, account_id: &AccountId) -> StoreResult<AccountType> {
        let mut conn = self.connection.clone();
        let raw: Option<String> = conn.hget(self.key(account_id), ACCOUNT_TYPE_FIELD).await?;
        decode_account_type(account_id, raw.as_deref())
    }

    async fn get_account(&self, account_id: &AccountId) -> StoreResult<Option<Account>> {
        let mut conn = self.connection.clone();
        let fields: HashMap<String, String> = conn.hgetall(self.key(account_id)).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        decode_account(account_id, &fields).map(Some)
    }
}
