//! Mutual exclusion for balance mutations.
//!
//! In [`GateMode::Global`] one lock serializes every mutation in the process,
//! whatever account it touches. [`GateMode::PerAccount`] keeps one lock per
//! account id, created on first use and dropped once no task holds or waits
//! on it; mutations on different accounts then run in parallel while the
//! per-account guarantee stays the same.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use bankledger_common::AccountId;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Locking strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateMode {
    /// Single process-wide lock.
    #[default]
    Global,
    /// One lock per account id.
    PerAccount,
}

impl FromStr for GateMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(GateMode::Global),
            "per-account" | "per_account" => Ok(GateMode::PerAccount),
            other => Err(format!("Unknown gate mode: {other}")),
        }
    }
}

impl fmt::Display for GateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateMode::Global => f.write_str("global"),
            GateMode::PerAccount => f.write_str("per-account"),
        }
    }
}

type AccountLocks = Arc<DashMap<AccountId, Arc<Mutex<()>>>>;

enum Locks {
    Global(Arc<Mutex<()>>),
    PerAccount(AccountLocks),
}

/// The gate every mutation passes through.
pub struct Gate {
    locks: Locks,
}

/// Held for the duration of one critical section.
pub struct GateGuard {
    guard: Option<OwnedMutexGuard<()>>,
    reclaim: Option<(AccountLocks, AccountId)>,
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        // Release first so the strong count below only sees the map and waiters.
        drop(self.guard.take());
        if let Some((locks, account_id)) = self.reclaim.take() {
            locks.remove_if(&account_id, |_, lock| Arc::strong_count(lock) == 1);
        }
    }
}

impl Gate {
    /// Create a gate in the given mode.
    pub fn new(mode: GateMode) -> Self {
        let locks = match mode {
            GateMode::Global => Locks::Global(Arc::new(Mutex::new(()))),
            GateMode::PerAccount => Locks::PerAccount(Arc::new(DashMap::new())),
        };
        Self { locks }
    }

    /// Locking strategy of this gate.
    pub fn mode(&self) -> GateMode {
        match self.locks {
            Locks::Global(_) => GateMode::Global,
            Locks::PerAccount(_) => GateMode::PerAccount,
        }
    }

    /// Wait for exclusive access covering `account_id`.
    pub async fn acquire(&self, account_id: &AccountId) -> GateGuard {
        match &self.locks {
            Locks::Global(lock) => GateGuard {
                guard: Some(Arc::clone(lock).lock_owned().await),
                reclaim: None,
            },
            Locks::PerAccount(locks) => {
                let lock = Arc::clone(
                    &*locks
                        .entry(account_id.clone())
                        .or_insert_with(|| Arc::new(Mutex::new(()))),
                );
                GateGuard {
                    guard: Some(lock.lock_owned().await),
                    reclaim: Some((Arc::clone(locks), account_id.clone())),
                }
            }
        }
    }

    /// Number of per-account locks currently allocated. Always 0 in global mode.
    pub fn tracked_accounts(&self) -> usize {
        match &self.locks {
            Locks::Global(_) => 0,
            Locks::PerAccount(locks) => locks.len(),
        }
    }
}
