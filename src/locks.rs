//! Per-account mutual exclusion
//!
//! Every mutating operation holds its account's exclusive lock for the
//! whole read-validate-mutate-journal sequence; the in-process registry
//! here replaces the row locks the backing store would otherwise take.
//! Guards release on drop, so every exit path (commit, business error,
//! panic) unlocks unconditionally.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::timeout;
use tracing::debug;

use crate::core_types::AccountId;
use crate::error::WalletError;

/// Exclusive hold on one account, released on drop
pub type AccountGuard = OwnedMutexGuard<()>;

/// Registry of named per-account locks.
///
/// Lock entries are created on first use and never removed; accounts are
/// never deleted either, so the registry tracks the account population.
pub struct AccountLocks {
    locks: DashMap<AccountId, Arc<Mutex<()>>>,
    wait: Duration,
}

impl AccountLocks {
    /// `wait` bounds how long an acquisition may block before the
    /// operation fails with `Busy`.
    pub fn new(wait: Duration) -> Self {
        Self {
            locks: DashMap::new(),
            wait,
        }
    }

    /// Acquire one account's lock within the wait budget.
    ///
    /// # Errors
    /// `Busy` when the budget elapses; the caller may retry the whole
    /// operation from validation.
    pub async fn acquire(&self, id: AccountId) -> Result<AccountGuard, WalletError> {
        let lock = self.lock_cell(id);
        let guard = timeout(self.wait, lock.lock_owned())
            .await
            .map_err(|_| WalletError::Busy)?;
        debug!(account = %id, "account lock acquired");
        Ok(guard)
    }

    /// Acquire two accounts' locks in the fixed global order (ascending
    /// account id), regardless of the order the caller names them in.
    /// Crossed concurrent transfers therefore cannot deadlock.
    ///
    /// Guards come back in the order the arguments were given.
    pub async fn acquire_pair(
        &self,
        a: AccountId,
        b: AccountId,
    ) -> Result<(AccountGuard, AccountGuard), WalletError> {
        debug_assert_ne!(a, b, "pair acquisition needs two distinct accounts");

        if a < b {
            let first = self.acquire(a).await?;
            let second = self.acquire(b).await?;
            Ok((first, second))
        } else {
            let second = self.acquire(b).await?;
            let first = self.acquire(a).await?;
            Ok((first, second))
        }
    }

    fn lock_cell(&self, id: AccountId) -> Arc<Mutex<()>> {
        self.locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locks(wait_ms: u64) -> AccountLocks {
        AccountLocks::new(Duration::from_millis(wait_ms))
    }

    #[tokio::test]
    async fn test_acquire_and_release() {
        let locks = locks(50);
        let id = AccountId::new();

        let guard = locks.acquire(id).await.unwrap();
        drop(guard);

        // released on drop, second acquisition succeeds
        assert!(locks.acquire(id).await.is_ok());
    }

    #[tokio::test]
    async fn test_contended_lock_times_out_busy() {
        let locks = locks(20);
        let id = AccountId::new();

        let _held = locks.acquire(id).await.unwrap();
        assert_eq!(locks.acquire(id).await.unwrap_err(), WalletError::Busy);
    }

    #[tokio::test]
    async fn test_distinct_accounts_do_not_contend() {
        let locks = locks(20);
        let a = AccountId::new();
        let b = AccountId::new();

        let _ga = locks.acquire(a).await.unwrap();
        assert!(locks.acquire(b).await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_crossed_pairs_cannot_deadlock() {
        let locks = Arc::new(locks(1000));
        let a = AccountId::new();
        let b = AccountId::new();

        let mut tasks = Vec::new();
        for i in 0..20 {
            let locks = Arc::clone(&locks);
            // half the tasks name the pair in (a, b) order, half reversed
            let (x, y) = if i % 2 == 0 { (a, b) } else { (b, a) };
            tasks.push(tokio::spawn(async move {
                let _guards = locks.acquire_pair(x, y).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
    }
}
