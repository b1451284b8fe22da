//! Ledger - the account balance store
//!
//! Holds one `Account` per id in a sharded concurrent map and enforces the
//! never-negative invariant through the [`Balance`] type. The store never
//! deletes accounts; closing one flips `active` off.
//!
//! The store itself writes no journal entries. The engine pairs every
//! successful credit/debit with a journal append inside the same unit of
//! work, which keeps balance mutation and audit-trail writing separately
//! testable.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

use crate::balance::Balance;
use crate::core_types::AccountId;
use crate::error::WalletError;

/// One account row: balance plus lifecycle state
#[derive(Debug, Clone)]
struct Account {
    balance: Balance,
    active: bool,
    created_at: DateTime<Utc>,
}

impl Account {
    fn new() -> Self {
        Self {
            balance: Balance::default(),
            active: true,
            created_at: Utc::now(),
        }
    }
}

/// Point-in-time view of one account.
///
/// Safe to read without a lock, but then only as an eventually-consistent
/// display value, never as the basis for a further mutation decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BalanceSnapshot {
    pub account_id: AccountId,
    pub book: u64,
    pub available: u64,
    pub version: u64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl BalanceSnapshot {
    /// Whether the available balance covers `amount`
    #[inline]
    pub const fn can_cover(&self, amount: u64) -> bool {
        self.available >= amount
    }
}

/// Concurrent account/balance store.
///
/// DashMap gives per-shard locking, so operations on different accounts
/// proceed in parallel. Read-modify-write sequences on the SAME account
/// still need the per-account lock held by the engine; the shard lock only
/// protects each individual call.
pub struct BalanceStore {
    accounts: DashMap<AccountId, Account>,
}

impl BalanceStore {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
        }
    }

    /// Create a new active account with a zero balance
    pub fn open_account(&self) -> AccountId {
        let id = AccountId::new();
        self.accounts.insert(id, Account::new());
        id
    }

    /// Create an account under a caller-chosen id (bootstrap/import path)
    pub fn open_account_with_id(&self, id: AccountId) -> Result<(), WalletError> {
        if self.accounts.contains_key(&id) {
            return Err(WalletError::Internal(format!(
                "account already exists: {id}"
            )));
        }
        self.accounts.insert(id, Account::new());
        Ok(())
    }

    /// Soft-close an account. Balances are retained, mutations rejected.
    pub fn deactivate(&self, id: AccountId) -> Result<(), WalletError> {
        let mut account = self
            .accounts
            .get_mut(&id)
            .ok_or(WalletError::AccountNotFound(id))?;
        account.active = false;
        Ok(())
    }

    /// Re-open a soft-closed account
    pub fn reactivate(&self, id: AccountId) -> Result<(), WalletError> {
        let mut account = self
            .accounts
            .get_mut(&id)
            .ok_or(WalletError::AccountNotFound(id))?;
        account.active = true;
        Ok(())
    }

    /// Current state of an account, inactive ones included
    pub fn snapshot(&self, id: AccountId) -> Result<BalanceSnapshot, WalletError> {
        let account = self
            .accounts
            .get(&id)
            .ok_or(WalletError::AccountNotFound(id))?;
        Ok(Self::snapshot_of(id, &account))
    }

    /// Pure sufficiency predicate, no mutation
    pub fn can_debit(&self, id: AccountId, amount: u64) -> Result<bool, WalletError> {
        let account = self
            .accounts
            .get(&id)
            .ok_or(WalletError::AccountNotFound(id))?;
        Ok(account.balance.can_debit(amount))
    }

    /// Increase an account's balance. Returns the post-mutation snapshot.
    pub fn credit(&self, id: AccountId, amount: u64) -> Result<BalanceSnapshot, WalletError> {
        if amount == 0 {
            return Err(WalletError::InvalidAmount);
        }
        let mut account = self
            .accounts
            .get_mut(&id)
            .ok_or(WalletError::AccountNotFound(id))?;
        if !account.active {
            return Err(WalletError::InactiveAccount(id));
        }
        account
            .balance
            .credit(amount)
            .map_err(|e| WalletError::Internal(e.to_string()))?;
        Ok(Self::snapshot_of(id, &account))
    }

    /// Decrease an account's balance. Returns the post-mutation snapshot.
    pub fn debit(&self, id: AccountId, amount: u64) -> Result<BalanceSnapshot, WalletError> {
        if amount == 0 {
            return Err(WalletError::InvalidAmount);
        }
        let mut account = self
            .accounts
            .get_mut(&id)
            .ok_or(WalletError::AccountNotFound(id))?;
        if !account.active {
            return Err(WalletError::InactiveAccount(id));
        }
        let available = account.balance.available();
        account
            .balance
            .debit(amount)
            .map_err(|_| WalletError::InsufficientFunds { available })?;
        Ok(Self::snapshot_of(id, &account))
    }

    /// Number of accounts ever opened
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    fn snapshot_of(id: AccountId, account: &Account) -> BalanceSnapshot {
        BalanceSnapshot {
            account_id: id,
            book: account.balance.book(),
            available: account.balance.available(),
            version: account.balance.version(),
            active: account.active,
            created_at: account.created_at,
        }
    }
}

impl Default for BalanceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_and_snapshot() {
        let store = BalanceStore::new();
        let id = store.open_account();

        let snap = store.snapshot(id).unwrap();
        assert_eq!(snap.available, 0);
        assert_eq!(snap.book, 0);
        assert!(snap.active);
    }

    #[test]
    fn test_unknown_account() {
        let store = BalanceStore::new();
        let ghost = AccountId::new();
        assert_eq!(
            store.snapshot(ghost),
            Err(WalletError::AccountNotFound(ghost))
        );
        assert!(store.credit(ghost, 10).is_err());
    }

    #[test]
    fn test_open_with_id_rejects_duplicates() {
        let store = BalanceStore::new();
        let id = AccountId::new();
        store.open_account_with_id(id).unwrap();
        assert!(store.open_account_with_id(id).is_err());
    }

    #[test]
    fn test_credit_then_debit() {
        let store = BalanceStore::new();
        let id = store.open_account();

        let snap = store.credit(id, 100).unwrap();
        assert_eq!(snap.available, 100);

        let snap = store.debit(id, 40).unwrap();
        assert_eq!(snap.available, 60);
        assert_eq!(snap.book, 60);
        assert_eq!(snap.version, 2);
    }

    #[test]
    fn test_debit_insufficient_reports_available() {
        let store = BalanceStore::new();
        let id = store.open_account();
        store.credit(id, 30).unwrap();

        assert_eq!(
            store.debit(id, 31),
            Err(WalletError::InsufficientFunds { available: 30 })
        );
        assert_eq!(store.snapshot(id).unwrap().available, 30);
    }

    #[test]
    fn test_zero_amounts_rejected() {
        let store = BalanceStore::new();
        let id = store.open_account();
        assert_eq!(store.credit(id, 0), Err(WalletError::InvalidAmount));
        assert_eq!(store.debit(id, 0), Err(WalletError::InvalidAmount));
    }

    #[test]
    fn test_inactive_account_rejects_mutations() {
        let store = BalanceStore::new();
        let id = store.open_account();
        store.credit(id, 100).unwrap();
        store.deactivate(id).unwrap();

        assert_eq!(store.credit(id, 1), Err(WalletError::InactiveAccount(id)));
        assert_eq!(store.debit(id, 1), Err(WalletError::InactiveAccount(id)));
        // balance survives deactivation and reads still work
        assert_eq!(store.snapshot(id).unwrap().available, 100);

        store.reactivate(id).unwrap();
        assert!(store.debit(id, 1).is_ok());
    }

    #[test]
    fn test_can_debit() {
        let store = BalanceStore::new();
        let id = store.open_account();
        store.credit(id, 50).unwrap();
        assert!(store.can_debit(id, 50).unwrap());
        assert!(!store.can_debit(id, 51).unwrap());
    }
}
