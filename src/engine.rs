//! Transfer engine
//!
//! Orchestrates deposits, withdrawals and peer-to-peer transfers as
//! atomic units of work: acquire the account lock(s), validate, mutate
//! the ledger, append the journal record(s), commit. Every operation
//! passes through validate -> lock -> mutate -> journal -> commit, and a
//! failure at any stage unwinds to the pre-operation state before the
//! error reaches the caller.
//!
//! The engine owns no retry policy. `Busy` and transient failures are
//! surfaced with nothing persisted; retrying the whole operation is the
//! caller's decision.
//!
//! Once the locks are held an operation runs without suspension points,
//! so a caller that stops waiting cannot strand a half-applied state:
//! the unit of work still reaches commit or abort on its own.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::core_types::{AccountId, TxDirection, TxId, TxStatus};
use crate::error::WalletError;
use crate::journal::{Journal, Page, TransactionRecord};
use crate::ledger::{BalanceSnapshot, BalanceStore};
use crate::locks::AccountLocks;
use crate::reference::ReferenceGenerator;

/// Result of a committed single-account operation
#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    pub reference: String,
    pub tx_id: TxId,
    pub new_balance: u64,
}

/// Result of a committed peer-to-peer transfer.
///
/// Both journal records share `reference`; each side reports the balance
/// computed from its own account after its own mutation.
#[derive(Debug, Clone, Serialize)]
pub struct TransferReceipt {
    pub reference: String,
    pub debit_tx: TxId,
    pub credit_tx: TxId,
    pub sender_new_balance: u64,
    pub recipient_new_balance: u64,
}

/// The balance-mutation and transfer engine.
///
/// Owns no balance state itself; it coordinates the [`BalanceStore`] and
/// [`Journal`] under the per-account locking discipline of
/// [`AccountLocks`].
pub struct TransferEngine {
    store: Arc<BalanceStore>,
    journal: Arc<Journal>,
    locks: AccountLocks,
    references: ReferenceGenerator,
    max_page_size: u32,
}

impl TransferEngine {
    /// Engine with its own empty store and journal
    pub fn new(config: &EngineConfig) -> Self {
        Self::from_parts(
            Arc::new(BalanceStore::new()),
            Arc::new(Journal::new()),
            config,
        )
    }

    /// Engine over shared store/journal handles
    pub fn from_parts(
        store: Arc<BalanceStore>,
        journal: Arc<Journal>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            store,
            journal,
            locks: AccountLocks::new(Duration::from_millis(config.lock_wait_ms)),
            references: ReferenceGenerator::new(
                config.reference_length,
                config.reference_max_attempts,
            ),
            max_page_size: config.max_page_size.max(1),
        }
    }

    pub fn store(&self) -> &BalanceStore {
        &self.store
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    // ------------------------------------------------------------------
    // Account lifecycle
    // ------------------------------------------------------------------

    pub fn open_account(&self) -> AccountId {
        let id = self.store.open_account();
        info!(account = %id, "account opened");
        id
    }

    /// Soft-close an account. Takes the account lock so an in-flight
    /// mutation can never interleave with the state flip.
    pub async fn deactivate_account(&self, id: AccountId) -> Result<(), WalletError> {
        let _guard = self.locks.acquire(id).await?;
        self.store.deactivate(id)?;
        info!(account = %id, "account deactivated");
        Ok(())
    }

    pub async fn reactivate_account(&self, id: AccountId) -> Result<(), WalletError> {
        let _guard = self.locks.acquire(id).await?;
        self.store.reactivate(id)?;
        info!(account = %id, "account reactivated");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reads (lock-free; eventually consistent while writers are in flight)
    // ------------------------------------------------------------------

    pub fn balance_of(&self, owner: AccountId) -> Result<BalanceSnapshot, WalletError> {
        self.store.snapshot(owner)
    }

    /// Fetch one record by its reference or, failing that, by record id.
    pub fn get_transaction(
        &self,
        owner: AccountId,
        reference_or_id: &str,
    ) -> Result<TransactionRecord, WalletError> {
        if let Some(record) = self.journal.find_by_reference(owner, reference_or_id) {
            return Ok(record);
        }
        if let Ok(id) = reference_or_id.parse::<TxId>()
            && let Some(record) = self.journal.find_by_id(owner, id)
        {
            return Ok(record);
        }
        Err(WalletError::TransactionNotFound)
    }

    /// Page through an owner's records, newest first.
    ///
    /// The page size is clamped to the configured cap.
    pub fn list_transactions(
        &self,
        owner: AccountId,
        page: u32,
        page_size: u32,
    ) -> Result<Page<TransactionRecord>, WalletError> {
        self.store.snapshot(owner)?;
        let page_size = page_size.clamp(1, self.max_page_size);
        Ok(self.journal.list_by_owner(owner, page, page_size))
    }

    // ------------------------------------------------------------------
    // Mutating operations
    // ------------------------------------------------------------------

    /// Credit `amount` to `owner` and journal the mutation.
    pub async fn deposit(&self, owner: AccountId, amount: u64) -> Result<Receipt, WalletError> {
        if amount == 0 {
            return Err(WalletError::InvalidAmount);
        }

        let _guard = self.locks.acquire(owner).await?;
        self.ensure_active(owner)?;

        let after = self.store.credit(owner, amount)?;
        debug!(account = %owner, amount, phase = "mutated", "deposit applied");

        let record = match self.journal_one(owner, TxDirection::Credit, amount, after.available) {
            Ok(record) => record,
            Err(err) => {
                self.undo_credit(owner, amount, "deposit");
                return Err(err);
            }
        };

        info!(
            account = %owner,
            amount,
            reference = %record.reference,
            new_balance = after.available,
            "deposit committed"
        );
        Ok(Receipt {
            tx_id: record.id,
            reference: record.reference,
            new_balance: after.available,
        })
    }

    /// Debit `amount` from `owner` and journal the mutation.
    ///
    /// Fails `InsufficientFunds` before any mutation; in that case no
    /// journal record exists and the balance is untouched.
    pub async fn withdraw(&self, owner: AccountId, amount: u64) -> Result<Receipt, WalletError> {
        if amount == 0 {
            return Err(WalletError::InvalidAmount);
        }

        let _guard = self.locks.acquire(owner).await?;
        self.ensure_active(owner)?;

        let snapshot = self.store.snapshot(owner)?;
        if !snapshot.can_cover(amount) {
            warn!(
                account = %owner,
                amount,
                available = snapshot.available,
                "withdrawal rejected, insufficient funds"
            );
            return Err(WalletError::InsufficientFunds {
                available: snapshot.available,
            });
        }

        let after = self.store.debit(owner, amount)?;
        debug!(account = %owner, amount, phase = "mutated", "withdrawal applied");

        let record = match self.journal_one(owner, TxDirection::Debit, amount, after.available) {
            Ok(record) => record,
            Err(err) => {
                self.undo_debit(owner, amount, "withdraw");
                return Err(err);
            }
        };

        info!(
            account = %owner,
            amount,
            reference = %record.reference,
            new_balance = after.available,
            "withdrawal committed"
        );
        Ok(Receipt {
            tx_id: record.id,
            reference: record.reference,
            new_balance: after.available,
        })
    }

    /// Move `amount` from `sender` to `recipient` atomically.
    ///
    /// Locks are taken in ascending account-id order whatever order the
    /// caller named the parties in, so two crossed transfers cannot
    /// deadlock. All four effects (two balance mutations, two journal
    /// records) commit together or not at all.
    pub async fn transfer(
        &self,
        sender: AccountId,
        recipient: AccountId,
        amount: u64,
    ) -> Result<TransferReceipt, WalletError> {
        if amount == 0 {
            return Err(WalletError::InvalidAmount);
        }
        if sender == recipient {
            return Err(WalletError::SelfTransferNotAllowed);
        }

        let _guards = self.locks.acquire_pair(sender, recipient).await?;
        self.ensure_active(sender)?;
        self.ensure_active(recipient)?;

        let sender_snapshot = self.store.snapshot(sender)?;
        if !sender_snapshot.can_cover(amount) {
            warn!(
                sender = %sender,
                recipient = %recipient,
                amount,
                available = sender_snapshot.available,
                "transfer rejected, insufficient funds"
            );
            return Err(WalletError::InsufficientFunds {
                available: sender_snapshot.available,
            });
        }

        let sender_after = self.store.debit(sender, amount)?;
        let recipient_after = match self.store.credit(recipient, amount) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                self.undo_debit(sender, amount, "transfer");
                return Err(err);
            }
        };
        debug!(
            sender = %sender,
            recipient = %recipient,
            amount,
            phase = "mutated",
            "transfer applied"
        );

        let (debit_record, credit_record) = match self.journal_pair(
            sender,
            recipient,
            amount,
            sender_after.available,
            recipient_after.available,
        ) {
            Ok(pair) => pair,
            Err(err) => {
                self.undo_credit(recipient, amount, "transfer");
                self.undo_debit(sender, amount, "transfer");
                return Err(err);
            }
        };

        info!(
            sender = %sender,
            recipient = %recipient,
            amount,
            reference = %debit_record.reference,
            sender_new_balance = sender_after.available,
            recipient_new_balance = recipient_after.available,
            "transfer committed"
        );
        Ok(TransferReceipt {
            reference: debit_record.reference.clone(),
            debit_tx: debit_record.id,
            credit_tx: credit_record.id,
            sender_new_balance: sender_after.available,
            recipient_new_balance: recipient_after.available,
        })
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn ensure_active(&self, id: AccountId) -> Result<(), WalletError> {
        let snapshot = self.store.snapshot(id)?;
        if !snapshot.active {
            warn!(account = %id, "mutation rejected, account inactive");
            return Err(WalletError::InactiveAccount(id));
        }
        Ok(())
    }

    /// Append one record under a freshly generated reference.
    ///
    /// The generator pre-checks the journal; the unique index still
    /// closes the check-to-insert window, so an append-time collision is
    /// retried with a new reference up to the configured bound.
    fn journal_one(
        &self,
        owner: AccountId,
        direction: TxDirection,
        amount: u64,
        new_balance: u64,
    ) -> Result<TransactionRecord, WalletError> {
        for attempt in 1..=self.references.max_attempts() {
            let reference = self.references.generate(&self.journal)?;
            match self.journal.append(
                owner,
                &reference,
                direction,
                TxStatus::Completed,
                amount,
                new_balance,
            ) {
                Err(WalletError::DuplicateReference) => {
                    warn!(attempt, "reference taken at append time, regenerating");
                }
                other => return other,
            }
        }
        Err(WalletError::DuplicateReference)
    }

    fn journal_pair(
        &self,
        sender: AccountId,
        recipient: AccountId,
        amount: u64,
        sender_new_balance: u64,
        recipient_new_balance: u64,
    ) -> Result<(TransactionRecord, TransactionRecord), WalletError> {
        for attempt in 1..=self.references.max_attempts() {
            let reference = self.references.generate(&self.journal)?;
            match self.journal.append_transfer(
                &reference,
                amount,
                sender,
                sender_new_balance,
                recipient,
                recipient_new_balance,
            ) {
                Err(WalletError::DuplicateReference) => {
                    warn!(attempt, "reference taken at append time, regenerating");
                }
                other => return other,
            }
        }
        Err(WalletError::DuplicateReference)
    }

    /// Unwind a credit while the operation's lock is still held.
    ///
    /// Cannot fail in practice: lifecycle flips also take the account
    /// lock, and the amount being removed was added by this operation.
    /// A failure here means the store lost money; it is logged for
    /// reconciliation rather than masked.
    fn undo_credit(&self, owner: AccountId, amount: u64, op: &'static str) {
        if let Err(err) = self.store.debit(owner, amount) {
            error!(
                account = %owner,
                amount,
                op,
                error = %err,
                "rollback of credit failed, manual reconciliation required"
            );
        }
    }

    fn undo_debit(&self, owner: AccountId, amount: u64, op: &'static str) {
        if let Err(err) = self.store.credit(owner, amount) {
            error!(
                account = %owner,
                amount,
                op,
                error = %err,
                "rollback of debit failed, manual reconciliation required"
            );
        }
    }
}
