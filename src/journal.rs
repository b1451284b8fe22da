//! Journal - append-only transaction records
//!
//! Every committed balance mutation produces exactly one immutable record
//! here; a peer-to-peer transfer produces two (debit side, credit side)
//! sharing one reference. Records are never updated or deleted.
//!
//! Ordering: each record gets a monotonically increasing sequence number
//! at insertion. Listings sort on that key, so pagination neither skips
//! nor duplicates records while new ones are being appended.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core_types::{AccountId, SeqNum, TxDirection, TxId, TxStatus};
use crate::error::WalletError;

/// One immutable journal record
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TransactionRecord {
    pub id: TxId,
    pub seq: SeqNum,
    pub owner: AccountId,
    pub reference: String,
    pub direction: TxDirection,
    pub status: TxStatus,
    /// Always a positive magnitude; direction carries the sign
    pub amount: u64,
    /// The owner's balance right after this mutation committed
    pub new_balance: u64,
    pub created_at: DateTime<Utc>,
}

/// One page of a listing, newest records first
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number as requested (0 is treated as 1)
    pub page: u32,
    pub page_size: u32,
    /// Total records for this owner, across all pages
    pub total: u64,
}

#[derive(Default)]
struct JournalInner {
    next_seq: SeqNum,
    records: BTreeMap<SeqNum, TransactionRecord>,
    /// Unique index backstopping the reference generator. A transfer's
    /// two sides share one entry.
    by_reference: HashMap<String, Vec<SeqNum>>,
    /// Insertion-ordered per-owner index, the pagination source
    by_owner: HashMap<AccountId, Vec<SeqNum>>,
}

impl JournalInner {
    #[allow(clippy::too_many_arguments)]
    fn insert(
        &mut self,
        owner: AccountId,
        reference: &str,
        direction: TxDirection,
        status: TxStatus,
        amount: u64,
        new_balance: u64,
        created_at: DateTime<Utc>,
    ) -> TransactionRecord {
        let seq = self.next_seq;
        self.next_seq += 1;

        let record = TransactionRecord {
            id: TxId::new(),
            seq,
            owner,
            reference: reference.to_string(),
            direction,
            status,
            amount,
            new_balance,
            created_at,
        };
        self.by_reference
            .entry(reference.to_string())
            .or_default()
            .push(seq);
        self.by_owner.entry(owner).or_default().push(seq);
        self.records.insert(seq, record.clone());
        record
    }
}

/// Append-only journal store.
///
/// Appends from concurrent writers are independent; the only cross-record
/// coupling is the reference uniqueness constraint, enforced atomically
/// under the inner write lock.
pub struct Journal {
    inner: RwLock<JournalInner>,
}

impl Journal {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(JournalInner::default()),
        }
    }

    /// Whether a reference is already taken. Advisory only: `append` makes
    /// the authoritative check-and-insert under one lock.
    pub fn reference_exists(&self, reference: &str) -> bool {
        self.inner
            .read()
            .expect("journal lock poisoned")
            .by_reference
            .contains_key(reference)
    }

    /// Append one record.
    ///
    /// Fails with `DuplicateReference` when the reference is taken;
    /// nothing is written in that case.
    pub fn append(
        &self,
        owner: AccountId,
        reference: &str,
        direction: TxDirection,
        status: TxStatus,
        amount: u64,
        new_balance: u64,
    ) -> Result<TransactionRecord, WalletError> {
        let mut inner = self.inner.write().expect("journal lock poisoned");
        if inner.by_reference.contains_key(reference) {
            return Err(WalletError::DuplicateReference);
        }
        Ok(inner.insert(owner, reference, direction, status, amount, new_balance, Utc::now()))
    }

    /// Append both sides of a transfer atomically under one reference.
    ///
    /// Either both records become visible or neither does. Each side
    /// carries its own post-mutation balance.
    pub fn append_transfer(
        &self,
        reference: &str,
        amount: u64,
        debit_owner: AccountId,
        debit_new_balance: u64,
        credit_owner: AccountId,
        credit_new_balance: u64,
    ) -> Result<(TransactionRecord, TransactionRecord), WalletError> {
        let mut inner = self.inner.write().expect("journal lock poisoned");
        if inner.by_reference.contains_key(reference) {
            return Err(WalletError::DuplicateReference);
        }
        let now = Utc::now();
        let debit = inner.insert(
            debit_owner,
            reference,
            TxDirection::Debit,
            TxStatus::Completed,
            amount,
            debit_new_balance,
            now,
        );
        let credit = inner.insert(
            credit_owner,
            reference,
            TxDirection::Credit,
            TxStatus::Completed,
            amount,
            credit_new_balance,
            now,
        );
        Ok((debit, credit))
    }

    /// Look up the record a reference names for one owner.
    ///
    /// Owner-scoped because a transfer's two sides share the reference;
    /// each party sees only its own record.
    pub fn find_by_reference(
        &self,
        owner: AccountId,
        reference: &str,
    ) -> Option<TransactionRecord> {
        let inner = self.inner.read().expect("journal lock poisoned");
        let seqs = inner.by_reference.get(reference)?;
        seqs.iter()
            .filter_map(|seq| inner.records.get(seq))
            .find(|rec| rec.owner == owner)
            .cloned()
    }

    /// Look up a record by its id, scoped to the owner
    pub fn find_by_id(&self, owner: AccountId, id: TxId) -> Option<TransactionRecord> {
        let inner = self.inner.read().expect("journal lock poisoned");
        let seqs = inner.by_owner.get(&owner)?;
        seqs.iter()
            .filter_map(|seq| inner.records.get(seq))
            .find(|rec| rec.id == id)
            .cloned()
    }

    /// Page through one owner's records, most recent first.
    ///
    /// An out-of-range page returns an empty page, not an error.
    pub fn list_by_owner(
        &self,
        owner: AccountId,
        page: u32,
        page_size: u32,
    ) -> Page<TransactionRecord> {
        let page = page.max(1);
        let page_size = page_size.max(1);

        let inner = self.inner.read().expect("journal lock poisoned");
        let seqs: &[SeqNum] = inner
            .by_owner
            .get(&owner)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        let total = seqs.len() as u64;
        let offset = (page as usize - 1).saturating_mul(page_size as usize);
        let items = seqs
            .iter()
            .rev()
            .skip(offset)
            .take(page_size as usize)
            .filter_map(|seq| inner.records.get(seq))
            .cloned()
            .collect();

        Page {
            items,
            page,
            page_size,
            total,
        }
    }

    /// Total number of records ever appended
    pub fn len(&self) -> usize {
        self.inner.read().expect("journal lock poisoned").records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Journal {
    fn default() -> Self {
        Self::new()
    }
}
