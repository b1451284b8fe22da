//! Core types used throughout the wallet engine
//!
//! Identifier newtypes and the journal's status/direction enums.
//! Numeric ids on the enums match the storage schema (SMALLINT columns).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sequence number assigned to journal records at insertion time.
///
/// Monotonically increasing and immutable, which makes it the pagination
/// key: listing on `seq` stays stable while new records are appended.
pub type SeqNum = u64;

/// Account identifier.
///
/// Opaque UUID v4. `Ord` matters: two-account operations acquire locks in
/// ascending `AccountId` order to rule out circular waits.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AccountId(Uuid);

impl AccountId {
    /// Generate a fresh random account id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[inline]
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccountId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Journal record identifier.
///
/// ULID-based: sortable, 128-bit, needs no coordination between writers.
/// Distinct from the human-facing reference string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(ulid::Ulid);

impl TxId {
    /// Generate a new unique TxId
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    #[inline]
    pub fn inner(&self) -> ulid::Ulid {
        self.0
    }
}

impl Default for TxId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TxId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(ulid::Ulid::from_string(s)?))
    }
}

/// Journal record status.
///
/// Engine-committed records are written `Completed`. The other states
/// belong to flows settled outside the engine (e.g. gateway deposits that
/// confirm asynchronously) and round-trip through `from_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum TxStatus {
    Pending = 0,
    Completed = 1,
    Cancelled = 2,
    Failed = 3,
}

impl TxStatus {
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(TxStatus::Pending),
            1 => Some(TxStatus::Completed),
            2 => Some(TxStatus::Cancelled),
            3 => Some(TxStatus::Failed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Pending => "pending",
            TxStatus::Completed => "completed",
            TxStatus::Cancelled => "cancelled",
            TxStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<i16> for TxStatus {
    type Error = ();

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        TxStatus::from_id(value).ok_or(())
    }
}

/// Direction of a balance mutation.
///
/// Amounts are stored as positive magnitudes; the direction lives here,
/// never in the sign of the amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum TxDirection {
    Credit = 1,
    Debit = 2,
}

impl TxDirection {
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(TxDirection::Credit),
            2 => Some(TxDirection::Debit),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TxDirection::Credit => "credit",
            TxDirection::Debit => "debit",
        }
    }
}

impl fmt::Display for TxDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<i16> for TxDirection {
    type Error = ();

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        TxDirection::from_id(value).ok_or(())
    }
}
