//! Wallet engine error types
//!
//! One taxonomy for the whole engine surface. Error codes are stable
//! strings for API response mapping.

use thiserror::Error;

use crate::core_types::AccountId;
use crate::money::MoneyError;

/// Engine error taxonomy.
///
/// Validation errors are raised before any lock is taken.
/// `InsufficientFunds` and `AccountNotFound` are raised after lock
/// acquisition but before any mutation, so a failed operation never
/// leaves a partial effect. `Busy` is retryable by the caller; the engine
/// itself never retries a whole operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("amount must be greater than zero")]
    InvalidAmount,

    #[error("account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("account is inactive: {0}")]
    InactiveAccount(AccountId),

    /// Carries the untouched available balance so the caller can render
    /// "transfer failed, your balance is still X".
    #[error("insufficient funds: available balance is {available}")]
    InsufficientFunds { available: u64 },

    #[error("sender and recipient must be different accounts")]
    SelfTransferNotAllowed,

    #[error("could not allocate a unique transaction reference")]
    DuplicateReference,

    #[error("account is locked by another operation, try again")]
    Busy,

    #[error("transaction not found")]
    TransactionNotFound,

    #[error("internal error: {0}")]
    Internal(String),
}

impl WalletError {
    /// Stable error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            WalletError::InvalidAmount => "INVALID_AMOUNT",
            WalletError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            WalletError::InactiveAccount(_) => "INACTIVE_ACCOUNT",
            WalletError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            WalletError::SelfTransferNotAllowed => "SELF_TRANSFER_NOT_ALLOWED",
            WalletError::DuplicateReference => "DUPLICATE_REFERENCE",
            WalletError::Busy => "BUSY",
            WalletError::TransactionNotFound => "TRANSACTION_NOT_FOUND",
            WalletError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the caller may retry the whole operation with backoff
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(self, WalletError::Busy)
    }
}

impl From<MoneyError> for WalletError {
    fn from(err: MoneyError) -> Self {
        match err {
            MoneyError::InvalidAmount => WalletError::InvalidAmount,
            MoneyError::PrecisionOverflow { .. } => WalletError::InvalidAmount,
            MoneyError::Overflow => WalletError::InvalidAmount,
            MoneyError::InvalidFormat(_) => WalletError::InvalidAmount,
        }
    }
}
