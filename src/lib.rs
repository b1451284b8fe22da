//! walletcore - digital wallet balance and transfer engine
//!
//! The core of a wallet backend: per-account balances mutated under
//! exclusive locks, with every committed mutation paired with an
//! immutable journal record inside the same atomic unit of work. The
//! HTTP layer, authentication and payment-gateway integrations live
//! outside this crate and call into [`TransferEngine`].
//!
//! # Modules
//!
//! - [`core_types`] - Identifier newtypes and status/direction enums
//! - [`money`] - Decimal/string to scaled minor-unit conversion
//! - [`error`] - The engine error taxonomy
//! - [`balance`] - Enforced balance type (checked arithmetic, private fields)
//! - [`ledger`] - The account balance store
//! - [`journal`] - Append-only transaction records
//! - [`reference`] - Collision-checked reference generation
//! - [`locks`] - Per-account mutual exclusion with bounded waits
//! - [`engine`] - Deposit, withdrawal and transfer orchestration
//! - [`config`] - YAML application/engine configuration
//! - [`logging`] - tracing subscriber setup

pub mod balance;
pub mod config;
pub mod core_types;
pub mod engine;
pub mod error;
pub mod journal;
pub mod ledger;
pub mod locks;
pub mod logging;
pub mod money;
pub mod reference;

// Convenient re-exports at crate root
pub use balance::Balance;
pub use config::{AppConfig, EngineConfig};
pub use core_types::{AccountId, SeqNum, TxDirection, TxId, TxStatus};
pub use engine::{Receipt, TransferEngine, TransferReceipt};
pub use error::WalletError;
pub use journal::{Journal, Page, TransactionRecord};
pub use ledger::{BalanceSnapshot, BalanceStore};
pub use locks::{AccountGuard, AccountLocks};
pub use money::{MoneyError, format_amount, format_amount_full, parse_amount, parse_decimal};
pub use reference::ReferenceGenerator;
