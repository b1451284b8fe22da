//! Transaction reference generation
//!
//! References are short alphanumeric tokens shown to users and used as
//! the idempotency/correlation key for one logical operation. Candidates
//! are checked against the journal before use; the journal's unique index
//! remains the backstop for the window between check and insert.

use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::warn;

use crate::error::WalletError;
use crate::journal::Journal;

pub const DEFAULT_REFERENCE_LENGTH: usize = 12;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Collision-checked reference generator.
///
/// At 62 symbols and length 12 the collision probability is negligible;
/// hitting the attempt bound means the generator is broken (bad RNG,
/// absurd length), not bad luck, so it fails fast instead of spinning.
pub struct ReferenceGenerator {
    length: usize,
    max_attempts: u32,
}

impl ReferenceGenerator {
    pub fn new(length: usize, max_attempts: u32) -> Self {
        Self {
            length: length.max(1),
            max_attempts: max_attempts.max(1),
        }
    }

    #[inline]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Produce a reference not currently present in the journal.
    ///
    /// # Errors
    /// `DuplicateReference` if every attempt collided.
    pub fn generate(&self, journal: &Journal) -> Result<String, WalletError> {
        for attempt in 1..=self.max_attempts {
            let candidate = self.candidate();
            if !journal.reference_exists(&candidate) {
                return Ok(candidate);
            }
            warn!(attempt, reference = %candidate, "reference collision, regenerating");
        }
        Err(WalletError::DuplicateReference)
    }

    fn candidate(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect()
    }
}

impl Default for ReferenceGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_REFERENCE_LENGTH, DEFAULT_MAX_ATTEMPTS)
    }
}
