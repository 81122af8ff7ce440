//! Session code generation.
//!
//! Codes are drawn uniformly from [`ALPHABET`]. Collisions with codes that
//! are already in use are retried a bounded number of times.

use rand::Rng;
use std::collections::HashSet;
use thiserror::Error;

/// Symbols a session code is drawn from
pub const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Default number of draws before giving up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("Code length must be at least 1")]
    InvalidLength,

    #[error("No free code of length {length} after {attempts} attempts")]
    AlphabetExhausted { length: usize, attempts: u32 },
}

/// Draw a code of `length` symbols that is not in `existing`.
pub fn generate(length: usize, existing: &HashSet<String>) -> Result<String, IdentifierError> {
    let mut rng = rand::thread_rng();
    generate_with_rng(&mut rng, length, existing, DEFAULT_MAX_ATTEMPTS)
}

/// Draw a code with a provided RNG and retry bound.
pub fn generate_with_rng<R: Rng + ?Sized>(
    rng: &mut R,
    length: usize,
    existing: &HashSet<String>,
    max_attempts: u32,
) -> Result<String, IdentifierError> {
    if length == 0 {
        return Err(IdentifierError::InvalidLength);
    }

    // Every code is taken: no amount of retrying will help
    if let Some(capacity) = capacity(length) {
        if existing.len() >= capacity {
            return Err(IdentifierError::AlphabetExhausted {
                length,
                attempts: 0,
            });
        }
    }

    for _ in 0..max_attempts {
        let code: String = (0..length)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        if !existing.contains(&code) {
            return Ok(code);
        }
    }

    Err(IdentifierError::AlphabetExhausted {
        length,
        attempts: max_attempts,
    })
}

/// Number of distinct codes of this length, `None` if it overflows.
fn capacity(length: usize) -> Option<usize> {
    let length = u32::try_from(length).ok()?;
    ALPHABET.len().checked_pow(length)
}
