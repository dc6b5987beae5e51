//! Shared lookup table and the time/memory trade-off mixer built on it.
//!
//! The table holds 2^20 words; entry `i` is the first 8 bytes (big-endian)
//! of SHA-256 over a 32-byte seed whose leading 4 bytes are `i` big-endian
//! and the rest zero. It is consensus data, not a cache: every node must
//! hold exactly the same words.

use std::sync::OnceLock;
use std::time::Instant;

use sha2::{Digest, Sha256};

use crate::core::params::{LOOKUP_TABLE_SIZE, TRADEOFF_ROUNDS};

static GLOBAL_TABLE: OnceLock<LookupTable> = OnceLock::new();

/// Immutable table of 2^20 pseudo-random words.
pub struct LookupTable {
    entries: Box<[u64]>,
}

impl LookupTable {
    /// Build a fresh table. Deterministic: every call yields the same words.
    pub fn generate() -> Self {
        let start = Instant::now();
        let mut seed = [0u8; 32];
        let entries: Box<[u64]> = (0..LOOKUP_TABLE_SIZE)
            .map(|i| {
                seed[..4].copy_from_slice(&(i as u32).to_be_bytes());
                let hash = Sha256::digest(seed);
                u64::from_be_bytes(hash[..8].try_into().expect("sha256 output is 32 bytes"))
            })
            .collect();

        tracing::debug!(
            "Generated lookup table: {} entries in {:.2?}",
            entries.len(),
            start.elapsed()
        );
        Self { entries }
    }

    /// Process-wide table, built once on first use.
    ///
    /// Concurrent first callers block until the single builder finishes;
    /// afterwards access is lock-free and read-only.
    pub fn global() -> &'static LookupTable {
        GLOBAL_TABLE.get_or_init(Self::generate)
    }

    pub fn get(&self, index: usize) -> u64 {
        self.entries[index]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Table-driven mixing of one word.
    ///
    /// Each round xors in the entry addressed by the running value and
    /// rotates left by one bit.
    pub fn time_memory_tradeoff(&self, input: u64) -> u64 {
        let mut result = input;
        for _ in 0..TRADEOFF_ROUNDS {
            let index = (result % LOOKUP_TABLE_SIZE as u64) as usize;
            result ^= self.entries[index];
            result = result.rotate_left(1);
        }
        result
    }
}
