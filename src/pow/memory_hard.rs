//! Scratchpad mixer.
//!
//! A scratchpad of 1024 words is filled with one seed word, then every word
//! is replaced, pass after pass, by BLAKE2b-512 of two words it addresses.
//! Updates land in place, so later words see earlier results within the
//! same pass and the passes must run in order.

use blake2::{Blake2b512, Digest};

use crate::core::params::{SCRATCHPAD_ITERATIONS, SCRATCHPAD_OUTPUT_WORDS, SCRATCHPAD_WORDS};
use crate::core::types::Hash256;

/// Output size in bytes: eight little-endian words.
pub const MEMORY_HARD_OUTPUT: usize = SCRATCHPAD_OUTPUT_WORDS * 8;

/// Run the scratchpad mixer. Only the leading 8 bytes of `input` seed it.
pub fn memory_hard_function(input: &Hash256) -> [u8; MEMORY_HARD_OUTPUT] {
    let seed = u64::from_le_bytes(input[..8].try_into().expect("hash has at least 8 bytes"));
    let mut memory = vec![seed; SCRATCHPAD_WORDS];

    for _ in 0..SCRATCHPAD_ITERATIONS {
        for j in 0..SCRATCHPAD_WORDS {
            let index1 = (memory[j] % SCRATCHPAD_WORDS as u64) as usize;
            let index2 = ((memory[j] >> 32) % SCRATCHPAD_WORDS as u64) as usize;

            let mut hasher = Blake2b512::new();
            hasher.update(memory[index1].to_le_bytes());
            hasher.update(memory[index2].to_le_bytes());
            let hash = hasher.finalize();

            memory[j] = u64::from_le_bytes(hash[..8].try_into().expect("blake2b-512 output is 64 bytes"));
        }
    }

    let mut result = [0u8; MEMORY_HARD_OUTPUT];
    for (chunk, word) in result.chunks_exact_mut(8).zip(&memory) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_seed_vector() {
        let out = memory_hard_function(&[0u8; 32]);
        assert_eq!(hex::encode(out), "ba3b5861a4df0ec6".repeat(8));
    }

    #[test]
    fn test_counting_seed_vector() {
        let input: Hash256 = std::array::from_fn(|i| i as u8);
        let out = memory_hard_function(&input);
        let expected = format!(
            "{}{}",
            "bb26566ad6449efc".repeat(5),
            "8e335833826f7eb8".repeat(3)
        );
        assert_eq!(hex::encode(out), expected);
    }

    #[test]
    fn test_only_leading_eight_bytes_matter() {
        let mut a = [0xAAu8; 32];
        let mut b = [0xAAu8; 32];
        a[8..].fill(0x00);
        b[8..].fill(0xFF);
        assert_eq!(memory_hard_function(&a), memory_hard_function(&b));

        b[0] ^= 1;
        assert_ne!(memory_hard_function(&a), memory_hard_function(&b));
    }
}
