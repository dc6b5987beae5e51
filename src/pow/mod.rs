//! Hoohash: proof-of-work evaluation for DAG block headers.
//!
//! Design goals:
//!   - Deterministic: every node derives the same work value, bit for bit
//!   - One-time setup per header: the diffusion matrix and the lookup table
//!     are derived once and reused while the nonce changes
//!   - Revisable: three protocol revisions share one message layout
//!
//! Message layout (80 bytes, shared by all variants):
//!
//!   PRE_POW_HASH (32) || TIMESTAMP (8, LE) || 32 zero bytes || NONCE (8, LE)
//!
//! Variants:
//!
//!   original — PoW hash (cSHAKE256) → heavy hash → work value
//!
//!   rev1 — BLAKE3 → matrix multiply → BLAKE3 → work value
//!
//!   rev2 — BLAKE3 → R = scratchpad mixer (64 bytes)
//!              T = trade-off(first 8 bytes of R, big-endian)
//!              V = delay function(R)
//!          R || V || low byte of T is cut to its first 32 bytes (the
//!          deployed network hashes exactly those), then matrix multiply →
//!          BLAKE3 → work value
//!
//! The work value reads the final digest as a little-endian integer.

pub mod lookup;
pub mod matrix;
pub mod memory_hard;
pub mod vdf;

use std::fmt;
use std::str::FromStr;

use num_bigint::BigUint;

use crate::core::difficulty::{compact_to_target, max_target, target_to_difficulty};
use crate::core::params::POW_MESSAGE_PADDING;
use crate::core::types::{BlockHeader, Hash256, DecodeError};
use crate::crypto::{Blake3HashWriter, HashWriter, PowHashWriter};

use self::lookup::LookupTable;
use self::matrix::{HeavyMatrix, MatrixContext};
use self::memory_hard::memory_hard_function;
use self::vdf::verifiable_delay_function;

/// Protocol revision of the PoW pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PowVariant {
    #[default]
    Original,
    Rev1,
    Rev2,
}

impl fmt::Display for PowVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowVariant::Original => write!(f, "original"),
            PowVariant::Rev1 => write!(f, "rev1"),
            PowVariant::Rev2 => write!(f, "rev2"),
        }
    }
}

impl FromStr for PowVariant {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "original" => Ok(PowVariant::Original),
            "rev1" => Ok(PowVariant::Rev1),
            "rev2" => Ok(PowVariant::Rev2),
            _ => Err(DecodeError::UnknownVariant(s.to_string())),
        }
    }
}

/// Pre-computed values for evaluating one header across many nonces.
///
/// The matrix is derived once from the pre-PoW hash and never changes; the
/// target is fixed at construction. Only the nonce and timestamp move, and
/// only through the explicit setters.
///
/// A header whose bits decode to a negative target has no target at all, and
/// every check against it fails.
#[derive(Clone)]
pub struct State<M: MatrixContext = HeavyMatrix> {
    mat: M,
    table: &'static LookupTable,
    timestamp: i64,
    nonce: u64,
    target: Option<BigUint>,
    pre_pow_hash: Hash256,
}

impl<M: MatrixContext> State<M> {
    /// Build a state from a header, taking the target from its bits field.
    ///
    /// The header's timestamp and nonce are zeroed while the pre-PoW hash is
    /// taken and restored before returning.
    pub fn new<H: BlockHeader>(header: &mut H) -> Self {
        let target = compact_to_target(header.bits());
        if target.is_none() {
            tracing::debug!("Negative compact target: bits={:#010x}", header.bits());
        }

        let timestamp = header.time_in_milliseconds();
        let nonce = header.nonce();
        header.set_time_in_milliseconds(0);
        header.set_nonce(0);
        let pre_pow_hash = header.hash();
        header.set_time_in_milliseconds(timestamp);
        header.set_nonce(nonce);

        Self::with_target(pre_pow_hash, timestamp, nonce, target)
    }

    /// Build a state directly from its components.
    pub fn from_parts(pre_pow_hash: Hash256, timestamp: i64, nonce: u64, target: BigUint) -> Self {
        Self::with_target(pre_pow_hash, timestamp, nonce, Some(target))
    }

    fn with_target(pre_pow_hash: Hash256, timestamp: i64, nonce: u64, target: Option<BigUint>) -> Self {
        tracing::debug!(
            pre_pow_hash = %hex::encode(pre_pow_hash),
            timestamp,
            nonce,
            "Building PoW state"
        );
        Self {
            mat: M::from_pre_pow_hash(&pre_pow_hash),
            table: LookupTable::global(),
            timestamp,
            nonce,
            target,
            pre_pow_hash,
        }
    }

    pub fn pre_pow_hash(&self) -> &Hash256 {
        &self.pre_pow_hash
    }

    /// The decoded target, or `None` when the bits encoded a negative one.
    pub fn target(&self) -> Option<&BigUint> {
        self.target.as_ref()
    }

    /// Whether a work value is at most the target. Always false without one.
    pub fn meets_target(&self, work: &BigUint) -> bool {
        self.target.as_ref().is_some_and(|target| work <= target)
    }

    /// Difficulty of the target; a missing or zero target maps to the maximum.
    pub fn difficulty(&self) -> BigUint {
        self.target.as_ref().map_or_else(max_target, target_to_difficulty)
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn set_nonce(&mut self, nonce: u64) {
        self.nonce = nonce;
    }

    pub fn set_timestamp(&mut self, timestamp: i64) {
        self.timestamp = timestamp;
    }

    /// Advance the nonce by one, wrapping at 2^64.
    pub fn increment_nonce(&mut self) {
        self.nonce = self.nonce.wrapping_add(1);
    }

    /// Hash the PoW message with the given writer.
    fn pow_hash<W: HashWriter>(&self, mut writer: W) -> Hash256 {
        writer.infallible_write(&self.pre_pow_hash);
        writer.infallible_write_element(&self.timestamp);
        writer.infallible_write(&[0u8; POW_MESSAGE_PADDING]);
        writer.infallible_write_element(&self.nonce);
        writer.finalize()
    }

    /// Work value of the original variant.
    pub fn calculate_proof_of_work_value(&self) -> BigUint {
        let pow_hash = self.pow_hash(PowHashWriter::new());
        let hash = self.mat.heavy_hash(&pow_hash);
        to_big(&hash)
    }

    /// Work value of the first revision.
    pub fn calculate_proof_of_work_value_rev1(&self) -> BigUint {
        let pow_hash = self.pow_hash(Blake3HashWriter::new());
        let multiplied = self.mat.matrix_multiply(&pow_hash);
        to_big(&Blake3HashWriter::hash(&multiplied))
    }

    /// Work value of the second revision.
    pub fn calculate_proof_of_work_value_rev2(&self) -> BigUint {
        let pow_hash = self.pow_hash(Blake3HashWriter::new());

        let memory_hard = memory_hard_function(&pow_hash);
        let tradeoff_seed = u64::from_be_bytes(memory_hard[..8].try_into().expect("64-byte scratchpad output"));
        let tradeoff = self.table.time_memory_tradeoff(tradeoff_seed);
        let vdf = verifiable_delay_function(&memory_hard);

        let mut combined = Vec::with_capacity(memory_hard.len() + vdf.len() + 1);
        combined.extend_from_slice(&memory_hard);
        combined.extend_from_slice(&vdf);
        combined.push(tradeoff as u8);

        // Consensus: only the leading 32 bytes (all from the scratchpad) reach the matrix.
        let mut truncated = [0u8; 32];
        truncated.copy_from_slice(&combined[..32]);
        tracing::trace!(discarded = combined.len() - truncated.len(), "rev2 input truncated");

        let multiplied = self.mat.matrix_multiply(&truncated);
        to_big(&Blake3HashWriter::hash(&multiplied))
    }

    /// Work value of any variant.
    pub fn calculate_work(&self, variant: PowVariant) -> BigUint {
        match variant {
            PowVariant::Original => self.calculate_proof_of_work_value(),
            PowVariant::Rev1 => self.calculate_proof_of_work_value_rev1(),
            PowVariant::Rev2 => self.calculate_proof_of_work_value_rev2(),
        }
    }

    /// Whether the original-variant work value is at most the target.
    ///
    /// Does not check that the target itself is valid for the network.
    pub fn check_proof_of_work(&self) -> bool {
        self.check_proof_of_work_variant(PowVariant::Original)
    }

    /// Whether the given variant's work value is at most the target.
    pub fn check_proof_of_work_variant(&self, variant: PowVariant) -> bool {
        self.meets_target(&self.calculate_work(variant))
    }

    /// Build a state from the header and check its PoW against its bits.
    pub fn check_proof_of_work_by_bits<H: BlockHeader>(header: &mut H) -> bool {
        Self::new(header).check_proof_of_work()
    }

    /// Block level for DAG pruning: `max_block_level - bitlen(work)`, floored at 0.
    ///
    /// Genesis roots every level, so a header with no parents gets the maximum.
    pub fn block_level<H: BlockHeader + Clone>(header: &H, max_block_level: u32) -> u32 {
        if header.direct_parents().is_empty() {
            return max_block_level;
        }

        let work = Self::new(&mut header.clone()).calculate_proof_of_work_value();
        let level = i64::from(max_block_level) - work.bits() as i64;
        level.max(0) as u32
    }
}

impl<M: MatrixContext> fmt::Debug for State<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("pre_pow_hash", &hex::encode(self.pre_pow_hash))
            .field("timestamp", &self.timestamp)
            .field("nonce", &self.nonce)
            .field("target", &self.target.as_ref().map(|t| t.to_str_radix(16)))
            .finish()
    }
}

/// Check a header's PoW against its own bits field.
pub fn check_proof_of_work_by_bits<H: BlockHeader>(header: &mut H) -> bool {
    State::<HeavyMatrix>::check_proof_of_work_by_bits(header)
}

/// Block level of a header under the reference matrix.
pub fn block_level<H: BlockHeader + Clone>(header: &H, max_block_level: u32) -> u32 {
    State::<HeavyMatrix>::block_level(header, max_block_level)
}

/// Interpret a digest as a little-endian integer.
///
/// Equivalent to reversing the bytes and parsing them big-endian, so the
/// first digest byte is the least significant.
pub fn to_big(digest: &[u8]) -> BigUint {
    BigUint::from_bytes_le(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::difficulty::max_target;
    use crate::core::types::tests::sample_header;
    use crate::core::types::Header;
    use num_traits::Zero;

    /// Pass-through matrix so the pipeline can be checked without diffusion.
    #[derive(Clone)]
    struct IdentityMatrix;

    impl MatrixContext for IdentityMatrix {
        fn from_pre_pow_hash(_hash: &Hash256) -> Self {
            IdentityMatrix
        }

        fn heavy_hash(&self, hash: &Hash256) -> Hash256 {
            *hash
        }

        fn matrix_multiply(&self, hash: &Hash256) -> Vec<u8> {
            hash.to_vec()
        }
    }

    fn pow_message(pre_pow_hash: &Hash256, timestamp: i64, nonce: u64) -> Vec<u8> {
        let mut msg = Vec::with_capacity(80);
        msg.extend_from_slice(pre_pow_hash);
        msg.extend_from_slice(&timestamp.to_le_bytes());
        msg.extend_from_slice(&[0u8; 32]);
        msg.extend_from_slice(&nonce.to_le_bytes());
        msg
    }

    fn child_header() -> Header {
        sample_header()
    }

    #[test]
    fn test_to_big_reverses_bytes() {
        let mut digest = [0u8; 32];
        digest[0] = 0x01;
        assert_eq!(to_big(&digest), BigUint::from(1u8));

        let mut digest = [0u8; 32];
        digest[31] = 0x01;
        assert_eq!(to_big(&digest), BigUint::from(1u8) << 248u32);

        let digest: Vec<u8> = (1..=32).collect();
        let mut reversed = digest.clone();
        reversed.reverse();
        assert_eq!(to_big(&digest), BigUint::from_bytes_be(&reversed));
    }

    #[test]
    fn test_new_restores_header_and_zeroes_for_pre_pow() {
        let mut header = child_header();
        let original = header.clone();
        let state: State = State::new(&mut header);

        assert_eq!(header, original);
        assert_eq!(state.timestamp(), original.time_in_milliseconds);
        assert_eq!(state.nonce(), original.nonce);
        assert_eq!(state.target(), compact_to_target(original.bits).as_ref());

        let mut zeroed = original.clone();
        zeroed.time_in_milliseconds = 0;
        zeroed.nonce = 0;
        assert_eq!(state.pre_pow_hash(), &zeroed.hash());
    }

    #[test]
    fn test_pre_pow_hash_ignores_time_and_nonce() {
        let mut a = child_header();
        let mut b = child_header();
        b.nonce = 1;
        b.time_in_milliseconds = 42;
        let sa: State<IdentityMatrix> = State::new(&mut a);
        let sb: State<IdentityMatrix> = State::new(&mut b);
        assert_eq!(sa.pre_pow_hash(), sb.pre_pow_hash());
    }

    #[test]
    fn test_original_variant_message_layout() {
        let pre_pow_hash = [0xABu8; 32];
        let state = State::<IdentityMatrix>::from_parts(pre_pow_hash, -5, 77, max_target());

        let mut writer = PowHashWriter::new();
        writer.infallible_write(&pow_message(&pre_pow_hash, -5, 77));
        let expected = to_big(&writer.finalize());

        assert_eq!(state.calculate_proof_of_work_value(), expected);
    }

    #[test]
    fn test_rev1_with_identity_matrix() {
        let pre_pow_hash = [0x01u8; 32];
        let state = State::<IdentityMatrix>::from_parts(pre_pow_hash, 1000, 5, max_target());

        let pow_hash = Blake3HashWriter::hash(&pow_message(&pre_pow_hash, 1000, 5));
        let expected = to_big(&Blake3HashWriter::hash(&pow_hash));
        assert_eq!(state.calculate_proof_of_work_value_rev1(), expected);
    }

    #[test]
    fn test_rev2_consumes_only_leading_scratchpad_bytes() {
        let pre_pow_hash = [0x02u8; 32];
        let state = State::<IdentityMatrix>::from_parts(pre_pow_hash, 1000, 5, max_target());

        let pow_hash = Blake3HashWriter::hash(&pow_message(&pre_pow_hash, 1000, 5));
        let scratch = memory_hard_function(&pow_hash);
        let expected = to_big(&Blake3HashWriter::hash(&scratch[..32]));
        assert_eq!(state.calculate_proof_of_work_value_rev2(), expected);
    }

    #[test]
    fn test_variants_differ_and_are_deterministic() {
        let mut header = child_header();
        let state: State = State::new(&mut header);

        let rev1 = state.calculate_proof_of_work_value_rev1();
        let rev2 = state.calculate_proof_of_work_value_rev2();
        assert_ne!(rev1, rev2);

        assert_eq!(rev1, state.calculate_proof_of_work_value_rev1());
        assert_eq!(rev2, state.calculate_proof_of_work_value_rev2());
        assert_eq!(
            state.calculate_proof_of_work_value(),
            state.calculate_work(PowVariant::Original)
        );
    }

    #[test]
    fn test_nonce_changes_work() {
        let mut header = child_header();
        let mut state: State = State::new(&mut header);
        let before = state.calculate_proof_of_work_value();
        state.increment_nonce();
        assert_ne!(before, state.calculate_proof_of_work_value());
    }

    #[test]
    fn test_increment_nonce_wraps() {
        let mut state = State::<IdentityMatrix>::from_parts([0; 32], 0, u64::MAX - 1, BigUint::zero());
        for _ in 0..3 {
            state.increment_nonce();
        }
        assert_eq!(state.nonce(), 1);

        let mut state = State::<IdentityMatrix>::from_parts([0; 32], 0, 10, BigUint::zero());
        for _ in 0..1000 {
            state.increment_nonce();
        }
        assert_eq!(state.nonce(), 1010);
    }

    #[test]
    fn test_target_boundary_is_inclusive() {
        let reference: State = State::from_parts([3u8; 32], 1234, 99, BigUint::zero());
        let work = reference.calculate_proof_of_work_value();
        assert!(!work.is_zero());

        let exact: State = State::from_parts([3u8; 32], 1234, 99, work.clone());
        assert!(exact.check_proof_of_work());

        let below: State = State::from_parts([3u8; 32], 1234, 99, work - 1u8);
        assert!(!below.check_proof_of_work());
    }

    /// Matrix whose heavy hash is all zeros, so the original work value is 0.
    #[derive(Clone)]
    struct ZeroWorkMatrix;

    impl MatrixContext for ZeroWorkMatrix {
        fn from_pre_pow_hash(_hash: &Hash256) -> Self {
            ZeroWorkMatrix
        }

        fn heavy_hash(&self, _hash: &Hash256) -> Hash256 {
            [0u8; 32]
        }

        fn matrix_multiply(&self, _hash: &Hash256) -> Vec<u8> {
            vec![0u8; 32]
        }
    }

    #[test]
    fn test_negative_bits_reject_zero_work() {
        let mut header = child_header();
        header.bits = 0x0480_0001;
        let state: State<ZeroWorkMatrix> = State::new(&mut header);
        assert!(state.calculate_proof_of_work_value().is_zero());
        assert_eq!(state.target(), None);
        assert!(!state.check_proof_of_work());
        assert!(!State::<ZeroWorkMatrix>::check_proof_of_work_by_bits(&mut header));
        assert_eq!(state.difficulty(), max_target());

        // a zero target is still met by zero work
        header.bits = 0x0480_0000;
        let zero_target: State<ZeroWorkMatrix> = State::new(&mut header);
        assert_eq!(zero_target.target(), Some(&BigUint::zero()));
        assert!(zero_target.check_proof_of_work());
    }

    #[test]
    fn test_all_zero_inputs_end_to_end() {
        let easy: State = State::from_parts([0u8; 32], 0, 0, max_target());
        assert!(easy.check_proof_of_work());

        let impossible: State = State::from_parts([0u8; 32], 0, 0, BigUint::zero());
        assert!(!impossible.check_proof_of_work());
    }

    #[test]
    fn test_check_by_bits_matches_state() {
        for bits in [0x207fffffu32, 0x1d00ffff, 0x0480_0001] {
            let mut header = child_header();
            header.bits = bits;
            let expected = State::<HeavyMatrix>::new(&mut header.clone()).check_proof_of_work();
            assert_eq!(check_proof_of_work_by_bits(&mut header), expected, "bits={:#x}", bits);
        }
    }

    #[test]
    fn test_hard_bits_reject_and_easy_bits_accept() {
        let mut header = child_header();
        header.bits = 0x0480_0001; // sign bit: negative target
        assert!(!check_proof_of_work_by_bits(&mut header));

        header.bits = 0x2200_ffff; // above 2^256
        assert!(check_proof_of_work_by_bits(&mut header));
    }

    #[test]
    fn test_variant_check_uses_variant_work() {
        let state: State = State::from_parts([5u8; 32], 0, 0, max_target());
        for variant in [PowVariant::Original, PowVariant::Rev1, PowVariant::Rev2] {
            assert!(state.check_proof_of_work_variant(variant));
        }
        let strict: State = State::from_parts([5u8; 32], 0, 0, BigUint::zero());
        assert!(!strict.check_proof_of_work_variant(PowVariant::Rev2));
    }

    #[test]
    fn test_genesis_block_level_is_max() {
        let mut genesis = child_header();
        genesis.parents_by_level.clear();
        assert_eq!(block_level(&genesis, 32), 32);
        assert_eq!(block_level(&genesis, 0), 0);
        assert_eq!(block_level(&genesis, crate::core::params::MAX_BLOCK_LEVEL), 225);
    }

    #[test]
    fn test_block_level_formula_and_clamp() {
        let header = child_header();
        let work = State::<HeavyMatrix>::new(&mut header.clone()).calculate_proof_of_work_value();
        let bits = work.bits() as u32;
        assert!(bits > 8);

        assert_eq!(block_level(&header, bits + 10), 10);
        assert_eq!(block_level(&header, bits), 0);
        assert_eq!(block_level(&header, 8), 0);
        assert_eq!(block_level(&header, 0), 0);
    }

    #[test]
    fn test_block_level_leaves_header_untouched() {
        let header = child_header();
        let before = header.clone();
        let _ = block_level(&header, 225);
        assert_eq!(header, before);
    }

    #[test]
    fn test_variant_parsing() {
        assert_eq!("original".parse::<PowVariant>().unwrap(), PowVariant::Original);
        assert_eq!("REV1".parse::<PowVariant>().unwrap(), PowVariant::Rev1);
        assert_eq!("rev2".parse::<PowVariant>().unwrap(), PowVariant::Rev2);
        assert!(matches!("rev3".parse::<PowVariant>(), Err(DecodeError::UnknownVariant(_))));
        assert_eq!(PowVariant::Rev2.to_string(), "rev2");
    }
}
