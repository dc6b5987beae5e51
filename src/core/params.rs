/// Hoopow consensus parameters.
/// Every constant here is consensus-critical: changing one forks the network.

/// Number of 64-bit entries in the shared lookup table (2^20).
pub const LOOKUP_TABLE_SIZE: usize = 1 << 20;

/// Rounds of table-driven mixing in the time/memory trade-off stage.
pub const TRADEOFF_ROUNDS: usize = 1000;

/// Scratchpad size of the memory-hard stage, in 64-bit words.
///
/// The working set is 8 KiB, so the stage is memory-hard in name only.
pub const SCRATCHPAD_WORDS: usize = 1 << 10;

/// Full passes over the scratchpad. Passes must run in order.
pub const SCRATCHPAD_ITERATIONS: usize = 2;

/// Number of words copied out of the scratchpad (8 words = 64 bytes).
pub const SCRATCHPAD_OUTPUT_WORDS: usize = 8;

/// Sequential modular squarings performed by the delay function.
pub const VDF_ROUNDS: usize = 1000;

/// Delay function modulus: p = 2^256 - 2^32 - 977.
pub const VDF_MODULUS_HEX: &str =
    "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEFFFFFC2F";

/// Highest block level a header can reach. Genesis always sits here.
pub const MAX_BLOCK_LEVEL: u32 = 225;

/// Bytes of zero padding between the timestamp and nonce in the PoW message.
pub const POW_MESSAGE_PADDING: usize = 32;

/// cSHAKE256 customization for the primary PoW hash.
pub const POW_HASH_DOMAIN: &[u8] = b"ProofOfWorkHash";

/// cSHAKE256 customization for the heavy hash finalizer.
pub const HEAVY_HASH_DOMAIN: &[u8] = b"HeavyHash";

/// BLAKE2b key used for block header hashing.
pub const BLOCK_HASH_DOMAIN: &[u8] = b"BlockHash";
