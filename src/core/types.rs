use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::serialization::WriteElement;
use crate::crypto::{BlockHashWriter, HashWriter};

/// A 32-byte hash used throughout the system
pub type Hash256 = [u8; 32];

/// Null hash (all zeros)
pub const NULL_HASH: Hash256 = [0u8; 32];

// ─── Header Contract ─────────────────────────────────────────────────

/// What the PoW core needs from a block header.
///
/// `hash()` must cover every header field, so callers that want the pre-PoW
/// hash zero the timestamp and nonce first and restore them afterwards.
pub trait BlockHeader {
    /// Compact difficulty bits
    fn bits(&self) -> u32;
    fn time_in_milliseconds(&self) -> i64;
    fn set_time_in_milliseconds(&mut self, time: i64);
    fn nonce(&self) -> u64;
    fn set_nonce(&mut self, nonce: u64);
    fn direct_parents(&self) -> &[Hash256];
    fn hash(&self) -> Hash256;
}

// ─── Header ──────────────────────────────────────────────────────────

/// Block header of a DAG block.
///
/// Parents are grouped by level; level 0 holds the direct parents. A header
/// with no direct parents is the genesis header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub version: u16,
    #[serde(with = "hex_hash_levels")]
    pub parents_by_level: Vec<Vec<Hash256>>,
    #[serde(with = "hex_hash")]
    pub hash_merkle_root: Hash256,
    #[serde(with = "hex_hash")]
    pub accepted_id_merkle_root: Hash256,
    #[serde(with = "hex_hash")]
    pub utxo_commitment: Hash256,
    pub time_in_milliseconds: i64,
    pub bits: u32,
    pub nonce: u64,
    pub daa_score: u64,
    pub blue_score: u64,
    #[serde(with = "hex_biguint")]
    pub blue_work: BigUint,
    #[serde(with = "hex_hash")]
    pub pruning_point: Hash256,
}

impl Header {
    /// Serialize every field into a hash writer in canonical order.
    pub fn write_to<W: HashWriter>(&self, w: &mut W) {
        w.infallible_write_element(&self.version);
        w.infallible_write_element(&(self.parents_by_level.len() as u64));
        for level in &self.parents_by_level {
            w.infallible_write_element(&(level.len() as u64));
            for parent in level {
                w.infallible_write(parent);
            }
        }
        w.infallible_write(&self.hash_merkle_root);
        w.infallible_write(&self.accepted_id_merkle_root);
        w.infallible_write(&self.utxo_commitment);
        w.infallible_write_element(&self.time_in_milliseconds);
        w.infallible_write_element(&self.bits);
        w.infallible_write_element(&self.nonce);
        w.infallible_write_element(&self.daa_score);
        w.infallible_write_element(&self.blue_score);

        let blue_work = blue_work_bytes(&self.blue_work);
        w.infallible_write_element(&(blue_work.len() as u64));
        w.infallible_write(&blue_work);

        w.infallible_write(&self.pruning_point);
    }
}

/// Minimal big-endian bytes; zero encodes as an empty string.
fn blue_work_bytes(work: &BigUint) -> Vec<u8> {
    if work.bits() == 0 {
        Vec::new()
    } else {
        work.to_bytes_be()
    }
}

impl BlockHeader for Header {
    fn bits(&self) -> u32 {
        self.bits
    }

    fn time_in_milliseconds(&self) -> i64 {
        self.time_in_milliseconds
    }

    fn set_time_in_milliseconds(&mut self, time: i64) {
        self.time_in_milliseconds = time;
    }

    fn nonce(&self) -> u64 {
        self.nonce
    }

    fn set_nonce(&mut self, nonce: u64) {
        self.nonce = nonce;
    }

    fn direct_parents(&self) -> &[Hash256] {
        self.parents_by_level.first().map(Vec::as_slice).unwrap_or(&[])
    }

    fn hash(&self) -> Hash256 {
        let mut writer = BlockHashWriter::new();
        self.write_to(&mut writer);
        writer.finalize()
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Header [{}] bits={:#010x} ts={} nonce={} parents={}",
            hex::encode(self.hash()),
            self.bits,
            self.time_in_milliseconds,
            self.nonce,
            self.direct_parents().len(),
        )
    }
}

// ─── Decoding Errors ─────────────────────────────────────────────────

#[derive(Debug)]
pub enum DecodeError {
    InvalidHex(String),
    InvalidHashLength(usize),
    InvalidJson(String),
    UnknownVariant(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::InvalidHex(msg) => write!(f, "invalid hex: {}", msg),
            DecodeError::InvalidHashLength(len) => write!(f, "hash must be 32 bytes, got {}", len),
            DecodeError::InvalidJson(msg) => write!(f, "invalid header json: {}", msg),
            DecodeError::UnknownVariant(name) => write!(f, "unknown pow variant: {}", name),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Parse a 64-character hex string into a hash.
pub fn parse_hash(s: &str) -> Result<Hash256, DecodeError> {
    let bytes = hex::decode(s).map_err(|e| DecodeError::InvalidHex(e.to_string()))?;
    if bytes.len() != 32 {
        return Err(DecodeError::InvalidHashLength(bytes.len()));
    }
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&bytes);
    Ok(hash)
}

/// Parse a header from its JSON form.
pub fn parse_header_json(json: &str) -> Result<Header, DecodeError> {
    serde_json::from_str(json).map_err(|e| DecodeError::InvalidJson(e.to_string()))
}

// ─── Serde Helpers ───────────────────────────────────────────────────

mod hex_hash {
    use super::{parse_hash, Hash256};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(hash: &Hash256, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Hash256, D::Error> {
        let s = String::deserialize(d)?;
        parse_hash(&s).map_err(de::Error::custom)
    }
}

mod hex_hash_levels {
    use super::{parse_hash, Hash256};
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(levels: &[Vec<Hash256>], s: S) -> Result<S::Ok, S::Error> {
        let encoded: Vec<Vec<String>> = levels
            .iter()
            .map(|level| level.iter().map(hex::encode).collect())
            .collect();
        encoded.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Vec<Hash256>>, D::Error> {
        let encoded = Vec::<Vec<String>>::deserialize(d)?;
        encoded
            .iter()
            .map(|level| {
                level
                    .iter()
                    .map(|h| parse_hash(h).map_err(de::Error::custom))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect()
    }
}

mod hex_biguint {
    use num_bigint::BigUint;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(n: &BigUint, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&n.to_str_radix(16))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<BigUint, D::Error> {
        let s = String::deserialize(d)?;
        BigUint::parse_bytes(s.as_bytes(), 16)
            .ok_or_else(|| de::Error::custom(format!("invalid hex integer: {}", s)))
    }
}
