//! Hash writers used by the PoW pipeline and header hashing.
//!
//! Every writer is an infallible digest stream: bytes go in, a 32-byte
//! digest comes out. Writers also implement [`io::Write`] so fixed-width
//! elements can be serialized straight into them.

use std::io;

use blake2::digest::consts::U32;
use blake2::digest::{KeyInit, Mac};
use blake2::Blake2bMac;
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::{CShake256, CShake256Core};

use crate::core::params::{BLOCK_HASH_DOMAIN, HEAVY_HASH_DOMAIN, POW_HASH_DOMAIN};
use crate::core::serialization::WriteElement;
use crate::core::types::Hash256;

/// A streaming hash whose writes cannot fail.
pub trait HashWriter: io::Write + Sized {
    fn infallible_write(&mut self, data: &[u8]);

    fn finalize(self) -> Hash256;

    /// Serialize a fixed-width element into the digest.
    ///
    /// Panics if the serializer reports an error: the underlying stream
    /// never fails, so an error here is a bug, not a runtime condition.
    fn infallible_write_element<E: WriteElement>(&mut self, element: &E) {
        if let Err(e) = element.write_element(self) {
            panic!("hash digest stream returned an error: {}", e);
        }
    }
}

macro_rules! impl_io_write {
    ($t:ty) => {
        impl io::Write for $t {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.infallible_write(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }
    };
}

/// cSHAKE256 with a fixed customization string, squeezed to 32 bytes.
struct CShakeWriter(CShake256);

impl CShakeWriter {
    fn new(domain: &[u8]) -> Self {
        Self(CShake256::from_core(CShake256Core::new(domain)))
    }

    fn write(&mut self, data: &[u8]) {
        Update::update(&mut self.0, data);
    }

    fn finalize(self) -> Hash256 {
        let mut out = [0u8; 32];
        self.0.finalize_xof().read(&mut out);
        out
    }
}

/// Primary PoW hash, used only by the original variant.
pub struct PowHashWriter(CShakeWriter);

impl PowHashWriter {
    pub fn new() -> Self {
        Self(CShakeWriter::new(POW_HASH_DOMAIN))
    }
}

impl Default for PowHashWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl HashWriter for PowHashWriter {
    fn infallible_write(&mut self, data: &[u8]) {
        self.0.write(data);
    }

    fn finalize(self) -> Hash256 {
        self.0.finalize()
    }
}

impl_io_write!(PowHashWriter);

/// Finalizer of the reference heavy hash.
pub struct HeavyHashWriter(CShakeWriter);

impl HeavyHashWriter {
    pub fn new() -> Self {
        Self(CShakeWriter::new(HEAVY_HASH_DOMAIN))
    }

    pub fn hash(data: &[u8]) -> Hash256 {
        let mut writer = Self::new();
        writer.infallible_write(data);
        writer.finalize()
    }
}

impl Default for HeavyHashWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl HashWriter for HeavyHashWriter {
    fn infallible_write(&mut self, data: &[u8]) {
        self.0.write(data);
    }

    fn finalize(self) -> Hash256 {
        self.0.finalize()
    }
}

impl_io_write!(HeavyHashWriter);

/// Fast hash (BLAKE3) used by the revised variants.
#[derive(Clone, Default)]
pub struct Blake3HashWriter(blake3::Hasher);

impl Blake3HashWriter {
    pub fn new() -> Self {
        Self(blake3::Hasher::new())
    }

    pub fn hash(data: &[u8]) -> Hash256 {
        *blake3::hash(data).as_bytes()
    }
}

impl HashWriter for Blake3HashWriter {
    fn infallible_write(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize(self) -> Hash256 {
        *self.0.finalize().as_bytes()
    }
}

impl_io_write!(Blake3HashWriter);

/// Keyed BLAKE2b-256 over serialized header fields.
pub struct BlockHashWriter(Blake2bMac<U32>);

impl BlockHashWriter {
    pub fn new() -> Self {
        match <Blake2bMac<U32> as KeyInit>::new_from_slice(BLOCK_HASH_DOMAIN) {
            Ok(mac) => Self(mac),
            // key is a 9-byte constant, well under the 64-byte limit
            Err(e) => panic!("invalid block hash key: {}", e),
        }
    }
}

impl Default for BlockHashWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl HashWriter for BlockHashWriter {
    fn infallible_write(&mut self, data: &[u8]) {
        Mac::update(&mut self.0, data);
    }

    fn finalize(self) -> Hash256 {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.0.finalize().into_bytes());
        out
    }
}

impl_io_write!(BlockHashWriter);

#[cfg(test)]
mod tests {
    use super::*;

    fn digest_of<W: HashWriter>(mut w: W, chunks: &[&str]) -> Hash256 {
        for c in chunks {
            w.infallible_write(c.as_bytes());
        }
        w.finalize()
    }

    #[test]
    fn test_streaming_matches_one_shot() {
        let whole = digest_of(Blake3HashWriter::new(), &["hello world"]);
        let split = digest_of(Blake3HashWriter::new(), &["hello", " ", "world"]);
        assert_eq!(whole, split);
        assert_eq!(whole, Blake3HashWriter::hash(b"hello world"));

        let whole = digest_of(PowHashWriter::new(), &["abcdef"]);
        let split = digest_of(PowHashWriter::new(), &["abc", "def"]);
        assert_eq!(whole, split);
    }

    #[test]
    fn test_writers_are_independent() {
        let data = &["same input"];
        let pow = digest_of(PowHashWriter::new(), data);
        let heavy = digest_of(HeavyHashWriter::new(), data);
        let fast = digest_of(Blake3HashWriter::new(), data);
        let block = digest_of(BlockHashWriter::new(), data);
        assert_ne!(pow, heavy);
        assert_ne!(pow, fast);
        assert_ne!(fast, block);
        assert_ne!(heavy, block);
    }

    #[test]
    fn test_blake3_empty_vector() {
        assert_eq!(
            hex::encode(Blake3HashWriter::new().finalize()),
            "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262"
        );
    }

    #[test]
    fn test_write_element_goes_through_digest() {
        let mut a = Blake3HashWriter::new();
        a.infallible_write_element(&42u64);
        let mut b = Blake3HashWriter::new();
        b.infallible_write(&42u64.to_le_bytes());
        assert_eq!(a.finalize(), b.finalize());
    }
}
