//! Fixed-width little-endian encodings for consensus hashing.

use std::io::{self, Write};

/// A value with a canonical fixed-width encoding.
pub trait WriteElement {
    fn write_element<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()>;
}

macro_rules! impl_write_element {
    ($($t:ty),*) => {
        $(
            impl WriteElement for $t {
                fn write_element<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
                    w.write_all(&self.to_le_bytes())
                }
            }
        )*
    };
}

impl_write_element!(u16, u32, u64, i64);
