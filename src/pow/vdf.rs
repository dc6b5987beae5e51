//! Sequential squaring delay function.
//!
//! `x <- x^2 mod p` for a fixed 256-bit prime, 1000 times. Every round needs
//! the previous one, so extra hardware cannot shorten the chain.

use std::sync::OnceLock;

use num_bigint::BigUint;
use num_traits::Zero;
use sha2::{Digest, Sha256};

use crate::core::params::{VDF_MODULUS_HEX, VDF_ROUNDS};
use crate::core::types::Hash256;

fn modulus() -> &'static BigUint {
    static MODULUS: OnceLock<BigUint> = OnceLock::new();
    MODULUS.get_or_init(|| {
        BigUint::parse_bytes(VDF_MODULUS_HEX.as_bytes(), 16).expect("modulus constant is valid hex")
    })
}

/// Evaluate the delay function over `input` read as a big-endian integer.
///
/// Returns SHA-256 of the final value's minimal big-endian encoding; zero
/// encodes as the empty string.
pub fn verifiable_delay_function(input: &[u8]) -> Hash256 {
    let p = modulus();
    let mut x = BigUint::from_bytes_be(input);
    for _ in 0..VDF_ROUNDS {
        x = (&x * &x) % p;
    }

    let bytes = if x.is_zero() { Vec::new() } else { x.to_bytes_be() };
    Sha256::digest(&bytes).into()
}
