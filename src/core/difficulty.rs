//! Compact "bits" encoding of difficulty targets.
//!
//! Format: `0x[exponent][mantissa]`
//! - exponent: 1 byte, the byte length of the target
//! - mantissa: 3 bytes, the most significant bytes of the target
//!
//! Bit `0x0080_0000` is a sign bit. A "negative" encoding has no target at
//! all: no work value, zero included, can meet it.

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};

const SIGN_BIT: u32 = 0x0080_0000;
const MANTISSA_MASK: u32 = 0x007f_ffff;

/// Decode a compact bits value into the full target.
///
/// Returns `None` for a negative encoding. The sign bit on a zero magnitude
/// is ignored, so that case still decodes to `Some(0)`.
pub fn compact_to_target(compact: u32) -> Option<BigUint> {
    let exponent = compact >> 24;
    let mantissa = compact & MANTISSA_MASK;

    let target = if exponent <= 3 {
        BigUint::from(mantissa >> (8 * (3 - exponent)))
    } else {
        BigUint::from(mantissa) << (8 * (exponent - 3))
    };

    if compact & SIGN_BIT != 0 && !target.is_zero() {
        return None;
    }
    Some(target)
}

/// Encode a target into compact bits. Precision beyond the top three bytes is lost.
pub fn target_to_compact(target: &BigUint) -> u32 {
    if target.is_zero() {
        return 0;
    }

    let mut exponent = ((target.bits() + 7) / 8) as u32;
    let mut mantissa = if exponent <= 3 {
        // fits in 24 bits
        target.to_u32().unwrap_or(0) << (8 * (3 - exponent))
    } else {
        (target >> (8 * (exponent - 3))).to_u32().unwrap_or(0)
    };

    // Keep the sign bit clear by moving one byte into the exponent.
    if mantissa & SIGN_BIT != 0 {
        mantissa >>= 8;
        exponent += 1;
    }

    (exponent << 24) | mantissa
}

/// Largest representable work value, 2^256 - 1.
pub fn max_target() -> BigUint {
    (BigUint::from(1u8) << 256u32) - BigUint::from(1u8)
}

/// Difficulty = max_target / target. A zero target maps to the maximum.
pub fn target_to_difficulty(target: &BigUint) -> BigUint {
    if target.is_zero() {
        return max_target();
    }
    max_target() / target
}
