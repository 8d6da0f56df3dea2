//! Deterministic sampling.
//!
//! Every decision maps the input string onto a 256-bit [`Key`] with SHA-256
//! and compares it against a threshold or a bucket range. The same input
//! always lands in the same place, so a client stays enrolled (or not) for
//! as long as its identifier and the rate do not change.
//!
//! # Examples
//!
//! ```
//! use targex::sampling::{bucket_sample, fraction_to_key, stable_sample};
//!
//! assert_eq!(fraction_to_key(0.0).unwrap().to_hex(), "0".repeat(64));
//!
//! let enrolled = stable_sample("user-1", 0.1).unwrap();
//! assert_eq!(enrolled, stable_sample("user-1", 0.1).unwrap());
//!
//! // Buckets [0, 10000) cover every input exactly once
//! assert!(bucket_sample("user-1", 0, 10_000, 10_000).unwrap());
//! ```

use std::{fmt, str::FromStr};

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Size of the shared bucket space used by recipes that do not name one.
pub const DEFAULT_BUCKET_TOTAL: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SamplingError {
    #[error("Fraction {0} is outside [0, 1]")]
    FractionOutOfRange(f64),

    #[error("Bucket space is empty")]
    EmptyBucketSpace,

    #[error("No ratios given")]
    NoRatios,

    #[error("Sum of ratios overflows")]
    RatioOverflow,

    #[error("Invalid key '{0}': expected 64 hex digits")]
    InvalidKey(String),
}

/// 256-bit unsigned integer, big-endian.
///
/// Keys order numerically, which for fixed-width big-endian bytes is the
/// same as lexicographic order of the bytes and of the hex form.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key([u8; 32]);

impl Key {
    pub const ZERO: Key = Key([0; 32]);
    pub const MAX: Key = Key([0xff; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Key(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Canonical form: 64 lowercase hex digits.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, SamplingError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| SamplingError::InvalidKey(s.to_string()))?;
        Ok(Key(bytes))
    }

    /// `self mod modulus`; `modulus` must be non-zero.
    fn rem(&self, modulus: u64) -> u64 {
        let modulus = u128::from(modulus);
        let rem = self
            .0
            .iter()
            .fold(0u128, |acc, &byte| ((acc << 8) | u128::from(byte)) % modulus);
        // rem < modulus <= u64::MAX
        rem as u64
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.to_hex())
    }
}

impl FromStr for Key {
    type Err = SamplingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Key::from_hex(s)
    }
}

// ========================================
// Fraction to key
// ========================================

/// Little-endian 64-bit limbs; wide enough for a 53-bit mantissa times
/// `2^256 - 1`.
type Wide = [u64; 5];

const WIDE_BITS: u32 = 320;

/// Maps `frac` in `[0, 1]` onto the key space: `round_half_up(frac *
/// (2^256 - 1))`, computed exactly from the binary value of `frac`.
///
/// `0` is [`Key::ZERO`] and `1` is [`Key::MAX`].
pub fn fraction_to_key(frac: f64) -> Result<Key, SamplingError> {
    if !(0.0..=1.0).contains(&frac) {
        return Err(SamplingError::FractionOutOfRange(frac));
    }
    if frac == 0.0 {
        return Ok(Key::ZERO);
    }

    // frac = mantissa / 2^shift
    let bits = frac.to_bits();
    let exponent = ((bits >> 52) & 0x7ff) as u32;
    let fraction = bits & ((1 << 52) - 1);
    let (mantissa, shift) = if exponent == 0 {
        (fraction, 1074)
    } else {
        (fraction | (1 << 52), 1075 - exponent)
    };

    // mantissa * (2^256 - 1) = (mantissa << 256) - mantissa
    let mut wide: Wide = [0, 0, 0, 0, mantissa];
    sub_small(&mut wide, mantissa);

    if shift > 0 {
        add_power_of_two(&mut wide, shift - 1);
    }
    let scaled = shift_right(&wide, shift);

    if scaled[4] != 0 {
        return Ok(Key::MAX);
    }
    let mut bytes = [0u8; 32];
    for (limb, chunk) in scaled[..4].iter().rev().zip(bytes.chunks_exact_mut(8)) {
        chunk.copy_from_slice(&limb.to_be_bytes());
    }
    Ok(Key(bytes))
}

fn sub_small(wide: &mut Wide, value: u64) {
    let mut borrow = value;
    for limb in wide.iter_mut() {
        if borrow == 0 {
            break;
        }
        let (result, underflow) = limb.overflowing_sub(borrow);
        *limb = result;
        borrow = u64::from(underflow);
    }
}

fn add_power_of_two(wide: &mut Wide, bit: u32) {
    if bit >= WIDE_BITS {
        return;
    }
    let mut carry = 1u64 << (bit % 64);
    for limb in wide.iter_mut().skip((bit / 64) as usize) {
        if carry == 0 {
            break;
        }
        let (result, overflow) = limb.overflowing_add(carry);
        *limb = result;
        carry = u64::from(overflow);
    }
}

fn shift_right(wide: &Wide, shift: u32) -> Wide {
    let mut out: Wide = [0; 5];
    if shift >= WIDE_BITS {
        return out;
    }
    let limbs = (shift / 64) as usize;
    let bits = shift % 64;
    for (i, slot) in out.iter_mut().enumerate() {
        let low = wide.get(i + limbs).copied().unwrap_or(0);
        let high = wide.get(i + limbs + 1).copied().unwrap_or(0);
        *slot = if bits == 0 {
            low
        } else {
            (low >> bits) | (high << (64 - bits))
        };
    }
    out
}

// ========================================
// Hashing and sampling
// ========================================

/// SHA-256 of the UTF-8 bytes of `input`, as a key.
pub fn hash_to_key(input: &str) -> Key {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());

    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hasher.finalize());
    Key(bytes)
}

/// Whether `input` falls in the lowest `rate` share of the key space.
pub fn stable_sample(input: &str, rate: f64) -> Result<bool, SamplingError> {
    let threshold = fraction_to_key(rate)?;
    Ok(hash_to_key(input) < threshold)
}

/// Bucket of `input` in `[0, total)`.
pub fn bucket_index(input: &str, total: u64) -> Result<u64, SamplingError> {
    if total == 0 {
        return Err(SamplingError::EmptyBucketSpace);
    }
    Ok(hash_to_key(input).rem(total))
}

/// Whether the bucket of `input` lies in `count` buckets from `start`.
///
/// The range wraps past `total` back to zero, so `start = 95, count = 10`
/// out of 100 covers buckets 95..100 and 0..5.
pub fn bucket_sample(input: &str, start: u64, count: u64, total: u64) -> Result<bool, SamplingError> {
    let index = bucket_index(input, total)?;
    if count >= total {
        return Ok(true);
    }

    let start = start % total;
    let offset = if index >= start {
        index - start
    } else {
        total - start + index
    };
    Ok(offset < count)
}

/// Index of the ratio whose share of the bucket space holds `input`.
///
/// With ratios `[1, 2]` a third of inputs get `0` and two thirds get `1`.
pub fn ratio_sample(input: &str, ratios: &[u64]) -> Result<usize, SamplingError> {
    if ratios.is_empty() {
        return Err(SamplingError::NoRatios);
    }
    let total = ratios
        .iter()
        .try_fold(0u64, |sum, &ratio| sum.checked_add(ratio))
        .ok_or(SamplingError::RatioOverflow)?;
    let index = bucket_index(input, total)?;

    let mut boundary = 0;
    ratios
        .iter()
        .position(|&ratio| {
            boundary += ratio;
            index < boundary
        })
        .ok_or(SamplingError::EmptyBucketSpace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction_rounds_half_up() {
        // (2^256 - 1) / 2 = 2^255 - 0.5
        assert_eq!(
            fraction_to_key(0.5).unwrap().to_hex(),
            format!("8{}", "0".repeat(63))
        );
        // 3 * (2^256 - 1) / 4 = 3 * 2^254 - 0.75
        assert_eq!(
            fraction_to_key(0.75).unwrap().to_hex(),
            format!("b{}", "f".repeat(63))
        );
    }

    #[test]
    fn test_tiny_fractions() {
        assert_eq!(fraction_to_key(f64::MIN_POSITIVE).unwrap(), Key::ZERO);
        assert_eq!(fraction_to_key(5e-324).unwrap(), Key::ZERO);
        // 2^-256 * (2^256 - 1) rounds to 1
        let key = fraction_to_key(2f64.powi(-256)).unwrap();
        assert_eq!(key.to_hex(), format!("{}1", "0".repeat(63)));
    }

    #[test]
    fn test_key_hex_round_trip() {
        let key = hash_to_key("abc");
        assert_eq!(key.to_string().parse::<Key>().unwrap(), key);
        assert!(matches!(Key::from_hex("abc"), Err(SamplingError::InvalidKey(_))));
    }

    #[test]
    fn test_key_rem() {
        let mut bytes = [0u8; 32];
        bytes[31] = 7;
        assert_eq!(Key::from_bytes(bytes).rem(4), 3);
        // 2^256 - 1 is divisible by 3 and by 5
        assert_eq!(Key::MAX.rem(3), 0);
        assert_eq!(Key::MAX.rem(5), 0);
        assert_eq!(Key::MAX.rem(7), 1);
    }

    #[test]
    fn test_ratio_sample_skips_zero_ratios() {
        assert_eq!(ratio_sample("test", &[0, 5]), Ok(1));
        assert_eq!(ratio_sample("test", &[5, 0]), Ok(0));
        assert_eq!(ratio_sample("test", &[]), Err(SamplingError::NoRatios));
        assert_eq!(ratio_sample("test", &[0, 0]), Err(SamplingError::EmptyBucketSpace));
        assert_eq!(ratio_sample("test", &[u64::MAX, 1]), Err(SamplingError::RatioOverflow));
    }
}
