//! Canonical serialization for deterministic fingerprints.
//!
//! Layout snapshots and layout parameters are fingerprinted so callers can
//! detect whether a recompute actually changed the geometry.
//!
//! ## Determinism Guarantees
//!
//! - Stable field order: Struct fields serialize in declaration order
//! - Stable Vec order: Vectors serialize in index order
//! - Floats are quantized to integers by callers before hashing

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Quantization factor for float normalization (1e6, rounded to i64).
pub const FLOAT_QUANTIZATION_FACTOR: f64 = 1_000_000.0;

/// Quantize a float to an i64 for deterministic hashing.
pub fn quantize(value: f64) -> i64 {
    (value * FLOAT_QUANTIZATION_FACTOR).round() as i64
}

/// Serialize a value to canonical JSON bytes for hashing.
///
/// Values that cannot be represented as JSON (e.g. maps with non-string keys)
/// serialize to an empty buffer.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).unwrap_or_default()
}

/// Compute canonical hash of a serializable value.
pub fn canonical_hash<T: Serialize>(value: &T) -> u64 {
    let bytes = to_canonical_bytes(value);
    xxh64(&bytes, 0)
}

/// Compute canonical hash and return as hex string.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> String {
    format!("{:016x}", canonical_hash(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Point {
        x: i64,
        y: i64,
    }

    #[test]
    fn test_determinism() {
        let p = Point { x: quantize(12.5), y: quantize(-3.25) };

        let h1 = canonical_hash(&p);
        let h2 = canonical_hash(&p);
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_quantize_absorbs_float_noise() {
        assert_eq!(quantize(0.1 + 0.2), quantize(0.3));
        assert_ne!(quantize(0.3), quantize(0.300_01));
    }

    #[test]
    fn test_hex_width() {
        let hex = canonical_hash_hex(&"root");
        assert_eq!(hex.len(), 16);
    }
}
