//! Blake2b hashing utilities
//!
//! Cardano hashes verification keys and native scripts with blake2b-224 and
//! transaction bodies and auxiliary data with blake2b-256.

use blake2::digest::consts::{U28, U32};
use blake2::{Blake2b, Digest};

type Blake2b224 = Blake2b<U28>;
type Blake2b256 = Blake2b<U32>;

/// Computes blake2b-224 of the input data (key hashes, policy ids)
pub fn blake2b_224(data: &[u8]) -> [u8; 28] {
    let mut hasher = Blake2b224::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Computes blake2b-256 of the input data (transaction ids, metadata hashes)
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Computes blake2b-224 and returns it as a hex string
pub fn blake2b_224_hex(data: &[u8]) -> String {
    hex::encode(blake2b_224(data))
}

/// Computes blake2b-256 and returns it as a hex string
pub fn blake2b_256_hex(data: &[u8]) -> String {
    hex::encode(blake2b_256(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blake2b_224() {
        let data = b"hello world";
        assert_eq!(blake2b_224(data).len(), 28);
        assert_eq!(
            blake2b_224_hex(data),
            "42d1854b7d69e3b57c64fcc7b4f64171b47dff43fba6ac0499ff437f"
        );
    }

    #[test]
    fn test_blake2b_256() {
        let data = b"hello world";
        assert_eq!(blake2b_256(data).len(), 32);
        assert_eq!(
            blake2b_256_hex(data),
            "256c83b297114d201b30179f3f0ef0cace9783622da5974326b436178aeef610"
        );
    }

    #[test]
    fn test_zero_key_hash() {
        assert_eq!(
            blake2b_224_hex(&[0u8; 32]),
            "f9dca21a6c826ec8acb4cf395cbc24351937bfe6560b2683ab8b415f"
        );
    }
}
