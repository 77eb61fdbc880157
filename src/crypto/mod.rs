//! Cryptographic utilities
//!
//! This module provides:
//! - Blake2b-224 / blake2b-256 hashing
//! - Ed25519 key management and signatures

pub mod hash;
pub mod keys;

pub use hash::{blake2b_224, blake2b_224_hex, blake2b_256, blake2b_256_hex};
pub use keys::{
    decode_key_hex, key_hash_from_public_hex, verify_signature, KeyError, KeyPair, CBOR_KEY_PREFIX,
    KEY_SIZE, SIGNATURE_SIZE,
};
