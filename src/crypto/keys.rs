//! Ed25519 key management
//!
//! Provides key pair generation, signing, and verification for Shelley
//! payment keys. Keys can be read either as raw 32-byte hex or in the
//! CBOR-wrapped form (`5820` prefix) used by cardano-cli key files.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use thiserror::Error;

use super::hash::blake2b_224;

/// Size of an ed25519 key in bytes
pub const KEY_SIZE: usize = 32;

/// Size of an ed25519 signature in bytes
pub const SIGNATURE_SIZE: usize = 64;

/// CBOR header of a 32 byte bytestring, prefixed to keys in key files
pub const CBOR_KEY_PREFIX: &str = "5820";

/// Errors that can occur during key operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("Invalid signing key")]
    InvalidSigningKey,
    #[error("Invalid verification key")]
    InvalidVerificationKey,
    #[error("Invalid signature")]
    InvalidSignature,
}

/// An ed25519 signing key together with its verification key
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Create a key pair from raw signing key bytes
    pub fn from_bytes(bytes: &[u8; KEY_SIZE]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(bytes),
        }
    }

    /// Create a key pair from a hex-encoded signing key, raw or CBOR-wrapped
    pub fn from_signing_key_hex(hex_key: &str) -> Result<Self, KeyError> {
        let bytes = decode_key_hex(hex_key).ok_or(KeyError::InvalidSigningKey)?;
        Ok(Self::from_bytes(&bytes))
    }

    /// Signing key as raw hex
    pub fn signing_key_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// Signing key in the CBOR-wrapped form used by key files
    pub fn signing_key_cbor_hex(&self) -> String {
        format!("{}{}", CBOR_KEY_PREFIX, self.signing_key_hex())
    }

    /// Raw verification key bytes
    pub fn public_key(&self) -> [u8; KEY_SIZE] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Verification key as raw hex
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key())
    }

    /// Blake2b-224 hash of the verification key
    pub fn key_hash(&self) -> [u8; 28] {
        blake2b_224(&self.public_key())
    }

    /// Verification key hash as hex, as used in policy scripts
    pub fn key_hash_hex(&self) -> String {
        hex::encode(self.key_hash())
    }

    /// Sign a message (a transaction hash in practice)
    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_SIZE] {
        self.signing_key.sign(message).to_bytes()
    }

    /// Verify a signature against this key pair's verification key
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<bool, KeyError> {
        verify_signature(&self.public_key(), message, signature)
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key_hex())
            .finish()
    }
}

/// Decode a 32 byte key from raw hex or `5820`-prefixed CBOR hex
pub fn decode_key_hex(hex_key: &str) -> Option<[u8; KEY_SIZE]> {
    let hex_key = hex_key.trim();
    let raw = if hex_key.len() == 2 * KEY_SIZE + CBOR_KEY_PREFIX.len() {
        hex_key.strip_prefix(CBOR_KEY_PREFIX)?
    } else {
        hex_key
    };

    hex::decode(raw).ok()?.try_into().ok()
}

/// Hash a hex-encoded verification key (raw or CBOR-wrapped) to its key hash
pub fn key_hash_from_public_hex(hex_key: &str) -> Result<[u8; 28], KeyError> {
    let bytes = decode_key_hex(hex_key).ok_or(KeyError::InvalidVerificationKey)?;
    Ok(blake2b_224(&bytes))
}

/// Verify a signature against a raw verification key
pub fn verify_signature(
    public_key: &[u8],
    message: &[u8],
    signature: &[u8],
) -> Result<bool, KeyError> {
    let key_bytes: [u8; KEY_SIZE] = public_key
        .try_into()
        .map_err(|_| KeyError::InvalidVerificationKey)?;
    let key =
        VerifyingKey::from_bytes(&key_bytes).map_err(|_| KeyError::InvalidVerificationKey)?;
    let sig = Signature::from_slice(signature).map_err(|_| KeyError::InvalidSignature)?;

    Ok(key.verify(message, &sig).is_ok())
}
