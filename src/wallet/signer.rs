//! Signing capability
//!
//! The builder only needs something that can produce a witness over a
//! transaction id. Local key pairs implement it directly; hardware or remote
//! signers can implement it without exposing key material.

use crate::crypto::{blake2b_224, KeyError, KeyPair, KEY_SIZE};
use crate::multisig::witness::Witness;

/// Produces witnesses for transaction ids
pub trait TxSigner {
    /// Raw verification key
    fn verification_key(&self) -> [u8; KEY_SIZE];

    /// Sign a raw (32 byte) transaction id
    fn create_witness(&self, tx_hash: &[u8]) -> Result<Witness, KeyError>;

    /// Payment key hash of the verification key
    fn key_hash(&self) -> [u8; 28] {
        blake2b_224(&self.verification_key())
    }
}

impl TxSigner for KeyPair {
    fn verification_key(&self) -> [u8; KEY_SIZE] {
        self.public_key()
    }

    fn create_witness(&self, tx_hash: &[u8]) -> Result<Witness, KeyError> {
        Ok(Witness {
            public_key: self.public_key(),
            signature: self.sign(tx_hash),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_pair_signer() {
        let key = KeyPair::generate();
        let hash = [7u8; 32];

        let witness = key.create_witness(&hash).unwrap();
        assert_eq!(witness.public_key, key.public_key());
        assert_eq!(TxSigner::key_hash(&key), key.key_hash());
        assert!(witness.verify(&hex::encode(hash)).unwrap());
    }
}
