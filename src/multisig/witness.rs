//! Verification key witnesses
//!
//! A witness is a verification key plus its ed25519 signature over a
//! transaction id. Witnesses are independent of each other; combining them
//! into a transaction deduplicates by key hash and keeps them ordered, so the
//! result does not depend on the order they were produced in.

use crate::core::transaction::{RawTransaction, TransactionError};
use crate::crypto::{blake2b_224, verify_signature, KeyPair, KEY_SIZE, SIGNATURE_SIZE};
use crate::multisig::policy::MultisigError;
use minicbor::{Decoder, Encoder};

/// Signature of one key over a transaction id
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Witness {
    pub public_key: [u8; KEY_SIZE],
    pub signature: [u8; SIGNATURE_SIZE],
}

impl Witness {
    /// Sign a hex transaction id with `key`
    pub fn new(key: &KeyPair, tx_hash: &str) -> Result<Self, MultisigError> {
        let hash = decode_tx_hash(tx_hash)?;
        Ok(Self {
            public_key: key.public_key(),
            signature: key.sign(&hash),
        })
    }

    /// Build from raw key and signature bytes, `None` on wrong lengths
    pub fn from_slices(public_key: &[u8], signature: &[u8]) -> Option<Self> {
        Some(Self {
            public_key: public_key.try_into().ok()?,
            signature: signature.try_into().ok()?,
        })
    }

    /// Blake2b-224 hash of the verification key
    pub fn key_hash(&self) -> [u8; 28] {
        blake2b_224(&self.public_key)
    }

    pub fn key_hash_hex(&self) -> String {
        hex::encode(self.key_hash())
    }

    /// Check the signature against a hex transaction id
    pub fn verify(&self, tx_hash: &str) -> Result<bool, MultisigError> {
        let hash = decode_tx_hash(tx_hash)?;
        Ok(verify_signature(&self.public_key, &hash, &self.signature)?)
    }

    /// Hex of the CBOR pair `[vkey, signature]`, the form exchanged between
    /// signers
    pub fn to_hex(&self) -> Result<String, MultisigError> {
        let mut enc = Encoder::new(Vec::new());
        enc.array(2)
            .and_then(|e| e.bytes(&self.public_key))
            .and_then(|e| e.bytes(&self.signature))
            .map_err(TransactionError::from)?;
        Ok(hex::encode(enc.into_writer()))
    }

    pub fn from_hex(hex_witness: &str) -> Result<Self, MultisigError> {
        let bytes = hex::decode(hex_witness.trim())
            .map_err(|e| MultisigError::InvalidWitness(e.to_string()))?;

        let mut d = Decoder::new(&bytes);
        let invalid = |e: minicbor::decode::Error| MultisigError::InvalidWitness(e.to_string());
        if d.array().map_err(invalid)? != Some(2) {
            return Err(MultisigError::InvalidWitness("expected a pair".to_string()));
        }
        let public_key = d.bytes().map_err(invalid)?;
        let signature = d.bytes().map_err(invalid)?;

        Self::from_slices(public_key, signature)
            .ok_or_else(|| MultisigError::InvalidWitness("wrong key or signature size".to_string()))
    }
}

fn decode_tx_hash(tx_hash: &str) -> Result<Vec<u8>, MultisigError> {
    hex::decode(tx_hash).map_err(|_| {
        MultisigError::TransactionError(TransactionError::Decoding(format!(
            "transaction hash {}",
            tx_hash
        )))
    })
}

/// Create a witness for a transaction id with one signing key
pub fn create_witness(tx_hash: &str, key: &KeyPair) -> Result<Witness, MultisigError> {
    Witness::new(key, tx_hash)
}

/// Merge witnesses into a finalized transaction
///
/// Witnesses already present in `raw_tx` are kept; a second witness for the
/// same key is dropped. Every witness must sign the transaction's id.
pub fn combine_witnesses(raw_tx: &[u8], witnesses: &[Witness]) -> Result<Vec<u8>, MultisigError> {
    let mut tx = RawTransaction::from_bytes(raw_tx)?;
    let tx_hash = tx.hash();

    let mut duplicates = 0;
    for witness in witnesses {
        if !witness.verify(&tx_hash)? {
            return Err(MultisigError::InvalidSignature(witness.key_hash_hex()));
        }
        if !tx.witness_set_mut().add_witness(witness.clone()) {
            duplicates += 1;
        }
    }

    if duplicates > 0 {
        log::debug!("Dropped {} duplicate witnesses for {}", duplicates, tx_hash);
    }
    log::info!(
        "Transaction {} carries {} witnesses",
        tx_hash,
        tx.witness_set().len()
    );

    Ok(tx.to_bytes()?)
}
