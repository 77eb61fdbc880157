//! Witness collection for script-guarded transactions
//!
//! Gathers witnesses from the participants of one or more policies for a
//! single finalized transaction, and produces the signed envelope once every
//! policy has reached its threshold.

use crate::core::transaction::RawTransaction;
use crate::crypto::KeyPair;
use crate::multisig::policy::{MultisigError, PolicyScript};
use crate::multisig::witness::{combine_witnesses, create_witness, Witness};
use chrono::{DateTime, Utc};

/// A witness together with when it was handed in
#[derive(Clone, Debug)]
pub struct CollectedWitness {
    pub witness: Witness,
    pub collected_at: DateTime<Utc>,
}

/// Status of a collection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectorStatus {
    /// Waiting for more signatures
    AwaitingSignatures,
    /// Every policy threshold is met
    Ready,
}

/// Collects witnesses for one raw transaction
#[derive(Clone, Debug)]
pub struct WitnessCollector {
    raw_tx: Vec<u8>,
    tx_hash: String,
    policies: Vec<PolicyScript>,
    witnesses: Vec<CollectedWitness>,
    created_at: DateTime<Utc>,
}

impl WitnessCollector {
    /// Start collecting for `raw_tx`. With no policies any key may sign and a
    /// single witness is enough.
    pub fn new(raw_tx: Vec<u8>, policies: Vec<PolicyScript>) -> Result<Self, MultisigError> {
        let tx_hash = RawTransaction::from_bytes(&raw_tx)?.hash();

        Ok(Self {
            raw_tx,
            tx_hash,
            policies,
            witnesses: Vec::new(),
            created_at: Utc::now(),
        })
    }

    pub fn tx_hash(&self) -> &str {
        &self.tx_hash
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Check whether a key hash (hex) belongs to any of the policies
    pub fn is_authorized(&self, key_hash: &str) -> bool {
        self.policies.is_empty() || self.policies.iter().any(|p| p.is_signer(key_hash))
    }

    /// Add a witness from an authorized signer
    pub fn add_witness(&mut self, witness: Witness) -> Result<(), MultisigError> {
        let key_hash = witness.key_hash_hex();

        if !self.is_authorized(&key_hash) {
            return Err(MultisigError::UnauthorizedSigner(key_hash));
        }

        if self.witnesses.iter().any(|w| w.witness.key_hash() == witness.key_hash()) {
            return Err(MultisigError::AlreadySigned(key_hash));
        }

        if !witness.verify(&self.tx_hash)? {
            return Err(MultisigError::InvalidSignature(key_hash));
        }

        log::debug!("Collected witness from {} for {}", key_hash, self.tx_hash);
        self.witnesses.push(CollectedWitness {
            witness,
            collected_at: Utc::now(),
        });

        Ok(())
    }

    /// Sign with a local key and add the witness
    pub fn sign_with(&mut self, key: &KeyPair) -> Result<(), MultisigError> {
        let witness = create_witness(&self.tx_hash, key)?;
        self.add_witness(witness)
    }

    pub fn signature_count(&self) -> usize {
        self.witnesses.len()
    }

    /// Key hashes (hex) that have signed so far
    pub fn signed_by(&self) -> Vec<String> {
        self.witnesses.iter().map(|w| w.witness.key_hash_hex()).collect()
    }

    /// Signatures still missing per policy, in policy order
    pub fn missing(&self) -> Vec<usize> {
        let signed = self.signed_by();
        self.policies
            .iter()
            .map(|policy| {
                let have = signed.iter().filter(|h| policy.is_signer(h)).count();
                policy.required().saturating_sub(have)
            })
            .collect()
    }

    pub fn is_ready(&self) -> bool {
        if self.policies.is_empty() {
            return !self.witnesses.is_empty();
        }
        self.missing().iter().all(|m| *m == 0)
    }

    pub fn status(&self) -> CollectorStatus {
        if self.is_ready() {
            CollectorStatus::Ready
        } else {
            CollectorStatus::AwaitingSignatures
        }
    }

    /// Produce the signed envelope
    pub fn finalize(&self) -> Result<Vec<u8>, MultisigError> {
        if !self.is_ready() {
            let need: usize = self.policies.iter().map(|p| p.required()).sum::<usize>().max(1);
            return Err(MultisigError::InsufficientSignatures {
                have: self.witnesses.len(),
                need,
            });
        }

        let witnesses: Vec<Witness> = self.witnesses.iter().map(|w| w.witness.clone()).collect();
        combine_witnesses(&self.raw_tx, &witnesses)
    }
}
