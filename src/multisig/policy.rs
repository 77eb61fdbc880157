//! Threshold native scripts
//!
//! A [`PolicyScript`] is an `atLeast` native script over a set of payment key
//! hashes. Its CBOR form is hashed into the policy id, which also serves as
//! the payment credential of the script's enterprise address.

use crate::core::address::{Address, NetworkId, KEY_HASH_SIZE};
use crate::core::transaction::TransactionError;
use crate::crypto::{blake2b_224, key_hash_from_public_hex};
use minicbor::Encoder;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const SCRIPT_PUBKEY: u32 = 0;
const SCRIPT_N_OF_K: u32 = 3;

/// Tag byte prepended to native scripts before hashing
const NATIVE_SCRIPT_TAG: u8 = 0x00;

/// Errors related to policy scripts and multisig witnesses
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MultisigError {
    #[error("Invalid policy script: {0}")]
    PolicyScriptInvalid(String),
    #[error("Invalid key hash: {0}")]
    InvalidKeyHash(String),
    #[error("Duplicate signer key hash: {0}")]
    DuplicateSigner(String),
    #[error("Signer not authorized: {0}")]
    UnauthorizedSigner(String),
    #[error("Already signed by {0}")]
    AlreadySigned(String),
    #[error("Insufficient signatures: have {have}, need {need}")]
    InsufficientSignatures { have: usize, need: usize },
    #[error("Invalid signature from {0}")]
    InvalidSignature(String),
    #[error("Invalid witness: {0}")]
    InvalidWitness(String),
    #[error("Transaction error: {0}")]
    TransactionError(#[from] TransactionError),
    #[error("Crypto error: {0}")]
    CryptoError(#[from] crate::crypto::KeyError),
    #[error("Address error: {0}")]
    AddressError(#[from] crate::core::address::AddressError),
}

/// JSON shape of native scripts as written by cardano-cli
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum ScriptJson {
    Sig {
        #[serde(rename = "keyHash")]
        key_hash: String,
    },
    AtLeast {
        required: usize,
        scripts: Vec<ScriptJson>,
    },
    All {
        scripts: Vec<ScriptJson>,
    },
    Any {
        scripts: Vec<ScriptJson>,
    },
}

/// M-of-N signature policy over payment key hashes
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PolicyScript {
    required: usize,
    /// Lowercase hex, sorted ascending
    key_hashes: Vec<String>,
}

impl PolicyScript {
    /// Create a policy requiring `required` of the given key hashes (hex)
    ///
    /// # Errors
    /// Fails when the key set is empty, the threshold is out of range, a key
    /// hash is malformed, or a key hash repeats.
    pub fn new(required: usize, key_hashes: Vec<String>) -> Result<Self, MultisigError> {
        if key_hashes.is_empty() {
            return Err(MultisigError::PolicyScriptInvalid(
                "key hash set is empty".to_string(),
            ));
        }

        if required == 0 || required > key_hashes.len() {
            return Err(MultisigError::PolicyScriptInvalid(format!(
                "threshold {} out of range 1..={}",
                required,
                key_hashes.len()
            )));
        }

        let mut sorted = Vec::with_capacity(key_hashes.len());
        for key_hash in key_hashes {
            let normalized = key_hash.trim().to_ascii_lowercase();
            match hex::decode(&normalized) {
                Ok(bytes) if bytes.len() == KEY_HASH_SIZE => sorted.push(normalized),
                _ => return Err(MultisigError::InvalidKeyHash(key_hash)),
            }
        }

        sorted.sort();
        if let Some(pair) = sorted.windows(2).find(|w| w[0] == w[1]) {
            return Err(MultisigError::DuplicateSigner(pair[0].clone()));
        }

        Ok(Self {
            required,
            key_hashes: sorted,
        })
    }

    /// Create a policy from hex verification keys (raw or `5820`-wrapped)
    pub fn from_verification_keys(
        required: usize,
        verification_keys: &[String],
    ) -> Result<Self, MultisigError> {
        let key_hashes = verification_keys
            .iter()
            .map(|vk| key_hash_from_public_hex(vk).map(hex::encode))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(required, key_hashes)
    }

    /// Parse the cardano-cli JSON form (`atLeast`, `all` or `any` over `sig`)
    pub fn from_json(json: &str) -> Result<Self, MultisigError> {
        let parsed: ScriptJson = serde_json::from_str(json)
            .map_err(|e| MultisigError::PolicyScriptInvalid(e.to_string()))?;

        let (required, scripts) = match parsed {
            ScriptJson::AtLeast { required, scripts } => (required, scripts),
            ScriptJson::All { scripts } => (scripts.len(), scripts),
            ScriptJson::Any { scripts } => (1, scripts),
            ScriptJson::Sig { key_hash } => (1, vec![ScriptJson::Sig { key_hash }]),
        };

        let key_hashes = scripts
            .into_iter()
            .map(|script| match script {
                ScriptJson::Sig { key_hash } => Ok(key_hash),
                _ => Err(MultisigError::PolicyScriptInvalid(
                    "nested scripts are not supported".to_string(),
                )),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(required, key_hashes)
    }

    /// The cardano-cli JSON form
    pub fn to_json(&self) -> String {
        let script = ScriptJson::AtLeast {
            required: self.required,
            scripts: self
                .key_hashes
                .iter()
                .map(|key_hash| ScriptJson::Sig {
                    key_hash: key_hash.clone(),
                })
                .collect(),
        };
        // plain strings and integers always serialize
        serde_json::to_string_pretty(&script).unwrap_or_default()
    }

    /// Signatures required (M)
    pub fn required(&self) -> usize {
        self.required
    }

    /// Number of signers (N)
    pub fn count(&self) -> usize {
        self.key_hashes.len()
    }

    pub fn key_hashes(&self) -> &[String] {
        &self.key_hashes
    }

    /// Check whether a key hash (hex) is one of the signers
    pub fn is_signer(&self, key_hash: &str) -> bool {
        let key_hash = key_hash.to_ascii_lowercase();
        self.key_hashes.binary_search(&key_hash).is_ok()
    }

    /// Description like "2-of-3"
    pub fn description(&self) -> String {
        format!("{}-of-{}", self.required, self.key_hashes.len())
    }

    /// Canonical CBOR: `[3, required, [[0, key_hash], ...]]`
    pub fn to_cbor(&self) -> Result<Vec<u8>, MultisigError> {
        Ok(self.encode()?)
    }

    fn encode(&self) -> Result<Vec<u8>, TransactionError> {
        let mut enc = Encoder::new(Vec::new());
        enc.array(3)?
            .u32(SCRIPT_N_OF_K)?
            .u64(self.required as u64)?
            .array(self.key_hashes.len() as u64)?;

        for key_hash in &self.key_hashes {
            let bytes = hex::decode(key_hash)
                .map_err(|_| TransactionError::Encoding(format!("key hash {}", key_hash)))?;
            enc.array(2)?.u32(SCRIPT_PUBKEY)?.bytes(&bytes)?;
        }

        Ok(enc.into_writer())
    }

    /// Policy id: blake2b-224 of the tagged script CBOR
    pub fn policy_id(&self) -> Result<String, MultisigError> {
        let mut tagged = vec![NATIVE_SCRIPT_TAG];
        tagged.extend_from_slice(&self.to_cbor()?);
        Ok(hex::encode(blake2b_224(&tagged)))
    }

    /// Enterprise address locked by this script
    pub fn address(&self, network: NetworkId) -> Result<Address, MultisigError> {
        Ok(Address::from_policy_id(network, &self.policy_id()?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH_A: &str = "27e38d0e19e3434e33fbd001d3fe04b5b76763f88acd625e0d770b43";
    const HASH_B: &str = "f9dca21a6c826ec8acb4cf395cbc24351937bfe6560b2683ab8b415f";

    fn hashes() -> Vec<String> {
        vec![HASH_B.to_string(), HASH_A.to_string()]
    }

    #[test]
    fn test_policy_creation() {
        let policy = PolicyScript::new(2, hashes()).unwrap();

        assert_eq!(policy.required(), 2);
        assert_eq!(policy.count(), 2);
        assert_eq!(policy.description(), "2-of-2");
        assert_eq!(policy.key_hashes()[0], HASH_A);
        assert!(policy.is_signer(HASH_B));
        assert!(!policy.is_signer(&"00".repeat(28)));
    }

    #[test]
    fn test_policy_validation() {
        assert!(matches!(
            PolicyScript::new(0, hashes()),
            Err(MultisigError::PolicyScriptInvalid(_))
        ));
        assert!(matches!(
            PolicyScript::new(3, hashes()),
            Err(MultisigError::PolicyScriptInvalid(_))
        ));
        assert!(matches!(
            PolicyScript::new(1, vec![]),
            Err(MultisigError::PolicyScriptInvalid(_))
        ));
        assert!(matches!(
            PolicyScript::new(1, vec!["abcd".to_string()]),
            Err(MultisigError::InvalidKeyHash(_))
        ));
        assert!(matches!(
            PolicyScript::new(1, vec![HASH_A.to_string(), HASH_A.to_uppercase()]),
            Err(MultisigError::DuplicateSigner(_))
        ));
    }

    #[test]
    fn test_canonical_cbor() {
        let policy = PolicyScript::new(1, hashes()).unwrap();
        assert_eq!(
            hex::encode(policy.to_cbor().unwrap()),
            format!("830301828200581c{}8200581c{}", HASH_A, HASH_B)
        );
    }

    #[test]
    fn test_policy_id() {
        let policy = PolicyScript::new(1, hashes()).unwrap();
        assert_eq!(
            policy.policy_id().unwrap(),
            "30c148e539f81c49399c848c9cc79de2d20c8ca969e08d088cd0d8f0"
        );

        let policy = PolicyScript::new(2, hashes()).unwrap();
        assert_eq!(
            policy.policy_id().unwrap(),
            "92d868b5d469e4172d139aa6d77da3c87153d91338c3a5233a4ba327"
        );
        assert_eq!(
            policy.address(NetworkId::Testnet).unwrap().to_string(),
            "addr_test1wzfds6946357g9edzwd2d4ma50y8z57ezvuv8ffr8f96xfcctxdpr"
        );
    }

    #[test]
    fn test_policy_id_order_independent() {
        let forward = PolicyScript::new(2, vec![HASH_A.to_string(), HASH_B.to_string()]).unwrap();
        let reverse = PolicyScript::new(2, hashes()).unwrap();

        assert_eq!(forward, reverse);
        assert_eq!(forward.policy_id().unwrap(), reverse.policy_id().unwrap());
    }

    #[test]
    fn test_json_round_trip() {
        let policy = PolicyScript::new(2, hashes()).unwrap();
        let json = policy.to_json();

        assert!(json.contains("\"atLeast\""));
        assert!(json.contains("\"keyHash\""));
        assert_eq!(PolicyScript::from_json(&json).unwrap(), policy);
    }

    #[test]
    fn test_json_all_and_any() {
        let all = format!(
            r#"{{"type":"all","scripts":[{{"type":"sig","keyHash":"{}"}},{{"type":"sig","keyHash":"{}"}}]}}"#,
            HASH_A, HASH_B
        );
        assert_eq!(PolicyScript::from_json(&all).unwrap().required(), 2);

        let any = all.replace("\"all\"", "\"any\"");
        assert_eq!(PolicyScript::from_json(&any).unwrap().required(), 1);

        assert!(PolicyScript::from_json("{\"type\":\"before\",\"slot\":1}").is_err());
    }

    #[test]
    fn test_from_verification_keys() {
        let vk = "03a107bff3ce10be1d70dd18e74bc09967e4d6309ba50d5f1ddc8664125531b8";
        let policy = PolicyScript::from_verification_keys(1, &[vk.to_string()]).unwrap();
        assert_eq!(policy.key_hashes(), &[HASH_A.to_string()]);
    }
}
