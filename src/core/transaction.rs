//! Transaction model and binary codec
//!
//! A [`TransactionDraft`] collects inputs, outputs, fee, TTL, metadata and the
//! native scripts that guard script inputs. It serializes to the Alonzo-and-later
//! (Babbage) CBOR envelope `[body, witness_set, true, auxiliary_data | null]`; the
//! transaction id is blake2b-256 of the body bytes.
//!
//! [`RawTransaction`] is the decoded form of a finalized envelope. It keeps the
//! body and auxiliary data as the exact bytes they were read from, so adding
//! witnesses never changes the transaction id.

use crate::core::address::Address;
use crate::core::token::{Token, TokenAmount};
use crate::crypto::{blake2b_256, KEY_SIZE, SIGNATURE_SIZE};
use crate::multisig::witness::Witness;
use minicbor::data::Type;
use minicbor::{Decoder, Encoder};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::convert::Infallible;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Size of a transaction id in bytes
pub const TX_HASH_SIZE: usize = 32;

/// Size of a policy id in bytes
pub const POLICY_ID_SIZE: usize = 28;

const BODY_INPUTS: u32 = 0;
const BODY_OUTPUTS: u32 = 1;
const BODY_FEE: u32 = 2;
const BODY_TTL: u32 = 3;
const BODY_AUX_HASH: u32 = 7;

const WITNESS_VKEYS: u32 = 0;
const WITNESS_NATIVE_SCRIPTS: u32 = 1;

/// CBOR tag 258 (set), accepted in front of witness arrays when decoding
const TAG_SET: u64 = 258;

// =============================================================================
// Error Types
// =============================================================================

/// Transaction-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid output: {0}")]
    InvalidOutput(String),
    #[error("CBOR encoding failed: {0}")]
    Encoding(String),
    #[error("CBOR decoding failed: {0}")]
    Decoding(String),
}

impl From<minicbor::encode::Error<Infallible>> for TransactionError {
    fn from(e: minicbor::encode::Error<Infallible>) -> Self {
        TransactionError::Encoding(e.to_string())
    }
}

impl From<minicbor::decode::Error> for TransactionError {
    fn from(e: minicbor::decode::Error) -> Self {
        TransactionError::Decoding(e.to_string())
    }
}

type CborEncoder = Encoder<Vec<u8>>;

// =============================================================================
// Transaction Input
// =============================================================================

/// Reference to an output of a previous transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxInput {
    pub tx_hash: String,
    pub index: u32,
}

impl TxInput {
    pub fn new(tx_hash: impl Into<String>, index: u32) -> Self {
        Self {
            tx_hash: tx_hash.into(),
            index,
        }
    }

    fn hash_bytes(&self) -> Result<[u8; TX_HASH_SIZE], TransactionError> {
        hex::decode(&self.tx_hash)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| {
                TransactionError::InvalidInput(format!("{}#{}", self.tx_hash, self.index))
            })
    }
}

impl std::fmt::Display for TxInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.tx_hash, self.index)
    }
}

// =============================================================================
// Transaction Output
// =============================================================================

/// Transaction output carrying native coin and optional tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    /// Bech32 destination address
    pub address: String,
    /// Native coin amount
    pub amount: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tokens: Vec<TokenAmount>,
}

impl TxOutput {
    pub fn new(address: impl Into<String>, amount: u64) -> Self {
        Self {
            address: address.into(),
            amount,
            tokens: Vec::new(),
        }
    }

    pub fn with_tokens(mut self, tokens: Vec<TokenAmount>) -> Self {
        self.tokens.extend(tokens);
        self
    }

    /// True when at least one token quantity is non-zero
    pub fn has_tokens(&self) -> bool {
        self.tokens.iter().any(|t| t.amount > 0)
    }

    /// Serialized size of this output in bytes
    pub fn size(&self) -> Result<usize, TransactionError> {
        let mut enc = Encoder::new(Vec::new());
        encode_output(&mut enc, self)?;
        Ok(enc.into_writer().len())
    }
}

// =============================================================================
// Draft
// =============================================================================

/// Transaction under construction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionDraft {
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub fee: u64,
    /// Absolute slot after which the transaction is invalid
    pub ttl: Option<u64>,
    /// Auxiliary data, attached verbatim
    pub metadata: Option<Vec<u8>>,
    /// CBOR of the native scripts guarding script inputs
    pub native_scripts: Vec<Vec<u8>>,
}

impl TransactionDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical body bytes
    pub fn body_bytes(&self) -> Result<Vec<u8>, TransactionError> {
        let mut enc = Encoder::new(Vec::new());
        self.encode_body(&mut enc)?;
        Ok(enc.into_writer())
    }

    /// Transaction id (hex blake2b-256 of the body)
    pub fn hash(&self) -> Result<String, TransactionError> {
        Ok(hex::encode(blake2b_256(&self.body_bytes()?)))
    }

    /// Full envelope with the given verification key witnesses
    pub fn to_bytes(&self, witnesses: &[Witness]) -> Result<Vec<u8>, TransactionError> {
        Ok(self.finalize_with(witnesses)?.to_bytes()?)
    }

    /// Finalized transaction carrying only the native scripts
    pub fn finalize(&self) -> Result<RawTransaction, TransactionError> {
        self.finalize_with(&[])
    }

    fn finalize_with(&self, witnesses: &[Witness]) -> Result<RawTransaction, TransactionError> {
        let mut witness_set = WitnessSet {
            vkey_witnesses: Vec::new(),
            native_scripts: self.native_scripts.clone(),
        };
        for witness in witnesses {
            witness_set.add_witness(witness.clone());
        }

        Ok(RawTransaction {
            body: self.body_bytes()?,
            witness_set,
            is_valid: true,
            metadata: self.metadata.clone(),
        })
    }

    fn encode_body(&self, enc: &mut CborEncoder) -> Result<(), TransactionError> {
        let entries = 3 + self.ttl.is_some() as u64 + self.metadata.is_some() as u64;
        enc.map(entries)?;

        let inputs = canonical_inputs(&self.inputs)?;
        enc.u32(BODY_INPUTS)?.array(inputs.len() as u64)?;
        for (hash, index) in &inputs {
            enc.array(2)?.bytes(hash)?.u32(*index)?;
        }

        enc.u32(BODY_OUTPUTS)?.array(self.outputs.len() as u64)?;
        for output in &self.outputs {
            encode_output(enc, output)?;
        }

        enc.u32(BODY_FEE)?.u64(self.fee)?;

        if let Some(ttl) = self.ttl {
            enc.u32(BODY_TTL)?.u64(ttl)?;
        }

        if let Some(metadata) = &self.metadata {
            enc.u32(BODY_AUX_HASH)?.bytes(&blake2b_256(metadata))?;
        }

        Ok(())
    }
}

/// Inputs deduplicated and sorted by (hash bytes, index)
fn canonical_inputs(
    inputs: &[TxInput],
) -> Result<Vec<([u8; TX_HASH_SIZE], u32)>, TransactionError> {
    let mut out = inputs
        .iter()
        .map(|input| Ok((input.hash_bytes()?, input.index)))
        .collect::<Result<Vec<_>, TransactionError>>()?;
    out.sort();
    out.dedup();
    Ok(out)
}

fn encode_output(enc: &mut CborEncoder, output: &TxOutput) -> Result<(), TransactionError> {
    let address = Address::from_bech32(&output.address)
        .map_err(|e| TransactionError::InvalidOutput(e.to_string()))?;

    enc.array(2)?.bytes(address.as_bytes())?;

    let assets = canonical_assets(&output.tokens)?;
    if assets.is_empty() {
        enc.u64(output.amount)?;
        return Ok(());
    }

    enc.array(2)?.u64(output.amount)?.map(assets.len() as u64)?;
    for (policy, names) in &assets {
        enc.bytes(policy)?.map(names.len() as u64)?;
        for (name, quantity) in names {
            enc.bytes(name)?.u64(*quantity)?;
        }
    }
    Ok(())
}

type AssetGroups = Vec<(Vec<u8>, Vec<(Vec<u8>, u64)>)>;

/// Tokens grouped by policy, zero quantities dropped, duplicates summed, keys
/// in canonical CBOR order
fn canonical_assets(tokens: &[TokenAmount]) -> Result<AssetGroups, TransactionError> {
    let mut grouped: BTreeMap<Vec<u8>, BTreeMap<Vec<u8>, u64>> = BTreeMap::new();

    for token in tokens.iter().filter(|t| t.amount > 0) {
        if token.token.is_native() {
            return Err(TransactionError::InvalidOutput(
                "native coin listed as a token".to_string(),
            ));
        }
        let policy = hex::decode(&token.token.policy_id)
            .ok()
            .filter(|p| p.len() == POLICY_ID_SIZE)
            .ok_or_else(|| {
                TransactionError::InvalidOutput(format!("policy id {}", token.token.policy_id))
            })?;

        let quantity = grouped
            .entry(policy)
            .or_default()
            .entry(token.token.name.clone())
            .or_insert(0);
        *quantity = quantity.saturating_add(token.amount);
    }

    let mut groups: AssetGroups = grouped
        .into_iter()
        .map(|(policy, names)| {
            let mut names: Vec<_> = names.into_iter().collect();
            names.sort_by(|a, b| canonical_key_order(&a.0, &b.0));
            (policy, names)
        })
        .collect();
    groups.sort_by(|a, b| canonical_key_order(&a.0, &b.0));
    Ok(groups)
}

/// Length-first ordering of CBOR bytestring map keys
fn canonical_key_order(a: &[u8], b: &[u8]) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

// =============================================================================
// Witness Set
// =============================================================================

/// Verification key witnesses plus native scripts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WitnessSet {
    /// Kept sorted by key hash, one entry per key
    vkey_witnesses: Vec<Witness>,
    pub native_scripts: Vec<Vec<u8>>,
}

impl WitnessSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a witness. Returns false when a witness for the same key is
    /// already present.
    pub fn add_witness(&mut self, witness: Witness) -> bool {
        let key_hash = witness.key_hash();
        match self
            .vkey_witnesses
            .binary_search_by(|w| w.key_hash().cmp(&key_hash))
        {
            Ok(_) => false,
            Err(pos) => {
                self.vkey_witnesses.insert(pos, witness);
                true
            }
        }
    }

    pub fn vkey_witnesses(&self) -> &[Witness] {
        &self.vkey_witnesses
    }

    pub fn len(&self) -> usize {
        self.vkey_witnesses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vkey_witnesses.is_empty()
    }

    fn encode(&self, enc: &mut CborEncoder) -> Result<(), TransactionError> {
        let entries =
            !self.vkey_witnesses.is_empty() as u64 + !self.native_scripts.is_empty() as u64;
        enc.map(entries)?;

        if !self.vkey_witnesses.is_empty() {
            enc.u32(WITNESS_VKEYS)?
                .array(self.vkey_witnesses.len() as u64)?;
            for witness in &self.vkey_witnesses {
                enc.array(2)?
                    .bytes(&witness.public_key)?
                    .bytes(&witness.signature)?;
            }
        }

        if !self.native_scripts.is_empty() {
            enc.u32(WITNESS_NATIVE_SCRIPTS)?
                .array(self.native_scripts.len() as u64)?;
            for script in &self.native_scripts {
                enc.writer_mut().extend_from_slice(script);
            }
        }

        Ok(())
    }

    fn decode(d: &mut Decoder<'_>) -> Result<Self, TransactionError> {
        let mut set = WitnessSet::new();
        let entries = d
            .map()?
            .ok_or_else(|| TransactionError::Decoding("indefinite witness set".to_string()))?;

        for _ in 0..entries {
            match d.u32()? {
                WITNESS_VKEYS => {
                    for _ in 0..definite_array(d)? {
                        d.array()?;
                        let public_key = d.bytes()?;
                        let signature = d.bytes()?;
                        let witness = Witness::from_slices(public_key, signature).ok_or_else(
                            || TransactionError::Decoding("malformed vkey witness".to_string()),
                        )?;
                        set.add_witness(witness);
                    }
                }
                WITNESS_NATIVE_SCRIPTS => {
                    for _ in 0..definite_array(d)? {
                        set.native_scripts.push(raw_item(d)?.to_vec());
                    }
                }
                other => {
                    return Err(TransactionError::Decoding(format!(
                        "unsupported witness set key {}",
                        other
                    )))
                }
            }
        }

        Ok(set)
    }
}

/// Definite array header, optionally preceded by a set tag
fn definite_array(d: &mut Decoder<'_>) -> Result<u64, TransactionError> {
    if d.datatype()? == Type::Tag {
        let tag = d.tag()?;
        if tag.as_u64() != TAG_SET {
            return Err(TransactionError::Decoding(format!("unexpected tag {}", tag.as_u64())));
        }
    }
    d.array()?
        .ok_or_else(|| TransactionError::Decoding("indefinite array".to_string()))
}

/// Bytes of the next complete data item
fn raw_item<'b>(d: &mut Decoder<'b>) -> Result<&'b [u8], TransactionError> {
    let input = d.input();
    let start = d.position();
    d.skip()?;
    Ok(&input[start..d.position()])
}

// =============================================================================
// Raw Transaction
// =============================================================================

/// A finalized transaction envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransaction {
    body: Vec<u8>,
    witness_set: WitnessSet,
    is_valid: bool,
    metadata: Option<Vec<u8>>,
}

impl RawTransaction {
    /// Decode an envelope, keeping body and auxiliary data bytes verbatim
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut d = Decoder::new(bytes);
        let len = d
            .array()?
            .ok_or_else(|| TransactionError::Decoding("indefinite transaction".to_string()))?;
        if len != 3 && len != 4 {
            return Err(TransactionError::Decoding(format!(
                "transaction array of length {}",
                len
            )));
        }

        if d.datatype()? != Type::Map {
            return Err(TransactionError::Decoding("body is not a map".to_string()));
        }
        let body = raw_item(&mut d)?.to_vec();
        let witness_set = WitnessSet::decode(&mut d)?;
        let is_valid = if len == 4 { d.bool()? } else { true };

        let metadata = if d.datatype()? == Type::Null {
            d.null()?;
            None
        } else {
            Some(raw_item(&mut d)?.to_vec())
        };

        Ok(Self {
            body,
            witness_set,
            is_valid,
            metadata,
        })
    }

    /// Decode a hex encoded envelope
    pub fn from_hex(hex_tx: &str) -> Result<Self, TransactionError> {
        let bytes =
            hex::decode(hex_tx.trim()).map_err(|e| TransactionError::Decoding(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Encode the envelope
    pub fn to_bytes(&self) -> Result<Vec<u8>, TransactionError> {
        let mut enc = Encoder::new(Vec::with_capacity(self.body.len() + 256));
        enc.array(4)?;
        enc.writer_mut().extend_from_slice(&self.body);
        self.witness_set.encode(&mut enc)?;
        enc.bool(self.is_valid)?;
        match &self.metadata {
            Some(metadata) => enc.writer_mut().extend_from_slice(metadata),
            None => {
                enc.null()?;
            }
        }
        Ok(enc.into_writer())
    }

    pub fn to_hex(&self) -> Result<String, TransactionError> {
        Ok(hex::encode(self.to_bytes()?))
    }

    /// Transaction id (hex blake2b-256 of the body)
    pub fn hash(&self) -> String {
        hex::encode(blake2b_256(&self.body))
    }

    pub fn body_bytes(&self) -> &[u8] {
        &self.body
    }

    pub fn metadata(&self) -> Option<&[u8]> {
        self.metadata.as_deref()
    }

    pub fn witness_set(&self) -> &WitnessSet {
        &self.witness_set
    }

    pub fn witness_set_mut(&mut self) -> &mut WitnessSet {
        &mut self.witness_set
    }

    /// Decode the body back into a draft (inputs in canonical order, tokens
    /// grouped by policy)
    pub fn draft(&self) -> Result<TransactionDraft, TransactionError> {
        let mut d = Decoder::new(&self.body);
        let entries = d
            .map()?
            .ok_or_else(|| TransactionError::Decoding("indefinite body".to_string()))?;

        let mut draft = TransactionDraft {
            metadata: self.metadata.clone(),
            native_scripts: self.witness_set.native_scripts.clone(),
            ..Default::default()
        };

        for _ in 0..entries {
            match d.u32()? {
                BODY_INPUTS => {
                    for _ in 0..definite_array(&mut d)? {
                        d.array()?;
                        let tx_hash = hex::encode(d.bytes()?);
                        draft.inputs.push(TxInput::new(tx_hash, d.u32()?));
                    }
                }
                BODY_OUTPUTS => {
                    for _ in 0..definite_array(&mut d)? {
                        draft.outputs.push(decode_output(&mut d)?);
                    }
                }
                BODY_FEE => draft.fee = d.u64()?,
                BODY_TTL => draft.ttl = Some(d.u64()?),
                _ => d.skip()?,
            }
        }

        Ok(draft)
    }
}

fn decode_output(d: &mut Decoder<'_>) -> Result<TxOutput, TransactionError> {
    if d.array()? != Some(2) {
        return Err(TransactionError::Decoding("unsupported output form".to_string()));
    }

    let address = Address::from_bytes(d.bytes()?)
        .map_err(|e| TransactionError::Decoding(e.to_string()))?;
    let mut output = TxOutput::new(address.to_bech32(), 0);

    if d.datatype()? != Type::Array {
        output.amount = d.u64()?;
        return Ok(output);
    }

    d.array()?;
    output.amount = d.u64()?;
    let policies = d
        .map()?
        .ok_or_else(|| TransactionError::Decoding("indefinite asset map".to_string()))?;
    for _ in 0..policies {
        let policy_id = hex::encode(d.bytes()?);
        let names = d
            .map()?
            .ok_or_else(|| TransactionError::Decoding("indefinite asset map".to_string()))?;
        for _ in 0..names {
            let name = d.bytes()?.to_vec();
            let quantity = d.u64()?;
            output
                .tokens
                .push(TokenAmount::new(Token::new(policy_id.clone(), name), quantity));
        }
    }

    Ok(output)
}

/// Dummy witness used when sizing a transaction before it is signed
pub(crate) fn placeholder_witness(seed: usize) -> Witness {
    let mut public_key = [0u8; KEY_SIZE];
    public_key[..8].copy_from_slice(&(seed as u64).to_be_bytes());
    Witness {
        public_key,
        signature: [0u8; SIGNATURE_SIZE],
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::token::Token;
    use crate::crypto::KeyPair;

    const ADDRESS: &str = "addr_test1wz4k6frsfd9q98rya6zjxtpcmzn83pwc8uyl9yqw25p8qqcx3e0c0";
    const POLICY: &str = "29d222ce763455e3d7a09a665ce554f00ac89d2e99a1a83d267170c6";

    fn sample_draft() -> TransactionDraft {
        TransactionDraft {
            inputs: vec![TxInput::new("ab".repeat(32), 1)],
            outputs: vec![TxOutput::new(ADDRESS, 1_000_000)],
            fee: 200_000,
            ttl: Some(1000),
            ..Default::default()
        }
    }

    #[test]
    fn test_body_encoding() {
        let draft = sample_draft();
        assert_eq!(
            hex::encode(draft.body_bytes().unwrap()),
            "a40081825820abababababababababababababababababababababababababababababababab01\
             018182581d70ab6d24704b4a029c64ee85232c38d8a67885d83f09f2900e550270031a000f4240\
             021a00030d40031903e8"
        );
        assert_eq!(
            draft.hash().unwrap(),
            "487d42b6c2397e1dec898e6aa136e84f44b9b67e5300edc0875e404259279b8b"
        );
    }

    #[test]
    fn test_envelope_encoding() {
        let raw = sample_draft().finalize().unwrap();
        let hex_tx = raw.to_hex().unwrap();
        assert!(hex_tx.starts_with("84a4"));
        assert!(hex_tx.ends_with("a0f5f6"));
        assert_eq!(raw.hash(), sample_draft().hash().unwrap());
    }

    #[test]
    fn test_multi_asset_value_encoding() {
        let output = TxOutput::new(ADDRESS, 2_000_000).with_tokens(vec![
            TokenAmount::new(Token::new(POLICY, b"AA".to_vec()), 7),
            TokenAmount::new(Token::new(POLICY, b"B".to_vec()), 2),
            TokenAmount::new(Token::new(POLICY, b"B".to_vec()), 3),
            TokenAmount::new(Token::new(POLICY, b"Z".to_vec()), 0),
        ]);

        let mut enc = Encoder::new(Vec::new());
        encode_output(&mut enc, &output).unwrap();
        let encoded = hex::encode(enc.into_writer());

        // [addr, [coin, {policy: {"B": 5, "AA": 7}}]]
        assert!(encoded.ends_with(
            "821a001e8480a1581c29d222ce763455e3d7a09a665ce554f00ac89d2e99a1a83d267170c6a241420542414107"
        ));
    }

    #[test]
    fn test_inputs_sorted_and_deduplicated() {
        let mut draft = sample_draft();
        draft.inputs = vec![
            TxInput::new("bb".repeat(32), 0),
            TxInput::new("aa".repeat(32), 2),
            TxInput::new("aa".repeat(32), 1),
            TxInput::new("bb".repeat(32), 0),
        ];

        let inputs = canonical_inputs(&draft.inputs).unwrap();
        assert_eq!(inputs.len(), 3);
        assert_eq!(inputs[0], ([0xaa; 32], 1));
        assert_eq!(inputs[1], ([0xaa; 32], 2));
        assert_eq!(inputs[2], ([0xbb; 32], 0));
    }

    #[test]
    fn test_invalid_input_and_output() {
        let mut draft = sample_draft();
        draft.inputs.push(TxInput::new("xyz", 0));
        assert!(matches!(draft.body_bytes(), Err(TransactionError::InvalidInput(_))));

        let mut draft = sample_draft();
        draft.outputs.push(TxOutput::new("not-an-address", 1));
        assert!(matches!(draft.body_bytes(), Err(TransactionError::InvalidOutput(_))));
    }

    #[test]
    fn test_metadata_hash_in_body() {
        let mut draft = sample_draft();
        let metadata = vec![0xa1, 0x01, 0x02];
        draft.metadata = Some(metadata.clone());

        let body = draft.body_bytes().unwrap();
        assert_eq!(body[0], 0xa5);
        assert!(body.ends_with(&blake2b_256(&metadata)));

        let raw = RawTransaction::from_bytes(&draft.to_bytes(&[]).unwrap()).unwrap();
        assert_eq!(raw.metadata(), Some(metadata.as_slice()));
        assert!(raw.to_bytes().unwrap().ends_with(&metadata));
    }

    #[test]
    fn test_raw_transaction_round_trip() {
        let mut draft = sample_draft();
        draft.native_scripts = vec![vec![0x82, 0x00, 0x41, 0x00]];
        draft.metadata = Some(vec![0xa0]);

        let kp = KeyPair::generate();
        let hash = draft.hash().unwrap();
        let witness = Witness::new(&kp, &hash).unwrap();
        let bytes = draft.to_bytes(&[witness.clone()]).unwrap();

        let raw = RawTransaction::from_bytes(&bytes).unwrap();
        assert_eq!(raw.hash(), hash);
        assert_eq!(raw.witness_set().vkey_witnesses(), &[witness]);
        assert_eq!(raw.witness_set().native_scripts, draft.native_scripts);
        assert_eq!(raw.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_draft_decoded_from_body() {
        let mut draft = sample_draft();
        draft.outputs.push(
            TxOutput::new(ADDRESS, 1_500_000)
                .with_tokens(vec![TokenAmount::new(Token::new(POLICY, b"AA".to_vec()), 9)]),
        );
        draft.metadata = Some(vec![0xa0]);

        let raw = draft.finalize().unwrap();
        assert_eq!(raw.draft().unwrap(), draft);
    }

    #[test]
    fn test_witness_set_deduplicates() {
        let kp = KeyPair::generate();
        let witness = Witness::new(&kp, &sample_draft().hash().unwrap()).unwrap();

        let mut set = WitnessSet::new();
        assert!(set.add_witness(witness.clone()));
        assert!(!set.add_witness(witness));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(RawTransaction::from_bytes(&[0x01]).is_err());
        assert!(RawTransaction::from_bytes(&[0x82, 0x01, 0x02]).is_err());
        assert!(RawTransaction::from_hex("zz").is_err());
    }

    #[test]
    fn test_output_size() {
        let output = TxOutput::new(ADDRESS, 1_000_000);
        // 1 (array) + 2 + 29 (address) + 5 (coin)
        assert_eq!(output.size().unwrap(), 37);
    }
}
