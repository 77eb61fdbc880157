//! Core transaction engine
//!
//! This module contains the fundamental building blocks:
//! - Value model (tokens, UTXOs, multi-asset sums)
//! - Shelley addresses
//! - Protocol parameters and chain tip
//! - Transaction draft, witness set and CBOR envelope
//! - Transaction metadata
//! - Multi-asset coin selection
//! - Fee estimation
//! - Transaction builder

pub mod address;
pub mod builder;
pub mod fee;
pub mod metadata;
pub mod params;
pub mod selection;
pub mod token;
pub mod transaction;

pub use address::{Address, AddressError, NetworkId, KEY_HASH_SIZE};
pub use builder::{BuilderConfig, BuilderError, BuilderState, TxBuilder, DEFAULT_TTL_INCREMENT};
pub use fee::{estimate_fee, estimate_size, min_utxo_value, LinearFee, FEE_PLACEHOLDER};
pub use metadata::{metadata_from_json, metadata_from_json_str, MetadataError};
pub use params::{ProtocolParameters, Tip};
pub use selection::{
    select_all, select_for_amount, select_utxos, SelectionError, SelectionResult,
    DEFAULT_MAX_INPUTS, DEFAULT_MIN_INPUTS,
};
pub use token::{
    format_sums, outputs_sum, sums_difference, tokens_from_sums, utxos_sum, Token, TokenAmount,
    TokenError, TokenSums, Utxo, NATIVE_TOKEN_NAME,
};
pub use transaction::{
    RawTransaction, TransactionDraft, TransactionError, TxInput, TxOutput, WitnessSet,
};
