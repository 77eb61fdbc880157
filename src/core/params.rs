//! Protocol parameters and chain tip
//!
//! Both follow the JSON produced by `cardano-cli query protocol-parameters`
//! and `cardano-cli query tip`. Provider adapters translate their own schemas
//! into these shapes.

use crate::core::fee::LinearFee;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default maximum transaction size in bytes
pub const DEFAULT_MAX_TX_SIZE: u64 = 16_384;

/// Default cost per byte of a UTxO entry
pub const DEFAULT_UTXO_COST_PER_BYTE: u64 = 4_310;

/// Normalized protocol parameter bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolParameters {
    /// Constant part of the linear fee
    pub tx_fee_fixed: u64,
    /// Per-byte part of the linear fee
    pub tx_fee_per_byte: u64,
    #[serde(default = "default_max_tx_size")]
    pub max_tx_size: u64,
    #[serde(default = "default_utxo_cost_per_byte")]
    pub utxo_cost_per_byte: u64,
    /// Parameters this crate does not interpret, kept as-is
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn default_max_tx_size() -> u64 {
    DEFAULT_MAX_TX_SIZE
}

fn default_utxo_cost_per_byte() -> u64 {
    DEFAULT_UTXO_COST_PER_BYTE
}

impl ProtocolParameters {
    pub fn new(tx_fee_fixed: u64, tx_fee_per_byte: u64) -> Self {
        Self {
            tx_fee_fixed,
            tx_fee_per_byte,
            max_tx_size: DEFAULT_MAX_TX_SIZE,
            utxo_cost_per_byte: DEFAULT_UTXO_COST_PER_BYTE,
            extra: BTreeMap::new(),
        }
    }

    /// Parse the cardano-cli JSON form
    pub fn from_json(json: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Fee coefficients
    pub fn linear_fee(&self) -> LinearFee {
        LinearFee::new(self.tx_fee_fixed, self.tx_fee_per_byte)
    }
}

impl Default for ProtocolParameters {
    /// Mainnet values at the time of writing
    fn default() -> Self {
        Self::new(155_381, 44)
    }
}

/// Current chain tip
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Tip {
    pub block: u64,
    pub epoch: u64,
    pub era: String,
    pub hash: String,
    pub slot: u64,
    pub slot_in_epoch: u64,
    pub slots_to_epoch_end: u64,
    pub sync_progress: String,
}

impl Tip {
    pub fn at_slot(slot: u64) -> Self {
        Self {
            slot,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cli_parameters() {
        let json = br#"{
            "txFeeFixed": 155381,
            "txFeePerByte": 44,
            "maxTxSize": 16384,
            "utxoCostPerByte": 4310,
            "protocolVersion": {"major": 9, "minor": 0},
            "maxValueSize": 5000
        }"#;

        let params = ProtocolParameters::from_json(json).unwrap();
        assert_eq!(params.tx_fee_fixed, 155_381);
        assert_eq!(params.tx_fee_per_byte, 44);
        assert_eq!(params.extra["maxValueSize"], 5000);
        assert_eq!(params.linear_fee(), LinearFee::new(155_381, 44));
    }

    #[test]
    fn test_parameters_defaults_and_round_trip() {
        let params = ProtocolParameters::from_json(br#"{"txFeeFixed": 1, "txFeePerByte": 2}"#)
            .unwrap();
        assert_eq!(params.max_tx_size, DEFAULT_MAX_TX_SIZE);
        assert_eq!(params.utxo_cost_per_byte, DEFAULT_UTXO_COST_PER_BYTE);

        let json = params.to_json().unwrap();
        assert_eq!(ProtocolParameters::from_json(json.as_bytes()).unwrap(), params);

        assert!(ProtocolParameters::from_json(b"{}").is_err());
    }

    #[test]
    fn test_parse_tip() {
        let json = r#"{
            "block": 1460093,
            "epoch": 98,
            "era": "Babbage",
            "hash": "c1b4b9b1f6f1d0e8",
            "slot": 8466840,
            "slotInEpoch": 18840,
            "slotsToEpochEnd": 67560,
            "syncProgress": "100.00"
        }"#;

        let tip: Tip = serde_json::from_str(json).unwrap();
        assert_eq!(tip.slot, 8_466_840);
        assert_eq!(tip.slot_in_epoch, 18_840);
        assert_eq!(tip.era, "Babbage");

        let partial: Tip = serde_json::from_str(r#"{"slot": 5}"#).unwrap();
        assert_eq!(partial, Tip::at_slot(5));
    }
}
