//! JSON snapshot provider
//!
//! A snapshot is a JSON file holding protocol parameters, the tip, UTXOs per
//! address and an outbox of submitted transactions. It lets the CLI build and
//! sign transactions offline; the outbox can be relayed later by any tool
//! that talks to a node.

use super::memory::apply_transaction;
use super::{ChainDataProvider, ProviderError, TxRetriever, TxSubmitter, UtxoProvider};
use crate::core::params::{ProtocolParameters, Tip};
use crate::core::token::Utxo;
use crate::core::transaction::RawTransaction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A submitted transaction waiting in the outbox
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedTx {
    pub hash: String,
    pub cbor_hex: String,
    pub submitted_at: DateTime<Utc>,
}

/// Persisted chain data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainSnapshot {
    pub protocol_parameters: ProtocolParameters,
    pub tip: Tip,
    #[serde(default)]
    pub utxos: BTreeMap<String, Vec<Utxo>>,
    #[serde(default)]
    pub outbox: Vec<SubmittedTx>,
}

impl ChainSnapshot {
    pub fn new(protocol_parameters: ProtocolParameters, tip: Tip) -> Self {
        Self {
            protocol_parameters,
            tip,
            ..Default::default()
        }
    }

    /// Load a snapshot file
    pub fn load(path: &Path) -> Result<Self, ProviderError> {
        let file = fs::File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Write the snapshot through a temporary file and an atomic rename
    pub fn save(&self, path: &Path) -> Result<(), ProviderError> {
        let temp_path = path.with_extension("tmp");
        let file = fs::File::create(&temp_path)?;
        let writer = BufWriter::new(file);

        serde_json::to_writer_pretty(writer, self)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }
}

/// Provider reading and writing a [`ChainSnapshot`] file
#[derive(Debug)]
pub struct SnapshotProvider {
    path: PathBuf,
    snapshot: Mutex<ChainSnapshot>,
}

impl SnapshotProvider {
    /// Open an existing snapshot
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ProviderError> {
        let path = path.into();
        let snapshot = ChainSnapshot::load(&path)?;

        log::debug!(
            "Loaded snapshot {} at slot {} ({} addresses)",
            path.display(),
            snapshot.tip.slot,
            snapshot.utxos.len()
        );

        Ok(Self {
            path,
            snapshot: Mutex::new(snapshot),
        })
    }

    /// Write `snapshot` to `path` and open it
    pub fn create(
        path: impl Into<PathBuf>,
        snapshot: ChainSnapshot,
    ) -> Result<Self, ProviderError> {
        let path = path.into();
        snapshot.save(&path)?;

        Ok(Self {
            path,
            snapshot: Mutex::new(snapshot),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn snapshot(&self) -> MutexGuard<'_, ChainSnapshot> {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current snapshot
    pub fn to_snapshot(&self) -> ChainSnapshot {
        self.snapshot().clone()
    }

    /// Submitted transactions, oldest first
    pub fn outbox(&self) -> Vec<SubmittedTx> {
        self.snapshot().outbox.clone()
    }
}

impl ChainDataProvider for SnapshotProvider {
    fn get_tip(&self) -> Result<Tip, ProviderError> {
        Ok(self.snapshot().tip.clone())
    }

    fn get_protocol_parameters(&self) -> Result<ProtocolParameters, ProviderError> {
        Ok(self.snapshot().protocol_parameters.clone())
    }
}

impl UtxoProvider for SnapshotProvider {
    fn get_utxos(&self, address: &str) -> Result<Vec<Utxo>, ProviderError> {
        Ok(self.snapshot().utxos.get(address).cloned().unwrap_or_default())
    }
}

impl TxSubmitter for SnapshotProvider {
    /// Apply the transaction to the snapshot, queue it in the outbox and
    /// persist the file
    fn submit_tx(&self, signed_tx: &[u8]) -> Result<(), ProviderError> {
        let tx = RawTransaction::from_bytes(signed_tx)
            .map_err(|e| ProviderError::Rejected(e.to_string()))?;
        let hash = tx.hash();

        let mut snapshot = self.snapshot();
        if snapshot.outbox.iter().any(|queued| queued.hash == hash) {
            return Err(ProviderError::Rejected(format!("{} already submitted", hash)));
        }

        let mut utxos = snapshot.utxos.clone();
        apply_transaction(&mut utxos, &tx)?;

        let mut updated = snapshot.clone();
        updated.utxos = utxos;
        updated.outbox.push(SubmittedTx {
            hash: hash.clone(),
            cbor_hex: hex::encode(signed_tx),
            submitted_at: Utc::now(),
        });
        updated.save(&self.path)?;
        *snapshot = updated;

        log::info!("Queued transaction {} in {}", hash, self.path.display());
        Ok(())
    }
}

impl TxRetriever for SnapshotProvider {
    fn get_tx_by_hash(&self, hash: &str) -> Result<Option<serde_json::Value>, ProviderError> {
        let snapshot = self.snapshot();
        match snapshot.outbox.iter().find(|queued| queued.hash == hash) {
            Some(queued) => Ok(Some(serde_json::to_value(queued)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transaction::{TransactionDraft, TxInput, TxOutput};

    const FROM: &str = "addr_test1wz4k6frsfd9q98rya6zjxtpcmzn83pwc8uyl9yqw25p8qqcx3e0c0";
    const TO: &str = "addr_test1wzfds6946357g9edzwd2d4ma50y8z57ezvuv8ffr8f96xfcctxdpr";

    fn snapshot() -> ChainSnapshot {
        let mut snapshot = ChainSnapshot::new(ProtocolParameters::default(), Tip::at_slot(42));
        snapshot
            .utxos
            .insert(FROM.to_string(), vec![Utxo::new("aa".repeat(32), 0, 5_000_000)]);
        snapshot
    }

    #[test]
    fn test_save_load_snapshot() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("chain.json");

        let snapshot = snapshot();
        snapshot.save(&path).unwrap();
        assert_eq!(ChainSnapshot::load(&path).unwrap(), snapshot);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            SnapshotProvider::open(temp_dir.path().join("missing.json")),
            Err(ProviderError::Io(_))
        ));
    }

    #[test]
    fn test_parameters_use_cli_names() {
        let json = r#"{
            "protocolParameters": {"txFeeFixed": 1, "txFeePerByte": 2},
            "tip": {"slot": 7}
        }"#;
        let snapshot: ChainSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.protocol_parameters.tx_fee_per_byte, 2);
        assert_eq!(snapshot.tip.slot, 7);
        assert!(snapshot.utxos.is_empty());
    }

    #[test]
    fn test_submit_persists_outbox() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("chain.json");
        let provider = SnapshotProvider::create(&path, snapshot()).unwrap();

        let tx = TransactionDraft {
            inputs: vec![TxInput::new("aa".repeat(32), 0)],
            outputs: vec![TxOutput::new(TO, 4_800_000)],
            fee: 200_000,
            ttl: Some(100),
            ..Default::default()
        }
        .to_bytes(&[])
        .unwrap();
        let hash = RawTransaction::from_bytes(&tx).unwrap().hash();

        provider.submit_tx(&tx).unwrap();
        assert!(provider.get_utxos(FROM).unwrap().is_empty());
        assert_eq!(provider.get_utxos(TO).unwrap()[0].amount, 4_800_000);
        assert!(provider.get_tx_by_hash(&hash).unwrap().is_some());

        let reopened = SnapshotProvider::open(&path).unwrap();
        assert_eq!(reopened.outbox().len(), 1);
        assert_eq!(reopened.outbox()[0].cbor_hex, hex::encode(&tx));
        assert_eq!(reopened.get_tip().unwrap().slot, 42);
        assert!(matches!(reopened.submit_tx(&tx), Err(ProviderError::Rejected(_))));
    }
}
