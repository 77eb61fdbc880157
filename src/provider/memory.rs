//! In-memory provider
//!
//! Holds UTXOs per address, protocol parameters and a tip. Submitted
//! transactions are applied immediately: their inputs are spent and their
//! outputs become new UTXOs, so balance and confirmation polling can be
//! exercised without a node.

use super::{ChainDataProvider, ProviderError, TxRetriever, TxSubmitter, UtxoProvider};
use crate::core::params::{ProtocolParameters, Tip};
use crate::core::token::Utxo;
use crate::core::transaction::RawTransaction;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct LedgerState {
    params: ProtocolParameters,
    tip: Tip,
    utxos: BTreeMap<String, Vec<Utxo>>,
    transactions: BTreeMap<String, serde_json::Value>,
    submitted: Vec<Vec<u8>>,
    unavailable: bool,
    hold_submissions: bool,
}

/// Provider backed by an in-memory UTXO set
#[derive(Debug, Default)]
pub struct MemoryProvider {
    state: Mutex<LedgerState>,
}

impl MemoryProvider {
    pub fn new(params: ProtocolParameters, tip: Tip) -> Self {
        Self {
            state: Mutex::new(LedgerState {
                params,
                tip,
                ..Default::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Builder-style variant of [`set_utxos`](Self::set_utxos)
    pub fn with_utxos(self, address: &str, utxos: Vec<Utxo>) -> Self {
        self.set_utxos(address, utxos);
        self
    }

    /// Replace the UTXOs at `address`
    pub fn set_utxos(&self, address: &str, utxos: Vec<Utxo>) {
        self.state().utxos.insert(address.to_string(), utxos);
    }

    pub fn add_utxo(&self, address: &str, utxo: Utxo) {
        self.state()
            .utxos
            .entry(address.to_string())
            .or_default()
            .push(utxo);
    }

    pub fn set_tip(&self, tip: Tip) {
        self.state().tip = tip;
    }

    pub fn set_protocol_parameters(&self, params: ProtocolParameters) {
        self.state().params = params;
    }

    /// Simulate an outage; every call fails with `Unavailable` while false
    pub fn set_available(&self, available: bool) {
        self.state().unavailable = !available;
    }

    /// Accept submissions without applying them to the UTXO set
    pub fn hold_submissions(&self, hold: bool) {
        self.state().hold_submissions = hold;
    }

    /// Every accepted submission, in order
    pub fn submitted(&self) -> Vec<Vec<u8>> {
        self.state().submitted.clone()
    }

    /// Addresses with at least one UTXO
    pub fn addresses(&self) -> Vec<String> {
        self.state()
            .utxos
            .iter()
            .filter(|(_, utxos)| !utxos.is_empty())
            .map(|(address, _)| address.clone())
            .collect()
    }

    fn check_available(state: &LedgerState) -> Result<(), ProviderError> {
        if state.unavailable {
            return Err(ProviderError::Unavailable("memory provider offline".to_string()));
        }
        Ok(())
    }
}

/// Spend the inputs of `tx` and add its outputs to `utxos`
pub(crate) fn apply_transaction(
    utxos: &mut BTreeMap<String, Vec<Utxo>>,
    tx: &RawTransaction,
) -> Result<(), ProviderError> {
    let draft = tx
        .draft()
        .map_err(|e| ProviderError::Rejected(e.to_string()))?;
    let hash = tx.hash();

    for input in &draft.inputs {
        let known = utxos
            .values()
            .flatten()
            .any(|utxo| utxo.tx_hash == input.tx_hash && utxo.index == input.index);
        if !known {
            return Err(ProviderError::Rejected(format!("unknown input {}", input)));
        }
    }

    for entries in utxos.values_mut() {
        entries.retain(|utxo| {
            !draft
                .inputs
                .iter()
                .any(|input| utxo.tx_hash == input.tx_hash && utxo.index == input.index)
        });
    }

    for (index, output) in draft.outputs.iter().enumerate() {
        let mut utxo = Utxo::new(hash.clone(), index as u32, output.amount);
        utxo.tokens = output.tokens.clone();
        utxos.entry(output.address.clone()).or_default().push(utxo);
    }

    Ok(())
}

impl ChainDataProvider for MemoryProvider {
    fn get_tip(&self) -> Result<Tip, ProviderError> {
        let state = self.state();
        Self::check_available(&state)?;
        Ok(state.tip.clone())
    }

    fn get_protocol_parameters(&self) -> Result<ProtocolParameters, ProviderError> {
        let state = self.state();
        Self::check_available(&state)?;
        Ok(state.params.clone())
    }
}

impl UtxoProvider for MemoryProvider {
    fn get_utxos(&self, address: &str) -> Result<Vec<Utxo>, ProviderError> {
        let state = self.state();
        Self::check_available(&state)?;
        Ok(state.utxos.get(address).cloned().unwrap_or_default())
    }
}

impl TxSubmitter for MemoryProvider {
    fn submit_tx(&self, signed_tx: &[u8]) -> Result<(), ProviderError> {
        let mut state = self.state();
        Self::check_available(&state)?;

        let tx = RawTransaction::from_bytes(signed_tx)
            .map_err(|e| ProviderError::Rejected(e.to_string()))?;
        let hash = tx.hash();
        if state.transactions.contains_key(&hash) {
            return Err(ProviderError::Rejected(format!("{} already submitted", hash)));
        }

        state.submitted.push(signed_tx.to_vec());
        if state.hold_submissions {
            log::info!("Held transaction {}", hash);
            return Ok(());
        }

        apply_transaction(&mut state.utxos, &tx)?;
        let record = json!({
            "hash": hash,
            "slot": state.tip.slot,
            "size": signed_tx.len(),
            "witnesses": tx.witness_set().len(),
        });
        state.transactions.insert(hash.clone(), record);

        log::info!("Applied transaction {} ({} bytes)", hash, signed_tx.len());
        Ok(())
    }
}

impl TxRetriever for MemoryProvider {
    fn get_tx_by_hash(&self, hash: &str) -> Result<Option<serde_json::Value>, ProviderError> {
        let state = self.state();
        Self::check_available(&state)?;
        Ok(state.transactions.get(hash).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transaction::{TransactionDraft, TxInput, TxOutput};

    const FROM: &str = "addr_test1wz4k6frsfd9q98rya6zjxtpcmzn83pwc8uyl9yqw25p8qqcx3e0c0";
    const TO: &str = "addr_test1wzfds6946357g9edzwd2d4ma50y8z57ezvuv8ffr8f96xfcctxdpr";

    fn provider() -> MemoryProvider {
        MemoryProvider::new(ProtocolParameters::default(), Tip::at_slot(10))
            .with_utxos(FROM, vec![Utxo::new("aa".repeat(32), 0, 5_000_000)])
    }

    fn transfer(input_hash: &str) -> Vec<u8> {
        TransactionDraft {
            inputs: vec![TxInput::new(input_hash, 0)],
            outputs: vec![TxOutput::new(TO, 2_000_000), TxOutput::new(FROM, 2_800_000)],
            fee: 200_000,
            ttl: Some(100),
            ..Default::default()
        }
        .to_bytes(&[])
        .unwrap()
    }

    #[test]
    fn test_queries() {
        let provider = provider();
        assert_eq!(provider.get_tip().unwrap().slot, 10);
        assert_eq!(provider.get_protocol_parameters().unwrap(), ProtocolParameters::default());
        assert_eq!(provider.get_utxos(FROM).unwrap().len(), 1);
        assert!(provider.get_utxos(TO).unwrap().is_empty());
        assert_eq!(provider.addresses(), vec![FROM.to_string()]);
    }

    #[test]
    fn test_unavailable() {
        let provider = provider();
        provider.set_available(false);
        assert!(matches!(provider.get_tip(), Err(ProviderError::Unavailable(_))));
        assert!(matches!(provider.get_utxos(FROM), Err(ProviderError::Unavailable(_))));

        provider.set_available(true);
        assert!(provider.get_tip().is_ok());
    }

    #[test]
    fn test_submit_applies_transaction() {
        let provider = provider();
        let tx = transfer(&"aa".repeat(32));
        let hash = RawTransaction::from_bytes(&tx).unwrap().hash();

        assert!(provider.get_tx_by_hash(&hash).unwrap().is_none());
        provider.submit_tx(&tx).unwrap();

        let received = provider.get_utxos(TO).unwrap();
        assert_eq!(received, vec![Utxo::new(hash.clone(), 0, 2_000_000)]);
        let change = provider.get_utxos(FROM).unwrap();
        assert_eq!(change, vec![Utxo::new(hash.clone(), 1, 2_800_000)]);

        let record = provider.get_tx_by_hash(&hash).unwrap().unwrap();
        assert_eq!(record["hash"], hash);
        assert_eq!(provider.submitted(), vec![tx.clone()]);

        // inputs are spent now
        assert!(matches!(provider.submit_tx(&tx), Err(ProviderError::Rejected(_))));
    }

    #[test]
    fn test_submit_rejects_unknown_input() {
        let provider = provider();
        assert!(matches!(
            provider.submit_tx(&transfer(&"bb".repeat(32))),
            Err(ProviderError::Rejected(_))
        ));
        assert!(matches!(
            provider.submit_tx(&[0x01, 0x02]),
            Err(ProviderError::Rejected(_))
        ));
    }

    #[test]
    fn test_held_submission() {
        let provider = provider();
        provider.hold_submissions(true);

        let tx = transfer(&"aa".repeat(32));
        provider.submit_tx(&tx).unwrap();
        assert_eq!(provider.submitted().len(), 1);
        assert!(provider.get_utxos(TO).unwrap().is_empty());
    }
}
