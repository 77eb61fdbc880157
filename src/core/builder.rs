//! Transaction builder
//!
//! [`TxBuilder`] assembles one transaction through a fixed sequence of states:
//!
//! ```text
//! Empty -> Configured -> Populated -> Sized -> Finalized -> Witnessed
//! ```
//!
//! * `configure` sets protocol parameters and the TTL (`Empty` only)
//! * `add_inputs`, `add_outputs`, `set_metadata` fill the draft
//! * `estimate_fee` measures the draft, `apply_fee` / `set_fee` settle it
//! * `build` produces the raw envelope and its id
//! * `sign` / `assemble_witnesses` attach witnesses
//!
//! Calling an operation outside its states fails with
//! [`BuilderError::Misuse`]. A builder serves exactly one transaction.

use crate::core::fee::{estimate_fee, LinearFee};
use crate::core::params::ProtocolParameters;
use crate::core::transaction::{
    RawTransaction, TransactionDraft, TransactionError, TxInput, TxOutput,
};
use crate::crypto::KeyError;
use crate::multisig::policy::{MultisigError, PolicyScript};
use crate::multisig::witness::{combine_witnesses, Witness};
use crate::provider::{ChainDataProvider, ProviderError};
use crate::wallet::signer::TxSigner;
use std::fmt;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Slots added to the current tip when no TTL increment is given
pub const DEFAULT_TTL_INCREMENT: u64 = 200;

// =============================================================================
// Error Types
// =============================================================================

/// Builder errors
#[derive(Error, Debug)]
pub enum BuilderError {
    #[error("Builder misuse: {operation} requires state {expected}, builder is {actual}")]
    Misuse {
        operation: &'static str,
        expected: String,
        actual: BuilderState,
    },
    #[error("Negative change in output {index}: {available} available, fee {fee}")]
    NegativeChange { index: usize, available: u64, fee: u64 },
    #[error("Change output {0} would be empty but still carries tokens")]
    ZeroChangeWithTokens(usize),
    #[error("Output index {index} out of range for {len} outputs")]
    OutputIndex { index: i64, len: usize },
    #[error("Output {0} carries tokens and cannot be removed")]
    OutputHasTokens(usize),
    #[error("Transaction has no inputs")]
    NoInputs,
    #[error("Transaction too large: {size} bytes, limit {limit}")]
    TooLarge { size: usize, limit: u64 },
    #[error("Provider error: {0}")]
    ProviderError(#[from] ProviderError),
    #[error("Transaction error: {0}")]
    TransactionError(#[from] TransactionError),
    #[error("Multisig error: {0}")]
    MultisigError(#[from] MultisigError),
    #[error("Signing error: {0}")]
    KeyError(#[from] KeyError),
}

// =============================================================================
// State
// =============================================================================

/// Lifecycle state of a [`TxBuilder`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderState {
    Empty,
    Configured,
    Populated,
    Sized,
    Finalized,
    Witnessed,
}

impl fmt::Display for BuilderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuilderState::Empty => "Empty",
            BuilderState::Configured => "Configured",
            BuilderState::Populated => "Populated",
            BuilderState::Sized => "Sized",
            BuilderState::Finalized => "Finalized",
            BuilderState::Witnessed => "Witnessed",
        };
        f.write_str(name)
    }
}

/// Builder settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderConfig {
    /// TTL increment used when `configure` is given zero
    pub ttl_increment: u64,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            ttl_increment: DEFAULT_TTL_INCREMENT,
        }
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Single-use transaction builder
#[derive(Debug)]
pub struct TxBuilder {
    state: BuilderState,
    config: BuilderConfig,
    params: Option<ProtocolParameters>,
    draft: TransactionDraft,
    scripts: Vec<PolicyScript>,
    raw: Option<RawTransaction>,
    signed: Option<Vec<u8>>,
}

impl Default for TxBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TxBuilder {
    pub fn new() -> Self {
        Self::with_config(BuilderConfig::default())
    }

    pub fn with_config(config: BuilderConfig) -> Self {
        Self {
            state: BuilderState::Empty,
            config,
            params: None,
            draft: TransactionDraft::new(),
            scripts: Vec::new(),
            raw: None,
            signed: None,
        }
    }

    pub fn state(&self) -> BuilderState {
        self.state
    }

    /// The transaction as assembled so far
    pub fn draft(&self) -> &TransactionDraft {
        &self.draft
    }

    pub fn protocol_parameters(&self) -> Option<&ProtocolParameters> {
        self.params.as_ref()
    }

    /// Id of the built transaction
    pub fn tx_hash(&self) -> Option<String> {
        self.raw.as_ref().map(RawTransaction::hash)
    }

    /// Signed envelope, once witnessed
    pub fn signed_bytes(&self) -> Option<&[u8]> {
        self.signed.as_deref()
    }

    fn expect_state(
        &self,
        operation: &'static str,
        allowed: &[BuilderState],
    ) -> Result<(), BuilderError> {
        if allowed.contains(&self.state) {
            return Ok(());
        }

        Err(BuilderError::Misuse {
            operation,
            expected: allowed
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" or "),
            actual: self.state,
        })
    }

    fn transition(&mut self, next: BuilderState) {
        if self.state != next {
            log::debug!("Builder {} -> {}", self.state, next);
            self.state = next;
        }
    }

    // ===== Configure =====

    /// Fetch protocol parameters and the tip, TTL = slot + `ttl_increment`
    /// (the configured default when zero)
    pub fn configure(
        &mut self,
        provider: &dyn ChainDataProvider,
        ttl_increment: u64,
    ) -> Result<&mut Self, BuilderError> {
        self.expect_state("configure", &[BuilderState::Empty])?;

        let params = provider.get_protocol_parameters()?;
        let tip = provider.get_tip()?;
        self.configure_with(params, tip.slot, ttl_increment)
    }

    /// Configure from already fetched data
    pub fn configure_with(
        &mut self,
        params: ProtocolParameters,
        current_slot: u64,
        ttl_increment: u64,
    ) -> Result<&mut Self, BuilderError> {
        self.expect_state("configure", &[BuilderState::Empty])?;

        let increment = if ttl_increment == 0 {
            self.config.ttl_increment
        } else {
            ttl_increment
        };
        self.draft.ttl = Some(current_slot.saturating_add(increment));
        self.params = Some(params);

        self.transition(BuilderState::Configured);
        Ok(self)
    }

    // ===== Populate =====

    const POPULATE: [BuilderState; 2] = [BuilderState::Configured, BuilderState::Populated];

    /// Add key-guarded inputs
    pub fn add_inputs(&mut self, inputs: &[TxInput]) -> Result<&mut Self, BuilderError> {
        self.expect_state("add_inputs", &Self::POPULATE)?;

        self.draft.inputs.extend_from_slice(inputs);
        self.transition(BuilderState::Populated);
        Ok(self)
    }

    /// Add inputs guarded by `script`; the script is attached to the witness set
    pub fn add_inputs_with_script(
        &mut self,
        inputs: &[TxInput],
        script: &PolicyScript,
    ) -> Result<&mut Self, BuilderError> {
        self.expect_state("add_inputs_with_script", &Self::POPULATE)?;

        if !self.scripts.contains(script) {
            self.draft.native_scripts.push(script.to_cbor()?);
            self.scripts.push(script.clone());
        }
        self.draft.inputs.extend_from_slice(inputs);

        self.transition(BuilderState::Populated);
        Ok(self)
    }

    pub fn add_outputs(&mut self, outputs: &[TxOutput]) -> Result<&mut Self, BuilderError> {
        self.expect_state("add_outputs", &Self::POPULATE)?;

        self.draft.outputs.extend_from_slice(outputs);
        self.transition(BuilderState::Populated);
        Ok(self)
    }

    /// Attach auxiliary data, verbatim
    pub fn set_metadata(&mut self, metadata: Vec<u8>) -> Result<&mut Self, BuilderError> {
        self.expect_state("set_metadata", &Self::POPULATE)?;

        self.draft.metadata = Some(metadata);
        self.transition(BuilderState::Populated);
        Ok(self)
    }

    // ===== Fee and change =====

    /// Minimum fee for the current draft. With `witness_count` zero the count
    /// is derived from the attached scripts (one key when there are none).
    pub fn estimate_fee(&self, witness_count: usize) -> Result<u64, BuilderError> {
        self.expect_state(
            "estimate_fee",
            &[BuilderState::Populated, BuilderState::Sized],
        )?;

        let witnesses = if witness_count == 0 {
            self.derived_witness_count()
        } else {
            witness_count
        };

        Ok(estimate_fee(&self.draft, witnesses, &self.linear_fee())?)
    }

    /// Witnesses needed when every signer of every attached script signs
    pub fn derived_witness_count(&self) -> usize {
        self.scripts.iter().map(PolicyScript::count).sum::<usize>().max(1)
    }

    fn linear_fee(&self) -> LinearFee {
        self.params
            .as_ref()
            .map(ProtocolParameters::linear_fee)
            .unwrap_or_else(|| ProtocolParameters::default().linear_fee())
    }

    /// Set the fee without touching outputs
    pub fn set_fee(&mut self, fee: u64) -> Result<&mut Self, BuilderError> {
        self.expect_state("set_fee", &[BuilderState::Populated])?;

        self.draft.fee = fee;
        self.transition(BuilderState::Sized);
        Ok(self)
    }

    /// Set the fee and take it out of the change output at `change_index`
    /// (negative means the last output)
    ///
    /// A change output left with nothing is removed when it carries no
    /// tokens.
    pub fn apply_fee(&mut self, fee: u64, change_index: i64) -> Result<&mut Self, BuilderError> {
        self.expect_state("apply_fee", &[BuilderState::Populated])?;

        let index = self.resolve_output(change_index)?;
        let output = &self.draft.outputs[index];

        if output.amount < fee {
            return Err(BuilderError::NegativeChange {
                index,
                available: output.amount,
                fee,
            });
        }

        let change = output.amount - fee;
        if change == 0 {
            if output.has_tokens() {
                return Err(BuilderError::ZeroChangeWithTokens(index));
            }
            log::debug!("Dropping empty change output {}", index);
            self.draft.outputs.remove(index);
        } else {
            self.draft.outputs[index].amount = change;
        }

        self.draft.fee = fee;
        log::info!("Fee {} applied, change {}", fee, change);

        self.transition(BuilderState::Sized);
        Ok(self)
    }

    /// Overwrite the native amount of an output (negative index: last output)
    pub fn update_output_amount(
        &mut self,
        index: i64,
        amount: u64,
    ) -> Result<&mut Self, BuilderError> {
        self.expect_state(
            "update_output_amount",
            &[BuilderState::Populated, BuilderState::Sized],
        )?;

        let index = self.resolve_output(index)?;
        self.draft.outputs[index].amount = amount;
        Ok(self)
    }

    /// Remove an output that carries no tokens (negative index: last output)
    pub fn remove_output(&mut self, index: i64) -> Result<&mut Self, BuilderError> {
        self.expect_state(
            "remove_output",
            &[BuilderState::Populated, BuilderState::Sized],
        )?;

        let index = self.resolve_output(index)?;
        if self.draft.outputs[index].has_tokens() {
            return Err(BuilderError::OutputHasTokens(index));
        }

        self.draft.outputs.remove(index);
        Ok(self)
    }

    fn resolve_output(&self, index: i64) -> Result<usize, BuilderError> {
        let len = self.draft.outputs.len();
        let resolved = if index < 0 {
            len.checked_sub(1)
        } else {
            Some(index as usize).filter(|i| *i < len)
        };

        resolved.ok_or(BuilderError::OutputIndex { index, len })
    }

    // ===== Finalize =====

    /// Serialize the transaction. Returns the raw envelope and its id.
    pub fn build(&mut self) -> Result<(Vec<u8>, String), BuilderError> {
        self.expect_state("build", &[BuilderState::Sized])?;

        if self.draft.inputs.is_empty() {
            return Err(BuilderError::NoInputs);
        }

        let before = self.draft.outputs.len();
        self.draft
            .outputs
            .retain(|output| output.amount > 0 || output.has_tokens());
        if self.draft.outputs.len() != before {
            log::debug!("Dropped {} empty outputs", before - self.draft.outputs.len());
        }

        let raw = self.draft.finalize()?;
        let bytes = raw.to_bytes()?;
        let hash = raw.hash();

        if let Some(params) = &self.params {
            if bytes.len() as u64 > params.max_tx_size {
                return Err(BuilderError::TooLarge {
                    size: bytes.len(),
                    limit: params.max_tx_size,
                });
            }
        }

        log::info!("Built transaction {} ({} bytes)", hash, bytes.len());
        self.raw = Some(raw);
        self.transition(BuilderState::Finalized);

        Ok((bytes, hash))
    }

    // ===== Witness =====

    /// Sign with every signer and return the signed envelope
    pub fn sign(&mut self, signers: &[&dyn TxSigner]) -> Result<Vec<u8>, BuilderError> {
        self.expect_state("sign", &[BuilderState::Finalized])?;

        let raw = self.finalized()?;
        let hash = hex::decode(raw.hash()).map_err(|e| TransactionError::Encoding(e.to_string()))?;

        let witnesses = signers
            .iter()
            .map(|signer| signer.create_witness(&hash))
            .collect::<Result<Vec<_>, _>>()?;

        self.assemble_witnesses(&witnesses)
    }

    /// Combine externally produced witnesses into the signed envelope
    pub fn assemble_witnesses(&mut self, witnesses: &[Witness]) -> Result<Vec<u8>, BuilderError> {
        self.expect_state("assemble_witnesses", &[BuilderState::Finalized])?;

        let raw = self.finalized()?.to_bytes()?;
        let signed = combine_witnesses(&raw, witnesses)?;

        self.signed = Some(signed.clone());
        self.transition(BuilderState::Witnessed);
        Ok(signed)
    }

    fn finalized(&self) -> Result<&RawTransaction, BuilderError> {
        self.raw.as_ref().ok_or(BuilderError::Misuse {
            operation: "witness",
            expected: BuilderState::Finalized.to_string(),
            actual: self.state,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
