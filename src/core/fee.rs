//! Fee Estimation
//!
//! Shelley fees are linear in the serialized size of the signed transaction:
//! `fee = fixed + per_byte * size`. The size is measured on the draft with
//! placeholder witnesses and a placeholder fee wide enough that the real fee
//! can never encode longer.

use crate::core::params::ProtocolParameters;
use crate::core::transaction::{placeholder_witness, TransactionDraft, TransactionError, TxOutput};
use serde::{Deserialize, Serialize};

// =============================================================================
// Constants
// =============================================================================

/// Fee value used while measuring a draft (five byte CBOR encoding)
pub const FEE_PLACEHOLDER: u64 = u32::MAX as u64;

/// Per-entry overhead added to an output's size for the minimum UTxO value
pub const UTXO_ENTRY_OVERHEAD: u64 = 160;

// =============================================================================
// Linear Fee
// =============================================================================

/// Linear fee coefficients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearFee {
    pub fixed: u64,
    pub per_byte: u64,
}

impl LinearFee {
    pub fn new(fixed: u64, per_byte: u64) -> Self {
        Self { fixed, per_byte }
    }

    /// Fee for a transaction of the given size
    pub fn fee_for_size(&self, size_bytes: usize) -> u64 {
        self.per_byte
            .saturating_mul(size_bytes as u64)
            .saturating_add(self.fixed)
    }
}

// =============================================================================
// Estimation
// =============================================================================

/// Size of the signed transaction once `witness_count` keys have signed
pub fn estimate_size(
    draft: &TransactionDraft,
    witness_count: usize,
) -> Result<usize, TransactionError> {
    let mut sized = draft.clone();
    sized.fee = FEE_PLACEHOLDER;

    let witnesses: Vec<_> = (0..witness_count).map(placeholder_witness).collect();
    Ok(sized.to_bytes(&witnesses)?.len())
}

/// Minimum fee for `draft` signed by `witness_count` keys
///
/// The draft is not modified, so repeated calls give the same result.
pub fn estimate_fee(
    draft: &TransactionDraft,
    witness_count: usize,
    fee: &LinearFee,
) -> Result<u64, TransactionError> {
    let size = estimate_size(draft, witness_count)?;
    let amount = fee.fee_for_size(size);

    log::debug!(
        "Estimated fee {} for {} bytes with {} witnesses",
        amount,
        size,
        witness_count
    );

    Ok(amount)
}

/// Smallest native amount the ledger accepts for `output`
pub fn min_utxo_value(
    output: &TxOutput,
    params: &ProtocolParameters,
) -> Result<u64, TransactionError> {
    let size = output.size()? as u64;
    Ok((UTXO_ENTRY_OVERHEAD + size).saturating_mul(params.utxo_cost_per_byte))
}

// =============================================================================
// Tests
// =============================================================================
