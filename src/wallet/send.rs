//! Payment flows
//!
//! Ties selection, the builder and witnessing together:
//!
//! - [`create_tx`]: single key payment with change back to the sender
//! - [`create_multisig_tx`]: payment out of a script address, with the fee
//!   paid by a second script address
//! - [`sign_tx`]: witnesses from any number of signers
//! - [`submit_and_wait`]: submission followed by balance polling

use super::signer::TxSigner;
use super::wallet::WalletError;
use crate::core::address::NetworkId;
use crate::core::builder::{BuilderConfig, TxBuilder, DEFAULT_TTL_INCREMENT};
use crate::core::selection::{select_utxos, SelectionResult, DEFAULT_MAX_INPUTS, DEFAULT_MIN_INPUTS};
use crate::core::token::{tokens_from_sums, utxos_sum, Token, TokenSums, Utxo};
use crate::core::transaction::{RawTransaction, TransactionError, TxOutput};
use crate::multisig::policy::PolicyScript;
use crate::multisig::witness::combine_witnesses;
use crate::provider::{
    wait_for_balance, ChainDataProvider, Confirmation, RetryConfig, TxSubmitter, UtxoProvider,
};
use std::time::Instant;

/// Fee reserved during selection, before the real fee is known
pub const DEFAULT_POTENTIAL_FEE: u64 = 300_000;

/// Native amount reserved for change outputs during selection
pub const DEFAULT_MIN_UTXO_VALUE: u64 = 1_000_000;

/// Settings shared by the payment flows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendConfig {
    pub potential_fee: u64,
    pub min_utxo_value: u64,
    pub max_inputs: usize,
    pub min_inputs: usize,
    pub ttl_increment: u64,
}

impl Default for SendConfig {
    fn default() -> Self {
        Self {
            potential_fee: DEFAULT_POTENTIAL_FEE,
            min_utxo_value: DEFAULT_MIN_UTXO_VALUE,
            max_inputs: DEFAULT_MAX_INPUTS,
            min_inputs: DEFAULT_MIN_INPUTS,
            ttl_increment: DEFAULT_TTL_INCREMENT,
        }
    }
}

impl SendConfig {
    fn builder(&self) -> TxBuilder {
        TxBuilder::with_config(BuilderConfig {
            ttl_increment: self.ttl_increment,
        })
    }

    fn select(&self, utxos: &[Utxo], native: u64) -> Result<SelectionResult, WalletError> {
        let desired = TokenSums::from([(Token::native(), native)]);
        Ok(select_utxos(utxos, &desired, self.max_inputs, self.min_inputs)?)
    }
}

/// A built transaction and its id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTx {
    pub bytes: Vec<u8>,
    pub hash: String,
    pub fee: u64,
}

fn checked_sub(available: u64, spent: u64) -> Result<u64, WalletError> {
    available.checked_sub(spent).ok_or_else(|| {
        TransactionError::InvalidOutput(format!("{} spent out of {}", spent, available)).into()
    })
}

/// Pay `amount` from the signer's `sender` address to `receiver`, returning
/// the signed transaction
///
/// Every token carried by the selected inputs goes back to the sender with
/// the change.
#[allow(clippy::too_many_arguments)]
pub fn create_tx<P: ChainDataProvider + UtxoProvider>(
    provider: &P,
    signer: &dyn TxSigner,
    sender: &str,
    receiver: &str,
    amount: u64,
    metadata: Option<Vec<u8>>,
    config: &SendConfig,
) -> Result<PreparedTx, WalletError> {
    let mut builder = config.builder();
    builder.configure(provider, 0)?;

    let utxos = provider.get_utxos(sender)?;
    let selection = config.select(
        &utxos,
        amount
            .saturating_add(config.potential_fee)
            .saturating_add(config.min_utxo_value),
    )?;

    let inputs_sum = selection.total(&Token::native());
    let change = TxOutput::new(sender, checked_sub(inputs_sum, amount)?)
        .with_tokens(tokens_from_sums(&selection.totals, &[]));

    builder
        .add_inputs(&selection.inputs)?
        .add_outputs(&[TxOutput::new(receiver, amount), change])?;
    if let Some(metadata) = metadata {
        builder.set_metadata(metadata)?;
    }

    let fee = builder.estimate_fee(1)?;
    builder.apply_fee(fee, -1)?;

    let (_, hash) = builder.build()?;
    let bytes = builder.sign(&[signer])?;

    log::info!("Prepared payment {} of {} to {} (fee {})", hash, amount, receiver, fee);
    Ok(PreparedTx { bytes, hash, fee })
}

/// Pay `amount` from the script address of `policy` to `receiver`, with the
/// fee taken from the script address of `fee_policy`
///
/// The result is unsigned; collect witnesses from the signers of both
/// policies and pass them to [`sign_tx`] or a
/// [`WitnessCollector`](crate::multisig::WitnessCollector).
#[allow(clippy::too_many_arguments)]
pub fn create_multisig_tx<P: ChainDataProvider + UtxoProvider>(
    provider: &P,
    policy: &PolicyScript,
    fee_policy: &PolicyScript,
    network: NetworkId,
    receiver: &str,
    amount: u64,
    metadata: Option<Vec<u8>>,
    config: &SendConfig,
) -> Result<PreparedTx, WalletError> {
    let address = policy.address(network)?.to_bech32();
    let fee_address = fee_policy.address(network)?.to_bech32();

    let mut builder = config.builder();
    builder.configure(provider, 0)?;

    let utxos = provider.get_utxos(&address)?;
    let selection = config.select(&utxos, amount.saturating_add(config.min_utxo_value))?;

    // the same address may fund both sides; never spend an input twice
    let fee_utxos: Vec<Utxo> = provider
        .get_utxos(&fee_address)?
        .into_iter()
        .filter(|utxo| !selection.inputs.contains(&utxo.input()))
        .collect();
    let fee_selection = config.select(
        &fee_utxos,
        config.potential_fee.saturating_add(config.min_utxo_value),
    )?;

    let change = TxOutput::new(
        address.as_str(),
        checked_sub(selection.total(&Token::native()), amount)?,
    )
    .with_tokens(tokens_from_sums(&selection.totals, &[]));
    let fee_change = TxOutput::new(
        fee_address.as_str(),
        fee_selection.total(&Token::native()),
    )
    .with_tokens(tokens_from_sums(&fee_selection.totals, &[]));

    builder
        .add_outputs(&[TxOutput::new(receiver, amount), change, fee_change])?
        .add_inputs_with_script(&selection.inputs, policy)?
        .add_inputs_with_script(&fee_selection.inputs, fee_policy)?;
    if let Some(metadata) = metadata {
        builder.set_metadata(metadata)?;
    }

    let fee = builder.estimate_fee(0)?;
    builder.apply_fee(fee, -1)?;

    let (bytes, hash) = builder.build()?;

    log::info!(
        "Prepared multisig payment {} of {} to {} (fee {}, {} witnesses expected)",
        hash,
        amount,
        receiver,
        fee,
        builder.derived_witness_count()
    );
    Ok(PreparedTx { bytes, hash, fee })
}

/// Witness `raw_tx` with every signer
pub fn sign_tx(raw_tx: &[u8], signers: &[&dyn TxSigner]) -> Result<Vec<u8>, WalletError> {
    let hash = RawTransaction::from_bytes(raw_tx)?.hash();
    let hash_bytes =
        hex::decode(&hash).map_err(|e| TransactionError::Decoding(e.to_string()))?;

    let witnesses = signers
        .iter()
        .map(|signer| signer.create_witness(&hash_bytes))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(combine_witnesses(raw_tx, &witnesses)?)
}

/// Submit `signed_tx` and wait until the balance of `token` at `address`
/// grew by at least `increment`
#[allow(clippy::too_many_arguments)]
pub fn submit_and_wait<P: UtxoProvider + TxSubmitter>(
    provider: &P,
    signed_tx: &[u8],
    address: &str,
    token: &Token,
    increment: u64,
    retry: &RetryConfig,
    deadline: Option<Instant>,
) -> Result<Confirmation<u64>, WalletError> {
    let before = utxos_sum(&provider.get_utxos(address)?)
        .get(token)
        .copied()
        .unwrap_or(0);

    provider.submit_tx(signed_tx)?;
    log::info!("Transaction submitted, waiting for {} at {}", token, address);

    Ok(wait_for_balance(
        provider,
        address,
        token,
        before.saturating_add(increment),
        retry,
        deadline,
    )?)
}
