//! Confirmation polling
//!
//! After submission a transaction is only "done" once the provider reflects
//! it. These helpers poll with a bounded retry budget and an optional caller
//! deadline. Only transient provider failures are retried.

use super::{ProviderError, TxRetriever, UtxoProvider};
use crate::core::token::{Token, Utxo};
use chrono::{DateTime, Utc};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Confirmation errors
#[derive(Error, Debug)]
pub enum ConfirmationError {
    #[error("Not confirmed after {attempts} attempts")]
    Timeout { attempts: u32 },
    #[error("Deadline exceeded while waiting for confirmation")]
    DeadlineExceeded,
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Polling budget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 60,
            interval: Duration::from_secs(2),
        }
    }
}

/// Result of a successful poll
#[derive(Debug, Clone, PartialEq)]
pub struct Confirmation<T> {
    pub value: T,
    pub attempts: u32,
    pub confirmed_at: DateTime<Utc>,
}

fn is_transient(error: &ProviderError) -> bool {
    matches!(error, ProviderError::Unavailable(_) | ProviderError::Io(_))
}

fn poll<T>(
    config: &RetryConfig,
    deadline: Option<Instant>,
    what: &str,
    mut probe: impl FnMut() -> Result<Option<T>, ProviderError>,
) -> Result<Confirmation<T>, ConfirmationError> {
    for attempt in 1..=config.max_attempts {
        if deadline.map_or(false, |d| Instant::now() >= d) {
            return Err(ConfirmationError::DeadlineExceeded);
        }

        match probe() {
            Ok(Some(value)) => {
                log::info!("{} confirmed after {} attempts", what, attempt);
                return Ok(Confirmation {
                    value,
                    attempts: attempt,
                    confirmed_at: Utc::now(),
                });
            }
            Ok(None) => log::debug!("{} not visible yet (attempt {})", what, attempt),
            Err(e) if is_transient(&e) => log::warn!("{}: {} (attempt {})", what, e, attempt),
            Err(e) => return Err(e.into()),
        }

        if attempt < config.max_attempts {
            if let Some(d) = deadline {
                if Instant::now() + config.interval > d {
                    return Err(ConfirmationError::DeadlineExceeded);
                }
            }
            thread::sleep(config.interval);
        }
    }

    Err(ConfirmationError::Timeout {
        attempts: config.max_attempts,
    })
}

fn balance_of(utxos: &[Utxo], token: &Token) -> u64 {
    utxos
        .iter()
        .fold(0u64, |acc, utxo| acc.saturating_add(utxo.token_amount(token)))
}

/// Wait until the balance of `token` at `address` reaches `expected`
pub fn wait_for_balance(
    provider: &dyn UtxoProvider,
    address: &str,
    token: &Token,
    expected: u64,
    config: &RetryConfig,
    deadline: Option<Instant>,
) -> Result<Confirmation<u64>, ConfirmationError> {
    let what = format!("Balance of {} at {}", token, address);
    poll(config, deadline, &what, || {
        let balance = balance_of(&provider.get_utxos(address)?, token);
        Ok((balance >= expected).then_some(balance))
    })
}

/// Wait until the provider knows the transaction `hash`
pub fn wait_for_tx(
    provider: &dyn TxRetriever,
    hash: &str,
    config: &RetryConfig,
    deadline: Option<Instant>,
) -> Result<Confirmation<serde_json::Value>, ConfirmationError> {
    let what = format!("Transaction {}", hash);
    poll(config, deadline, &what, || provider.get_tx_by_hash(hash))
}

/// True when one of `utxos` was created by transaction `hash`
pub fn is_tx_in_utxos(hash: &str, utxos: &[Utxo]) -> bool {
    utxos.iter().any(|utxo| utxo.tx_hash.eq_ignore_ascii_case(hash))
}
