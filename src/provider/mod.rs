//! Chain data provider interfaces
//!
//! The transaction engine never talks to the network itself. Everything it
//! needs from the chain (UTXOs, protocol parameters, the tip) and the final
//! submission go through these capability traits, which backends such as a
//! node CLI wrapper, an indexing API client or the bundled in-memory and
//! snapshot providers implement.

pub mod confirm;
pub mod memory;
pub mod snapshot;

use crate::core::params::{ProtocolParameters, Tip};
use crate::core::token::Utxo;
use thiserror::Error;

pub use confirm::{
    is_tx_in_utxos, wait_for_balance, wait_for_tx, Confirmation, ConfirmationError, RetryConfig,
};
pub use memory::MemoryProvider;
pub use snapshot::{ChainSnapshot, SnapshotProvider, SubmittedTx};

/// Errors reported by provider backends
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider unavailable: {0}")]
    Unavailable(String),
    #[error("Transaction rejected: {0}")]
    Rejected(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Protocol parameters and tip
pub trait ChainDataProvider {
    fn get_tip(&self) -> Result<Tip, ProviderError>;

    fn get_protocol_parameters(&self) -> Result<ProtocolParameters, ProviderError>;
}

/// UTXO lookup by address
pub trait UtxoProvider {
    /// UTXOs at `address`; an address with nothing on it yields an empty list
    fn get_utxos(&self, address: &str) -> Result<Vec<Utxo>, ProviderError>;
}

/// Submission of signed transactions
pub trait TxSubmitter {
    /// Submit the CBOR envelope of a signed transaction
    fn submit_tx(&self, signed_tx: &[u8]) -> Result<(), ProviderError>;
}

/// Transaction lookup used while waiting for confirmation
pub trait TxRetriever {
    /// The provider's record of a transaction, `None` if not seen yet
    fn get_tx_by_hash(&self, hash: &str) -> Result<Option<serde_json::Value>, ProviderError>;
}

/// A backend offering everything needed to build and submit transactions
pub trait Provider: ChainDataProvider + UtxoProvider + TxSubmitter {}

impl<T: ChainDataProvider + UtxoProvider + TxSubmitter> Provider for T {}
