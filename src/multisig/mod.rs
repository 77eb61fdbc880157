//! Threshold multisig support
//!
//! Native `atLeast` policy scripts, per-signer witnesses and the collection
//! of witnesses into a signed transaction.
//!
//! # Example
//!
//! ```ignore
//! use cardano_wallet_tx::multisig::{PolicyScript, WitnessCollector};
//!
//! // 2-of-3 policy over payment key hashes
//! let policy = PolicyScript::new(2, vec![hash1, hash2, hash3])?;
//! let address = policy.address(NetworkId::Testnet)?;
//!
//! // Collect witnesses for a finalized transaction
//! let mut collector = WitnessCollector::new(raw_tx, vec![policy])?;
//! collector.sign_with(&key1)?;
//! collector.sign_with(&key2)?;
//!
//! let signed = collector.finalize()?;
//! ```

pub mod collector;
pub mod policy;
pub mod witness;

pub use collector::{CollectedWitness, CollectorStatus, WitnessCollector};
pub use policy::{MultisigError, PolicyScript};
pub use witness::{combine_witnesses, create_witness, Witness};
