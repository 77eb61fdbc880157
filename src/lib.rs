//! Cardano wallet transactions: build, sign and submit Babbage-era payments
//!
//! This crate provides:
//! - Multi-asset coin selection with min/max input bounds
//! - Linear fee estimation and minimum UTXO values
//! - A staged transaction builder with TTL, metadata and change handling
//! - M-of-N native policy scripts and witness collection
//! - Provider traits plus in-memory and JSON snapshot providers
//! - Payment key files and single or multisig send flows
//!
//! # Example
//!
//! ```rust
//! use cardano_wallet_tx::core::{NetworkId, ProtocolParameters, Tip, Utxo};
//! use cardano_wallet_tx::provider::MemoryProvider;
//! use cardano_wallet_tx::wallet::{create_tx, SendConfig, Wallet};
//!
//! let wallet = Wallet::new(NetworkId::Testnet);
//! let sender = wallet.address_string().unwrap();
//!
//! let provider = MemoryProvider::new(ProtocolParameters::default(), Tip::at_slot(1_000))
//!     .with_utxos(&sender, vec![Utxo::new("aa".repeat(32), 0, 10_000_000)]);
//!
//! let receiver = Wallet::new(NetworkId::Testnet).address_string().unwrap();
//! let tx = create_tx(&provider, &wallet, &sender, &receiver, 2_000_000, None, &SendConfig::default())
//!     .unwrap();
//! println!("Transaction {} pays a fee of {}", tx.hash, tx.fee);
//! ```

pub mod cli;
pub mod core;
pub mod crypto;
pub mod multisig;
pub mod provider;
pub mod wallet;

// Re-export commonly used types
pub use core::{
    Address, NetworkId, ProtocolParameters, Tip, Token, TxBuilder, Utxo, DEFAULT_TTL_INCREMENT,
};
pub use crypto::KeyPair;
pub use multisig::{PolicyScript, Witness, WitnessCollector};
pub use provider::{ChainDataProvider, MemoryProvider, SnapshotProvider, TxSubmitter, UtxoProvider};
pub use wallet::{create_multisig_tx, create_tx, TxSigner, Wallet};
