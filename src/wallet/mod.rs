//! Wallet module for keys, signing and payment flows

pub mod send;
pub mod signer;
pub mod wallet;

pub use send::{
    create_multisig_tx, create_tx, sign_tx, submit_and_wait, PreparedTx, SendConfig,
    DEFAULT_MIN_UTXO_VALUE, DEFAULT_POTENTIAL_FEE,
};
pub use signer::TxSigner;
pub use wallet::{load_verification_key, TextEnvelope, Wallet, WalletError, WalletInfo};
