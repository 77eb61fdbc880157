//! Single-key wallet
//!
//! Holds one ed25519 payment key, derives its enterprise address and reads
//! and writes cardano-cli text envelope key files.

use crate::core::address::{Address, AddressError, NetworkId};
use crate::core::builder::BuilderError;
use crate::core::selection::SelectionError;
use crate::core::token::{utxos_sum, TokenError, TokenSums, Utxo};
use crate::core::transaction::TransactionError;
use crate::crypto::{KeyError, KeyPair, CBOR_KEY_PREFIX, KEY_SIZE};
use crate::multisig::policy::MultisigError;
use crate::multisig::witness::Witness;
use crate::provider::{ConfirmationError, ProviderError, UtxoProvider};
use crate::wallet::signer::TxSigner;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Text envelope type of payment signing keys
pub const SIGNING_KEY_TYPE: &str = "PaymentSigningKeyShelley_ed25519";

/// Text envelope type of payment verification keys
pub const VERIFICATION_KEY_TYPE: &str = "PaymentVerificationKeyShelley_ed25519";

/// Wallet-related errors
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Selection error: {0}")]
    SelectionError(#[from] SelectionError),
    #[error("Builder error: {0}")]
    BuilderError(#[from] BuilderError),
    #[error("Provider error: {0}")]
    ProviderError(#[from] ProviderError),
    #[error("Multisig error: {0}")]
    MultisigError(#[from] MultisigError),
    #[error("Confirmation error: {0}")]
    ConfirmationError(#[from] ConfirmationError),
    #[error("Transaction error: {0}")]
    TransactionError(#[from] TransactionError),
    #[error("Address error: {0}")]
    AddressError(#[from] AddressError),
    #[error("Token error: {0}")]
    TokenError(#[from] TokenError),
    #[error("Invalid key file: {0}")]
    InvalidKeyFile(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Crypto error: {0}")]
    CryptoError(#[from] KeyError),
}

/// cardano-cli text envelope, used for key files and signed transactions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextEnvelope {
    #[serde(rename = "type")]
    pub envelope_type: String,
    pub description: String,
    pub cbor_hex: String,
}

impl TextEnvelope {
    pub fn new(envelope_type: &str, description: &str, cbor_hex: String) -> Self {
        Self {
            envelope_type: envelope_type.to_string(),
            description: description.to_string(),
            cbor_hex,
        }
    }

    pub fn read(path: &Path) -> Result<Self, WalletError> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn write(&self, path: &Path) -> Result<(), WalletError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// A payment key and the network its address lives on
pub struct Wallet {
    key_pair: KeyPair,
    network: NetworkId,
    /// Optional label for the wallet
    pub label: Option<String>,
}

impl Wallet {
    /// Create a new wallet with a fresh key pair
    pub fn new(network: NetworkId) -> Self {
        Self::from_key_pair(KeyPair::generate(), network)
    }

    pub fn from_key_pair(key_pair: KeyPair, network: NetworkId) -> Self {
        Self {
            key_pair,
            network,
            label: None,
        }
    }

    /// Import a signing key given as raw or CBOR wrapped hex
    pub fn from_signing_key_hex(hex_key: &str, network: NetworkId) -> Result<Self, WalletError> {
        let key_pair = KeyPair::from_signing_key_hex(hex_key)?;
        Ok(Self::from_key_pair(key_pair, network))
    }

    pub fn network(&self) -> NetworkId {
        self.network
    }

    pub fn key_pair(&self) -> &KeyPair {
        &self.key_pair
    }

    /// Enterprise address of the payment key
    pub fn address(&self) -> Result<Address, WalletError> {
        Ok(Address::enterprise(self.network, &self.key_pair.key_hash())?)
    }

    /// Bech32 enterprise address
    pub fn address_string(&self) -> Result<String, WalletError> {
        Ok(self.address()?.to_bech32())
    }

    /// Payment key hash (hex)
    pub fn key_hash(&self) -> String {
        self.key_pair.key_hash_hex()
    }

    /// Verification key (hex)
    pub fn public_key(&self) -> String {
        self.key_pair.public_key_hex()
    }

    /// UTXOs at the wallet's address
    pub fn utxos(&self, provider: &dyn UtxoProvider) -> Result<Vec<Utxo>, WalletError> {
        Ok(provider.get_utxos(&self.address_string()?)?)
    }

    /// Per-token balance at the wallet's address
    pub fn balance(&self, provider: &dyn UtxoProvider) -> Result<TokenSums, WalletError> {
        Ok(utxos_sum(&self.utxos(provider)?))
    }

    /// Save the signing key as a text envelope
    pub fn save(&self, path: &Path) -> Result<(), WalletError> {
        TextEnvelope {
            envelope_type: SIGNING_KEY_TYPE.to_string(),
            description: self
                .label
                .clone()
                .unwrap_or_else(|| "Payment Signing Key".to_string()),
            cbor_hex: self.key_pair.signing_key_cbor_hex(),
        }
        .write(path)
    }

    /// Save the verification key as a text envelope
    pub fn save_verification_key(&self, path: &Path) -> Result<(), WalletError> {
        TextEnvelope {
            envelope_type: VERIFICATION_KEY_TYPE.to_string(),
            description: "Payment Verification Key".to_string(),
            cbor_hex: format!("{}{}", CBOR_KEY_PREFIX, self.key_pair.public_key_hex()),
        }
        .write(path)
    }

    /// Load a wallet from a signing key text envelope
    pub fn load(path: &Path, network: NetworkId) -> Result<Self, WalletError> {
        let envelope = TextEnvelope::read(path)?;
        if envelope.envelope_type != SIGNING_KEY_TYPE {
            return Err(WalletError::InvalidKeyFile(format!(
                "{}: expected {}, found {}",
                path.display(),
                SIGNING_KEY_TYPE,
                envelope.envelope_type
            )));
        }

        let mut wallet = Self::from_signing_key_hex(&envelope.cbor_hex, network)?;
        wallet.label = Some(envelope.description);
        Ok(wallet)
    }

    /// Export wallet info (without the signing key)
    pub fn export_public_info(&self) -> Result<WalletInfo, WalletError> {
        Ok(WalletInfo {
            address: self.address_string()?,
            public_key: self.public_key(),
            key_hash: self.key_hash(),
            label: self.label.clone(),
        })
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("key_hash", &self.key_hash())
            .field("network", &self.network)
            .field("label", &self.label)
            .finish()
    }
}

impl TxSigner for Wallet {
    fn verification_key(&self) -> [u8; KEY_SIZE] {
        self.key_pair.public_key()
    }

    fn create_witness(&self, tx_hash: &[u8]) -> Result<Witness, KeyError> {
        self.key_pair.create_witness(tx_hash)
    }
}

/// Load a verification key text envelope and return the raw key
pub fn load_verification_key(path: &Path) -> Result<[u8; KEY_SIZE], WalletError> {
    let envelope = TextEnvelope::read(path)?;
    if envelope.envelope_type != VERIFICATION_KEY_TYPE {
        return Err(WalletError::InvalidKeyFile(format!(
            "{}: expected {}, found {}",
            path.display(),
            VERIFICATION_KEY_TYPE,
            envelope.envelope_type
        )));
    }

    crate::crypto::decode_key_hex(&envelope.cbor_hex)
        .ok_or(WalletError::CryptoError(KeyError::InvalidVerificationKey))
}

/// Public wallet information (safe to share)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletInfo {
    pub address: String,
    pub public_key: String,
    pub key_hash: String,
    pub label: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::params::{ProtocolParameters, Tip};
    use crate::core::token::Token;
    use crate::provider::MemoryProvider;

    fn seeded() -> Wallet {
        let seed: [u8; 32] = std::array::from_fn(|i| i as u8);
        Wallet::from_key_pair(KeyPair::from_bytes(&seed), NetworkId::Testnet)
    }

    #[test]
    fn test_wallet_creation() {
        let wallet = Wallet::new(NetworkId::Testnet);
        assert!(wallet.address_string().unwrap().starts_with("addr_test1"));
        assert_eq!(wallet.public_key().len(), 64);
        assert_eq!(wallet.key_hash().len(), 56);
    }

    #[test]
    fn test_known_key() {
        let wallet = seeded();
        assert_eq!(
            wallet.key_hash(),
            "27e38d0e19e3434e33fbd001d3fe04b5b76763f88acd625e0d770b43"
        );
        let address = wallet.address().unwrap();
        assert_eq!(address.as_bytes()[0], 0x60);
        assert_eq!(hex::encode(&address.as_bytes()[1..]), wallet.key_hash());
    }

    #[test]
    fn test_wallet_import() {
        let wallet1 = Wallet::new(NetworkId::Mainnet);
        let signing_key = wallet1.key_pair().signing_key_cbor_hex();

        let wallet2 = Wallet::from_signing_key_hex(&signing_key, NetworkId::Mainnet).unwrap();
        assert_eq!(wallet1.address().unwrap(), wallet2.address().unwrap());
        assert!(wallet2.address_string().unwrap().starts_with("addr1"));
    }

    #[test]
    fn test_wallet_save_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("payment.skey");

        let mut wallet1 = seeded();
        wallet1.label = Some("Test Wallet".to_string());
        wallet1.save(&path).unwrap();

        let envelope: TextEnvelope =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(envelope.envelope_type, SIGNING_KEY_TYPE);
        assert!(envelope.cbor_hex.starts_with("5820"));
        assert_eq!(envelope.cbor_hex.len(), 68);

        let wallet2 = Wallet::load(&path, NetworkId::Testnet).unwrap();
        assert_eq!(wallet1.key_hash(), wallet2.key_hash());
        assert_eq!(wallet2.label.as_deref(), Some("Test Wallet"));
    }

    #[test]
    fn test_verification_key_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let vkey = temp_dir.path().join("payment.vkey");

        let wallet = seeded();
        wallet.save_verification_key(&vkey).unwrap();
        assert_eq!(load_verification_key(&vkey).unwrap(), wallet.key_pair().public_key());

        // a verification key is not a signing key
        assert!(matches!(
            Wallet::load(&vkey, NetworkId::Testnet),
            Err(WalletError::InvalidKeyFile(_))
        ));
    }

    #[test]
    fn test_balance() {
        let wallet = seeded();
        let address = wallet.address_string().unwrap();
        let token = Token::new(
            "29d222ce763455e3d7a09a665ce554f00ac89d2e99a1a83d267170c6",
            b"A".to_vec(),
        );
        let provider = MemoryProvider::new(ProtocolParameters::default(), Tip::at_slot(0))
            .with_utxos(
                &address,
                vec![
                    Utxo::new("aa".repeat(32), 0, 1_000),
                    Utxo::new("bb".repeat(32), 1, 500).with_token(token.clone(), 9),
                ],
            );

        let balance = wallet.balance(&provider).unwrap();
        assert_eq!(balance[&Token::native()], 1_500);
        assert_eq!(balance[&token], 9);
    }

    #[test]
    fn test_wallet_signs() {
        let wallet = seeded();
        let witness = wallet.create_witness(&[1u8; 32]).unwrap();
        assert_eq!(witness.key_hash_hex(), wallet.key_hash());
        assert!(witness.verify(&hex::encode([1u8; 32])).unwrap());
    }
}
