//! CLI commands
//!
//! Command handlers for the `cardano-tx` binary. Chain data comes from a
//! JSON snapshot file, see [`SnapshotProvider`].

use crate::core::address::{Address, NetworkId};
use crate::core::metadata::metadata_from_json_str;
use crate::core::params::{ProtocolParameters, Tip};
use crate::core::token::{format_sums, utxos_sum};
use crate::crypto::blake2b_224;
use crate::multisig::PolicyScript;
use crate::provider::{ChainSnapshot, SnapshotProvider, TxSubmitter, UtxoProvider};
use crate::wallet::{create_tx, load_verification_key, SendConfig, TextEnvelope, Wallet};
use std::fs;
use std::path::{Path, PathBuf};

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Text envelope type of signed transactions
pub const SIGNED_TX_TYPE: &str = "Tx BabbageEra";

/// Create an empty snapshot file
pub fn cmd_init(snapshot: &Path, slot: u64, force: bool) -> CliResult<()> {
    if snapshot.exists() && !force {
        println!("⚠️  Snapshot already exists at {:?}", snapshot);
        println!("   Use --force to overwrite it");
        return Ok(());
    }

    let provider = SnapshotProvider::create(
        snapshot,
        ChainSnapshot::new(ProtocolParameters::default(), Tip::at_slot(slot)),
    )?;

    println!("✅ Snapshot initialized at {:?}", provider.path());
    println!("   Slot: {}", slot);
    Ok(())
}

/// Generate a payment key pair
pub fn cmd_keygen(
    signing_key: &Path,
    verification_key: &Path,
    network: NetworkId,
) -> CliResult<()> {
    let wallet = Wallet::new(network);
    wallet.save(signing_key)?;
    wallet.save_verification_key(verification_key)?;

    println!("🔐 New payment key created!");
    println!("   📍 Address: {}", wallet.address_string()?);
    println!("   🔑 Key hash: {}", wallet.key_hash());
    println!("   Signing key: {:?}", signing_key);
    println!("   Verification key: {:?}", verification_key);
    Ok(())
}

/// Print the enterprise address of a key file
pub fn cmd_address(
    signing_key: Option<&Path>,
    verification_key: Option<&Path>,
    network: NetworkId,
) -> CliResult<()> {
    let address = match (signing_key, verification_key) {
        (Some(path), _) => Wallet::load(path, network)?.address()?,
        (None, Some(path)) => {
            Address::enterprise(network, &blake2b_224(&load_verification_key(path)?))?
        }
        (None, None) => {
            return Err("either --signing-key or --verification-key is required".into())
        }
    };

    println!("{}", address);
    Ok(())
}

/// Build an `atLeast` policy script from key hashes and verification key files
pub fn cmd_policy(
    required: usize,
    key_hashes: &[String],
    verification_keys: &[PathBuf],
    network: NetworkId,
    out: Option<&Path>,
) -> CliResult<()> {
    let mut hashes = key_hashes.to_vec();
    for path in verification_keys {
        hashes.push(hex::encode(blake2b_224(&load_verification_key(path)?)));
    }

    let policy = PolicyScript::new(required, hashes)?;

    println!("📜 Policy {}", policy.description());
    println!("   ├─ Policy id: {}", policy.policy_id()?);
    println!("   └─ Address: {}", policy.address(network)?);

    if let Some(path) = out {
        fs::write(path, policy.to_json())?;
        println!("\n   Script written to {:?}", path);
    }
    Ok(())
}

/// Show the balance and UTXOs of an address
pub fn cmd_balance(snapshot: &Path, address: &str) -> CliResult<()> {
    let provider = SnapshotProvider::open(snapshot)?;
    let utxos = provider.get_utxos(address)?;

    println!("💰 Balance for {}", address);
    println!("   Total: {}", format_sums(&utxos_sum(&utxos)));
    println!("   UTXOs: {}", utxos.len());

    if !utxos.is_empty() {
        println!("\n   Transaction outputs:");
        for utxo in utxos.iter().take(10) {
            println!(
                "   └─ {}#{} = {}",
                utxo.tx_hash,
                utxo.index,
                format_sums(&utxos_sum(std::slice::from_ref(utxo)))
            );
        }
        if utxos.len() > 10 {
            println!("   ... and {} more", utxos.len() - 10);
        }
    }

    Ok(())
}

/// Options of [`cmd_send`]
#[derive(Debug, Clone)]
pub struct SendArgs {
    pub signing_key: PathBuf,
    pub to: String,
    pub amount: u64,
    pub metadata: Option<PathBuf>,
    pub ttl_increment: u64,
    pub out: Option<PathBuf>,
}

/// Build, sign and submit a payment against the snapshot
pub fn cmd_send(snapshot: &Path, args: &SendArgs, network: NetworkId) -> CliResult<String> {
    let provider = SnapshotProvider::open(snapshot)?;
    let wallet = Wallet::load(&args.signing_key, network)?;
    let sender = wallet.address_string()?;

    let metadata = match &args.metadata {
        Some(path) => Some(metadata_from_json_str(&fs::read_to_string(path)?)?),
        None => None,
    };

    let config = SendConfig {
        ttl_increment: args.ttl_increment,
        ..Default::default()
    };
    let prepared = create_tx(
        &provider,
        &wallet,
        &sender,
        &args.to,
        args.amount,
        metadata,
        &config,
    )?;

    if let Some(path) = &args.out {
        TextEnvelope::new(SIGNED_TX_TYPE, "", hex::encode(&prepared.bytes)).write(path)?;
        println!("   Signed transaction written to {:?}", path);
    }

    provider.submit_tx(&prepared.bytes)?;

    println!("📤 Transaction submitted:");
    println!("   ID: {}", prepared.hash);
    println!("   From: {}", sender);
    println!("   To: {}", args.to);
    println!("   Amount: {}", args.amount);
    println!("   Fee: {}", prepared.fee);

    Ok(prepared.hash)
}
