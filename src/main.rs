//! Cardano transaction CLI
//!
//! Builds, signs and submits transactions against a JSON chain snapshot.

use cardano_wallet_tx::cli::{self, SendArgs};
use cardano_wallet_tx::core::{NetworkId, DEFAULT_TTL_INCREMENT};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cardano-tx")]
#[command(version)]
#[command(about = "Build, sign and submit Cardano transactions", long_about = None)]
struct Cli {
    /// Network: mainnet or testnet
    #[arg(short, long, default_value = "testnet")]
    network: NetworkId,

    /// Chain snapshot file
    #[arg(short, long, default_value = "chain.json")]
    snapshot: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty chain snapshot
    Init {
        /// Slot of the tip
        #[arg(long, default_value = "0")]
        slot: u64,

        /// Overwrite an existing snapshot
        #[arg(short, long)]
        force: bool,
    },

    /// Generate a payment key pair
    Keygen {
        #[arg(long, default_value = "payment.skey")]
        signing_key: PathBuf,

        #[arg(long, default_value = "payment.vkey")]
        verification_key: PathBuf,
    },

    /// Print the address of a key
    Address {
        #[arg(long)]
        signing_key: Option<PathBuf>,

        #[arg(long)]
        verification_key: Option<PathBuf>,
    },

    /// Build an M-of-N policy script
    Policy {
        /// Signatures required
        #[arg(short, long)]
        required: usize,

        /// Signer key hash (hex), repeatable
        #[arg(long = "key-hash")]
        key_hashes: Vec<String>,

        /// Signer verification key file, repeatable
        #[arg(long = "verification-key")]
        verification_keys: Vec<PathBuf>,

        /// Write the script JSON to this file
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Show the balance of an address
    Balance {
        address: String,
    },

    /// Send coins from a key's address
    Send {
        #[arg(long)]
        signing_key: PathBuf,

        /// Recipient address
        #[arg(short, long)]
        to: String,

        /// Amount in lovelace
        #[arg(short, long)]
        amount: u64,

        /// Metadata JSON file
        #[arg(short, long)]
        metadata: Option<PathBuf>,

        /// Slots added to the tip for the TTL
        #[arg(long, default_value_t = DEFAULT_TTL_INCREMENT)]
        ttl: u64,

        /// Also write the signed transaction to this file
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { slot, force } => cli::cmd_init(&cli.snapshot, slot, force),

        Commands::Keygen {
            signing_key,
            verification_key,
        } => cli::cmd_keygen(&signing_key, &verification_key, cli.network),

        Commands::Address {
            signing_key,
            verification_key,
        } => cli::cmd_address(
            signing_key.as_deref(),
            verification_key.as_deref(),
            cli.network,
        ),

        Commands::Policy {
            required,
            key_hashes,
            verification_keys,
            out,
        } => cli::cmd_policy(
            required,
            &key_hashes,
            &verification_keys,
            cli.network,
            out.as_deref(),
        ),

        Commands::Balance { address } => cli::cmd_balance(&cli.snapshot, &address),

        Commands::Send {
            signing_key,
            to,
            amount,
            metadata,
            ttl,
            out,
        } => {
            let args = SendArgs {
                signing_key,
                to,
                amount,
                metadata,
                ttl_increment: ttl,
                out,
            };
            cli::cmd_send(&cli.snapshot, &args, cli.network).map(|_| ())
        }
    }
}
