//! Shelley address handling
//!
//! Only the two address kinds this crate creates are built here (enterprise
//! addresses for a payment key hash and for a native script hash); any
//! bech32 address can still be parsed and used as an output destination.

use bech32::{FromBase32, ToBase32, Variant};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Size of payment key hashes and script hashes in bytes
pub const KEY_HASH_SIZE: usize = 28;

const ENTERPRISE_KEY_HEADER: u8 = 0b0110_0000;
const ENTERPRISE_SCRIPT_HEADER: u8 = 0b0111_0000;

/// Address-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Invalid bech32 address: {0}")]
    InvalidBech32(String),
    #[error("Unknown address prefix: {0}")]
    UnknownPrefix(String),
    #[error("Invalid hash: expected {expected} bytes, got {actual}")]
    InvalidHashLength { expected: usize, actual: usize },
    #[error("Invalid hex: {0}")]
    InvalidHex(String),
    #[error("Empty address")]
    Empty,
}

/// Network the address belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkId {
    Mainnet,
    Testnet,
}

impl NetworkId {
    /// Network id nibble in the address header
    pub fn id(&self) -> u8 {
        match self {
            NetworkId::Mainnet => 1,
            NetworkId::Testnet => 0,
        }
    }

    /// Human readable part for bech32 payment addresses
    pub fn hrp(&self) -> &'static str {
        match self {
            NetworkId::Mainnet => "addr",
            NetworkId::Testnet => "addr_test",
        }
    }

    fn from_hrp(hrp: &str) -> Option<Self> {
        match hrp {
            "addr" => Some(NetworkId::Mainnet),
            "addr_test" => Some(NetworkId::Testnet),
            _ => None,
        }
    }
}

impl FromStr for NetworkId {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(NetworkId::Mainnet),
            "testnet" | "preview" | "preprod" => Ok(NetworkId::Testnet),
            other => Err(AddressError::UnknownPrefix(other.to_string())),
        }
    }
}

/// A Shelley address in its raw byte form
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    network: NetworkId,
    bytes: Vec<u8>,
}

impl Address {
    /// Enterprise address locked by a payment key hash
    pub fn enterprise(network: NetworkId, key_hash: &[u8]) -> Result<Self, AddressError> {
        Self::with_header(network, ENTERPRISE_KEY_HEADER, key_hash)
    }

    /// Enterprise address locked by a native script (policy) hash
    pub fn script(network: NetworkId, script_hash: &[u8]) -> Result<Self, AddressError> {
        Self::with_header(network, ENTERPRISE_SCRIPT_HEADER, script_hash)
    }

    /// Enterprise script address from a hex encoded policy id
    pub fn from_policy_id(network: NetworkId, policy_id: &str) -> Result<Self, AddressError> {
        let hash = hex::decode(policy_id).map_err(|_| AddressError::InvalidHex(policy_id.into()))?;
        Self::script(network, &hash)
    }

    fn with_header(network: NetworkId, header: u8, hash: &[u8]) -> Result<Self, AddressError> {
        if hash.len() != KEY_HASH_SIZE {
            return Err(AddressError::InvalidHashLength {
                expected: KEY_HASH_SIZE,
                actual: hash.len(),
            });
        }

        let mut bytes = Vec::with_capacity(1 + KEY_HASH_SIZE);
        bytes.push(header | network.id());
        bytes.extend_from_slice(hash);
        Ok(Self { network, bytes })
    }

    /// Address from its raw bytes; the network comes from the header nibble
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AddressError> {
        let header = bytes.first().ok_or(AddressError::Empty)?;
        let network = if header & 0x0f == NetworkId::Mainnet.id() {
            NetworkId::Mainnet
        } else {
            NetworkId::Testnet
        };

        Ok(Self {
            network,
            bytes: bytes.to_vec(),
        })
    }

    /// Parse a bech32 (`addr...` / `addr_test...`) address
    pub fn from_bech32(address: &str) -> Result<Self, AddressError> {
        let (hrp, data, _variant) = bech32::decode(address)
            .map_err(|e| AddressError::InvalidBech32(format!("{}: {}", address, e)))?;
        let network = NetworkId::from_hrp(&hrp).ok_or(AddressError::UnknownPrefix(hrp))?;
        let bytes = Vec::<u8>::from_base32(&data)
            .map_err(|e| AddressError::InvalidBech32(format!("{}: {}", address, e)))?;

        if bytes.is_empty() {
            return Err(AddressError::Empty);
        }

        Ok(Self { network, bytes })
    }

    /// Bech32 text form
    pub fn to_bech32(&self) -> String {
        // encoding only fails for an invalid hrp, and both hrps are valid
        bech32::encode(self.network.hrp(), self.bytes.to_base32(), Variant::Bech32)
            .unwrap_or_default()
    }

    pub fn network(&self) -> NetworkId {
        self.network
    }

    /// Raw address bytes (header byte followed by payload)
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_bech32())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bech32(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // blake2b-224 of the all-zero verification key
    const KEY_HASH: &str = "f9dca21a6c826ec8acb4cf395cbc24351937bfe6560b2683ab8b415f";

    #[test]
    fn test_enterprise_address_header() {
        let hash = hex::decode(KEY_HASH).unwrap();
        let testnet = Address::enterprise(NetworkId::Testnet, &hash).unwrap();
        let mainnet = Address::enterprise(NetworkId::Mainnet, &hash).unwrap();

        assert_eq!(testnet.as_bytes()[0], 0x60);
        assert_eq!(mainnet.as_bytes()[0], 0x61);
        assert_eq!(&testnet.as_bytes()[1..], hash.as_slice());
        assert!(testnet.to_string().starts_with("addr_test1"));
        assert!(mainnet.to_string().starts_with("addr1"));
    }

    #[test]
    fn test_script_address_header() {
        let address = Address::from_policy_id(NetworkId::Testnet, KEY_HASH).unwrap();
        assert_eq!(address.as_bytes()[0], 0x70);
    }

    #[test]
    fn test_bech32_round_trip() {
        let hash = hex::decode(KEY_HASH).unwrap();
        let address = Address::script(NetworkId::Testnet, &hash).unwrap();

        let parsed: Address = address.to_string().parse().unwrap();
        assert_eq!(parsed, address);
        assert_eq!(parsed.network(), NetworkId::Testnet);
    }

    #[test]
    fn test_from_bytes() {
        let hash = hex::decode(KEY_HASH).unwrap();
        let mainnet = Address::enterprise(NetworkId::Mainnet, &hash).unwrap();

        let parsed = Address::from_bytes(mainnet.as_bytes()).unwrap();
        assert_eq!(parsed, mainnet);
        assert_eq!(parsed.network(), NetworkId::Mainnet);
        assert!(matches!(Address::from_bytes(&[]), Err(AddressError::Empty)));
    }

    #[test]
    fn test_parse_known_address() {
        let address: Address = "addr_test1wz4k6frsfd9q98rya6zjxtpcmzn83pwc8uyl9yqw25p8qqcx3e0c0"
            .parse()
            .unwrap();
        assert_eq!(address.network(), NetworkId::Testnet);
        assert_eq!(address.as_bytes()[0], 0x70);
        assert_eq!(address.as_bytes().len(), 1 + KEY_HASH_SIZE);
    }

    #[test]
    fn test_invalid_addresses() {
        assert!(matches!(
            Address::enterprise(NetworkId::Testnet, &[1, 2, 3]),
            Err(AddressError::InvalidHashLength { .. })
        ));
        assert!("not an address".parse::<Address>().is_err());
        // valid bech32 checksum, wrong prefix
        assert!(matches!(
            "a12uel5l".parse::<Address>(),
            Err(AddressError::UnknownPrefix(_))
        ));
    }
}
