//! Multi-asset value model
//!
//! Tokens are identified by `(policy_id, name)`. The chain's native coin is a
//! distinguished sentinel token with no policy id. Amounts are aggregated in
//! [`TokenSums`], an ordered map whose iteration order (native coin first, then
//! `policy_id.name` lexicographically) is what keeps selection deterministic.

use crate::core::transaction::{TxInput, TxOutput};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Name of the native coin sentinel token
pub const NATIVE_TOKEN_NAME: &str = "lovelace";

/// Separator between policy id and hex-encoded name in a token's full name
pub const TOKEN_NAME_SEPARATOR: char = '.';

// =============================================================================
// Error Types
// =============================================================================

/// Token-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Invalid token name: {0}")]
    InvalidTokenName(String),
}

// =============================================================================
// Token
// =============================================================================

/// A native token identity (or the native coin sentinel)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    /// Policy id (hex). Empty for the native coin.
    #[serde(rename = "pid")]
    pub policy_id: String,
    /// Raw asset name bytes
    #[serde(rename = "nam", with = "hex_bytes")]
    pub name: Vec<u8>,
}

impl Token {
    /// Create a token from a policy id and raw name bytes
    pub fn new(policy_id: impl Into<String>, name: impl Into<Vec<u8>>) -> Self {
        Self {
            policy_id: policy_id.into(),
            name: name.into(),
        }
    }

    /// The native coin sentinel
    pub fn native() -> Self {
        Self {
            policy_id: String::new(),
            name: NATIVE_TOKEN_NAME.as_bytes().to_vec(),
        }
    }

    /// Check if this is the native coin sentinel
    pub fn is_native(&self) -> bool {
        self.policy_id.is_empty() && self.name == NATIVE_TOKEN_NAME.as_bytes()
    }

    /// Parse `policy_id.name`. When `name_is_hex` is set the name part is
    /// hex-decoded, otherwise it is taken verbatim.
    pub fn from_full_name(full_name: &str, name_is_hex: bool) -> Result<Self, TokenError> {
        if full_name == NATIVE_TOKEN_NAME {
            return Ok(Self::native());
        }

        let invalid = || TokenError::InvalidTokenName(full_name.to_string());

        let (policy_id, name) = full_name
            .split_once(TOKEN_NAME_SEPARATOR)
            .ok_or_else(invalid)?;

        if policy_id.is_empty()
            || name.contains(TOKEN_NAME_SEPARATOR)
            || !policy_id.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(invalid());
        }

        let name = if name_is_hex {
            hex::decode(name).map_err(|_| invalid())?
        } else {
            name.as_bytes().to_vec()
        };

        Ok(Self::new(policy_id, name))
    }

    /// Hex encoded asset name
    pub fn name_hex(&self) -> String {
        hex::encode(&self.name)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_native() {
            f.write_str(NATIVE_TOKEN_NAME)
        } else {
            write!(
                f,
                "{}{}{}",
                self.policy_id,
                TOKEN_NAME_SEPARATOR,
                self.name_hex()
            )
        }
    }
}

impl FromStr for Token {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_full_name(s, true)
    }
}

impl Ord for Token {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_native(), other.is_native()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self
                .policy_id
                .cmp(&other.policy_id)
                .then_with(|| self.name.cmp(&other.name)),
        }
    }
}

impl PartialOrd for Token {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// =============================================================================
// Token Amount
// =============================================================================

/// A token together with a quantity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAmount {
    #[serde(flatten)]
    pub token: Token,
    #[serde(rename = "val")]
    pub amount: u64,
}

impl TokenAmount {
    pub fn new(token: Token, amount: u64) -> Self {
        Self { token, amount }
    }

    /// Parse a full token name (`policy_id.hex_name`) and attach an amount
    pub fn from_full_name(
        full_name: &str,
        amount: u64,
        name_is_hex: bool,
    ) -> Result<Self, TokenError> {
        Ok(Self::new(Token::from_full_name(full_name, name_is_hex)?, amount))
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.token)
    }
}

// =============================================================================
// UTXO
// =============================================================================

/// Unspent transaction output as reported by a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    #[serde(rename = "hsh")]
    pub tx_hash: String,
    #[serde(rename = "ind")]
    pub index: u32,
    /// Native coin amount
    pub amount: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tokens: Vec<TokenAmount>,
}

impl Utxo {
    pub fn new(tx_hash: impl Into<String>, index: u32, amount: u64) -> Self {
        Self {
            tx_hash: tx_hash.into(),
            index,
            amount,
            tokens: Vec::new(),
        }
    }

    /// Attach a token quantity to this UTXO
    pub fn with_token(mut self, token: Token, amount: u64) -> Self {
        self.tokens.push(TokenAmount::new(token, amount));
        self
    }

    /// Amount of the given token carried by this UTXO (native coin included)
    pub fn token_amount(&self, token: &Token) -> u64 {
        if token.is_native() {
            return self.amount;
        }

        self.tokens
            .iter()
            .filter(|t| &t.token == token)
            .fold(0u64, |acc, t| acc.saturating_add(t.amount))
    }

    /// Reference to this UTXO as a transaction input
    pub fn input(&self) -> TxInput {
        TxInput::new(self.tx_hash.clone(), self.index)
    }

    /// Add every token of this UTXO into `sums`
    pub(crate) fn add_to(&self, sums: &mut TokenSums) {
        add_amount(sums, Token::native(), self.amount);
        for token in &self.tokens {
            add_amount(sums, token.token.clone(), token.amount);
        }
    }

    /// Remove every token of this UTXO from `sums`
    pub(crate) fn subtract_from(&self, sums: &mut TokenSums) {
        sub_amount(sums, &Token::native(), self.amount);
        for token in &self.tokens {
            sub_amount(sums, &token.token, token.amount);
        }
    }
}

// =============================================================================
// Sums
// =============================================================================

/// Per-token totals, iterated in canonical token order
pub type TokenSums = BTreeMap<Token, u64>;

fn add_amount(sums: &mut TokenSums, token: Token, amount: u64) {
    let entry = sums.entry(token).or_insert(0);
    *entry = entry.saturating_add(amount);
}

fn sub_amount(sums: &mut TokenSums, token: &Token, amount: u64) {
    if let Some(entry) = sums.get_mut(token) {
        *entry = entry.saturating_sub(amount);
    }
}

/// Sum of every token (native coin included) across `utxos`
pub fn utxos_sum(utxos: &[Utxo]) -> TokenSums {
    let mut sums = TokenSums::new();
    for utxo in utxos {
        utxo.add_to(&mut sums);
    }
    sums
}

/// Sum of every token (native coin included) across `outputs`
pub fn outputs_sum(outputs: &[TxOutput]) -> TokenSums {
    let mut sums = TokenSums::new();
    for output in outputs {
        add_amount(&mut sums, Token::native(), output.amount);
        for token in &output.tokens {
            add_amount(&mut sums, token.token.clone(), token.amount);
        }
    }
    sums
}

/// Non-native token amounts from `sums`, skipping `skip` and zero quantities.
/// The native coin is always skipped.
pub fn tokens_from_sums(sums: &TokenSums, skip: &[Token]) -> Vec<TokenAmount> {
    sums.iter()
        .filter(|(token, amount)| !token.is_native() && **amount > 0 && !skip.contains(token))
        .map(|(token, amount)| TokenAmount::new(token.clone(), *amount))
        .collect()
}

/// `available - spent` per token. Fails with the per-token shortfall when
/// `spent` exceeds `available` for any token.
pub fn sums_difference(available: &TokenSums, spent: &TokenSums) -> Result<TokenSums, TokenSums> {
    let mut shortfall = TokenSums::new();
    let mut remaining = available.clone();

    for (token, amount) in spent {
        let have = remaining.get(token).copied().unwrap_or(0);
        if have < *amount {
            shortfall.insert(token.clone(), amount - have);
        } else {
            remaining.insert(token.clone(), have - amount);
        }
    }

    if shortfall.is_empty() {
        Ok(remaining)
    } else {
        Err(shortfall)
    }
}

/// Render sums as `token=amount` pairs in canonical order
pub fn format_sums(sums: &TokenSums) -> String {
    sums.iter()
        .map(|(token, amount)| format!("{}={}", token, amount))
        .collect::<Vec<_>>()
        .join(", ")
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: &str = "29d222ce763455e3d7a09a665ce554f00ac89d2e99a1a83d267170c6";

    #[test]
    fn test_token_display() {
        let token = Token::new(POLICY, b"MIN".to_vec());
        assert_eq!(token.to_string(), format!("{}.4d494e", POLICY));
        assert_eq!(Token::native().to_string(), NATIVE_TOKEN_NAME);
    }

    #[test]
    fn test_token_round_trip() {
        let names: Vec<Vec<u8>> = vec![
            vec![],
            b"Route".to_vec(),
            vec![0x00, 0xff, 0x2e, 0x10],
            b"a.b".to_vec(),
        ];

        for name in names {
            let token = Token::new(POLICY, name);
            let parsed: Token = token.to_string().parse().unwrap();
            assert_eq!(parsed, token);
        }

        let native: Token = NATIVE_TOKEN_NAME.parse().unwrap();
        assert!(native.is_native());
    }

    #[test]
    fn test_token_parse_rejects_malformed() {
        assert!(matches!(
            "no_separator".parse::<Token>(),
            Err(TokenError::InvalidTokenName(_))
        ));
        assert!(format!("{}.zz", POLICY).parse::<Token>().is_err());
        assert!(format!("{}.abc", POLICY).parse::<Token>().is_err());
        assert!(".4d494e".parse::<Token>().is_err());
        assert!("a.b.c".parse::<Token>().is_err());
    }

    #[test]
    fn test_token_plain_name() {
        let token = Token::from_full_name(&format!("{}.MIN", POLICY), false).unwrap();
        assert_eq!(token.name, b"MIN".to_vec());
    }

    #[test]
    fn test_token_ordering_native_first() {
        let mut tokens = vec![
            Token::new("bb", b"x".to_vec()),
            Token::native(),
            Token::new("aa", b"y".to_vec()),
            Token::new("aa", b"x".to_vec()),
        ];
        tokens.sort();

        assert!(tokens[0].is_native());
        assert_eq!(tokens[1], Token::new("aa", b"x".to_vec()));
        assert_eq!(tokens[2], Token::new("aa", b"y".to_vec()));
        assert_eq!(tokens[3], Token::new("bb", b"x".to_vec()));
    }

    #[test]
    fn test_utxos_sum() {
        let token = Token::new(POLICY, b"1".to_vec());
        let utxos = vec![
            Utxo::new("1", 0, 100),
            Utxo::new("2", 0, 50).with_token(token.clone(), 20),
            Utxo::new("3", 1, 25).with_token(token.clone(), 5),
        ];

        let sums = utxos_sum(&utxos);
        assert_eq!(sums[&Token::native()], 175);
        assert_eq!(sums[&token], 25);
        assert_eq!(utxos[1].token_amount(&token), 20);
        assert_eq!(utxos[0].token_amount(&token), 0);
        assert_eq!(utxos[0].token_amount(&Token::native()), 100);
    }

    #[test]
    fn test_tokens_from_sums_skips_native() {
        let a = Token::new(POLICY, b"A".to_vec());
        let b = Token::new(POLICY, b"B".to_vec());
        let sums: TokenSums = [(Token::native(), 10), (a.clone(), 3), (b.clone(), 4)]
            .into_iter()
            .collect();

        let tokens = tokens_from_sums(&sums, &[b]);
        assert_eq!(tokens, vec![TokenAmount::new(a, 3)]);
    }

    #[test]
    fn test_sums_difference() {
        let a = Token::new(POLICY, b"A".to_vec());
        let available: TokenSums = [(Token::native(), 100), (a.clone(), 3)].into_iter().collect();
        let spent: TokenSums = [(Token::native(), 40)].into_iter().collect();

        let remaining = sums_difference(&available, &spent).unwrap();
        assert_eq!(remaining[&Token::native()], 60);
        assert_eq!(remaining[&a], 3);

        let too_much: TokenSums = [(a.clone(), 5)].into_iter().collect();
        let shortfall = sums_difference(&available, &too_much).unwrap_err();
        assert_eq!(shortfall[&a], 2);
    }

    #[test]
    fn test_utxo_json_format() {
        let utxo = Utxo::new("ab", 1, 7).with_token(Token::new(POLICY, b"A".to_vec()), 9);
        let json = serde_json::to_value(&utxo).unwrap();

        assert_eq!(json["hsh"], "ab");
        assert_eq!(json["ind"], 1);
        assert_eq!(json["tokens"][0]["pid"], POLICY);
        assert_eq!(json["tokens"][0]["nam"], "41");
        assert_eq!(json["tokens"][0]["val"], 9);

        let back: Utxo = serde_json::from_value(json).unwrap();
        assert_eq!(back, utxo);
    }
}
