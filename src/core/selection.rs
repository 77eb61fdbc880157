//! Multi-asset coin selection
//!
//! Picks a subset of a wallet's UTXOs whose combined value covers a vector of
//! required token amounts, bounded by a maximum (and padded up to a minimum)
//! number of inputs.
//!
//! The main pass walks the UTXOs in the order given and keeps a window of at
//! most `max_inputs` candidates. When the window is full the weakest member
//! (smallest amounts of the required tokens, in canonical token order, then
//! smallest native amount; first one wins ties) makes room for the next UTXO.
//! The first window that covers every requirement is the answer. If the walk
//! ends without one, a bounded depth-first search over the UTXOs ranked by
//! how much of the requirement they cover looks for any covering subset.
//!
//! Requirements are a [`TokenSums`], so they are always visited in canonical
//! order (native coin first) and the result only depends on the UTXO order.

use crate::core::token::{format_sums, utxos_sum, Token, TokenSums, Utxo};
use crate::core::transaction::TxInput;
use thiserror::Error;

/// Default upper bound on inputs per transaction
pub const DEFAULT_MAX_INPUTS: usize = 20;

/// Default lower bound on inputs per transaction
pub const DEFAULT_MIN_INPUTS: usize = 1;

/// Nodes the fallback search may visit before giving up
const SEARCH_BUDGET: usize = 100_000;

/// Fixed-point scale for coverage ranks
const COVERAGE_SCALE: u128 = 1_000_000;

/// Coin selection errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Insufficient funds, missing: {}", format_sums(.shortfall))]
    InsufficientFunds { shortfall: TokenSums },
}

/// Chosen inputs and everything they carry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionResult {
    pub inputs: Vec<TxInput>,
    /// Per-token totals of the chosen UTXOs, incidental tokens included
    pub totals: TokenSums,
}

impl SelectionResult {
    /// Total of one token across the chosen inputs
    pub fn total(&self, token: &Token) -> u64 {
        self.totals.get(token).copied().unwrap_or(0)
    }
}

type Requirement<'a> = (&'a Token, u64);

/// Select inputs covering every amount in `desired`
///
/// # Errors
/// `InsufficientFunds` with the per-token shortfall when no subset of at most
/// `max_inputs` UTXOs was found.
pub fn select_utxos(
    utxos: &[Utxo],
    desired: &TokenSums,
    max_inputs: usize,
    min_inputs: usize,
) -> Result<SelectionResult, SelectionError> {
    let required: Vec<Requirement> = desired
        .iter()
        .filter(|(_, amount)| **amount > 0)
        .map(|(token, amount)| (token, *amount))
        .collect();

    if required.is_empty() {
        return Ok(finish(utxos, Vec::new(), 0, max_inputs, min_inputs));
    }

    if max_inputs == 0 {
        return Err(SelectionError::InsufficientFunds {
            shortfall: shortfall(&TokenSums::new(), &required),
        });
    }

    let totals = match window_pass(utxos, &required, max_inputs) {
        Ok((chosen, next)) => {
            log::debug!("Window pass selected {} of {} UTXOs", chosen.len(), utxos.len());
            return Ok(finish(utxos, chosen, next, max_inputs, min_inputs));
        }
        Err(totals) => totals,
    };

    if let Some(chosen) = search_cover(utxos, &required, max_inputs) {
        log::debug!("Fallback search selected {} of {} UTXOs", chosen.len(), utxos.len());
        return Ok(finish(utxos, chosen, 0, max_inputs, min_inputs));
    }

    let shortfall = shortfall(&totals, &required);
    log::warn!(
        "Coin selection failed over {} UTXOs, missing {}",
        utxos.len(),
        format_sums(&shortfall)
    );
    Err(SelectionError::InsufficientFunds { shortfall })
}

/// Sliding window walk. Returns the covering window and the index to pad
/// from, or the totals of the final window.
fn window_pass(
    utxos: &[Utxo],
    required: &[Requirement],
    max_inputs: usize,
) -> Result<(Vec<usize>, usize), TokenSums> {
    let mut chosen: Vec<usize> = Vec::with_capacity(max_inputs);
    let mut sums = TokenSums::new();

    for (i, utxo) in utxos.iter().enumerate() {
        if chosen.len() == max_inputs {
            let weakest = weakest_position(utxos, &chosen, required);
            let removed = chosen.swap_remove(weakest);
            utxos[removed].subtract_from(&mut sums);
        }

        chosen.push(i);
        utxo.add_to(&mut sums);

        if is_covered(&sums, required) {
            return Ok((chosen, i + 1));
        }
    }

    Err(sums)
}

/// Position in `chosen` of the UTXO contributing least to the requirements
fn weakest_position(utxos: &[Utxo], chosen: &[usize], required: &[Requirement]) -> usize {
    let strength = |index: usize| -> Vec<u64> {
        let utxo = &utxos[index];
        required
            .iter()
            .filter(|(token, _)| !token.is_native())
            .map(|(token, _)| utxo.token_amount(token))
            .chain(std::iter::once(utxo.amount))
            .collect()
    };

    let mut weakest = 0;
    let mut weakest_strength = strength(chosen[0]);
    for (position, index) in chosen.iter().enumerate().skip(1) {
        let candidate = strength(*index);
        if candidate < weakest_strength {
            weakest = position;
            weakest_strength = candidate;
        }
    }
    weakest
}

fn is_covered(sums: &TokenSums, required: &[Requirement]) -> bool {
    required
        .iter()
        .all(|(token, amount)| sums.get(*token).copied().unwrap_or(0) >= *amount)
}

fn shortfall(sums: &TokenSums, required: &[Requirement]) -> TokenSums {
    required
        .iter()
        .filter_map(|(token, amount)| {
            let have = sums.get(*token).copied().unwrap_or(0);
            (have < *amount).then(|| ((*token).clone(), amount - have))
        })
        .collect()
}

/// Share of the requirement a UTXO covers on its own, summed over tokens
fn coverage(utxo: &Utxo, required: &[Requirement]) -> u128 {
    required
        .iter()
        .map(|(token, amount)| {
            let covered = utxo.token_amount(token).min(*amount) as u128;
            covered * COVERAGE_SCALE / *amount as u128
        })
        .sum()
}

/// Depth-first search for any covering subset of at most `max_inputs` UTXOs
fn search_cover(utxos: &[Utxo], required: &[Requirement], max_inputs: usize) -> Option<Vec<usize>> {
    let mut ranked: Vec<(usize, u128)> = utxos
        .iter()
        .enumerate()
        .map(|(i, utxo)| (i, coverage(utxo, required)))
        .filter(|(_, rank)| *rank > 0)
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    let order: Vec<usize> = ranked.into_iter().map(|(i, _)| i).collect();

    let remaining: Vec<u64> = required.iter().map(|(_, amount)| *amount).collect();
    let mut chosen = Vec::with_capacity(max_inputs);
    let mut budget = SEARCH_BUDGET;

    let found = descend(
        utxos,
        required,
        &order,
        0,
        max_inputs,
        &remaining,
        &mut chosen,
        &mut budget,
    );
    if !found && budget == 0 {
        log::debug!("Fallback search budget exhausted");
    }
    found.then_some(chosen)
}

#[allow(clippy::too_many_arguments)]
fn descend(
    utxos: &[Utxo],
    required: &[Requirement],
    order: &[usize],
    from: usize,
    max_inputs: usize,
    remaining: &[u64],
    chosen: &mut Vec<usize>,
    budget: &mut usize,
) -> bool {
    if remaining.iter().all(|r| *r == 0) {
        return true;
    }

    let slots = max_inputs - chosen.len();
    if slots == 0 || *budget == 0 || !reachable(utxos, required, &order[from..], slots, remaining) {
        return false;
    }

    for position in from..order.len() {
        if *budget == 0 {
            return false;
        }
        *budget -= 1;

        let utxo = &utxos[order[position]];
        let next: Vec<u64> = required
            .iter()
            .zip(remaining)
            .map(|((token, _), left)| left.saturating_sub(utxo.token_amount(token)))
            .collect();

        chosen.push(order[position]);
        if descend(utxos, required, order, position + 1, max_inputs, &next, chosen, budget) {
            return true;
        }
        chosen.pop();
    }

    false
}

/// Whether the best `slots` candidates could still cover each remaining amount
fn reachable(
    utxos: &[Utxo],
    required: &[Requirement],
    candidates: &[usize],
    slots: usize,
    remaining: &[u64],
) -> bool {
    required.iter().zip(remaining).all(|((token, _), left)| {
        if *left == 0 {
            return true;
        }
        let mut amounts: Vec<u64> = candidates
            .iter()
            .map(|i| utxos[*i].token_amount(token))
            .collect();
        amounts.sort_unstable_by(|a, b| b.cmp(a));
        amounts
            .iter()
            .take(slots)
            .fold(0u64, |acc, a| acc.saturating_add(*a))
            >= *left
    })
}

/// Pad `chosen` up to `min(min_inputs, max_inputs)` with the UTXOs from
/// `pad_from` onwards, in order, and total everything up
fn finish(
    utxos: &[Utxo],
    mut chosen: Vec<usize>,
    pad_from: usize,
    max_inputs: usize,
    min_inputs: usize,
) -> SelectionResult {
    let target = min_inputs.min(max_inputs);
    for index in pad_from..utxos.len() {
        if chosen.len() >= target {
            break;
        }
        if !chosen.contains(&index) {
            chosen.push(index);
        }
    }

    let selected: Vec<Utxo> = chosen.iter().map(|i| utxos[*i].clone()).collect();
    let mut totals = utxos_sum(&selected);
    totals.retain(|_, amount| *amount > 0);

    SelectionResult {
        inputs: selected.iter().map(Utxo::input).collect(),
        totals,
    }
}

// =============================================================================
// Single-token helpers
// =============================================================================

/// Select UTXOs for one token amount: a single UTXO that covers it on its own
/// if there is one, otherwise UTXOs in order until the running sum covers it
pub fn select_for_amount(
    utxos: &[Utxo],
    token: &Token,
    amount: u64,
) -> Result<SelectionResult, SelectionError> {
    if amount == 0 {
        return Ok(finish(utxos, Vec::new(), 0, 0, 0));
    }

    if let Some(index) = utxos.iter().position(|u| u.token_amount(token) >= amount) {
        return Ok(finish(utxos, vec![index], 0, 1, 1));
    }

    let mut chosen = Vec::new();
    let mut sum = 0u64;
    for (index, utxo) in utxos.iter().enumerate() {
        let part = utxo.token_amount(token);
        if part == 0 {
            continue;
        }
        chosen.push(index);
        sum = sum.saturating_add(part);
        if sum >= amount {
            return Ok(finish(utxos, chosen, 0, 0, 0));
        }
    }

    Err(SelectionError::InsufficientFunds {
        shortfall: TokenSums::from([(token.clone(), amount - sum)]),
    })
}

/// Select every UTXO, failing if together they do not cover `amount`
pub fn select_all(
    utxos: &[Utxo],
    token: &Token,
    amount: u64,
) -> Result<SelectionResult, SelectionError> {
    let result = finish(utxos, (0..utxos.len()).collect(), 0, 0, 0);
    let total = result.total(token);

    if total < amount {
        return Err(SelectionError::InsufficientFunds {
            shortfall: TokenSums::from([(token.clone(), amount - total)]),
        });
    }

    Ok(result)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> Token {
        Token::new("1", b"1".to_vec())
    }

    fn utxo(hash: &str, amount: u64, tokens: u64) -> Utxo {
        let utxo = Utxo::new(hash, 0, amount);
        if tokens > 0 {
            utxo.with_token(token(), tokens)
        } else {
            utxo
        }
    }

    fn wallet() -> Vec<Utxo> {
        vec![
            utxo("1", 100, 0),
            utxo("2", 50, 100),
            utxo("3", 150, 0),
            utxo("4", 200, 0),
            utxo("5", 160, 50),
            utxo("6", 400, 0),
            utxo("7", 200, 400),
            utxo("8", 50, 200),
        ]
    }

    fn desired(native: u64, tokens: u64) -> TokenSums {
        let mut sums = TokenSums::from([(Token::native(), native)]);
        if tokens > 0 {
            sums.insert(token(), tokens);
        }
        sums
    }

    fn hashes(result: &SelectionResult) -> Vec<&str> {
        result.inputs.iter().map(|i| i.tx_hash.as_str()).collect()
    }

    #[test]
    fn test_select_native_only() {
        let result = select_utxos(&wallet(), &desired(610, 0), 4, 1).unwrap();

        assert_eq!(hashes(&result), vec!["1", "4", "3", "5"]);
        assert_eq!(result.total(&Token::native()), 610);
        assert_eq!(result.total(&token()), 50);
    }

    #[test]
    fn test_select_with_window_replacement() {
        let result = select_utxos(&wallet(), &desired(710, 0), 3, 1).unwrap();

        assert_eq!(hashes(&result), vec!["4", "5", "6"]);
        assert_eq!(result.total(&Token::native()), 760);
        assert_eq!(result.total(&token()), 50);
    }

    #[test]
    fn test_select_native_and_token() {
        let result = select_utxos(&wallet(), &desired(200, 410), 2, 1).unwrap();

        assert_eq!(hashes(&result), vec!["2", "7"]);
        assert_eq!(result.total(&Token::native()), 250);
        assert_eq!(result.total(&token()), 500);
    }

    #[test]
    fn test_select_token_heavy() {
        let result = select_utxos(&wallet(), &desired(200, 700), 3, 1).unwrap();

        assert_eq!(hashes(&result), vec!["7", "2", "8"]);
        assert_eq!(result.total(&Token::native()), 300);
        assert_eq!(result.total(&token()), 700);
    }

    #[test]
    fn test_select_insufficient_token() {
        let err = select_utxos(&wallet(), &desired(200, 1000), 10, 1).unwrap_err();

        let SelectionError::InsufficientFunds { shortfall } = err;
        assert_eq!(shortfall.get(&token()), Some(&250));
        assert!(!shortfall.contains_key(&Token::native()));

        assert!(select_utxos(&wallet(), &desired(300, 1000), 5, 1).is_err());
    }

    #[test]
    fn test_select_pads_to_min_inputs() {
        let utxos = vec![
            utxo("1", 50, 0),
            utxo("2", 1000, 0),
            utxo("3", 150, 100),
            utxo("4", 200, 0),
        ];
        let result = select_utxos(&utxos, &desired(1000, 0), 5, 4).unwrap();

        assert_eq!(hashes(&result), vec!["1", "2", "3", "4"]);
        assert_eq!(result.total(&Token::native()), 1400);
        assert_eq!(result.total(&token()), 100);
    }

    #[test]
    fn test_min_inputs_capped_by_max() {
        let result = select_utxos(&wallet(), &desired(100, 0), 2, 5).unwrap();
        assert_eq!(result.inputs.len(), 2);
    }

    #[test]
    fn test_fallback_search_finds_cover() {
        // the window walk ends on {3, 4}; {1, 4} covers
        let utxos = vec![
            utxo("1", 100, 50),
            utxo("2", 10, 50),
            utxo("3", 50, 100),
            utxo("4", 100, 50),
        ];
        let result = select_utxos(&utxos, &desired(200, 100), 2, 1).unwrap();

        assert_eq!(hashes(&result), vec!["1", "4"]);
        assert_eq!(result.total(&Token::native()), 200);
        assert_eq!(result.total(&token()), 100);
    }

    #[test]
    fn test_empty_requirement_and_zero_max() {
        let result = select_utxos(&wallet(), &TokenSums::new(), 3, 0).unwrap();
        assert!(result.inputs.is_empty());
        assert!(result.totals.is_empty());

        let err = select_utxos(&wallet(), &desired(1, 0), 0, 0).unwrap_err();
        assert_eq!(
            err,
            SelectionError::InsufficientFunds {
                shortfall: desired(1, 0)
            }
        );

        assert!(select_utxos(&[], &desired(1, 0), 3, 1).is_err());
    }

    #[test]
    fn test_selection_invariants() {
        let utxos = wallet();
        for native in [50u64, 300, 700, 1000, 1300] {
            for tokens in [0u64, 100, 450, 750] {
                for max_inputs in 1..=8 {
                    let want = desired(native, tokens);
                    let first = select_utxos(&utxos, &want, max_inputs, 2);
                    let second = select_utxos(&utxos, &want, max_inputs, 2);
                    assert_eq!(first, second);

                    if let Ok(result) = first {
                        assert!(result.inputs.len() <= max_inputs);
                        assert!(result.inputs.len() >= 2usize.min(max_inputs));
                        for (token, amount) in &want {
                            assert!(result.total(token) >= *amount);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_select_for_amount_prefers_single() {
        let result = select_for_amount(&wallet(), &Token::native(), 300).unwrap();
        assert_eq!(hashes(&result), vec!["6"]);

        let result = select_for_amount(&wallet(), &token(), 150).unwrap();
        assert_eq!(hashes(&result), vec!["7"]);
    }

    #[test]
    fn test_select_for_amount_accumulates() {
        let result = select_for_amount(&wallet(), &Token::native(), 450).unwrap();
        assert_eq!(hashes(&result), vec!["1", "2", "3", "4"]);
        assert_eq!(result.total(&Token::native()), 500);

        let result = select_for_amount(&wallet(), &token(), 600).unwrap();
        assert_eq!(hashes(&result), vec!["2", "5", "7", "8"]);

        let err = select_for_amount(&wallet(), &token(), 800).unwrap_err();
        assert_eq!(
            err,
            SelectionError::InsufficientFunds {
                shortfall: TokenSums::from([(token(), 50)])
            }
        );
    }

    #[test]
    fn test_select_all() {
        let result = select_all(&wallet(), &Token::native(), 1310).unwrap();
        assert_eq!(result.inputs.len(), 8);
        assert_eq!(result.total(&token()), 750);

        assert!(select_all(&wallet(), &Token::native(), 1311).is_err());
    }
}
