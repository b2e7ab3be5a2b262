//! Ordering and accumulation helpers shared by the strategies.

use std::cmp::Ordering;

use super::Requirement;
use crate::enrich::EnrichedUtxo;
use crate::error::SpendError;

/// Tie-break for equal values: more confirmations first, then the smaller
/// txid, then the smaller vout. Total over distinct outpoints.
fn tie_break(a: &EnrichedUtxo, b: &EnrichedUtxo) -> Ordering {
    b.confirmations
        .cmp(&a.confirmations)
        .then(a.txid.cmp(&b.txid))
        .then(a.vout.cmp(&b.vout))
}

/// Ascending by value with the deterministic tie-break.
pub fn cmp_ascending(a: &EnrichedUtxo, b: &EnrichedUtxo) -> Ordering {
    a.value.cmp(&b.value).then_with(|| tie_break(a, b))
}

/// Descending by value with the deterministic tie-break.
pub fn cmp_descending(a: &EnrichedUtxo, b: &EnrichedUtxo) -> Ordering {
    b.value.cmp(&a.value).then_with(|| tie_break(a, b))
}

pub fn sorted_ascending(utxos: &[EnrichedUtxo]) -> Vec<EnrichedUtxo> {
    let mut sorted = utxos.to_vec();
    sorted.sort_by(cmp_ascending);
    sorted
}

pub fn sorted_descending(utxos: &[EnrichedUtxo]) -> Vec<EnrichedUtxo> {
    let mut sorted = utxos.to_vec();
    sorted.sort_by(cmp_descending);
    sorted
}

pub fn total_value(utxos: &[EnrichedUtxo]) -> u64 {
    utxos.iter().fold(0u64, |acc, u| acc.saturating_add(u.value))
}

/// Funding error for a strategy that found no covering subset. `required`
/// is the requirement at the largest input count the cap allows.
pub fn insufficient(candidates: &[EnrichedUtxo], requirement: &Requirement, max_inputs: usize) -> SpendError {
    let count = candidates.len().min(max_inputs).max(1);
    SpendError::InsufficientFunds {
        available: total_value(candidates),
        required: requirement.for_inputs(count),
    }
}

/// Take the shortest prefix of `sorted`, between `min_inputs` and
/// `max_inputs` long, that covers the requirement for its own length.
pub fn accumulate_between(
    sorted: &[EnrichedUtxo],
    requirement: &Requirement,
    min_inputs: usize,
    max_inputs: usize,
) -> Option<Vec<EnrichedUtxo>> {
    let mut total: u64 = 0;
    for (i, utxo) in sorted.iter().take(max_inputs).enumerate() {
        total = total.saturating_add(utxo.value);
        let count = i + 1;
        if count >= min_inputs && total >= requirement.for_inputs(count) {
            return Some(sorted[..count].to_vec());
        }
    }
    None
}

/// Take a prefix of `sorted` until it covers the requirement, using at most
/// `max_inputs` entries.
///
/// Over a descending list this is complete: the first `k` entries are the
/// most valuable subset of size `k`, so `None` means no subset within the
/// cap pays for itself.
pub fn accumulate(sorted: &[EnrichedUtxo], requirement: &Requirement, max_inputs: usize) -> Option<Vec<EnrichedUtxo>> {
    accumulate_between(sorted, requirement, 1, max_inputs)
}

/// Smallest-first accumulation that respects the input cap.
///
/// Takes the ascending prefix; if the cap is hit before the requirement is
/// met, slides a window of `max_inputs` consecutive entries up the sorted
/// list and returns the first window that covers. When small outputs cost
/// more to spend than they carry, a shorter run of the largest outputs can
/// still cover, so the last resort is largest-first accumulation, returned
/// in ascending order.
pub fn accumulate_ascending(
    sorted: &[EnrichedUtxo],
    requirement: &Requirement,
    max_inputs: usize,
) -> Option<Vec<EnrichedUtxo>> {
    if let Some(prefix) = accumulate(sorted, requirement, max_inputs) {
        return Some(prefix);
    }
    let width = max_inputs.min(sorted.len());
    if width > 0 && width < sorted.len() {
        let required = requirement.for_inputs(width);
        let mut total = total_value(&sorted[..width]);
        for start in 1..=(sorted.len() - width) {
            total = total
                .saturating_sub(sorted[start - 1].value)
                .saturating_add(sorted[start + width - 1].value);
            if total >= required {
                return Some(sorted[start..start + width].to_vec());
            }
        }
    }
    let mut chosen = accumulate(&sorted_descending(sorted), requirement, max_inputs)?;
    chosen.sort_by(cmp_ascending);
    Some(chosen)
}
