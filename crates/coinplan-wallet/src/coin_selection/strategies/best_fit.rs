//! Best-fit selection: cover the requirement with as little change as
//! practical.
//!
//! Starts from the smallest-first accumulation and then runs a bounded
//! local search. Each step considers two kinds of move:
//!
//! - **swap**: replace an included input `x` with the smallest excluded
//!   output `u` such that `u < x` and the total still covers;
//! - **drop**: remove the smallest included input if the rest still covers.
//!
//! Coverage is checked against the requirement for the resulting input
//! count, so a drop also saves that input's fee. The move leaving the least
//! change wins (a drop wins ties). No accepted move grows the change, and at most
//! `best_fit_max_swaps` moves are made, so the pass stays `O(steps * k log n)`
//! rather than exhaustive.

use std::collections::HashSet;

use coinplan_core::types::OutPoint;

use super::utils::{self, cmp_ascending};
use super::{Requirement, SelectionLimits, Strategy};
use crate::enrich::EnrichedUtxo;
use crate::error::SpendError;

pub struct BestFitStrategy;

impl Strategy for BestFitStrategy {
    fn name(&self) -> &'static str {
        "best-fit"
    }

    fn choose(
        &self,
        candidates: &[EnrichedUtxo],
        requirement: &Requirement,
        limits: &SelectionLimits,
    ) -> Result<Vec<EnrichedUtxo>, SpendError> {
        let sorted = utils::sorted_ascending(candidates);
        let initial = utils::accumulate_ascending(&sorted, requirement, limits.max_inputs)
            .ok_or_else(|| utils::insufficient(candidates, requirement, limits.max_inputs))?;
        Ok(improve(initial, &sorted, requirement, limits.best_fit_max_swaps))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Move {
    Swap { out: usize, into: usize, total: u64, change: u64 },
    Drop { total: u64, change: u64 },
}

impl Move {
    fn change(&self) -> u64 {
        match self {
            Move::Swap { change, .. } | Move::Drop { change, .. } => *change,
        }
    }
}

fn insert_sorted(list: &mut Vec<EnrichedUtxo>, utxo: EnrichedUtxo) {
    let pos = list
        .binary_search_by(|entry| cmp_ascending(entry, &utxo))
        .unwrap_or_else(|p| p);
    list.insert(pos, utxo);
}

/// Best single move from the current state, if any improves the change.
///
/// `excluded` is sorted ascending, so among equal values the swap picks the
/// output the tie-break ranks first.
fn best_move(
    selected: &[EnrichedUtxo],
    excluded: &[EnrichedUtxo],
    total: u64,
    requirement: &Requirement,
) -> Option<Move> {
    let required = requirement.for_inputs(selected.len());
    let current = total.saturating_sub(required);
    let mut best: Option<Move> = None;

    for (out, x) in selected.iter().enumerate() {
        let rest = total - x.value;
        let floor = required.saturating_sub(rest);
        let into = excluded.partition_point(|u| u.value < floor);
        if let Some(u) = excluded.get(into) {
            if u.value < x.value {
                let next = rest + u.value;
                let change = next - required;
                if best.is_none_or(|m| change < m.change()) {
                    best = Some(Move::Swap { out, into, total: next, change });
                }
            }
        }
    }

    if selected.len() > 1 {
        let rest = total - selected[0].value;
        let required = requirement.for_inputs(selected.len() - 1);
        if rest >= required {
            let change = rest - required;
            if change <= current && best.is_none_or(|m| change <= m.change()) {
                best = Some(Move::Drop { total: rest, change });
            }
        }
    }

    best
}

/// Bounded local search over an initial covering selection.
///
/// `selected` must be sorted ascending and cover the requirement for its
/// size; the result is sorted ascending and still covers it.
fn improve(
    mut selected: Vec<EnrichedUtxo>,
    sorted: &[EnrichedUtxo],
    requirement: &Requirement,
    max_steps: usize,
) -> Vec<EnrichedUtxo> {
    let chosen: HashSet<OutPoint> = selected.iter().map(EnrichedUtxo::outpoint).collect();
    let mut excluded: Vec<EnrichedUtxo> = sorted
        .iter()
        .filter(|u| !chosen.contains(&u.outpoint()))
        .cloned()
        .collect();
    let mut total = utils::total_value(&selected);

    for _ in 0..max_steps {
        match best_move(&selected, &excluded, total, requirement) {
            Some(Move::Swap { out, into, total: next, .. }) => {
                let removed = selected.remove(out);
                let added = excluded.remove(into);
                insert_sorted(&mut selected, added);
                insert_sorted(&mut excluded, removed);
                total = next;
            }
            Some(Move::Drop { total: next, .. }) => {
                let removed = selected.remove(0);
                insert_sorted(&mut excluded, removed);
                total = next;
            }
            None => break,
        }
    }
    selected
}
