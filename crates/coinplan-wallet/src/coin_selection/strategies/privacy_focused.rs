//! Privacy-focused selection.
//!
//! Spends at least `privacy_min_inputs` inputs even when one output would
//! cover the amount, so the input count reveals less about which output
//! was the payment. Inputs are drawn round-robin across address types
//! (largest first within each type) to mix the wallet's address chains.
//!
//! When the wallet has fewer candidates than the minimum, or the cap is
//! lower, the minimum degrades to what is available and a warning is logged.

use std::collections::{BTreeMap, VecDeque};

use coinplan_core::address::AddressType;
use tracing::warn;

use super::utils;
use super::{Requirement, SelectionLimits, Strategy};
use crate::enrich::EnrichedUtxo;
use crate::error::SpendError;

pub struct PrivacyFocusedStrategy;

impl Strategy for PrivacyFocusedStrategy {
    fn name(&self) -> &'static str {
        "privacy-focused"
    }

    fn choose(
        &self,
        candidates: &[EnrichedUtxo],
        requirement: &Requirement,
        limits: &SelectionLimits,
    ) -> Result<Vec<EnrichedUtxo>, SpendError> {
        let min_inputs = limits
            .privacy_min_inputs
            .min(candidates.len())
            .min(limits.max_inputs);
        if min_inputs < limits.privacy_min_inputs {
            warn!(
                wanted = limits.privacy_min_inputs,
                using = min_inputs,
                candidates = candidates.len(),
                max_inputs = limits.max_inputs,
                "privacy minimum input count degraded"
            );
        }

        if let Some(chosen) = round_robin(candidates, requirement, min_inputs, limits.max_inputs) {
            return Ok(chosen);
        }

        // Mixing could not cover within the cap; the largest outputs are the
        // strongest set of each size.
        let sorted = utils::sorted_descending(candidates);
        utils::accumulate_between(&sorted, requirement, min_inputs, limits.max_inputs)
            .ok_or_else(|| utils::insufficient(candidates, requirement, limits.max_inputs))
    }
}

/// Draw one output per address type per round until both the minimum count
/// and the requirement are met, or the cap is reached.
fn round_robin(
    candidates: &[EnrichedUtxo],
    requirement: &Requirement,
    min_inputs: usize,
    max_inputs: usize,
) -> Option<Vec<EnrichedUtxo>> {
    let mut groups: BTreeMap<Option<AddressType>, VecDeque<EnrichedUtxo>> = BTreeMap::new();
    for utxo in utils::sorted_descending(candidates) {
        groups.entry(utxo.address_type).or_default().push_back(utxo);
    }

    let mut chosen = Vec::new();
    let mut total: u64 = 0;
    let done = |chosen: &Vec<EnrichedUtxo>, total: u64| {
        chosen.len() >= min_inputs && total >= requirement.for_inputs(chosen.len())
    };

    while chosen.len() < max_inputs && !done(&chosen, total) {
        let mut drew = false;
        for queue in groups.values_mut() {
            if chosen.len() >= max_inputs || done(&chosen, total) {
                break;
            }
            if let Some(utxo) = queue.pop_front() {
                total = total.saturating_add(utxo.value);
                chosen.push(utxo);
                drew = true;
            }
        }
        if !drew {
            break;
        }
    }

    done(&chosen, total).then_some(chosen)
}
