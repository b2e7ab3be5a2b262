//! Dust consolidation: sweep as many small outputs as the cap allows.
//!
//! The target is a floor, not a stopping point. Candidates are taken
//! ascending by value up to `max_inputs`, so dust goes first and small
//! non-dust outputs fill the remaining slots. If that prefix cannot cover
//! the requirement, the non-dust slots are refilled with the largest
//! outputs, giving up dust slots one at a time until the total covers.

use super::utils::{self, cmp_ascending};
use super::{Requirement, SelectionLimits, Strategy};
use crate::enrich::EnrichedUtxo;
use crate::error::SpendError;

pub struct ConsolidateDustStrategy;

impl Strategy for ConsolidateDustStrategy {
    fn name(&self) -> &'static str {
        "consolidate-dust"
    }

    fn choose(
        &self,
        candidates: &[EnrichedUtxo],
        requirement: &Requirement,
        limits: &SelectionLimits,
    ) -> Result<Vec<EnrichedUtxo>, SpendError> {
        let sorted = utils::sorted_ascending(candidates);
        let cap = limits.max_inputs.min(sorted.len());
        let sweep = &sorted[..cap];
        if utils::total_value(sweep) >= requirement.for_inputs(sweep.len()) {
            return Ok(sweep.to_vec());
        }

        let (dust, rest): (Vec<_>, Vec<_>) = sorted.iter().cloned().partition(|u| u.is_dust);
        let largest_rest = utils::sorted_descending(&rest);
        let fewest_dust = cap.saturating_sub(rest.len());
        for keep in (fewest_dust..=dust.len().min(cap)).rev() {
            let mut chosen: Vec<EnrichedUtxo> = dust[..keep].to_vec();
            chosen.extend(largest_rest.iter().take(cap - keep).cloned());
            if utils::total_value(&chosen) >= requirement.for_inputs(chosen.len()) {
                chosen.sort_by(cmp_ascending);
                return Ok(chosen);
            }
        }

        // Last resort: the largest outputs overall.
        let descending = utils::sorted_descending(candidates);
        let mut chosen = utils::accumulate(&descending, requirement, cap)
            .ok_or_else(|| utils::insufficient(candidates, requirement, cap))?;
        chosen.sort_by(cmp_ascending);
        Ok(chosen)
    }
}
