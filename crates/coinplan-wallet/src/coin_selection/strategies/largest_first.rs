//! Largest-first selection: fewest inputs, usually the largest change.

use super::utils;
use super::{Requirement, SelectionLimits, Strategy};
use crate::enrich::EnrichedUtxo;
use crate::error::SpendError;

pub struct LargestFirstStrategy;

impl Strategy for LargestFirstStrategy {
    fn name(&self) -> &'static str {
        "largest-first"
    }

    fn choose(
        &self,
        candidates: &[EnrichedUtxo],
        requirement: &Requirement,
        limits: &SelectionLimits,
    ) -> Result<Vec<EnrichedUtxo>, SpendError> {
        // The capped descending prefix is the largest-valued subset of that
        // size, so failing here means nothing within the cap can cover.
        let sorted = utils::sorted_descending(candidates);
        utils::accumulate(&sorted, requirement, limits.max_inputs)
            .ok_or_else(|| utils::insufficient(candidates, requirement, limits.max_inputs))
    }
}
