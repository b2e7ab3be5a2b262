//! Smallest-first selection: spend small outputs before large ones.
//!
//! Favors cleaning up small UTXOs over a low input count.

use super::utils;
use super::{Requirement, SelectionLimits, Strategy};
use crate::enrich::EnrichedUtxo;
use crate::error::SpendError;

pub struct SmallestFirstStrategy;

impl Strategy for SmallestFirstStrategy {
    fn name(&self) -> &'static str {
        "smallest-first"
    }

    fn choose(
        &self,
        candidates: &[EnrichedUtxo],
        requirement: &Requirement,
        limits: &SelectionLimits,
    ) -> Result<Vec<EnrichedUtxo>, SpendError> {
        let sorted = utils::sorted_ascending(candidates);
        utils::accumulate_ascending(&sorted, requirement, limits.max_inputs)
            .ok_or_else(|| utils::insufficient(candidates, requirement, limits.max_inputs))
    }
}
