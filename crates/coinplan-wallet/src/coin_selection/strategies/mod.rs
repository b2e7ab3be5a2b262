//! Selection strategies.
//!
//! Each strategy answers one question: given the eligible candidates and a
//! [`Requirement`], which inputs should be spent, in which order? Every
//! input a strategy adds raises the fee, so coverage is always checked
//! against the requirement for the number of inputs actually chosen.

pub mod best_fit;
pub mod consolidate;
pub mod largest_first;
pub mod privacy_focused;
pub mod smallest_first;
pub mod utils;

use coinplan_core::constants::SELECTION_OUTPUT_COUNT;
use coinplan_core::types::FeeRate;

use crate::enrich::EnrichedUtxo;
use crate::error::SpendError;
use crate::fee::estimate_fee;
use crate::policy::SelectionStrategy;

/// What a selection of a given size must cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requirement {
    /// Amount the inputs must cover before fees.
    pub amount: u64,
    /// Rate the inputs pay for, or `None` when the fee comes out of the
    /// payment and only `amount` has to be covered.
    pub fee_rate: Option<FeeRate>,
    /// Fee assumed whatever the input count.
    pub min_fee: u64,
}

impl Requirement {
    /// A requirement that does not grow with the input count.
    pub fn fixed(amount: u64) -> Self {
        Self {
            amount,
            fee_rate: None,
            min_fee: 0,
        }
    }

    /// `amount` plus the fee for the chosen inputs and
    /// [`SELECTION_OUTPUT_COUNT`] outputs at `fee_rate`.
    pub fn with_fee(amount: u64, fee_rate: FeeRate) -> Self {
        Self {
            amount,
            fee_rate: Some(fee_rate),
            min_fee: 0,
        }
    }

    pub fn with_min_fee(mut self, min_fee: u64) -> Self {
        self.min_fee = min_fee;
        self
    }

    /// Total that `input_count` inputs must reach. Saturates at `u64::MAX`.
    pub fn for_inputs(&self, input_count: usize) -> u64 {
        match self.fee_rate {
            None => self.amount,
            Some(rate) => {
                let fee = estimate_fee(input_count, SELECTION_OUTPUT_COUNT as usize, rate).max(self.min_fee);
                self.amount.saturating_add(fee)
            }
        }
    }
}

/// Bounds a strategy must honor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionLimits {
    /// Hard cap on the number of chosen inputs.
    pub max_inputs: usize,
    /// Minimum inputs for the privacy-focused strategy.
    pub privacy_min_inputs: usize,
    /// Improvement steps allowed to the best-fit strategy.
    pub best_fit_max_swaps: usize,
}

/// A coin selection algorithm.
pub trait Strategy {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Choose `n` inputs from `candidates` whose total is at least
    /// `requirement.for_inputs(n)`.
    ///
    /// Returns [`SpendError::InsufficientFunds`] when no admissible subset
    /// covers the requirement for its own size. The returned order is the
    /// input order of the final transaction.
    fn choose(
        &self,
        candidates: &[EnrichedUtxo],
        requirement: &Requirement,
        limits: &SelectionLimits,
    ) -> Result<Vec<EnrichedUtxo>, SpendError>;
}

/// The algorithm behind a policy strategy. `None` for manual selection,
/// which bypasses the strategy engine.
pub fn for_kind(kind: SelectionStrategy) -> Option<Box<dyn Strategy>> {
    match kind {
        SelectionStrategy::BestFit => Some(Box::new(best_fit::BestFitStrategy)),
        SelectionStrategy::SmallestFirst => Some(Box::new(smallest_first::SmallestFirstStrategy)),
        SelectionStrategy::LargestFirst => Some(Box::new(largest_first::LargestFirstStrategy)),
        SelectionStrategy::PrivacyFocused => Some(Box::new(privacy_focused::PrivacyFocusedStrategy)),
        SelectionStrategy::ConsolidateDust => Some(Box::new(consolidate::ConsolidateDustStrategy)),
        SelectionStrategy::Manual => None,
    }
}
