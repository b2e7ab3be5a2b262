//! Coin selection under fee, size and confirmation constraints.
//!
//! [`CoinSelector::select`] filters the enriched UTXO set by the policy and
//! hands the chosen [`Strategy`] a [`Requirement`]: the target plus the fee
//! for however many inputs the strategy ends up taking. Every input added
//! has to pay for itself, so a funded wallet is selected in one round even
//! when most of its outputs are close to uneconomic.
//!
//! The result is then checked against the fee for its actual input count.
//! A shortfall raises the fee floor and selection runs again, bounded by
//! the iteration budget.

pub mod strategies;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use coinplan_core::address::Address;
use coinplan_core::constants::{
    BEST_FIT_MAX_SWAPS, DUST_THRESHOLD, MAX_SELECTION_ITERATIONS, PRIVACY_MIN_INPUTS,
    SELECTION_OUTPUT_COUNT,
};
use coinplan_core::types::FeeRate;

use crate::config::SpendConfig;
use crate::enrich::EnrichedUtxo;
use crate::error::SpendError;
use crate::fee::{estimate_fee, input_cost};
use crate::policy::{SelectionPolicy, SelectionStrategy};
use strategies::{Requirement, SelectionLimits, Strategy};

/// Outcome of coin selection: which UTXOs to spend and the fee/change split.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SelectionResult {
    /// Inputs in transaction order.
    pub inputs: Vec<EnrichedUtxo>,
    pub total_input_value: u64,
    /// Fee for this input count and two outputs.
    pub fee: u64,
    /// Value left over after the destination and the fee. May be zero or dust.
    pub change_value: u64,
    /// The policy's change override, when a change output will exist.
    pub change_address: Option<Address>,
    pub strategy: SelectionStrategy,
    /// Fixpoint rounds used; 1 when the first estimate held.
    pub iterations: usize,
}

/// Strategy-driven coin selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinSelector {
    pub dust_threshold: u64,
    pub privacy_min_inputs: usize,
    pub best_fit_max_swaps: usize,
    pub max_iterations: usize,
}

impl Default for CoinSelector {
    fn default() -> Self {
        Self {
            dust_threshold: DUST_THRESHOLD,
            privacy_min_inputs: PRIVACY_MIN_INPUTS,
            best_fit_max_swaps: BEST_FIT_MAX_SWAPS,
            max_iterations: MAX_SELECTION_ITERATIONS,
        }
    }
}

/// Amount the inputs must cover for a given fee.
fn required_for(target: u64, fee: u64, subtract_fee: bool) -> Result<u64, SpendError> {
    if subtract_fee {
        return Ok(target);
    }
    target
        .checked_add(fee)
        .ok_or_else(|| SpendError::InvalidAmount(format!("amount {target} plus fee {fee} overflows")))
}

fn fee_for(input_count: usize, fee_rate: FeeRate) -> u64 {
    estimate_fee(input_count, SELECTION_OUTPUT_COUNT as usize, fee_rate)
}

impl CoinSelector {
    pub fn from_config(config: &SpendConfig) -> Self {
        Self {
            dust_threshold: config.dust_threshold,
            privacy_min_inputs: config.privacy_min_inputs,
            best_fit_max_swaps: config.best_fit_max_swaps,
            max_iterations: config.max_selection_iterations,
        }
    }

    fn limits(&self, policy: &SelectionPolicy) -> SelectionLimits {
        SelectionLimits {
            max_inputs: policy.max_inputs,
            privacy_min_inputs: self.privacy_min_inputs,
            best_fit_max_swaps: self.best_fit_max_swaps,
        }
    }

    /// UTXOs the policy allows to be spent automatically.
    pub fn eligible(utxos: &[EnrichedUtxo], policy: &SelectionPolicy) -> Vec<EnrichedUtxo> {
        if policy.is_consolidation() {
            return utxos.to_vec();
        }
        utxos
            .iter()
            .filter(|u| u.confirmations >= policy.min_confirmations)
            .cloned()
            .collect()
    }

    /// Select inputs to send `target` satoshis under `policy`.
    ///
    /// # Errors
    /// - [`SpendError::InvalidAmount`] for a zero target
    /// - [`SpendError::InvalidPolicy`] for a zero input cap or a malformed
    ///   manual selection
    /// - [`SpendError::InsufficientFunds`] when no admissible subset covers
    ///   the target plus its fee
    /// - [`SpendError::SelectionDidNotConverge`] when no round produced a
    ///   selection paying its own fee within `max_iterations` rounds
    pub fn select(
        &self,
        utxos: &[EnrichedUtxo],
        target: u64,
        policy: &SelectionPolicy,
    ) -> Result<SelectionResult, SpendError> {
        if target == 0 {
            return Err(SpendError::InvalidAmount("target must be non-zero".into()));
        }
        if policy.max_inputs == 0 {
            return Err(SpendError::InvalidPolicy("max_inputs must be at least 1".into()));
        }

        let Some(strategy) = strategies::for_kind(policy.strategy) else {
            return self.select_manual(utxos, target, policy);
        };

        let candidates = Self::eligible(utxos, policy);
        let subtract = policy.subtract_fee_from_amount;
        if candidates.is_empty() {
            return Err(SpendError::InsufficientFunds {
                available: 0,
                required: required_for(target, fee_for(1, policy.fee_rate), subtract)?,
            });
        }

        let limits = self.limits(policy);
        let mut fee = fee_for(1, policy.fee_rate);
        required_for(target, fee, subtract)?;

        for iteration in 1..=self.max_iterations {
            let requirement = if subtract {
                Requirement::fixed(target)
            } else {
                Requirement::with_fee(target, policy.fee_rate).with_min_fee(fee)
            };
            let chosen = strategy.choose(&candidates, &requirement, &limits)?;
            let actual_fee = fee_for(chosen.len(), policy.fee_rate);
            let total = strategies::utils::total_value(&chosen);
            let needed = required_for(target, actual_fee, subtract)?;

            debug!(
                strategy = strategy.name(),
                iteration,
                inputs = chosen.len(),
                total,
                fee_floor = fee,
                actual_fee,
                "selection round"
            );

            if total >= needed {
                return Ok(self.finish(chosen, total, actual_fee, total - needed, policy, iteration));
            }
            fee = fee.max(actual_fee);
        }

        Err(SpendError::SelectionDidNotConverge {
            iterations: self.max_iterations,
        })
    }

    /// Spend exactly the outpoints in `policy.manual_selection`, in order.
    ///
    /// Outpoints are resolved against the full UTXO set, so confirmation
    /// filtering does not apply to an explicit choice.
    pub fn select_manual(
        &self,
        utxos: &[EnrichedUtxo],
        target: u64,
        policy: &SelectionPolicy,
    ) -> Result<SelectionResult, SpendError> {
        let subtract = policy.subtract_fee_from_amount;
        let outpoints = policy.manual_selection.as_deref().unwrap_or_default();
        if outpoints.is_empty() {
            return Err(SpendError::InsufficientManualSelection {
                available: 0,
                required: required_for(target, fee_for(0, policy.fee_rate), subtract)?,
            });
        }
        if outpoints.len() > policy.max_inputs {
            return Err(SpendError::InvalidPolicy(format!(
                "manual selection has {} inputs, cap is {}",
                outpoints.len(),
                policy.max_inputs
            )));
        }

        let mut seen = HashSet::with_capacity(outpoints.len());
        let mut chosen = Vec::with_capacity(outpoints.len());
        for outpoint in outpoints {
            if !seen.insert(*outpoint) {
                return Err(SpendError::InvalidPolicy(format!("duplicate outpoint {outpoint}")));
            }
            let utxo = utxos
                .iter()
                .find(|u| u.outpoint() == *outpoint)
                .ok_or_else(|| SpendError::UnknownUtxo(outpoint.to_string()))?;
            chosen.push(utxo.clone());
        }

        let total = strategies::utils::total_value(&chosen);
        let fee = fee_for(chosen.len(), policy.fee_rate);
        let required = required_for(target, fee, subtract)?;
        if total < required {
            return Err(SpendError::InsufficientManualSelection {
                available: total,
                required,
            });
        }

        debug!(inputs = chosen.len(), total, fee, "manual selection");
        Ok(self.finish(chosen, total, fee, total - required, policy, 1))
    }

    fn finish(
        &self,
        inputs: Vec<EnrichedUtxo>,
        total_input_value: u64,
        fee: u64,
        change_value: u64,
        policy: &SelectionPolicy,
        iterations: usize,
    ) -> SelectionResult {
        let change_address = if change_value > self.dust_threshold && !policy.is_consolidation() {
            policy.change_address.clone()
        } else {
            None
        };
        SelectionResult {
            inputs,
            total_input_value,
            fee,
            change_value,
            change_address,
            strategy: policy.strategy,
            iterations,
        }
    }

    /// Largest amount a single-output "send max" could carry.
    ///
    /// Takes eligible UTXOs largest first, up to the input cap, and skips any
    /// whose value does not pay for its own input. Zero when nothing is
    /// worth spending. A subtract-fee request for the gross value of those
    /// inputs delivers exactly this amount, since their change is zero and
    /// the assembled transaction has a single output.
    pub fn max_spendable(&self, utxos: &[EnrichedUtxo], policy: &SelectionPolicy) -> u64 {
        let cost = input_cost(policy.fee_rate);
        let sorted = strategies::utils::sorted_descending(&Self::eligible(utxos, policy));
        let spend: Vec<EnrichedUtxo> = sorted
            .into_iter()
            .take_while(|u| u.value > cost)
            .take(policy.max_inputs)
            .collect();
        if spend.is_empty() {
            return 0;
        }
        strategies::utils::total_value(&spend)
            .saturating_sub(estimate_fee(spend.len(), 1, policy.fee_rate))
    }
}
