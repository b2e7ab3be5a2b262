//! Transaction assembly from a coin selection.
//!
//! Turns a [`SelectionResult`] into an unsigned [`TransactionSkeleton`]:
//! 1. Settle the destination amount (net of the fee in subtract-fee mode)
//! 2. Compute change, folding dust change into the fee
//! 3. Choose the change address
//! 4. Emit the destination output first and change second
//!
//! In subtract-fee mode, change that will be folded leaves a single-output
//! transaction, so the destination pays the one-output fee rather than the
//! two-output figure selection planned with.
//!
//! The skeleton always balances: inputs equal outputs plus fee.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use coinplan_core::address::Address;
use coinplan_core::constants::DUST_THRESHOLD;
use coinplan_core::types::OutPoint;

use crate::change::HdChangeResolver;
use crate::coin_selection::SelectionResult;
use crate::error::SpendError;
use crate::fee::estimate_fee;
use crate::policy::{SelectionPolicy, SelectionStrategy};

/// An input of the unsigned transaction.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SkeletonInput {
    pub outpoint: OutPoint,
    pub value: u64,
    /// Address whose key signs this input.
    pub address: Address,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Destination,
    Change,
}

/// An output of the unsigned transaction.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SkeletonOutput {
    pub address: Address,
    pub value: u64,
    pub kind: OutputKind,
}

/// Unsigned transaction handed to an external signer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TransactionSkeleton {
    pub inputs: Vec<SkeletonInput>,
    /// Destination first, then change if any.
    pub outputs: Vec<SkeletonOutput>,
    /// Final fee, including any dust change absorbed into it.
    pub fee: u64,
    pub strategy: SelectionStrategy,
}

impl TransactionSkeleton {
    pub fn total_input(&self) -> u64 {
        self.inputs.iter().fold(0u64, |acc, i| acc.saturating_add(i.value))
    }

    pub fn total_output(&self) -> u64 {
        self.outputs.iter().fold(0u64, |acc, o| acc.saturating_add(o.value))
    }

    pub fn destination(&self) -> Option<&SkeletonOutput> {
        self.outputs.iter().find(|o| o.kind == OutputKind::Destination)
    }

    pub fn change(&self) -> Option<&SkeletonOutput> {
        self.outputs.iter().find(|o| o.kind == OutputKind::Change)
    }

    /// `Σinputs == Σoutputs + fee`.
    pub fn is_balanced(&self) -> bool {
        self.total_output().checked_add(self.fee) == Some(self.total_input())
    }
}

/// Builds skeletons from selections.
///
/// # Example
/// ```ignore
/// let skeleton = TransactionAssembler::new(config.dust_threshold)
///     .with_change_resolver(&resolver)
///     .assemble(&selection, &destination, amount, &policy)?;
/// ```
pub struct TransactionAssembler<'a> {
    dust_threshold: u64,
    change_resolver: Option<&'a HdChangeResolver<'a>>,
}

impl Default for TransactionAssembler<'_> {
    fn default() -> Self {
        Self::new(DUST_THRESHOLD)
    }
}

impl<'a> TransactionAssembler<'a> {
    pub fn new(dust_threshold: u64) -> Self {
        Self {
            dust_threshold,
            change_resolver: None,
        }
    }

    /// Derive change addresses through `resolver` when the policy names none.
    pub fn with_change_resolver(mut self, resolver: &'a HdChangeResolver<'a>) -> Self {
        self.change_resolver = Some(resolver);
        self
    }

    /// Assemble the unsigned transaction for sending `amount` to `destination`.
    ///
    /// # Errors
    /// - [`SpendError::InvalidAmount`] for a zero amount or a selection that
    ///   does not cover it
    /// - [`SpendError::AmountBelowDustAfterFee`] when the destination would
    ///   receive dust
    pub fn assemble(
        &self,
        selection: &SelectionResult,
        destination: &Address,
        amount: u64,
        policy: &SelectionPolicy,
    ) -> Result<TransactionSkeleton, SpendError> {
        if amount == 0 {
            return Err(SpendError::InvalidAmount("amount must be non-zero".into()));
        }
        let total = selection.total_input_value;
        let fee = selection.fee;
        let uncovered = || {
            SpendError::InvalidAmount(format!(
                "selection of {total} does not cover amount {amount} and fee {fee}"
            ))
        };

        let (send_amount, change, fee) = if policy.subtract_fee_from_amount {
            let change = total.checked_sub(amount).ok_or_else(uncovered)?;
            let fee = if change <= self.dust_threshold {
                estimate_fee(selection.inputs.len(), 1, policy.fee_rate)
            } else {
                fee
            };
            (amount.saturating_sub(fee), change, fee)
        } else {
            let change = total
                .checked_sub(amount)
                .and_then(|rest| rest.checked_sub(fee))
                .ok_or_else(uncovered)?;
            (amount, change, fee)
        };

        if send_amount <= self.dust_threshold {
            return Err(SpendError::AmountBelowDustAfterFee {
                amount: send_amount,
                dust_threshold: self.dust_threshold,
            });
        }
        let (change, fee) = if change <= self.dust_threshold {
            if change > 0 {
                debug!(change, "dust change folded into fee");
            }
            (0, fee + change)
        } else {
            (change, fee)
        };

        let mut outputs = vec![SkeletonOutput {
            address: destination.clone(),
            value: send_amount,
            kind: OutputKind::Destination,
        }];
        if change > 0 {
            outputs.push(SkeletonOutput {
                address: self.change_address(selection, destination, policy)?,
                value: change,
                kind: OutputKind::Change,
            });
        }

        let inputs = selection
            .inputs
            .iter()
            .map(|u| SkeletonInput {
                outpoint: u.outpoint(),
                value: u.value,
                address: u.address.clone(),
            })
            .collect();

        Ok(TransactionSkeleton {
            inputs,
            outputs,
            fee,
            strategy: selection.strategy,
        })
    }

    /// Only called when a change output will be created.
    fn change_address(
        &self,
        selection: &SelectionResult,
        destination: &Address,
        policy: &SelectionPolicy,
    ) -> Result<Address, SpendError> {
        if policy.is_consolidation() {
            return Ok(destination.clone());
        }
        if let Some(address) = &policy.change_address {
            return Ok(address.clone());
        }
        if let Some(resolver) = self.change_resolver {
            match resolver.resolve(&selection.inputs) {
                Ok(address) => return Ok(address),
                Err(e) => warn!(error = %e, "HD change derivation failed, using source address"),
            }
        }
        selection
            .inputs
            .first()
            .map(|u| u.address.clone())
            .ok_or_else(|| SpendError::InvalidPolicy("selection has no inputs".into()))
    }
}

#[cfg(test)]
mod tests {
    use coinplan_core::error::DeriveError;
    use coinplan_core::traits::{AddressDeriver, DerivationRequest};
    use coinplan_core::types::FeeRate;

    use super::*;
    use crate::coin_selection::strategies::utils::test_support::utxo;
    use crate::enrich::EnrichedUtxo;

    fn selection(inputs: Vec<EnrichedUtxo>, fee: u64, strategy: SelectionStrategy) -> SelectionResult {
        let total_input_value = inputs.iter().map(|u| u.value).sum();
        SelectionResult {
            inputs,
            total_input_value,
            fee,
            change_value: 0,
            change_address: None,
            strategy,
            iterations: 1,
        }
    }

    fn dest() -> Address {
        Address::parse("destination1").unwrap()
    }

    struct FailingDeriver;

    impl AddressDeriver for FailingDeriver {
        fn derive_addresses(&self, _: &DerivationRequest<'_>) -> Result<Vec<Address>, DeriveError> {
            Err(DeriveError::DerivationFailed("device unplugged".into()))
        }
    }

    struct OneAddress;

    impl AddressDeriver for OneAddress {
        fn derive_addresses(&self, _: &DerivationRequest<'_>) -> Result<Vec<Address>, DeriveError> {
            Ok(vec![Address::parse("hdchange0").unwrap()])
        }
    }

    #[test]
    fn destination_then_change() {
        let sel = selection(vec![utxo(1, 50_000_000)], 226, SelectionStrategy::BestFit);
        let tx = TransactionAssembler::default()
            .assemble(&sel, &dest(), 40_000_000, &SelectionPolicy::default())
            .unwrap();
        assert_eq!(tx.outputs.len(), 2);
        assert_eq!(tx.outputs[0].kind, OutputKind::Destination);
        assert_eq!(tx.outputs[0].value, 40_000_000);
        assert_eq!(tx.outputs[1].kind, OutputKind::Change);
        assert_eq!(tx.outputs[1].value, 50_000_000 - 40_000_000 - 226);
        assert_eq!(tx.fee, 226);
        assert!(tx.is_balanced());
    }

    #[test]
    fn default_change_goes_to_first_input() {
        let sel = selection(vec![utxo(4, 30_000), utxo(5, 90_000)], 500, SelectionStrategy::BestFit);
        let tx = TransactionAssembler::default()
            .assemble(&sel, &dest(), 50_000, &SelectionPolicy::default())
            .unwrap();
        assert_eq!(tx.change().unwrap().address.as_str(), "addr4");
    }

    #[test]
    fn dust_change_folded_into_fee() {
        let sel = selection(vec![utxo(1, 108_226)], 226, SelectionStrategy::BestFit);
        let tx = TransactionAssembler::default()
            .assemble(&sel, &dest(), 100_000, &SelectionPolicy::default())
            .unwrap();
        assert_eq!(tx.outputs.len(), 1);
        assert_eq!(tx.fee, 8_226);
        assert!(tx.change().is_none());
        assert!(tx.is_balanced());
    }

    #[test]
    fn change_at_threshold_is_dust() {
        let sel = selection(vec![utxo(1, 110_226)], 226, SelectionStrategy::BestFit);
        let tx = TransactionAssembler::default()
            .assemble(&sel, &dest(), 100_000, &SelectionPolicy::default())
            .unwrap();
        assert!(tx.change().is_none());
        assert_eq!(tx.fee, 10_226);
    }

    #[test]
    fn subtract_fee_from_destination() {
        // 1 input: 10_000 with one output, 11_771 with two
        let rate = FeeRate::from_sat_per_kvb(52_083);
        let sel = selection(vec![utxo(1, 1_000_000)], estimate_fee(1, 2, rate), SelectionStrategy::BestFit);
        let policy = SelectionPolicy::default().with_subtract_fee(true).with_fee_rate(rate);
        let tx = TransactionAssembler::default()
            .assemble(&sel, &dest(), 1_000_000, &policy)
            .unwrap();
        assert_eq!(tx.destination().unwrap().value, 990_000);
        assert_eq!(tx.fee, 10_000);
        assert_eq!(tx.outputs.len(), 1);
        assert!(tx.is_balanced());
    }

    #[test]
    fn subtract_fee_down_to_dust_rejected() {
        let rate = FeeRate::from_sat_per_kvb(31_250);
        assert_eq!(estimate_fee(1, 1, rate), 6_000);
        let sel = selection(vec![utxo(1, 15_000)], estimate_fee(1, 2, rate), SelectionStrategy::BestFit);
        let policy = SelectionPolicy::default().with_subtract_fee(true).with_fee_rate(rate);
        let err = TransactionAssembler::default()
            .assemble(&sel, &dest(), 15_000, &policy)
            .unwrap_err();
        assert_eq!(
            err,
            SpendError::AmountBelowDustAfterFee {
                amount: 9_000,
                dust_threshold: 10_000
            }
        );
    }

    #[test]
    fn sweep_at_dust_edge_uses_single_output_fee() {
        // 10_202 - 226 would be dust; with the change folded only 192 is due.
        let sel = selection(vec![utxo(1, 10_202)], 226, SelectionStrategy::BestFit);
        let policy = SelectionPolicy::default().with_subtract_fee(true);
        let tx = TransactionAssembler::default()
            .assemble(&sel, &dest(), 10_202, &policy)
            .unwrap();
        assert_eq!(tx.destination().unwrap().value, 10_010);
        assert_eq!(tx.fee, 192);
        assert!(tx.change().is_none());
        assert!(tx.is_balanced());
    }

    #[test]
    fn subtract_fee_with_change_keeps_two_output_fee() {
        let sel = selection(vec![utxo(1, 1_000_000)], 226, SelectionStrategy::BestFit);
        let policy = SelectionPolicy::default().with_subtract_fee(true);
        let tx = TransactionAssembler::default()
            .assemble(&sel, &dest(), 500_000, &policy)
            .unwrap();
        assert_eq!(tx.destination().unwrap().value, 499_774);
        assert_eq!(tx.change().unwrap().value, 500_000);
        assert_eq!(tx.fee, 226);
        assert!(tx.is_balanced());
    }

    #[test]
    fn subtract_fee_folds_dust_change_into_fee() {
        let sel = selection(vec![utxo(1, 105_000)], 226, SelectionStrategy::BestFit);
        let policy = SelectionPolicy::default().with_subtract_fee(true);
        let tx = TransactionAssembler::default()
            .assemble(&sel, &dest(), 100_000, &policy)
            .unwrap();
        assert_eq!(tx.destination().unwrap().value, 100_000 - 192);
        assert_eq!(tx.fee, 192 + 5_000);
        assert!(tx.is_balanced());
    }

    #[test]
    fn dust_amount_rejected() {
        let sel = selection(vec![utxo(1, 50_000)], 226, SelectionStrategy::BestFit);
        let err = TransactionAssembler::default()
            .assemble(&sel, &dest(), 10_000, &SelectionPolicy::default())
            .unwrap_err();
        assert!(matches!(err, SpendError::AmountBelowDustAfterFee { .. }));
    }

    #[test]
    fn zero_amount_rejected() {
        let sel = selection(vec![utxo(1, 50_000)], 226, SelectionStrategy::BestFit);
        let err = TransactionAssembler::default()
            .assemble(&sel, &dest(), 0, &SelectionPolicy::default())
            .unwrap_err();
        assert!(matches!(err, SpendError::InvalidAmount(_)));
    }

    #[test]
    fn uncovered_selection_rejected() {
        let sel = selection(vec![utxo(1, 50_000)], 226, SelectionStrategy::BestFit);
        let err = TransactionAssembler::default()
            .assemble(&sel, &dest(), 49_900, &SelectionPolicy::default())
            .unwrap_err();
        assert!(matches!(err, SpendError::InvalidAmount(_)));
    }

    #[test]
    fn consolidation_change_goes_to_destination() {
        let sel = selection(
            vec![utxo(1, 5_000), utxo(2, 6_000), utxo(3, 20_000_000)],
            522,
            SelectionStrategy::ConsolidateDust,
        );
        let policy = SelectionPolicy::default()
            .with_strategy(SelectionStrategy::ConsolidateDust)
            .with_change_address(Address::parse("ignored").unwrap());
        let tx = TransactionAssembler::default()
            .assemble(&sel, &dest(), 15_000_000, &policy)
            .unwrap();
        assert_eq!(tx.change().unwrap().address, dest());
        assert_eq!(tx.inputs.len(), 3);
    }

    #[test]
    fn policy_override_beats_resolver() {
        let deriver = OneAddress;
        let resolver = HdChangeResolver::new(&deriver).with_password("pw");
        let sel = selection(vec![utxo(1, 500_000)], 226, SelectionStrategy::BestFit);
        let policy = SelectionPolicy::default().with_change_address(Address::parse("mine").unwrap());
        let tx = TransactionAssembler::default()
            .with_change_resolver(&resolver)
            .assemble(&sel, &dest(), 100_000, &policy)
            .unwrap();
        assert_eq!(tx.change().unwrap().address.as_str(), "mine");
    }

    #[test]
    fn resolver_supplies_change() {
        let deriver = OneAddress;
        let resolver = HdChangeResolver::new(&deriver).with_password("pw");
        let sel = selection(vec![utxo(1, 500_000)], 226, SelectionStrategy::BestFit);
        let tx = TransactionAssembler::default()
            .with_change_resolver(&resolver)
            .assemble(&sel, &dest(), 100_000, &SelectionPolicy::default())
            .unwrap();
        assert_eq!(tx.change().unwrap().address.as_str(), "hdchange0");
    }

    #[test]
    fn resolver_failure_falls_back_to_source() {
        let deriver = FailingDeriver;
        let resolver = HdChangeResolver::new(&deriver).with_password("pw");
        let sel = selection(vec![utxo(7, 500_000)], 226, SelectionStrategy::BestFit);
        let tx = TransactionAssembler::default()
            .with_change_resolver(&resolver)
            .assemble(&sel, &dest(), 100_000, &SelectionPolicy::default())
            .unwrap();
        assert_eq!(tx.change().unwrap().address.as_str(), "addr7");
    }

    #[test]
    fn resolver_without_password_falls_back() {
        let deriver = OneAddress;
        let resolver = HdChangeResolver::new(&deriver);
        let sel = selection(vec![utxo(2, 500_000)], 226, SelectionStrategy::BestFit);
        let tx = TransactionAssembler::default()
            .with_change_resolver(&resolver)
            .assemble(&sel, &dest(), 100_000, &SelectionPolicy::default())
            .unwrap();
        assert_eq!(tx.change().unwrap().address.as_str(), "addr2");
    }

    #[test]
    fn inputs_keep_selection_order() {
        let sel = selection(vec![utxo(3, 70_000), utxo(1, 30_000)], 374, SelectionStrategy::Manual);
        let tx = TransactionAssembler::default()
            .assemble(&sel, &dest(), 60_000, &SelectionPolicy::default())
            .unwrap();
        let values: Vec<_> = tx.inputs.iter().map(|i| i.value).collect();
        assert_eq!(values, vec![70_000, 30_000]);
        assert_eq!(tx.strategy, SelectionStrategy::Manual);
    }

    #[test]
    fn skeleton_serializes_for_signer() {
        let sel = selection(vec![utxo(1, 500_000)], 226, SelectionStrategy::BestFit);
        let tx = TransactionAssembler::default()
            .assemble(&sel, &dest(), 100_000, &SelectionPolicy::default())
            .unwrap();
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["outputs"][0]["kind"], "destination");
        assert_eq!(json["outputs"][1]["kind"], "change");
        assert_eq!(json["strategy"], "best-fit");
        let back: TransactionSkeleton = serde_json::from_value(json).unwrap();
        assert_eq!(back, tx);
    }
}
