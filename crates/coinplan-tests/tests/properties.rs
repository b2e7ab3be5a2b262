//! Property-based tests for the spend planning pipeline.
//!
//! Each property runs 256 cases with proptest shrinking to produce minimal
//! failing examples.
//!
//! Properties tested:
//! - Conservation: inputs equal outputs plus fee in every skeleton
//! - No dust change: a change output is absent or above the threshold
//! - Monotonic fee: the estimate never falls as the transaction grows
//! - Convergence: selections pay their own fee, and a funded set always
//!   selects in one round
//! - Manual fidelity: manual mode spends exactly what was asked, in order
//! - Determinism: the input order of the UTXO set does not matter

use proptest::prelude::*;

use coinplan_core::constants::{DUST_THRESHOLD, MAX_SELECTION_ITERATIONS, PRIVACY_MIN_INPUTS};
use coinplan_core::types::FeeRate;
use coinplan_tests::helpers::*;
use coinplan_wallet::{
    CoinSelector, SelectionPolicy, SelectionStrategy, SpendError, SpendPlanner, SpendRequest, UtxoSnapshot,
    enrich, estimate_fee,
};

fn automatic_strategy() -> impl Strategy<Value = SelectionStrategy> {
    prop::sample::select(AUTOMATIC.to_vec())
}

fn values() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(1_000u64..=50_000_000, 1..=20)
}

/// Whether some set of `min_inputs..=max_inputs` outputs covers `target`
/// plus its own fee. The largest `k` outputs are the strongest set of size
/// `k`, so checking descending prefixes is enough.
fn is_funded(values: &[u64], target: u64, rate: FeeRate, min_inputs: usize, max_inputs: usize) -> bool {
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    let mut sum = 0u64;
    sorted.iter().take(max_inputs).enumerate().any(|(i, v)| {
        sum += v;
        i + 1 >= min_inputs && sum >= target + estimate_fee(i + 1, 2, rate)
    })
}

// ---------------------------------------------------------------------------
// Conservation and dust handling
//
// Whatever the strategy, rate, or subtract-fee mode, a successful plan must
// balance exactly and never carry dust change. Failures must be one of the
// documented funding errors.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn plans_conserve_value(
        pairs in prop::collection::vec((1_000u64..=50_000_000, 0u64..=10), 1..=20),
        strategy in automatic_strategy(),
        sat_per_vb in 1u64..=50,
        target_permille in 1u64..=1_000,
        subtract in any::<bool>(),
    ) {
        let utxos = raw_utxos_with_confs(&pairs);
        let total: u64 = utxos.iter().map(|u| u.value).sum();
        let amount = (total / 1_000 * target_permille).max(1);
        let snapshot = UtxoSnapshot { height: TIP, utxos };
        let request = SpendRequest {
            destination: destination(),
            amount,
            policy: SelectionPolicy::default()
                .with_strategy(strategy)
                .with_fee_rate(FeeRate::from_sat_per_vb(sat_per_vb))
                .with_subtract_fee(subtract),
        };

        match SpendPlanner::default().plan(&snapshot, &request, None) {
            Ok(tx) => {
                prop_assert!(tx.is_balanced(), "unbalanced: {:?}", tx);
                let dest = tx.destination().unwrap();
                prop_assert!(dest.value > DUST_THRESHOLD);
                prop_assert_eq!(&tx.outputs[0], dest);
                if subtract {
                    prop_assert!(dest.value <= amount);
                } else {
                    prop_assert_eq!(dest.value, amount);
                }
                prop_assert!(tx.fee >= estimate_fee(tx.inputs.len(), tx.outputs.len(), request.policy.fee_rate));
            }
            Err(SpendError::InsufficientFunds { .. }) | Err(SpendError::AmountBelowDustAfterFee { .. }) => {}
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }

    #[test]
    fn change_is_never_dust(
        values in values(),
        strategy in automatic_strategy(),
        sat_per_vb in 1u64..=20,
        target_permille in 1u64..=900,
    ) {
        let snapshot = snapshot(&values);
        let total: u64 = values.iter().sum();
        let request = SpendRequest {
            destination: destination(),
            amount: (total / 1_000 * target_permille).max(1),
            policy: SelectionPolicy::default()
                .with_strategy(strategy)
                .with_fee_rate(FeeRate::from_sat_per_vb(sat_per_vb)),
        };
        if let Ok(tx) = SpendPlanner::default().plan(&snapshot, &request, None) {
            match tx.change() {
                Some(change) => prop_assert!(change.value > DUST_THRESHOLD),
                None => prop_assert_eq!(tx.outputs.len(), 1),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Fee monotonicity
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn fee_is_monotonic(
        inputs in 0usize..=500,
        outputs in 0usize..=50,
        sat_per_kvb in 0u64..=1_000_000,
    ) {
        let rate = FeeRate::from_sat_per_kvb(sat_per_kvb);
        let fee = estimate_fee(inputs, outputs, rate);
        prop_assert!(estimate_fee(inputs + 1, outputs, rate) >= fee);
        prop_assert!(estimate_fee(inputs, outputs + 1, rate) >= fee);
        prop_assert!(estimate_fee(inputs, outputs, FeeRate::from_sat_per_kvb(sat_per_kvb + 1)) >= fee);
    }
}

// ---------------------------------------------------------------------------
// Convergence
//
// A successful selection always pays the fee for its own input count within
// the iteration bound. Whenever some admissible set pays for itself, every
// strategy finds one in the first round, even when the outputs are barely
// worth their input cost.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn selection_pays_its_own_fee(
        values in values(),
        strategy in automatic_strategy(),
        sat_per_vb in 1u64..=50,
        target_permille in 1u64..=1_000,
    ) {
        let utxos = enriched(&values);
        let total: u64 = values.iter().sum();
        let target = (total / 1_000 * target_permille).max(1);
        let rate = FeeRate::from_sat_per_vb(sat_per_vb);
        let policy = SelectionPolicy::default().with_strategy(strategy).with_fee_rate(rate);

        match CoinSelector::default().select(&utxos, target, &policy) {
            Ok(result) => {
                prop_assert!(result.iterations >= 1 && result.iterations <= MAX_SELECTION_ITERATIONS);
                prop_assert_eq!(result.fee, estimate_fee(result.inputs.len(), 2, rate));
                prop_assert_eq!(result.total_input_value, target + result.fee + result.change_value);
                prop_assert!(result.inputs.len() <= policy.max_inputs);
            }
            Err(SpendError::InsufficientFunds { .. }) => {}
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }

    #[test]
    fn funded_sets_of_small_outputs_always_select(
        values in prop::collection::vec(1_500u64..=5_000, 1..=60),
        strategy in automatic_strategy(),
        sat_per_vb in 1u64..=10,
        target_permille in 1u64..=1_000,
    ) {
        let utxos = enriched(&values);
        let total: u64 = values.iter().sum();
        let target = (total / 1_000 * target_permille).max(1);
        let rate = FeeRate::from_sat_per_vb(sat_per_vb);
        let policy = SelectionPolicy::default().with_strategy(strategy).with_fee_rate(rate);
        let min_inputs = if strategy == SelectionStrategy::PrivacyFocused {
            PRIVACY_MIN_INPUTS.min(values.len())
        } else {
            1
        };
        let funded = is_funded(&values, target, rate, min_inputs, policy.max_inputs);

        match CoinSelector::default().select(&utxos, target, &policy) {
            Ok(result) => {
                prop_assert!(funded);
                prop_assert_eq!(result.iterations, 1);
                prop_assert!(result.total_input_value >= target + result.fee);
            }
            Err(SpendError::InsufficientFunds { .. }) => prop_assert!(!funded, "funded set was rejected"),
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }

    #[test]
    fn largest_first_converges_when_funded(
        values in prop::collection::vec(100_000u64..=50_000_000, 1..=20),
        sat_per_vb in 1u64..=10,
        target_permille in 1u64..=1_000,
    ) {
        let rate = FeeRate::from_sat_per_vb(sat_per_vb);
        let total: u64 = values.iter().sum();
        let budget = total - estimate_fee(values.len(), 2, rate);
        let target = (budget / 1_000 * target_permille).max(1);
        let policy = SelectionPolicy::default()
            .with_strategy(SelectionStrategy::LargestFirst)
            .with_fee_rate(rate);

        let result = CoinSelector::default().select(&enriched(&values), target, &policy);
        prop_assert!(result.is_ok(), "{:?}", result);
        prop_assert_eq!(result.unwrap().iterations, 1);
    }
}

// ---------------------------------------------------------------------------
// Manual selection fidelity
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn manual_spends_exactly_the_choice(
        values in prop::collection::vec(1_000u64..=5_000_000, 1..=12),
        picks in prop::collection::vec(any::<prop::sample::Index>(), 1..=6),
        target in 1u64..=10_000_000,
        sat_per_vb in 1u64..=20,
    ) {
        let utxos = enriched(&values);
        let mut chosen = Vec::new();
        for pick in &picks {
            let op = utxos[pick.index(utxos.len())].outpoint();
            if !chosen.contains(&op) {
                chosen.push(op);
            }
        }
        let rate = FeeRate::from_sat_per_vb(sat_per_vb);
        let policy = SelectionPolicy::default()
            .with_fee_rate(rate)
            .with_manual_selection(chosen.clone());

        let sum: u64 = utxos
            .iter()
            .filter(|u| chosen.contains(&u.outpoint()))
            .map(|u| u.value)
            .sum();
        let required = target + estimate_fee(chosen.len(), 2, rate);

        match CoinSelector::default().select(&utxos, target, &policy) {
            Ok(result) => {
                prop_assert!(sum >= required);
                let spent: Vec<_> = result.inputs.iter().map(|u| u.outpoint()).collect();
                prop_assert_eq!(spent, chosen);
                prop_assert_eq!(result.strategy, SelectionStrategy::Manual);
            }
            Err(SpendError::InsufficientManualSelection { available, required: r }) => {
                prop_assert!(sum < required);
                prop_assert_eq!(available, sum);
                prop_assert_eq!(r, required);
            }
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Determinism
//
// Selection depends on the set of UTXOs, not the order the backend
// returned them in.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn selection_ignores_input_order(
        values in prop::collection::vec(1_000u64..=1_000_000, 1..=20),
        strategy in automatic_strategy(),
        target_permille in 1u64..=1_000,
    ) {
        let raw = raw_utxos(&values);
        let forward = enrich(&raw, TIP, DUST_THRESHOLD);
        let mut backward = forward.clone();
        backward.reverse();

        let total: u64 = values.iter().sum();
        let target = (total / 1_000 * target_permille).max(1);
        let policy = SelectionPolicy::default().with_strategy(strategy);
        let selector = CoinSelector::default();

        prop_assert_eq!(
            selector.select(&forward, target, &policy),
            selector.select(&backward, target, &policy)
        );
    }
}
