//! Size-based fee estimation.
//!
//! The estimate is `ceil(vbytes * rate / 1000)` with
//! `vbytes = overhead + inputs * INPUT_VBYTES + outputs * OUTPUT_VBYTES`.
//! It is non-decreasing in both counts, which is what lets the
//! fee/selection fixpoint in [`crate::coin_selection`] settle.

use coinplan_core::constants::{FEE_RATE_SCALE, INPUT_VBYTES, OUTPUT_VBYTES, TX_OVERHEAD_VBYTES};
use coinplan_core::types::FeeRate;

/// Approximate virtual size of a transaction with the given shape.
pub fn estimate_vbytes(input_count: usize, output_count: usize) -> u64 {
    TX_OVERHEAD_VBYTES
        .saturating_add((input_count as u64).saturating_mul(INPUT_VBYTES))
        .saturating_add((output_count as u64).saturating_mul(OUTPUT_VBYTES))
}

/// Fee in satoshis, rounded up to the next whole satoshi.
pub fn estimate_fee(input_count: usize, output_count: usize, fee_rate: FeeRate) -> u64 {
    let scaled = (estimate_vbytes(input_count, output_count) as u128)
        * (fee_rate.as_sat_per_kvb() as u128);
    let fee = scaled.div_ceil(FEE_RATE_SCALE as u128);
    u64::try_from(fee).unwrap_or(u64::MAX)
}

/// Fee attributable to one extra input at `fee_rate`.
pub fn input_cost(fee_rate: FeeRate) -> u64 {
    let scaled = (INPUT_VBYTES as u128) * (fee_rate.as_sat_per_kvb() as u128);
    u64::try_from(scaled.div_ceil(FEE_RATE_SCALE as u128)).unwrap_or(u64::MAX)
}
