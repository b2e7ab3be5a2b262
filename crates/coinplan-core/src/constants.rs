//! Policy constants. All monetary values in satoshis.

/// Outputs at or below this value are dust: spending them costs about as much
/// in fee as they are worth, and the assembler never creates one as change.
pub const DUST_THRESHOLD: u64 = 10_000;

/// Fixed transaction overhead in virtual bytes (version, locktime, counts).
pub const TX_OVERHEAD_VBYTES: u64 = 10;

/// Virtual size of one legacy pay-to-pubkey-hash input.
pub const INPUT_VBYTES: u64 = 148;

/// Virtual size of one pay-to-pubkey-hash output.
pub const OUTPUT_VBYTES: u64 = 34;

/// Fee rates are stored as satoshis per this many virtual bytes.
pub const FEE_RATE_SCALE: u64 = 1_000;

/// Outputs counted by the selection fee estimate: destination plus change.
pub const SELECTION_OUTPUT_COUNT: u64 = 2;

/// Minimum input count forced by the privacy-focused strategy.
pub const PRIVACY_MIN_INPUTS: usize = 2;

/// Upper bound on local-improvement steps taken by the best-fit strategy.
pub const BEST_FIT_MAX_SWAPS: usize = 8;

/// Upper bound on fee/selection fixpoint iterations.
pub const MAX_SELECTION_ITERATIONS: usize = 4;

/// Input cap applied when a policy does not set one.
pub const DEFAULT_MAX_INPUTS: usize = 100;

/// Number of candidate change addresses derived per HD change lookup.
pub const CHANGE_ADDRESS_POOL_SIZE: u32 = 5;

/// SLIP-44 coin type used when none is configured.
pub const DEFAULT_COIN_TYPE: u32 = 0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dust_threshold_is_ten_thousand_sats() {
        assert_eq!(DUST_THRESHOLD, 10_000);
    }

    #[test]
    fn privacy_forces_multiple_inputs() {
        assert!(PRIVACY_MIN_INPUTS >= 2);
    }

    #[test]
    fn single_input_tx_size() {
        let vbytes = TX_OVERHEAD_VBYTES + INPUT_VBYTES + SELECTION_OUTPUT_COUNT * OUTPUT_VBYTES;
        assert_eq!(vbytes, 226);
    }
}
