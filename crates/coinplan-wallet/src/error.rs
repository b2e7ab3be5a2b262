//! Spend planning error types.

use coinplan_core::error::{DeriveError, NetworkError};
use thiserror::Error;

/// Errors that can occur while selecting coins or assembling a transaction.
///
/// Every variant is deterministic: the same UTXO snapshot and policy always
/// produce the same error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpendError {
    /// No subset of the eligible UTXOs covers the amount plus fee.
    #[error("insufficient funds: have {available}, need {required}")]
    InsufficientFunds {
        /// Total value of the eligible UTXOs in satoshis.
        available: u64,
        /// Amount plus fee that had to be covered.
        required: u64,
    },

    /// The explicitly chosen UTXOs do not cover the amount plus fee.
    #[error("manual selection insufficient: have {available}, need {required}")]
    InsufficientManualSelection {
        /// Total value of the manual selection in satoshis.
        available: u64,
        /// Amount plus fee for that many inputs.
        required: u64,
    },

    /// What the destination would receive is at or below the dust threshold.
    #[error("amount {amount} is at or below the dust threshold {dust_threshold} after fees")]
    AmountBelowDustAfterFee {
        /// Amount the destination output would carry.
        amount: u64,
        /// Dust threshold in effect.
        dust_threshold: u64,
    },

    /// The fee/selection fixpoint did not settle. Indicates a bug, not bad input.
    #[error("coin selection did not converge after {iterations} iterations")]
    SelectionDidNotConverge {
        /// Iterations attempted.
        iterations: usize,
    },

    /// A manually selected outpoint is not in the wallet's UTXO set.
    #[error("unknown UTXO: {0}")]
    UnknownUtxo(String),

    /// Invalid monetary amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Selection policy is internally inconsistent.
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    /// Configuration could not be loaded or failed validation.
    #[error("config: {0}")]
    Config(String),

    /// Data-access failure, passed through unchanged.
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// HD derivation failure.
    #[error(transparent)]
    Derive(#[from] DeriveError),
}
