//! Spend policy: which strategy to run and under which constraints.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use coinplan_core::address::Address;
use coinplan_core::constants::DEFAULT_MAX_INPUTS;
use coinplan_core::error::ParseError;
use coinplan_core::types::{FeeRate, OutPoint};

/// Coin selection objective.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionStrategy {
    /// Minimize leftover change.
    #[default]
    BestFit,
    /// Spend small outputs first, leaving fewer dust outputs behind.
    SmallestFirst,
    /// Spend large outputs first, minimizing input count.
    LargestFirst,
    /// Force several inputs, mixed across address types.
    PrivacyFocused,
    /// Sweep dust into one output, including unconfirmed dust.
    ConsolidateDust,
    /// Spend exactly the outputs the user picked.
    Manual,
}

impl SelectionStrategy {
    pub const ALL: [SelectionStrategy; 6] = [
        SelectionStrategy::BestFit,
        SelectionStrategy::SmallestFirst,
        SelectionStrategy::LargestFirst,
        SelectionStrategy::PrivacyFocused,
        SelectionStrategy::ConsolidateDust,
        SelectionStrategy::Manual,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionStrategy::BestFit => "best-fit",
            SelectionStrategy::SmallestFirst => "smallest-first",
            SelectionStrategy::LargestFirst => "largest-first",
            SelectionStrategy::PrivacyFocused => "privacy-focused",
            SelectionStrategy::ConsolidateDust => "consolidate-dust",
            SelectionStrategy::Manual => "manual",
        }
    }
}

impl fmt::Display for SelectionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectionStrategy {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| ParseError::UnknownStrategy(s.to_string()))
    }
}

/// Constraints and preferences for one spend.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SelectionPolicy {
    pub strategy: SelectionStrategy,
    pub fee_rate: FeeRate,
    /// Hard cap on the number of inputs.
    pub max_inputs: usize,
    /// UTXOs with fewer confirmations are skipped (except when consolidating dust).
    pub min_confirmations: u64,
    /// Outpoints to spend verbatim under [`SelectionStrategy::Manual`].
    #[serde(default)]
    pub manual_selection: Option<Vec<OutPoint>>,
    /// Where change goes instead of the default.
    #[serde(default)]
    pub change_address: Option<Address>,
    /// Deduct the fee from the destination amount instead of adding it.
    #[serde(default)]
    pub subtract_fee_from_amount: bool,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            strategy: SelectionStrategy::BestFit,
            fee_rate: FeeRate::from_sat_per_vb(1),
            max_inputs: DEFAULT_MAX_INPUTS,
            min_confirmations: 1,
            manual_selection: None,
            change_address: None,
            subtract_fee_from_amount: false,
        }
    }
}

impl SelectionPolicy {
    pub fn with_strategy(mut self, strategy: SelectionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_fee_rate(mut self, fee_rate: FeeRate) -> Self {
        self.fee_rate = fee_rate;
        self
    }

    pub fn with_max_inputs(mut self, max_inputs: usize) -> Self {
        self.max_inputs = max_inputs;
        self
    }

    pub fn with_min_confirmations(mut self, min_confirmations: u64) -> Self {
        self.min_confirmations = min_confirmations;
        self
    }

    /// Switch to manual mode spending exactly `outpoints`.
    pub fn with_manual_selection(mut self, outpoints: Vec<OutPoint>) -> Self {
        self.strategy = SelectionStrategy::Manual;
        self.manual_selection = Some(outpoints);
        self
    }

    pub fn with_change_address(mut self, address: Address) -> Self {
        self.change_address = Some(address);
        self
    }

    pub fn with_subtract_fee(mut self, subtract: bool) -> Self {
        self.subtract_fee_from_amount = subtract;
        self
    }

    pub fn is_consolidation(&self) -> bool {
        self.strategy == SelectionStrategy::ConsolidateDust
    }
}
