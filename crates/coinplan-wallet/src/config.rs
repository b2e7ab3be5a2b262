//! Spend planning configuration.
//!
//! [`SpendConfig`] carries the tunables of the planner. It is read once per
//! request and passed down; nothing in the engine holds on to it. Values are
//! layered: built-in defaults, then an optional TOML file, then `COINPLAN_*`
//! environment variables (e.g. `COINPLAN_DUST_THRESHOLD=5000`).

use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use coinplan_core::constants::{
    BEST_FIT_MAX_SWAPS, CHANGE_ADDRESS_POOL_SIZE, DEFAULT_COIN_TYPE, DEFAULT_MAX_INPUTS, DUST_THRESHOLD,
    MAX_SELECTION_ITERATIONS, PRIVACY_MIN_INPUTS,
};

use crate::error::SpendError;
use crate::policy::SelectionPolicy;

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "COINPLAN";

/// Tunables for selection, assembly, and change derivation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SpendConfig {
    /// Outputs at or below this many satoshis are dust.
    pub dust_threshold: u64,
    /// Minimum inputs for the privacy-focused strategy. At least 2.
    pub privacy_min_inputs: usize,
    /// Improvement steps for the best-fit strategy.
    pub best_fit_max_swaps: usize,
    /// Fee/selection fixpoint rounds before giving up.
    pub max_selection_iterations: usize,
    /// Input cap for policies built from this config.
    pub default_max_inputs: usize,
    /// Internal-chain addresses derived when looking for a fresh change address.
    pub change_address_pool_size: u32,
    /// SLIP-44 coin type used for derivation.
    pub coin_type: u32,
    pub account_index: u32,
}

impl Default for SpendConfig {
    fn default() -> Self {
        Self {
            dust_threshold: DUST_THRESHOLD,
            privacy_min_inputs: PRIVACY_MIN_INPUTS,
            best_fit_max_swaps: BEST_FIT_MAX_SWAPS,
            max_selection_iterations: MAX_SELECTION_ITERATIONS,
            default_max_inputs: DEFAULT_MAX_INPUTS,
            change_address_pool_size: CHANGE_ADDRESS_POOL_SIZE,
            coin_type: DEFAULT_COIN_TYPE,
            account_index: 0,
        }
    }
}

impl SpendConfig {
    /// Load defaults, overlay `path` if it exists, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, SpendError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }
        let loaded = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize::<SpendConfig>())
            .map_err(|e| SpendError::Config(e.to_string()))?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<(), SpendError> {
        if self.privacy_min_inputs < 2 {
            return Err(SpendError::Config(format!(
                "privacy_min_inputs must be at least 2, got {}",
                self.privacy_min_inputs
            )));
        }
        if self.max_selection_iterations == 0 {
            return Err(SpendError::Config("max_selection_iterations must be non-zero".into()));
        }
        if self.change_address_pool_size == 0 {
            return Err(SpendError::Config("change_address_pool_size must be non-zero".into()));
        }
        if self.default_max_inputs == 0 {
            return Err(SpendError::Config("default_max_inputs must be non-zero".into()));
        }
        Ok(())
    }

    /// A default policy using this config's input cap.
    pub fn default_policy(&self) -> SelectionPolicy {
        SelectionPolicy::default().with_max_inputs(self.default_max_inputs)
    }
}
