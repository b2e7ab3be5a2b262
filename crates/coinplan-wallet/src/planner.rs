//! End-to-end spend planning.
//!
//! [`SpendPlanner`] ties the pieces together. The only I/O is
//! [`SpendPlanner::fetch_snapshot`], which awaits the [`UtxoSource`] once;
//! everything after that ([`SpendPlanner::plan`]) is a pure pipeline of
//! enrichment, selection, and assembly over the snapshot. Re-planning after
//! a preference change is just another call to `plan`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use coinplan_core::address::Address;
use coinplan_core::traits::UtxoSource;
use coinplan_core::types::UnspentOutput;
use coinplan_core::utxo_source::SnapshotFile;

use crate::builder::{TransactionAssembler, TransactionSkeleton};
use crate::change::HdChangeResolver;
use crate::coin_selection::CoinSelector;
use crate::config::SpendConfig;
use crate::enrich::{self, EnrichedUtxo, UtxoSummary};
use crate::error::SpendError;
use crate::policy::SelectionPolicy;

/// The wallet's UTXOs and the chain height they were read at.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct UtxoSnapshot {
    pub height: u64,
    pub utxos: Vec<UnspentOutput>,
}

impl From<SnapshotFile> for UtxoSnapshot {
    fn from(file: SnapshotFile) -> Self {
        Self {
            height: file.height,
            utxos: file.utxos,
        }
    }
}

/// One spend to plan.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SpendRequest {
    pub destination: Address,
    /// Satoshis to send. Under subtract-fee, the fee comes out of this.
    pub amount: u64,
    pub policy: SelectionPolicy,
}

/// Plans spends under a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct SpendPlanner {
    config: SpendConfig,
}

impl SpendPlanner {
    pub fn new(config: SpendConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SpendConfig {
        &self.config
    }

    /// Read the chain height and every UTXO owned by `addresses`.
    ///
    /// Network errors are returned as-is; nothing is retried. An output
    /// reported under more than one address is kept once.
    pub async fn fetch_snapshot(
        &self,
        source: &dyn UtxoSource,
        addresses: &[Address],
    ) -> Result<UtxoSnapshot, SpendError> {
        let height = source.current_block_height().await?;
        let mut by_outpoint = BTreeMap::new();
        for address in addresses {
            let utxos = source.get_utxos(address).await?;
            debug!(%address, count = utxos.len(), "fetched utxos");
            for utxo in utxos {
                by_outpoint.entry(utxo.outpoint()).or_insert(utxo);
            }
        }
        Ok(UtxoSnapshot {
            height,
            utxos: by_outpoint.into_values().collect(),
        })
    }

    fn enriched(&self, snapshot: &UtxoSnapshot) -> Vec<EnrichedUtxo> {
        enrich::enrich(&snapshot.utxos, snapshot.height, self.config.dust_threshold)
    }

    /// Balance breakdown of a snapshot.
    pub fn summary(&self, snapshot: &UtxoSnapshot) -> UtxoSummary {
        enrich::summarize(&self.enriched(snapshot))
    }

    /// Largest amount a single-output send could carry under `policy`.
    pub fn max_spendable(&self, snapshot: &UtxoSnapshot, policy: &SelectionPolicy) -> u64 {
        CoinSelector::from_config(&self.config).max_spendable(&self.enriched(snapshot), policy)
    }

    /// Plan `request` against `snapshot`.
    ///
    /// When `resolver` is given it supplies the change address unless the
    /// policy names one; its failures fall back to the first input's
    /// address.
    pub fn plan(
        &self,
        snapshot: &UtxoSnapshot,
        request: &SpendRequest,
        resolver: Option<&HdChangeResolver<'_>>,
    ) -> Result<TransactionSkeleton, SpendError> {
        let utxos = self.enriched(snapshot);
        let selection =
            CoinSelector::from_config(&self.config).select(&utxos, request.amount, &request.policy)?;

        let mut assembler = TransactionAssembler::new(self.config.dust_threshold);
        if let Some(resolver) = resolver {
            assembler = assembler.with_change_resolver(resolver);
        }
        let skeleton = assembler.assemble(&selection, &request.destination, request.amount, &request.policy)?;

        info!(
            strategy = %skeleton.strategy,
            inputs = skeleton.inputs.len(),
            outputs = skeleton.outputs.len(),
            fee = skeleton.fee,
            iterations = selection.iterations,
            "spend planned"
        );
        Ok(skeleton)
    }
}
