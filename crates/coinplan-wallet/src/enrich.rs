//! UTXO enrichment: raw backend records to typed selection candidates.
//!
//! [`enrich`] is a pure function of the raw outputs, the chain height and
//! the dust threshold. It is recomputed for every spend request and never
//! cached, so a reorg or a newly confirmed block is picked up on the next
//! call without any invalidation logic.

use serde::{Deserialize, Serialize};

use coinplan_core::address::{Address, AddressType};
use coinplan_core::types::{OutPoint, Txid, UnspentOutput};

/// A UTXO annotated with confirmation and dust information for selection.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EnrichedUtxo {
    pub txid: Txid,
    pub vout: u32,
    /// Value in satoshis.
    pub value: u64,
    /// `current_height - height + 1`, or 0 when unmined or above the tip.
    pub confirmations: u64,
    pub is_confirmed: bool,
    /// Recency proxy; equal to `confirmations`.
    pub age_in_blocks: u64,
    /// `value <= dust_threshold`.
    pub is_dust: bool,
    /// Owning address.
    pub address: Address,
    pub address_type: Option<AddressType>,
}

impl EnrichedUtxo {
    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.txid, self.vout)
    }
}

/// Confirmation count of an output mined at `height` when the tip is at
/// `current_height`. Floors at zero for heights above the tip.
pub fn confirmations(height: Option<u64>, current_height: u64) -> u64 {
    match height {
        Some(h) if h <= current_height => current_height - h + 1,
        _ => 0,
    }
}

/// Enrich raw unspent outputs for selection.
///
/// Output order matches input order. Empty in, empty out.
pub fn enrich(raw: &[UnspentOutput], current_height: u64, dust_threshold: u64) -> Vec<EnrichedUtxo> {
    raw.iter()
        .map(|utxo| {
            let confirmations = confirmations(utxo.height, current_height);
            EnrichedUtxo {
                txid: utxo.txid,
                vout: utxo.vout,
                value: utxo.value,
                confirmations,
                is_confirmed: confirmations >= 1,
                age_in_blocks: confirmations,
                is_dust: utxo.value <= dust_threshold,
                address: utxo.address.clone(),
                address_type: utxo.address_type,
            }
        })
        .collect()
}

/// Balance breakdown of an enriched UTXO set.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct UtxoSummary {
    /// Value of outputs with at least one confirmation.
    pub confirmed: u64,
    /// Value of outputs still in the mempool.
    pub unconfirmed: u64,
    /// Value held in dust outputs (confirmed or not).
    pub dust: u64,
    pub utxo_count: usize,
    pub dust_count: usize,
}

impl UtxoSummary {
    pub fn total(&self) -> u64 {
        self.confirmed.saturating_add(self.unconfirmed)
    }
}

/// Summarize balances of an enriched set.
pub fn summarize(utxos: &[EnrichedUtxo]) -> UtxoSummary {
    let mut summary = UtxoSummary {
        utxo_count: utxos.len(),
        ..UtxoSummary::default()
    };
    for utxo in utxos {
        if utxo.is_confirmed {
            summary.confirmed = summary.confirmed.saturating_add(utxo.value);
        } else {
            summary.unconfirmed = summary.unconfirmed.saturating_add(utxo.value);
        }
        if utxo.is_dust {
            summary.dust = summary.dust.saturating_add(utxo.value);
            summary.dust_count += 1;
        }
    }
    summary
}
