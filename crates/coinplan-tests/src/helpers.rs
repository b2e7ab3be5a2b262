//! Shared test helpers for property and scenario tests.

use coinplan_core::address::{Address, AddressType};
use coinplan_core::constants::DUST_THRESHOLD;
use coinplan_core::types::{Txid, UnspentOutput};
use coinplan_wallet::{EnrichedUtxo, SelectionStrategy, UtxoSnapshot, enrich};

/// Chain tip used by every helper.
pub const TIP: u64 = 1_000;

/// Every strategy that goes through the selection engine.
pub const AUTOMATIC: [SelectionStrategy; 5] = [
    SelectionStrategy::BestFit,
    SelectionStrategy::SmallestFirst,
    SelectionStrategy::LargestFirst,
    SelectionStrategy::PrivacyFocused,
    SelectionStrategy::ConsolidateDust,
];

/// A distinct txid per `n`.
pub fn txid(n: u32) -> Txid {
    let mut bytes = [0u8; 32];
    bytes[..4].copy_from_slice(&n.to_be_bytes());
    bytes[31] = 0xC0;
    Txid(bytes)
}

pub fn address(name: &str) -> Address {
    Address::parse(name).unwrap()
}

/// An output owned by one of four wallet addresses, alternating address type.
pub fn raw_utxo(n: u32, value: u64, height: Option<u64>) -> UnspentOutput {
    UnspentOutput {
        txid: txid(n),
        vout: n % 2,
        value,
        address: address(&format!("owner{}", n % 4)),
        height,
        address_type: Some(if n % 2 == 0 {
            AddressType::Receiving
        } else {
            AddressType::Change
        }),
    }
}

/// Outputs with the given values, each with six confirmations at [`TIP`].
pub fn raw_utxos(values: &[u64]) -> Vec<UnspentOutput> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| raw_utxo(i as u32, v, Some(TIP - 5)))
        .collect()
}

/// Outputs from `(value, confirmations)` pairs; zero confirmations means
/// still in the mempool.
pub fn raw_utxos_with_confs(pairs: &[(u64, u64)]) -> Vec<UnspentOutput> {
    pairs
        .iter()
        .enumerate()
        .map(|(i, &(v, confs))| {
            let height = (confs > 0).then(|| TIP + 1 - confs);
            raw_utxo(i as u32, v, height)
        })
        .collect()
}

pub fn enriched(values: &[u64]) -> Vec<EnrichedUtxo> {
    enrich(&raw_utxos(values), TIP, DUST_THRESHOLD)
}

pub fn snapshot(values: &[u64]) -> UtxoSnapshot {
    UtxoSnapshot {
        height: TIP,
        utxos: raw_utxos(values),
    }
}

pub fn destination() -> Address {
    address("destination0")
}
