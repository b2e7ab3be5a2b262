//! In-memory [`UtxoSource`] backed by a fixed snapshot.
//!
//! Used by tests and by the CLI, which loads a JSON snapshot exported from
//! the indexing backend. It can also be told to fail, to exercise error
//! pass-through.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::NetworkError;
use crate::traits::UtxoSource;
use crate::types::UnspentOutput;

/// Serialized form of a snapshot: chain height plus every known UTXO.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SnapshotFile {
    pub height: u64,
    pub utxos: Vec<UnspentOutput>,
}

/// A UTXO source answering from memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryUtxoSource {
    height: u64,
    by_address: BTreeMap<Address, Vec<UnspentOutput>>,
    failure: Option<NetworkError>,
}

impl MemoryUtxoSource {
    pub fn new(height: u64) -> Self {
        Self {
            height,
            ..Self::default()
        }
    }

    /// Build a source from a deserialized snapshot.
    pub fn from_snapshot(snapshot: SnapshotFile) -> Self {
        let mut source = Self::new(snapshot.height);
        for utxo in snapshot.utxos {
            source.insert(utxo);
        }
        source
    }

    /// Add an unspent output under its owning address.
    pub fn insert(&mut self, utxo: UnspentOutput) {
        self.by_address
            .entry(utxo.address.clone())
            .or_default()
            .push(utxo);
    }

    /// Make every subsequent call fail with `error`.
    pub fn fail_with(&mut self, error: NetworkError) {
        self.failure = Some(error);
    }

    /// Addresses that own at least one output.
    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.by_address.keys()
    }

    pub fn utxo_count(&self) -> usize {
        self.by_address.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl UtxoSource for MemoryUtxoSource {
    async fn get_utxos(&self, address: &Address) -> Result<Vec<UnspentOutput>, NetworkError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        Ok(self.by_address.get(address).cloned().unwrap_or_default())
    }

    async fn current_block_height(&self) -> Result<u64, NetworkError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        Ok(self.height)
    }
}
