//! Capability interfaces consumed by the engine.
//!
//! - [`UtxoSource`] — balance/UTXO/height retrieval (the data-access layer implements)
//! - [`AddressDeriver`] — HD address derivation (the key management layer implements)
//!
//! The engine never retries a failed call: retry and timeout policy belong
//! to the implementor and its caller.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::address::{Address, AddressType};
use crate::error::{DeriveError, NetworkError};
use crate::types::UnspentOutput;

/// Read access to the wallet's unspent outputs and the chain tip.
#[async_trait]
pub trait UtxoSource: Send + Sync {
    /// All unspent outputs currently owned by `address`.
    async fn get_utxos(&self, address: &Address) -> Result<Vec<UnspentOutput>, NetworkError>;

    /// Height of the current best block.
    async fn current_block_height(&self) -> Result<u64, NetworkError>;
}

/// BIP-44 chain within an account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainType {
    /// Chain 0: addresses handed out for receiving.
    External,
    /// Chain 1: addresses used for change.
    Internal,
}

impl ChainType {
    pub fn index(&self) -> u32 {
        match self {
            ChainType::External => 0,
            ChainType::Internal => 1,
        }
    }
}

/// Parameters of one derivation call.
///
/// Borrows the password so the caller keeps sole ownership of the secret.
#[derive(Clone, Copy)]
pub struct DerivationRequest<'a> {
    pub password: &'a str,
    pub account_index: u32,
    /// Number of consecutive addresses to derive, starting at index 0.
    pub count: u32,
    pub address_type: AddressType,
    pub chain_type: ChainType,
    pub coin_type: u32,
}

impl std::fmt::Debug for DerivationRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivationRequest")
            .field("password", &"[REDACTED]")
            .field("account_index", &self.account_index)
            .field("count", &self.count)
            .field("address_type", &self.address_type)
            .field("chain_type", &self.chain_type)
            .field("coin_type", &self.coin_type)
            .finish()
    }
}

/// Hierarchical-deterministic address derivation.
///
/// Requires wallet-secret authorization. Implementations return
/// [`DeriveError::AuthenticationRequired`] when the password is missing or
/// wrong, and [`DeriveError::DerivationFailed`] for anything else.
pub trait AddressDeriver: Send + Sync {
    fn derive_addresses(&self, request: &DerivationRequest<'_>) -> Result<Vec<Address>, DeriveError>;
}
