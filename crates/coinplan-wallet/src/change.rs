//! HD change-address resolution.
//!
//! [`HdChangeResolver`] asks an [`AddressDeriver`] for a small pool of
//! internal-chain change addresses and returns the first one that none of
//! the spent inputs already uses, so change does not land back on an
//! address being emptied. The assembler falls back to the first input's
//! address when resolution fails.

use tracing::debug;
use zeroize::Zeroizing;

use coinplan_core::address::{Address, AddressType};
use coinplan_core::constants::{CHANGE_ADDRESS_POOL_SIZE, DEFAULT_COIN_TYPE};
use coinplan_core::error::DeriveError;
use coinplan_core::traits::{AddressDeriver, ChainType, DerivationRequest};

use crate::config::SpendConfig;
use crate::enrich::EnrichedUtxo;

/// Resolves a change address through an injected deriver.
pub struct HdChangeResolver<'a> {
    deriver: &'a dyn AddressDeriver,
    password: Option<Zeroizing<String>>,
    account_index: u32,
    coin_type: u32,
    pool_size: u32,
}

impl<'a> HdChangeResolver<'a> {
    pub fn new(deriver: &'a dyn AddressDeriver) -> Self {
        Self {
            deriver,
            password: None,
            account_index: 0,
            coin_type: DEFAULT_COIN_TYPE,
            pool_size: CHANGE_ADDRESS_POOL_SIZE,
        }
    }

    /// A resolver using the account, coin type and pool size from `config`.
    pub fn from_config(deriver: &'a dyn AddressDeriver, config: &SpendConfig) -> Self {
        Self {
            account_index: config.account_index,
            coin_type: config.coin_type,
            pool_size: config.change_address_pool_size,
            ..Self::new(deriver)
        }
    }

    /// Supply the wallet password. Without it every resolution fails with
    /// [`DeriveError::AuthenticationRequired`].
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(Zeroizing::new(password.into()));
        self
    }

    /// Derive change for another account than the configured one.
    pub fn with_account(mut self, account_index: u32) -> Self {
        self.account_index = account_index;
        self
    }

    pub fn with_pool_size(mut self, pool_size: u32) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Pick a change address for a transaction spending `inputs`.
    pub fn resolve(&self, inputs: &[EnrichedUtxo]) -> Result<Address, DeriveError> {
        let password = self.password.as_ref().ok_or(DeriveError::AuthenticationRequired)?;
        let request = DerivationRequest {
            password: password.as_str(),
            account_index: self.account_index,
            count: self.pool_size,
            address_type: AddressType::Change,
            chain_type: ChainType::Internal,
            coin_type: self.coin_type,
        };
        let pool = self.deriver.derive_addresses(&request)?;

        let fresh = pool
            .iter()
            .position(|candidate| inputs.iter().all(|u| u.address != *candidate));
        debug!(pool = pool.len(), fresh_index = ?fresh, "derived change pool");

        let index = fresh.unwrap_or(0);
        pool.into_iter()
            .nth(index)
            .ok_or_else(|| DeriveError::DerivationFailed("deriver returned no addresses".into()))
    }
}
