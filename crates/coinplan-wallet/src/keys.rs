//! Seed management and a reference HD address deriver.
//!
//! [`KeyChain`] implements [`AddressDeriver`] with BLAKE3 keyed derivation
//! over `(coin_type, account, chain, index)` from a 32-byte master seed.
//! Derivation is gated on a wallet password, checked against an Argon2 PHC
//! string; the password itself is never stored.
//!
//! This is enough for tests and offline tooling. Production wallets plug
//! their own deriver into the same trait.

use std::fmt;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use zeroize::{Zeroize, ZeroizeOnDrop};

use coinplan_core::address::{Address, AddressType};
use coinplan_core::error::DeriveError;
use coinplan_core::traits::{AddressDeriver, DerivationRequest};

/// BLAKE3 KDF context for address derivation.
const KDF_CONTEXT: &str = "coinplan-address-derivation-v1";

/// Upper bound on addresses per derivation call.
pub const MAX_DERIVE_COUNT: u32 = 1_000;

/// A 32-byte master seed. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Seed {
    bytes: [u8; 32],
}

impl Seed {
    /// Generate a random seed from the OS cryptographic RNG.
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut bytes = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Seed").field("bytes", &"[REDACTED]").finish()
    }
}

/// Password-gated deterministic address derivation from a master seed.
pub struct KeyChain {
    seed: Seed,
    /// Argon2 PHC string of the wallet password.
    password_hash: String,
}

impl KeyChain {
    /// Create a keychain locked with `password`.
    pub fn new(seed: Seed, password: &str) -> Result<Self, DeriveError> {
        if password.is_empty() {
            return Err(DeriveError::AuthenticationRequired);
        }
        use rand::RngCore;
        let mut salt_bytes = [0u8; 16];
        rand::rngs::OsRng.fill_bytes(&mut salt_bytes);
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| DeriveError::DerivationFailed(format!("salt: {e}")))?;
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| DeriveError::DerivationFailed(format!("password hash: {e}")))?
            .to_string();
        Ok(Self { seed, password_hash })
    }

    /// Rebuild a keychain from a stored PHC password hash.
    pub fn with_password_hash(seed: Seed, password_hash: String) -> Result<Self, DeriveError> {
        PasswordHash::new(&password_hash)
            .map_err(|e| DeriveError::DerivationFailed(format!("password hash: {e}")))?;
        Ok(Self { seed, password_hash })
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    fn authorize(&self, password: &str) -> Result<(), DeriveError> {
        if password.is_empty() {
            return Err(DeriveError::AuthenticationRequired);
        }
        let parsed = PasswordHash::new(&self.password_hash)
            .map_err(|e| DeriveError::DerivationFailed(format!("password hash: {e}")))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| DeriveError::AuthenticationRequired)
    }

    /// Address at one derivation path, without the password check.
    fn address_at(&self, request: &DerivationRequest<'_>, index: u32) -> Result<Address, DeriveError> {
        let mut ikm = Vec::with_capacity(48);
        ikm.extend_from_slice(self.seed.as_bytes());
        ikm.extend_from_slice(&request.coin_type.to_le_bytes());
        ikm.extend_from_slice(&request.account_index.to_le_bytes());
        ikm.extend_from_slice(&request.chain_type.index().to_le_bytes());
        ikm.extend_from_slice(&index.to_le_bytes());
        let derived = blake3::derive_key(KDF_CONTEXT, &ikm);
        ikm.zeroize();

        let encoded = bs58::encode(&derived[..20]).into_string();
        Address::parse(&format!("{}{encoded}", type_prefix(request.address_type)))
            .map_err(|e| DeriveError::DerivationFailed(e.to_string()))
    }
}

fn type_prefix(address_type: AddressType) -> &'static str {
    match address_type {
        AddressType::Main => "m",
        AddressType::Receiving => "r",
        AddressType::Change => "c",
    }
}

impl AddressDeriver for KeyChain {
    fn derive_addresses(&self, request: &DerivationRequest<'_>) -> Result<Vec<Address>, DeriveError> {
        self.authorize(request.password)?;
        if request.count > MAX_DERIVE_COUNT {
            return Err(DeriveError::DerivationFailed(format!(
                "count {} exceeds {MAX_DERIVE_COUNT}",
                request.count
            )));
        }
        (0..request.count).map(|i| self.address_at(request, i)).collect()
    }
}

impl fmt::Debug for KeyChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyChain")
            .field("seed", &self.seed)
            .field("password_hash", &"[REDACTED]")
            .finish()
    }
}
