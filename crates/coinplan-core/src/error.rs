//! Error types shared across coinplan crates.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("empty address")] Empty,
    #[error("invalid character: {0:?}")] InvalidCharacter(char),
    #[error("address too long: {len} > {max}")] TooLong { len: usize, max: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid txid: {0}")] InvalidTxid(String),
    #[error("invalid outpoint: {0}")] InvalidOutPoint(String),
    #[error("invalid fee rate: {0}")] InvalidFeeRate(String),
    #[error("unknown address type: {0}")] UnknownAddressType(String),
    #[error("unknown strategy: {0}")] UnknownStrategy(String),
}

/// Failure reported by the data-access collaborator. Passed through unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("request timed out")] Timeout,
    #[error("backend unavailable: {0}")] Unavailable(String),
    #[error("malformed response: {0}")] MalformedResponse(String),
}

/// Failure reported by the HD address derivation capability.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeriveError {
    #[error("authentication required")] AuthenticationRequired,
    #[error("derivation failed: {0}")] DerivationFailed(String),
}
