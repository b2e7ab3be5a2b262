//! Core value types: transaction ids, outpoints, raw UTXOs, fee rates.
//!
//! All monetary values are in satoshis and held as `u64`; nothing in the
//! engine touches floating point.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::address::{Address, AddressType};
use crate::constants::FEE_RATE_SCALE;
use crate::error::ParseError;

/// A 32-byte transaction id.
///
/// Ordered byte-wise, which is the same order as its lowercase hex form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Txid(pub [u8; 32]);

impl fmt::Display for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for Txid {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| ParseError::InvalidTxid(s.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| ParseError::InvalidTxid(s.to_string()))?;
        Ok(Self(arr))
    }
}

impl Serialize for Txid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Txid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Reference to a specific output of a previous transaction.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutPoint {
    /// Transaction containing the output.
    pub txid: Txid,
    /// Index of the output within that transaction.
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: Txid, vout: u32) -> Self {
        Self { txid, vout }
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

impl FromStr for OutPoint {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (txid, vout) = s
            .split_once(':')
            .ok_or_else(|| ParseError::InvalidOutPoint(s.to_string()))?;
        let txid = txid.parse()?;
        let vout = vout
            .parse()
            .map_err(|_| ParseError::InvalidOutPoint(s.to_string()))?;
        Ok(Self { txid, vout })
    }
}

/// An unspent output as reported by the indexing backend.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UnspentOutput {
    pub txid: Txid,
    pub vout: u32,
    /// Value in satoshis.
    pub value: u64,
    /// Address that owns (can spend) this output.
    pub address: Address,
    /// Block height the output was mined at; `None` while in the mempool.
    #[serde(default)]
    pub height: Option<u64>,
    /// Wallet chain of `address`, when the data-access layer knows it.
    #[serde(default)]
    pub address_type: Option<AddressType>,
}

impl UnspentOutput {
    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.txid, self.vout)
    }
}

/// Fee rate in satoshis per 1000 virtual bytes.
///
/// The finer unit keeps fractional per-byte rates such as 2.5 sat/vB exact
/// in integer arithmetic.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FeeRate(u64);

impl FeeRate {
    pub const ZERO: Self = Self(0);

    /// Rate from whole satoshis per virtual byte.
    pub fn from_sat_per_vb(sat_per_vb: u64) -> Self {
        Self(sat_per_vb.saturating_mul(FEE_RATE_SCALE))
    }

    /// Rate from satoshis per 1000 virtual bytes.
    pub fn from_sat_per_kvb(sat_per_kvb: u64) -> Self {
        Self(sat_per_kvb)
    }

    pub fn as_sat_per_kvb(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for FeeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / FEE_RATE_SCALE;
        let frac = self.0 % FEE_RATE_SCALE;
        if frac == 0 {
            write!(f, "{whole} sat/vB")
        } else {
            let digits = format!("{frac:03}");
            write!(f, "{whole}.{} sat/vB", digits.trim_end_matches('0'))
        }
    }
}

/// Parses a decimal sat/vB rate with at most three fractional digits,
/// e.g. `"2"`, `"2.5"`, `"0.125"`.
impl FromStr for FeeRate {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidFeeRate(s.to_string());
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() || frac.len() > 3 {
            return Err(invalid());
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let whole: u64 = whole.parse().map_err(|_| invalid())?;
        let frac_scaled: u64 = if frac.is_empty() {
            0
        } else {
            format!("{frac:0<3}").parse().map_err(|_| invalid())?
        };
        whole
            .checked_mul(FEE_RATE_SCALE)
            .and_then(|v| v.checked_add(frac_scaled))
            .map(Self)
            .ok_or_else(invalid)
    }
}
