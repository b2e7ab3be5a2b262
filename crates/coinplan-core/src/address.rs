//! Wallet addresses and the wallet chain they belong to.
//!
//! The engine never decodes an address: it only compares, copies, and hands
//! them to the signer. An [`Address`] is therefore an opaque string that is
//! validated once on parse (non-empty, ASCII alphanumeric, bounded length),
//! which covers base58 and bech32 encodings alike.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{AddressError, ParseError};

/// Longest address string accepted (bech32 limit).
pub const MAX_ADDRESS_LEN: usize = 90;

/// An opaque wallet or destination address.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(String);

impl Address {
    /// Validate and wrap an address string.
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        if s.is_empty() {
            return Err(AddressError::Empty);
        }
        if s.len() > MAX_ADDRESS_LEN {
            return Err(AddressError::TooLong {
                len: s.len(),
                max: MAX_ADDRESS_LEN,
            });
        }
        if let Some(c) = s.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(AddressError::InvalidCharacter(c));
        }
        Ok(Self(s.to_string()))
    }

    /// The address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Which wallet chain an address was handed out from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressType {
    /// The wallet's primary (imported or first) address.
    Main,
    /// External-chain receiving address.
    Receiving,
    /// Internal-chain change address.
    Change,
}

impl AddressType {
    /// Lowercase name used in config files and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressType::Main => "main",
            AddressType::Receiving => "receiving",
            AddressType::Change => "change",
        }
    }
}

impl fmt::Display for AddressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AddressType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "main" => Ok(AddressType::Main),
            "receiving" => Ok(AddressType::Receiving),
            "change" => Ok(AddressType::Change),
            other => Err(ParseError::UnknownAddressType(other.to_string())),
        }
    }
}
