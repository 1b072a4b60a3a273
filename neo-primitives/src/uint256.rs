//! Implementation of `UInt256`, a 256-bit transaction hash.

use crate::error::{PrimitiveError, PrimitiveResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// The length of `UInt256` values in bytes.
pub const UINT256_SIZE: usize = 32;

/// Represents a 256-bit unsigned integer stored little-endian.
#[derive(Clone, Copy, Default, Eq, PartialEq, Hash)]
pub struct UInt256([u8; UINT256_SIZE]);

impl UInt256 {
    /// Alias matching C# `UInt256.Length`.
    pub const LENGTH: usize = UINT256_SIZE;

    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self([0u8; UINT256_SIZE])
    }

    #[inline]
    #[must_use]
    pub const fn from_array(bytes: [u8; UINT256_SIZE]) -> Self {
        Self(bytes)
    }

    #[inline]
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// Creates a new `UInt256` from a little-endian byte slice.
    ///
    /// # Errors
    ///
    /// Returns `PrimitiveError::InvalidFormat` if the input is not exactly 32 bytes.
    pub fn from_bytes(value: &[u8]) -> PrimitiveResult<Self> {
        let bytes: [u8; UINT256_SIZE] =
            value
                .try_into()
                .map_err(|_| PrimitiveError::InvalidFormat {
                    message: format!("Invalid UInt256 length: {}", value.len()),
                })?;
        Ok(Self(bytes))
    }

    /// Single SHA-256 of `data`, the hash used for transaction identifiers.
    #[must_use]
    pub fn sha256(data: &[u8]) -> Self {
        let mut bytes = [0u8; UINT256_SIZE];
        bytes.copy_from_slice(&Sha256::digest(data));
        Self(bytes)
    }

    #[inline]
    #[must_use]
    pub const fn to_array(&self) -> [u8; UINT256_SIZE] {
        self.0
    }

    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Parses a `UInt256` from a big-endian hexadecimal string with optional `0x`.
    ///
    /// # Errors
    ///
    /// Returns `PrimitiveError::InvalidFormat` if the input is not 64 hex digits.
    pub fn parse(s: &str) -> PrimitiveResult<Self> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.len() != UINT256_SIZE * 2 {
            return Err(PrimitiveError::InvalidFormat {
                message: format!("UInt256 expects {} hex digits", UINT256_SIZE * 2),
            });
        }
        let mut bytes = hex::decode(digits).map_err(|err| PrimitiveError::InvalidFormat {
            message: err.to_string(),
        })?;
        bytes.reverse();
        Self::from_bytes(&bytes)
    }

    #[must_use]
    pub fn to_hex_string(&self) -> String {
        let mut bytes = self.0;
        bytes.reverse();
        format!("0x{}", hex::encode(bytes))
    }
}

impl Ord for UInt256 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.iter().rev().cmp(other.0.iter().rev())
    }
}

impl PartialOrd for UInt256 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for UInt256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex_string())
    }
}

impl fmt::Debug for UInt256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UInt256({})", self.to_hex_string())
    }
}

impl FromStr for UInt256 {
    type Err = PrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for UInt256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex_string())
    }
}

impl<'de> Deserialize<'de> for UInt256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}
