//! Implementation of `UInt160`, a 160-bit script hash.

use crate::error::{PrimitiveError, PrimitiveResult};
use ripemd::Ripemd160;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// The length of `UInt160` values in bytes.
pub const UINT160_SIZE: usize = 20;

/// Represents a 160-bit unsigned integer stored little-endian.
///
/// Script hashes identify contracts and multi-signature accounts. The
/// textual form is `0x` followed by the big-endian hex digits.
#[derive(Clone, Copy, Default, Eq, PartialEq, Hash)]
pub struct UInt160([u8; UINT160_SIZE]);

impl UInt160 {
    /// Alias matching C# `UInt160.Length`.
    pub const LENGTH: usize = UINT160_SIZE;

    /// Returns a zero `UInt160`.
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self([0u8; UINT160_SIZE])
    }

    /// Wraps a little-endian byte array.
    #[inline]
    #[must_use]
    pub const fn from_array(bytes: [u8; UINT160_SIZE]) -> Self {
        Self(bytes)
    }

    /// Checks if this `UInt160` is zero.
    #[inline]
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// Creates a new `UInt160` from a little-endian byte slice.
    ///
    /// # Errors
    ///
    /// Returns `PrimitiveError::InvalidFormat` if the input is not exactly 20 bytes.
    pub fn from_bytes(value: &[u8]) -> PrimitiveResult<Self> {
        let bytes: [u8; UINT160_SIZE] =
            value
                .try_into()
                .map_err(|_| PrimitiveError::InvalidFormat {
                    message: format!("Invalid UInt160 length: {}", value.len()),
                })?;
        Ok(Self(bytes))
    }

    /// Computes the script hash (`RIPEMD160(SHA256(script))`) of a VM script.
    #[must_use]
    pub fn from_script(script: &[u8]) -> Self {
        let sha = Sha256::digest(script);
        let digest = Ripemd160::digest(sha);
        let mut bytes = [0u8; UINT160_SIZE];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// Little-endian bytes.
    #[inline]
    #[must_use]
    pub const fn to_array(&self) -> [u8; UINT160_SIZE] {
        self.0
    }

    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Parses a `UInt160` from a big-endian hexadecimal string with optional `0x`.
    ///
    /// # Errors
    ///
    /// Returns `PrimitiveError::InvalidFormat` if the input is not 40 hex digits.
    pub fn parse(s: &str) -> PrimitiveResult<Self> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.len() != UINT160_SIZE * 2 {
            return Err(PrimitiveError::InvalidFormat {
                message: format!("UInt160 expects {} hex digits", UINT160_SIZE * 2),
            });
        }
        let mut bytes = hex::decode(digits).map_err(|err| PrimitiveError::InvalidFormat {
            message: err.to_string(),
        })?;
        bytes.reverse();
        Self::from_bytes(&bytes)
    }

    /// Converts the `UInt160` to its `0x`-prefixed big-endian hex form.
    #[must_use]
    pub fn to_hex_string(&self) -> String {
        let mut bytes = self.0;
        bytes.reverse();
        format!("0x{}", hex::encode(bytes))
    }
}

impl Ord for UInt160 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.iter().rev().cmp(other.0.iter().rev())
    }
}

impl PartialOrd for UInt160 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for UInt160 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex_string())
    }
}

impl fmt::Debug for UInt160 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UInt160({})", self.to_hex_string())
    }
}

impl FromStr for UInt160 {
    type Err = PrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for UInt160 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex_string())
    }
}

impl<'de> Deserialize<'de> for UInt160 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        let hash = UInt160::parse("0xfe924b7cfe89ddd271abaf7210a80a7e11178758").unwrap();
        assert_eq!(
            hash.to_hex_string(),
            "0xfe924b7cfe89ddd271abaf7210a80a7e11178758"
        );
        assert_eq!(hash.to_array()[0], 0x58);
        assert_eq!(hash.to_array()[19], 0xfe);
    }

    #[test]
    fn test_parse_rejects_bad_length() {
        assert!(UInt160::parse("0x1234").is_err());
        assert!(UInt160::from_bytes(&[0u8; 21]).is_err());
    }

    #[test]
    fn test_ordering_is_numeric() {
        let low = UInt160::parse("0x0000000000000000000000000000000000000001").unwrap();
        let high = UInt160::parse("0x1000000000000000000000000000000000000000").unwrap();
        assert!(low < high);
        assert!(UInt160::zero() < low);
    }

    #[test]
    fn test_from_script_is_stable() {
        let a = UInt160::from_script(&[0x11, 0x41]);
        let b = UInt160::from_script(&[0x11, 0x41]);
        assert_eq!(a, b);
        assert_ne!(a, UInt160::from_script(&[0x12, 0x41]));
    }
}
