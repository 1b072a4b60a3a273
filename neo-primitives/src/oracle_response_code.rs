//! `OracleResponseCode` - the status byte carried by every oracle response.

use crate::error::PrimitiveError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Represents the response code for the oracle request.
///
/// Byte values are the on-chain encoding and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OracleResponseCode {
    /// Indicates that the request has been successfully completed.
    Success = 0x00,
    /// Indicates that the protocol of the request is not supported.
    ProtocolNotSupported = 0x10,
    /// Indicates that the requested Uri does not exist.
    NotFound = 0x14,
    /// Indicates that the request was not completed within the specified time.
    Timeout = 0x16,
    /// Indicates that there is no permission to request the resource.
    Forbidden = 0x18,
    /// Indicates that the data for the response is too large.
    ResponseTooLarge = 0x1a,
    /// Indicates that the request failed due to insufficient balance.
    InsufficientFunds = 0x1c,
    /// Indicates that the content-type of the request is not supported.
    ContentTypeNotSupported = 0x1f,
    /// Indicates that the request failed due to other errors.
    Error = 0xff,
}

impl OracleResponseCode {
    /// All codes, in byte order.
    pub const ALL: [OracleResponseCode; 9] = [
        Self::Success,
        Self::ProtocolNotSupported,
        Self::NotFound,
        Self::Timeout,
        Self::Forbidden,
        Self::ResponseTooLarge,
        Self::InsufficientFunds,
        Self::ContentTypeNotSupported,
        Self::Error,
    ];

    /// Converts to byte representation.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        self as u8
    }

    /// Creates from byte representation.
    #[must_use]
    pub const fn from_byte(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Success),
            0x10 => Some(Self::ProtocolNotSupported),
            0x14 => Some(Self::NotFound),
            0x16 => Some(Self::Timeout),
            0x18 => Some(Self::Forbidden),
            0x1a => Some(Self::ResponseTooLarge),
            0x1c => Some(Self::InsufficientFunds),
            0x1f => Some(Self::ContentTypeNotSupported),
            0xff => Some(Self::Error),
            _ => None,
        }
    }

    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::ProtocolNotSupported => "ProtocolNotSupported",
            Self::NotFound => "NotFound",
            Self::Timeout => "Timeout",
            Self::Forbidden => "Forbidden",
            Self::ResponseTooLarge => "ResponseTooLarge",
            Self::InsufficientFunds => "InsufficientFunds",
            Self::ContentTypeNotSupported => "ContentTypeNotSupported",
            Self::Error => "Error",
        }
    }

    /// Returns true if this response code indicates success.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for OracleResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<u8> for OracleResponseCode {
    type Error = PrimitiveError;

    fn try_from(value: u8) -> Result<Self, PrimitiveError> {
        Self::from_byte(value).ok_or(PrimitiveError::InvalidValue {
            type_name: "OracleResponseCode",
            value,
        })
    }
}

impl Serialize for OracleResponseCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.to_byte())
    }
}

impl<'de> Deserialize<'de> for OracleResponseCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let byte = u8::deserialize(deserializer)?;
        Self::from_byte(byte).ok_or_else(|| {
            serde::de::Error::custom(format!("Invalid oracle response code byte: {byte}"))
        })
    }
}
