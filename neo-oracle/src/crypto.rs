//! secp256r1 keys and signatures used by oracle committee members.

use neo_primitives::UInt256;
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Length of a compressed SEC1 public key.
pub const PUBLIC_KEY_SIZE: usize = 33;

/// Length of an `r || s` ECDSA signature.
pub const SIGNATURE_SIZE: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("ecc256: invalid public key encoding")]
    InvalidPublicKey,
    #[error("ecc256: invalid private key")]
    InvalidPrivateKey,
    #[error("ecdsa: signing failed")]
    SigningFailed,
}

/// A compressed secp256r1 public key.
///
/// Keys order by x-coordinate, then by y parity, which is the canonical
/// order of keys inside a multi-signature verification script.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ECPoint([u8; PUBLIC_KEY_SIZE]);

impl ECPoint {
    /// Decodes a compressed or uncompressed SEC1 point, validating it lies on the curve.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let key =
            p256::PublicKey::from_sec1_bytes(bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        let encoded = key.to_encoded_point(true);
        let mut compressed = [0u8; PUBLIC_KEY_SIZE];
        compressed.copy_from_slice(encoded.as_bytes());
        Ok(Self(compressed))
    }

    pub fn from_hex(value: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(value).map_err(|_| CryptoError::InvalidPublicKey)?;
        Self::from_bytes(&bytes)
    }

    /// Compressed encoding.
    pub fn encode_point(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Verifies `signature` over `data` (hashed with SHA-256 by the ECDSA scheme).
    pub fn verify_signature(&self, data: &[u8], signature: &[u8]) -> bool {
        if signature.len() != SIGNATURE_SIZE {
            return false;
        }
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        let Ok(key) = VerifyingKey::from_sec1_bytes(&self.0) else {
            return false;
        };
        key.verify(data, &signature).is_ok()
    }
}

impl Ord for ECPoint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0[1..]
            .cmp(&other.0[1..])
            .then_with(|| self.0[0].cmp(&other.0[0]))
    }
}

impl PartialOrd for ECPoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ECPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for ECPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ECPoint({})", hex::encode(self.0))
    }
}

impl Serialize for ECPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for ECPoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::from_hex(&text).map_err(serde::de::Error::custom)
    }
}

/// A committee member's signing key.
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
    public_key: ECPoint,
}

impl KeyPair {
    /// Builds a key pair from a 32-byte big-endian private scalar.
    pub fn from_private_key(private_key: &[u8]) -> Result<Self, CryptoError> {
        let signing_key =
            SigningKey::from_slice(private_key).map_err(|_| CryptoError::InvalidPrivateKey)?;
        let encoded = signing_key.verifying_key().to_encoded_point(true);
        let public_key = ECPoint::from_bytes(encoded.as_bytes())?;
        Ok(Self {
            signing_key,
            public_key,
        })
    }

    pub fn public_key(&self) -> ECPoint {
        self.public_key
    }

    /// Signs `data` with RFC 6979 deterministic nonces.
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let signature: Signature = self
            .signing_key
            .try_sign(data)
            .map_err(|_| CryptoError::SigningFailed)?;
        Ok(signature.to_bytes().to_vec())
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// Data a committee member signs for a transaction: network magic followed by the hash.
pub fn get_sign_data(hash: &UInt256, network: u32) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + UInt256::LENGTH);
    data.extend_from_slice(&network.to_le_bytes());
    data.extend_from_slice(hash.as_bytes());
    data
}
