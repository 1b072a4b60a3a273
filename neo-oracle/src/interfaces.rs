//! Capabilities the oracle service needs from the rest of the node.
//!
//! The service never touches ledger storage, key custody or peer transport
//! directly; everything it observes or emits goes through these traits.

use crate::committee::Committee;
use crate::crypto::{CryptoError, ECPoint, KeyPair};
use crate::payloads::Transaction;
use crate::request::OracleRequest;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use url::Url;

/// Failures reported by the chain collaborator.
#[derive(Debug, Clone, Error)]
pub enum ChainError {
    #[error("chain unavailable: {0}")]
    Unavailable(String),
    #[error("oracle committee unreadable: {0}")]
    CommitteeUnreadable(String),
}

/// Read-only view of the ledger.
#[async_trait]
pub trait OracleChain: Send + Sync {
    /// Requests not yet answered on-chain.
    async fn pending_requests(&self) -> Result<Vec<OracleRequest>, ChainError>;

    /// Last block height at which a response to `id` is still valid, or
    /// `None` if the request is no longer pending.
    async fn request_valid_until(&self, id: u64) -> Result<Option<u32>, ChainError>;

    async fn current_height(&self) -> Result<u32, ChainError>;

    /// The committee designated for the oracle role at the next block.
    async fn current_committee(&self) -> Result<Committee, ChainError>;
}

/// Failures reported by the HTTP collaborator.
#[derive(Debug, Clone, Error)]
pub enum HttpClientError {
    #[error("request timed out")]
    Timeout,
    #[error("host refused: {0}")]
    Forbidden(String),
    #[error("transport error: {0}")]
    Transport(String),
}

/// Body of an HTTP response, delivered in chunks.
pub type BodyStream = BoxStream<'static, Result<Bytes, HttpClientError>>;

/// Status line and headers of a response, with the body still unread.
pub struct HttpResponse {
    pub status: u16,
    /// Raw `Content-Type` header value.
    pub content_type: Option<String>,
    /// Declared `Content-Length`, if any.
    pub content_length: Option<u64>,
    pub body: BodyStream,
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// A minimal HTTP GET capability. Timeouts and size caps are enforced by
/// the caller, not by implementations.
#[async_trait]
pub trait OracleHttpClient: Send + Sync {
    async fn get(&self, url: &Url) -> Result<HttpResponse, HttpClientError>;
}

/// URL admission predicate consulted before any network I/O.
pub trait UrlValidator: Send + Sync {
    /// `Ok` admits the URL; `Err` carries the reason it was denied.
    fn validate(&self, url: &Url) -> Result<(), String>;
}

/// A committee member's signature over a response transaction, as exchanged
/// between oracle nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleSignatureMessage {
    pub request_id: u64,
    pub public_key: ECPoint,
    #[serde(with = "crate::request::hex_bytes")]
    pub signature: Vec<u8>,
}

/// Outbound signature gossip. Fire-and-forget: delivery is the transport's
/// concern.
pub trait SignatureBroadcaster: Send + Sync {
    fn broadcast_signature(&self, message: OracleSignatureMessage);
}

/// Hands finalized transactions to the mempool.
#[async_trait]
pub trait TransactionRelay: Send + Sync {
    async fn submit(&self, tx: Transaction) -> Result<(), String>;
}

/// Access to the local committee member's signing key.
pub trait OracleSigner: Send + Sync {
    fn public_key(&self) -> ECPoint;

    /// Signs `data`; for response transactions this is the sign data
    /// (network magic followed by the hash).
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

impl OracleSigner for KeyPair {
    fn public_key(&self) -> ECPoint {
        KeyPair::public_key(self)
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        KeyPair::sign(self, data)
    }
}
