//! # Neo Oracle
//!
//! Oracle coordination engine for Neo N3 oracle nodes.
//!
//! Every designated oracle node independently fetches the URL of a pending
//! request, derives the same response and response transaction, signs it and
//! gossips the signature. Once `M` of the `N` committee members have signed
//! the same transaction hash, exactly one local caller assembles the witness
//! and hands the transaction to the relay.
//!
//! ## Components
//!
//! - [`https`]: fetch policy (timeout, size cap, URL admission, status table)
//! - [`service::ResponseBuilder`]: deterministic response and transaction
//! - [`service::SignatureSet`]: threshold signature store
//! - [`service::OracleService`]: per-request state machine
//!
//! Everything the service needs from the node (chain view, HTTP, signing key,
//! peer gossip, mempool) is injected through the traits in [`interfaces`].

pub mod committee;
pub mod crypto;
pub mod filter;
pub mod https;
pub mod interfaces;
pub mod io;
pub mod metrics;
pub mod payloads;
pub mod request;
pub mod script;
pub mod service;
pub mod settings;

pub use committee::{bft_threshold, Committee};
pub use crypto::{ECPoint, KeyPair};
pub use https::{DefaultUrlValidator, FetchOutcome, FetchPolicy, ReqwestHttpClient};
pub use interfaces::{
    ChainError, HttpClientError, HttpResponse, OracleChain, OracleHttpClient,
    OracleSignatureMessage, OracleSigner, SignatureBroadcaster, TransactionRelay, UrlValidator,
};
pub use metrics::{NoopMetrics, OracleMetrics, PrometheusMetrics};
pub use payloads::{OracleResponse, Transaction};
pub use request::OracleRequest;
pub use service::{
    spawn_relay, AdmitResult, BuiltResponse, OracleDependencies, OracleService,
    OracleServiceError, OracleStatus, RequestState, ResponseBuilder, SignatureSet,
    SignatureStatus,
};
pub use settings::{FeePolicy, OracleServiceSettings};

pub use neo_primitives::{OracleResponseCode, UInt160, UInt256};
