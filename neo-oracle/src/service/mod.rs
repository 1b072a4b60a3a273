//! Oracle coordination: per-request state machine, signature aggregation
//! and finalization.

mod handlers;
mod lifecycle;
mod processing;
pub mod transactions;
mod utils;

#[cfg(test)]
mod tests;

pub use handlers::SignatureStatus;
pub use lifecycle::spawn_relay;
pub use transactions::queue::{AdmitResult, SignatureSet};
pub use transactions::response::{derive_response, BuiltResponse, ResponseBuilder};
pub use utils::verify_oracle_signature;

use crate::committee::Committee;
use crate::crypto::{CryptoError, ECPoint};
use crate::https::{DefaultUrlValidator, FetchPolicy, ReqwestHttpClient};
use crate::interfaces::{
    ChainError, OracleChain, OracleHttpClient, OracleSignatureMessage, OracleSigner,
    SignatureBroadcaster, UrlValidator,
};
use crate::metrics::{NoopMetrics, OracleMetrics};
use crate::payloads::Transaction;
use crate::settings::OracleServiceSettings;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;

/// Signatures held for a request whose transaction is not yet built.
const MAX_BUFFERED_SIGNATURES: usize = crate::committee::MAX_COMMITTEE_SIZE;

/// Tracked requests past which a peer signature may not open a new task.
const MAX_TRACKED_TASKS: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleStatus {
    Unstarted,
    Running,
    Stopped,
}

impl OracleStatus {
    fn as_u8(self) -> u8 {
        match self {
            OracleStatus::Unstarted => 0,
            OracleStatus::Running => 1,
            OracleStatus::Stopped => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => OracleStatus::Running,
            2 => OracleStatus::Stopped,
            _ => OracleStatus::Unstarted,
        }
    }
}

#[derive(Debug, Error)]
pub enum OracleServiceError {
    #[error("oracle not designated: {0}")]
    NotDesignated(String),
    #[error("invalid oracle committee: {0}")]
    InvalidCommittee(String),
    #[error("oracle response signing failed: {0}")]
    Signing(#[from] CryptoError),
    #[error("oracle chain error: {0}")]
    Chain(#[from] ChainError),
    #[error("invalid oracle configuration: {0}")]
    Config(String),
}

/// Lifecycle of one request id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestState {
    /// Known only through buffered peer signatures, or waiting to be retried.
    New,
    Fetching,
    /// Local signature produced; collecting peers' signatures.
    Signed,
    Finalized,
    Expired,
}

impl RequestState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestState::Finalized | RequestState::Expired)
    }
}

pub(crate) struct OracleTask {
    state: RequestState,
    /// Last height at which the response is valid, once read from the chain.
    valid_until: Option<u32>,
    signatures: Option<SignatureSet>,
    /// Peer signatures received before the local hash was known.
    buffered: BTreeMap<ECPoint, Vec<u8>>,
    /// Our own signature message, re-sent while peers are missing.
    local_message: Option<OracleSignatureMessage>,
    created: Instant,
    broadcast_at: Option<Instant>,
}

impl OracleTask {
    fn new() -> Self {
        Self {
            state: RequestState::New,
            valid_until: None,
            signatures: None,
            buffered: BTreeMap::new(),
            local_message: None,
            created: Instant::now(),
            broadcast_at: None,
        }
    }
}

type TaskRef = Arc<Mutex<OracleTask>>;

/// Collaborators the service is wired to.
#[derive(Clone)]
pub struct OracleDependencies {
    pub chain: Arc<dyn OracleChain>,
    pub http: Arc<dyn OracleHttpClient>,
    pub admission: Arc<dyn UrlValidator>,
    pub signer: Arc<dyn OracleSigner>,
    pub broadcaster: Arc<dyn SignatureBroadcaster>,
    pub metrics: Arc<dyn OracleMetrics>,
}

impl OracleDependencies {
    pub fn new(
        chain: Arc<dyn OracleChain>,
        http: Arc<dyn OracleHttpClient>,
        admission: Arc<dyn UrlValidator>,
        signer: Arc<dyn OracleSigner>,
        broadcaster: Arc<dyn SignatureBroadcaster>,
    ) -> Self {
        Self {
            chain,
            http,
            admission,
            signer,
            broadcaster,
            metrics: Arc::new(NoopMetrics),
        }
    }

    /// Wires the reqwest client and the settings-driven URL validator.
    pub fn with_default_http(
        settings: &OracleServiceSettings,
        chain: Arc<dyn OracleChain>,
        signer: Arc<dyn OracleSigner>,
        broadcaster: Arc<dyn SignatureBroadcaster>,
    ) -> Result<Self, OracleServiceError> {
        let admission: Arc<dyn UrlValidator> =
            Arc::new(DefaultUrlValidator::from_settings(settings));
        let http = Arc::new(ReqwestHttpClient::new(settings, Arc::clone(&admission))?);
        Ok(Self::new(chain, http, admission, signer, broadcaster))
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn OracleMetrics>) -> Self {
        self.metrics = metrics;
        self
    }
}

/// Oracle service runtime.
pub struct OracleService {
    settings: OracleServiceSettings,
    chain: Arc<dyn OracleChain>,
    http: Arc<dyn OracleHttpClient>,
    admission: Arc<dyn UrlValidator>,
    signer: Arc<dyn OracleSigner>,
    broadcaster: Arc<dyn SignatureBroadcaster>,
    metrics: Arc<dyn OracleMetrics>,
    fetch_policy: FetchPolicy,
    builder: ResponseBuilder,
    status: AtomicU8,
    cancel: AtomicBool,
    intake_suspended: AtomicBool,
    committee: RwLock<Option<Arc<Committee>>>,
    tasks: DashMap<u64, TaskRef>,
    finished_cache: Mutex<HashMap<u64, (RequestState, Instant)>>,
    fetch_permits: Semaphore,
    relay: mpsc::UnboundedSender<Transaction>,
    request_task: Mutex<Option<JoinHandle<()>>>,
    timer_task: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for OracleService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OracleService")
            .field("status", &self.status())
            .field("pending", &self.tasks.len())
            .finish_non_exhaustive()
    }
}
