//! In-memory collaborators shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use neo_oracle::{
    ChainError, Committee, HttpClientError, HttpResponse, KeyPair, OracleChain,
    OracleDependencies, OracleHttpClient, OracleRequest, OracleService, OracleServiceSettings,
    OracleSignatureMessage, SignatureBroadcaster, Transaction, UInt160, UInt256, UrlValidator,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use url::Url;

pub const VALID_UNTIL: u32 = 5_760;

pub fn key_pair(seed: u8) -> KeyPair {
    let mut private = [0u8; 32];
    private[31] = seed;
    KeyPair::from_private_key(&private).unwrap()
}

pub fn committee(seeds: &[u8]) -> Committee {
    Committee::bft(seeds.iter().map(|seed| key_pair(*seed).public_key()).collect()).unwrap()
}

pub fn oracle_request(id: u64, url: &str, gas_for_response: i64) -> OracleRequest {
    OracleRequest {
        id,
        original_tx_id: UInt256::sha256(&id.to_le_bytes()),
        url: url.to_string(),
        filter: None,
        callback_contract: UInt160::from_script(b"callback"),
        callback_method: "callback".to_string(),
        user_data: Vec::new(),
        gas_for_response,
    }
}

pub struct MockChain {
    pub committee: Mutex<Committee>,
    pub pending: Mutex<Vec<OracleRequest>>,
    pub height: Mutex<u32>,
}

impl MockChain {
    pub fn new(committee: Committee) -> Self {
        Self {
            committee: Mutex::new(committee),
            pending: Mutex::new(Vec::new()),
            height: Mutex::new(1),
        }
    }
}

#[async_trait]
impl OracleChain for MockChain {
    async fn pending_requests(&self) -> Result<Vec<OracleRequest>, ChainError> {
        Ok(self.pending.lock().clone())
    }

    async fn request_valid_until(&self, id: u64) -> Result<Option<u32>, ChainError> {
        let pending = self.pending.lock().iter().any(|request| request.id == id);
        Ok((pending || self.pending.lock().is_empty()).then_some(VALID_UNTIL))
    }

    async fn current_height(&self) -> Result<u32, ChainError> {
        Ok(*self.height.lock())
    }

    async fn current_committee(&self) -> Result<Committee, ChainError> {
        Ok(self.committee.lock().clone())
    }
}

/// A canned reply for one URL.
#[derive(Clone)]
pub enum Route {
    Reply { status: u16, body: Vec<u8> },
    Fail(HttpClientError),
}

/// Serves canned replies by exact URL; unknown URLs fail at the transport.
#[derive(Default)]
pub struct RoutedHttp {
    routes: HashMap<String, Route>,
    pub calls: AtomicUsize,
}

impl RoutedHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, url: &str, status: u16, body: Vec<u8>) -> Self {
        self.routes
            .insert(url.to_string(), Route::Reply { status, body });
        self
    }

    pub fn fail(mut self, url: &str, error: HttpClientError) -> Self {
        self.routes.insert(url.to_string(), Route::Fail(error));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OracleHttpClient for RoutedHttp {
    async fn get(&self, url: &Url) -> Result<HttpResponse, HttpClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.routes.get(url.as_str()) {
            Some(Route::Reply { status, body }) => {
                let chunks: Vec<Result<Bytes, HttpClientError>> = body
                    .chunks(4096)
                    .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
                    .collect();
                Ok(HttpResponse {
                    status: *status,
                    content_type: None,
                    content_length: None,
                    body: futures::stream::iter(chunks).boxed(),
                })
            }
            Some(Route::Fail(error)) => Err(error.clone()),
            None => Err(HttpClientError::Transport(format!("no route to {url}"))),
        }
    }
}

pub struct AllowAll;

impl UrlValidator for AllowAll {
    fn validate(&self, _url: &Url) -> Result<(), String> {
        Ok(())
    }
}

/// Denies every URL containing one of the listed fragments.
pub struct DenyContaining(pub Vec<&'static str>);

impl UrlValidator for DenyContaining {
    fn validate(&self, url: &Url) -> Result<(), String> {
        match self.0.iter().find(|fragment| url.as_str().contains(*fragment)) {
            Some(fragment) => Err(format!("{fragment} is denied")),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct Outbox(Mutex<Vec<OracleSignatureMessage>>);

impl Outbox {
    pub fn messages(&self) -> Vec<OracleSignatureMessage> {
        self.0.lock().clone()
    }
}

impl SignatureBroadcaster for Outbox {
    fn broadcast_signature(&self, message: OracleSignatureMessage) {
        self.0.lock().push(message);
    }
}

/// One oracle node wired to in-memory collaborators.
pub struct TestNode {
    pub service: Arc<OracleService>,
    pub finalized: mpsc::UnboundedReceiver<Transaction>,
    pub chain: Arc<MockChain>,
    pub outbox: Arc<Outbox>,
}

impl TestNode {
    pub fn new(
        local: u8,
        members: &[u8],
        http: Arc<RoutedHttp>,
        admission: Arc<dyn UrlValidator>,
    ) -> Self {
        Self::with_settings(local, members, http, admission, OracleServiceSettings::default())
    }

    pub fn with_settings(
        local: u8,
        members: &[u8],
        http: Arc<RoutedHttp>,
        admission: Arc<dyn UrlValidator>,
        settings: OracleServiceSettings,
    ) -> Self {
        let chain = Arc::new(MockChain::new(committee(members)));
        let outbox = Arc::new(Outbox::default());
        let deps = OracleDependencies::new(
            chain.clone(),
            http,
            admission,
            Arc::new(key_pair(local)),
            outbox.clone(),
        );
        let (service, finalized) = OracleService::new(settings, deps);
        // `start` loads the committee before any peer traffic is handled.
        service.set_committee(Arc::new(committee(members)));
        Self {
            service,
            finalized,
            chain,
            outbox,
        }
    }

    /// Delivers every signature this node has broadcast to `peer`.
    pub fn gossip_to(&self, peer: &TestNode) {
        for message in self.outbox.messages() {
            peer.service
                .on_signature_received(message.request_id, message.public_key, message.signature);
        }
    }
}

/// Installs a test subscriber honouring `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
