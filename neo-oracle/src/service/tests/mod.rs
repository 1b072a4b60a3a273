use super::*;
use crate::crypto::KeyPair;
use crate::interfaces::{HttpClientError, HttpResponse};
use crate::request::OracleRequest;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use neo_primitives::{OracleResponseCode, UInt160, UInt256};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use url::Url;

fn pair(seed: u8) -> KeyPair {
    let mut private = [0u8; 32];
    private[31] = seed;
    KeyPair::from_private_key(&private).unwrap()
}

fn request(id: u64) -> OracleRequest {
    OracleRequest {
        id,
        original_tx_id: UInt256::zero(),
        url: "https://api.example.com/data".to_string(),
        filter: None,
        callback_contract: UInt160::zero(),
        callback_method: "callback".to_string(),
        user_data: Vec::new(),
        gas_for_response: 100_000_000,
    }
}

struct Chain {
    committee: Committee,
    valid_until: Option<u32>,
    failing: AtomicBool,
    pending: Vec<OracleRequest>,
}

#[async_trait]
impl OracleChain for Chain {
    async fn pending_requests(&self) -> Result<Vec<OracleRequest>, ChainError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ChainError::Unavailable("offline".to_string()));
        }
        Ok(self.pending.clone())
    }

    async fn request_valid_until(&self, _id: u64) -> Result<Option<u32>, ChainError> {
        Ok(self.valid_until)
    }

    async fn current_height(&self) -> Result<u32, ChainError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ChainError::Unavailable("offline".to_string()));
        }
        Ok(10)
    }

    async fn current_committee(&self) -> Result<Committee, ChainError> {
        Ok(self.committee.clone())
    }
}

/// Serves `{}` and, when gated, blocks until released.
#[derive(Default)]
struct Http {
    calls: AtomicUsize,
    entered: Notify,
    gate: Option<Notify>,
}

#[async_trait]
impl OracleHttpClient for Http {
    async fn get(&self, _url: &Url) -> Result<HttpResponse, HttpClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        Ok(HttpResponse {
            status: 200,
            content_type: None,
            content_length: None,
            body: futures::stream::iter(vec![Ok(Bytes::from_static(b"{}"))]).boxed(),
        })
    }
}

struct AllowAll;

impl UrlValidator for AllowAll {
    fn validate(&self, _url: &Url) -> Result<(), String> {
        Ok(())
    }
}

#[derive(Default)]
struct Outbox(parking_lot::Mutex<Vec<OracleSignatureMessage>>);

impl SignatureBroadcaster for Outbox {
    fn broadcast_signature(&self, message: OracleSignatureMessage) {
        self.0.lock().push(message);
    }
}

struct Node {
    service: Arc<OracleService>,
    finalized: mpsc::UnboundedReceiver<Transaction>,
    chain: Arc<Chain>,
    http: Arc<Http>,
    outbox: Arc<Outbox>,
}

fn node(local: u8, members: &[u8], valid_until: Option<u32>, http: Http) -> Node {
    let keys = members.iter().map(|seed| pair(*seed).public_key()).collect();
    let chain = Arc::new(Chain {
        committee: Committee::bft(keys).unwrap(),
        valid_until,
        failing: AtomicBool::new(false),
        pending: vec![request(1)],
    });
    let http = Arc::new(http);
    let outbox = Arc::new(Outbox::default());
    let deps = OracleDependencies::new(
        chain.clone(),
        http.clone(),
        Arc::new(AllowAll),
        Arc::new(pair(local)),
        outbox.clone(),
    );
    let (service, finalized) = OracleService::new(OracleServiceSettings::default(), deps);
    Node {
        service,
        finalized,
        chain,
        http,
        outbox,
    }
}

#[tokio::test]
async fn test_single_member_finalizes_on_own_signature() {
    let mut node = node(1, &[1], Some(100), Http::default());
    node.service.handle_request(request(1)).await;

    let tx = node.finalized.try_recv().unwrap();
    let response = tx.oracle_response().unwrap();
    assert_eq!(response.code, OracleResponseCode::Success);
    assert_eq!(response.result, b"{}".to_vec());
    assert_eq!(tx.valid_until_block(), 100);
    assert_eq!(node.service.request_state(1), Some(RequestState::Finalized));
    assert_eq!(node.service.pending_count(), 0);
    assert_eq!(node.outbox.0.lock().len(), 1);

    // A finished request is never answered twice.
    node.service.handle_request(request(1)).await;
    assert_eq!(node.http.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_peer_signature_is_buffered_until_local_hash_is_known() {
    let mut first = node(1, &[1, 2], Some(100), Http::default());
    let mut second = node(2, &[1, 2], Some(100), Http::default());

    first.service.handle_request(request(1)).await;
    assert_eq!(first.service.request_state(1), Some(RequestState::Signed));
    let message = first.outbox.0.lock()[0].clone();
    second
        .service
        .set_committee(Arc::new(second.chain.committee.clone()));

    assert_eq!(
        second
            .service
            .on_signature_received(1, message.public_key, message.signature.clone()),
        SignatureStatus::Buffered
    );
    assert_eq!(second.service.request_state(1), Some(RequestState::New));

    second.service.handle_request(request(1)).await;
    let finalized = second.finalized.try_recv().unwrap();

    let reply = second.outbox.0.lock()[0].clone();
    assert_eq!(
        first
            .service
            .on_signature_received(1, reply.public_key, reply.signature),
        SignatureStatus::Admitted(AdmitResult::Accepted)
    );
    assert_eq!(first.finalized.try_recv().unwrap(), finalized);
}

fn wide_key(index: u16) -> KeyPair {
    let mut private = [0u8; 32];
    private[30..].copy_from_slice(&index.to_be_bytes());
    KeyPair::from_private_key(&private).unwrap()
}

#[tokio::test]
async fn test_signatures_dropped_until_committee_is_known() {
    let node = node(1, &[1, 2], Some(100), Http::default());
    assert!(node.service.committee().is_none());
    assert_eq!(
        node.service
            .on_signature_received(3, pair(2).public_key(), vec![1; 64]),
        SignatureStatus::CommitteeUnknown
    );
    assert_eq!(node.service.pending_count(), 0);
    assert_eq!(node.service.request_state(3), None);
}

#[tokio::test]
async fn test_signature_only_tasks_are_capped() {
    let node = node(1, &[1, 2], Some(100), Http::default());
    node.service
        .set_committee(Arc::new(node.chain.committee.clone()));
    let peer = pair(2).public_key();

    for id in 0..MAX_TRACKED_TASKS as u64 {
        assert_eq!(
            node.service.on_signature_received(id, peer, vec![1; 64]),
            SignatureStatus::Buffered
        );
    }
    assert_eq!(node.service.pending_count(), MAX_TRACKED_TASKS);

    let overflow = MAX_TRACKED_TASKS as u64;
    assert_eq!(
        node.service.on_signature_received(overflow, peer, vec![1; 64]),
        SignatureStatus::BufferFull
    );
    assert_eq!(node.service.request_state(overflow), None);
    // Known ids still take signatures.
    assert_eq!(
        node.service.on_signature_received(0, peer, vec![2; 64]),
        SignatureStatus::Buffered
    );
}

#[tokio::test]
async fn test_full_buffer_is_not_reported_as_undesignated() {
    let node = node(1, &[1, 2], Some(100), Http::default());
    let keys: Vec<KeyPair> = (1..=MAX_BUFFERED_SIGNATURES as u16).map(wide_key).collect();
    node.service.set_committee(Arc::new(
        Committee::bft(keys.iter().map(KeyPair::public_key).collect()).unwrap(),
    ));
    for key in &keys {
        assert_eq!(
            node.service
                .on_signature_received(9, key.public_key(), vec![1; 64]),
            SignatureStatus::Buffered
        );
    }

    // After a committee change a newly designated member finds the buffer full.
    let newcomer = wide_key(MAX_BUFFERED_SIGNATURES as u16 + 1);
    let mut rotated: Vec<_> = keys[1..].iter().map(KeyPair::public_key).collect();
    rotated.push(newcomer.public_key());
    node.service
        .set_committee(Arc::new(Committee::bft(rotated).unwrap()));
    assert_eq!(
        node.service
            .on_signature_received(9, newcomer.public_key(), vec![1; 64]),
        SignatureStatus::BufferFull
    );
}

#[tokio::test]
async fn test_bad_signatures_do_not_count() {
    let node = node(1, &[1, 2], Some(100), Http::default());
    node.service.handle_request(request(1)).await;

    let outsider = pair(9);
    assert_eq!(
        node.service
            .on_signature_received(1, outsider.public_key(), vec![0; 64]),
        SignatureStatus::NotDesignated
    );
    // Member key, but signing some other hash.
    let wrong = pair(2)
        .sign(&crate::crypto::get_sign_data(&UInt256::sha256(b"other"), 860_833_102))
        .unwrap();
    assert_eq!(
        node.service
            .on_signature_received(1, pair(2).public_key(), wrong),
        SignatureStatus::InvalidSignature
    );
    assert_eq!(node.service.request_state(1), Some(RequestState::Signed));

    // Re-sending our own signature is a no-op.
    let own = node.outbox.0.lock()[0].clone();
    assert_eq!(
        node.service
            .on_signature_received(1, own.public_key, own.signature),
        SignatureStatus::Admitted(AdmitResult::Duplicate)
    );
}

#[tokio::test]
async fn test_expiry_discards_late_fetch() {
    let http = Http {
        gate: Some(Notify::new()),
        ..Default::default()
    };
    let mut node = node(1, &[1], Some(50), http);
    let service = Arc::clone(&node.service);
    let handle = tokio::spawn(async move { service.handle_request(request(1)).await });

    node.http.entered.notified().await;
    assert_eq!(node.service.request_state(1), Some(RequestState::Fetching));
    assert_eq!(node.service.expire_requests(49), 0);
    assert_eq!(node.service.expire_requests(50), 1);

    if let Some(gate) = &node.http.gate {
        gate.notify_one();
    }
    handle.await.unwrap();

    assert_eq!(node.service.request_state(1), Some(RequestState::Expired));
    assert!(node.finalized.try_recv().is_err());
    assert!(node.outbox.0.lock().is_empty());
    assert_eq!(
        node.service
            .on_signature_received(1, pair(1).public_key(), vec![0; 64]),
        SignatureStatus::Finished
    );
}

#[tokio::test]
async fn test_request_gone_from_chain_is_not_fetched() {
    let node = node(1, &[1], None, Http::default());
    node.service.handle_request(request(1)).await;
    assert_eq!(node.http.calls.load(Ordering::SeqCst), 0);
    assert!(node.service.is_request_finished(1));
}

#[tokio::test]
async fn test_undesignated_node_does_not_answer() {
    let node = node(5, &[1, 2], Some(100), Http::default());
    node.service.handle_request(request(1)).await;
    assert_eq!(node.http.calls.load(Ordering::SeqCst), 0);
    assert!(node.outbox.0.lock().is_empty());
    assert_eq!(node.service.request_state(1), Some(RequestState::New));

    assert!(matches!(
        node.service.start().await,
        Err(OracleServiceError::NotDesignated(_))
    ));
    assert_eq!(node.service.status(), OracleStatus::Unstarted);
}

#[tokio::test]
async fn test_timer_resends_and_drops_stale_tasks() {
    let node = node(1, &[1, 2], Some(100), Http::default());
    node.service.handle_request(request(1)).await;
    assert_eq!(
        node.service
            .on_signature_received(7, pair(2).public_key(), vec![1; 64]),
        SignatureStatus::Buffered
    );

    let settings = node.service.settings().clone();
    node.service.on_timer(Instant::now());
    assert_eq!(node.outbox.0.lock().len(), 1);

    node.service
        .on_timer(Instant::now() + settings.refresh_interval + Duration::from_secs(1));
    assert_eq!(node.outbox.0.lock().len(), 2);
    assert_eq!(node.service.request_state(7), Some(RequestState::New));

    node.service
        .on_timer(Instant::now() + settings.max_task_timeout + Duration::from_secs(1));
    assert_eq!(node.service.request_state(7), Some(RequestState::Expired));
    assert_eq!(node.service.request_state(1), Some(RequestState::Signed));
}

#[tokio::test]
async fn test_chain_failure_suspends_intake() {
    let node = node(1, &[1], Some(100), Http::default());
    node.chain.failing.store(true, Ordering::SeqCst);
    assert!(matches!(
        node.service.poll_once().await,
        Err(OracleServiceError::Chain(_))
    ));
    assert!(node.service.is_intake_suspended());
    assert_eq!(node.service.add_requests(vec![request(2)]), 0);

    node.chain.failing.store(false, Ordering::SeqCst);
    assert_eq!(node.service.poll_once().await.unwrap(), 1);
    assert!(!node.service.is_intake_suspended());
    assert!(node.service.committee().is_some());
}

#[tokio::test]
async fn test_start_and_stop() {
    let node = node(1, &[1], Some(100), Http::default());
    node.service.start().await.unwrap();
    assert!(node.service.is_running());
    node.service.stop();
    assert_eq!(node.service.status(), OracleStatus::Stopped);
    assert_eq!(node.service.pending_count(), 0);
}
