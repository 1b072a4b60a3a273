use super::super::{
    OracleDependencies, OracleService, OracleStatus, RequestState, ResponseBuilder,
};
use crate::committee::Committee;
use crate::https::FetchPolicy;
use crate::payloads::Transaction;
use crate::settings::OracleServiceSettings;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info};

impl OracleService {
    /// Creates the service and the channel finalized transactions are
    /// written to. Hand the receiver to [`spawn_relay`](super::spawn_relay)
    /// or drain it directly.
    pub fn new(
        settings: OracleServiceSettings,
        deps: OracleDependencies,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<Transaction>) {
        let mut settings = settings;
        settings.normalize();
        let (relay, relay_rx) = mpsc::unbounded_channel();
        let service = Self {
            fetch_policy: FetchPolicy::from_settings(&settings),
            builder: ResponseBuilder::new(settings.fee),
            fetch_permits: Semaphore::new(settings.max_concurrent_fetches),
            settings,
            chain: deps.chain,
            http: deps.http,
            admission: deps.admission,
            signer: deps.signer,
            broadcaster: deps.broadcaster,
            metrics: deps.metrics,
            status: AtomicU8::new(OracleStatus::Unstarted.as_u8()),
            cancel: AtomicBool::new(false),
            intake_suspended: AtomicBool::new(false),
            committee: RwLock::new(None),
            tasks: DashMap::new(),
            finished_cache: Mutex::new(HashMap::new()),
            relay,
            request_task: Mutex::new(None),
            timer_task: Mutex::new(None),
        };
        (Arc::new(service), relay_rx)
    }

    pub fn settings(&self) -> &OracleServiceSettings {
        &self.settings
    }

    pub fn status(&self) -> OracleStatus {
        OracleStatus::from_u8(self.status.load(Ordering::SeqCst))
    }

    pub fn is_running(&self) -> bool {
        self.status() == OracleStatus::Running
    }

    /// True while the chain collaborator is failing; no new requests are
    /// scheduled until a poll succeeds.
    pub fn is_intake_suspended(&self) -> bool {
        self.intake_suspended.load(Ordering::SeqCst)
    }

    pub(in super::super) fn suspend_intake(&self) {
        self.intake_suspended.store(true, Ordering::SeqCst);
    }

    pub(in super::super) fn resume_intake(&self) {
        if self.intake_suspended.swap(false, Ordering::SeqCst) {
            info!(target: "neo::oracle", "oracle request intake resumed");
        }
    }

    /// The most recently observed committee.
    pub fn committee(&self) -> Option<Arc<Committee>> {
        self.committee.read().clone()
    }

    /// Swaps in a new committee snapshot.
    pub fn set_committee(&self, committee: Arc<Committee>) {
        let mut current = self.committee.write();
        if current.as_deref() != Some(committee.as_ref()) {
            debug!(
                target: "neo::oracle",
                nodes = committee.len(),
                threshold = committee.threshold(),
                "oracle committee updated"
            );
            *current = Some(committee);
        }
    }

    /// Number of requests with in-memory state.
    pub fn pending_count(&self) -> usize {
        self.tasks.len()
    }

    /// Current state of a request, if it is tracked or recently finished.
    pub fn request_state(&self, request_id: u64) -> Option<RequestState> {
        if let Some((state, _)) = self.finished_cache.lock().get(&request_id) {
            return Some(*state);
        }
        let task = self.tasks.get(&request_id).map(|entry| Arc::clone(entry.value()))?;
        let state = task.lock().state;
        Some(state)
    }

    pub fn is_request_finished(&self, request_id: u64) -> bool {
        self.finished_cache.lock().contains_key(&request_id)
    }

    /// Drops the task and remembers the id so it is not answered again.
    pub(in super::super) fn finish(&self, request_id: u64, state: RequestState) {
        self.finished_cache
            .lock()
            .insert(request_id, (state, Instant::now()));
        self.tasks.remove(&request_id);
        self.metrics.pending_tasks(self.tasks.len());
    }

    pub(in super::super) fn cleanup_finished_cache(&self, now: Instant) {
        let ttl = self.settings.finished_cache_ttl;
        self.finished_cache
            .lock()
            .retain(|_, (_, finished)| now.saturating_duration_since(*finished) <= ttl);
    }
}
