use super::super::utils::{sign_transaction, verify_oracle_signature};
use super::super::{AdmitResult, OracleService, OracleTask, RequestState, SignatureSet, TaskRef};
use crate::crypto::ECPoint;
use crate::interfaces::OracleSignatureMessage;
use crate::request::OracleRequest;
use parking_lot::Mutex;
use std::mem;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

impl OracleService {
    /// Schedules every request not yet tracked or finished on the fetch
    /// pool. Returns how many were scheduled.
    pub fn add_requests(self: &Arc<Self>, requests: Vec<OracleRequest>) -> usize {
        if self.is_intake_suspended() {
            return 0;
        }
        let mut scheduled = 0;
        for request in requests {
            let Some(task) = self.begin_task(request.id) else {
                continue;
            };
            let service = Arc::clone(self);
            tokio::spawn(async move {
                service.process_request(request, task).await;
            });
            scheduled += 1;
        }
        scheduled
    }

    /// Runs the whole local pipeline for one request: fetch, build, sign,
    /// admit, broadcast and, if enough signatures are already held,
    /// finalize. Returns once the local signature is out, or immediately
    /// if the request is already being handled.
    pub async fn handle_request(&self, request: OracleRequest) {
        if let Some(task) = self.begin_task(request.id) {
            self.process_request(request, task).await;
        }
    }

    /// Moves the request from `New` to `Fetching`, creating its task if
    /// needed. `None` if it is finished or already past `New`.
    fn begin_task(&self, request_id: u64) -> Option<TaskRef> {
        if self.is_request_finished(request_id) {
            return None;
        }
        let task = Arc::clone(
            self.tasks
                .entry(request_id)
                .or_insert_with(|| Arc::new(Mutex::new(OracleTask::new())))
                .value(),
        );
        {
            let mut guard = task.lock();
            if guard.state != RequestState::New {
                return None;
            }
            guard.state = RequestState::Fetching;
        }
        self.metrics.request_scheduled();
        self.metrics.pending_tasks(self.tasks.len());
        Some(task)
    }

    /// Puts a task back to `New` so the next poll retries it.
    fn retry_later(task: &TaskRef) {
        let mut guard = task.lock();
        if guard.state == RequestState::Fetching {
            guard.state = RequestState::New;
        }
    }

    async fn process_request(&self, request: OracleRequest, task: TaskRef) {
        let request_id = request.id;
        let Ok(_permit) = self.fetch_permits.acquire().await else {
            return;
        };
        if task.lock().state != RequestState::Fetching {
            return;
        }

        let valid_until = match self.chain.request_valid_until(request_id).await {
            Ok(Some(height)) => height,
            Ok(None) => {
                debug!(target: "neo::oracle", request_id, "oracle request no longer pending");
                self.finish(request_id, RequestState::Finalized);
                return;
            }
            Err(err) => {
                error!(target: "neo::oracle", request_id, %err, "failed to read oracle request");
                self.suspend_intake();
                Self::retry_later(&task);
                return;
            }
        };
        task.lock().valid_until = Some(valid_until);

        let committee = match self.chain.current_committee().await {
            Ok(committee) => Arc::new(committee),
            Err(err) => {
                error!(target: "neo::oracle", request_id, %err, "failed to read oracle committee");
                self.suspend_intake();
                Self::retry_later(&task);
                return;
            }
        };
        self.set_committee(Arc::clone(&committee));
        let public_key = self.signer.public_key();
        if !committee.contains(&public_key) {
            warn!(target: "neo::oracle", request_id, "local key is not a designated oracle node");
            Self::retry_later(&task);
            return;
        }

        let outcome = self.process_url(&request.url).await;
        self.metrics.fetch_completed(outcome.code);
        debug!(
            target: "neo::oracle",
            request_id,
            url = %request.url,
            code = %outcome.code,
            "oracle url processed"
        );

        let built = match self
            .builder
            .build(&request, &outcome, &committee, valid_until)
        {
            Ok(built) => built,
            Err(err) => {
                error!(target: "neo::oracle", request_id, %err, "failed to build oracle response");
                Self::retry_later(&task);
                return;
            }
        };
        let (hash, signature) =
            match sign_transaction(&built.transaction, self.signer.as_ref(), self.settings.network) {
                Ok(signed) => signed,
                Err(err) => {
                    error!(target: "neo::oracle", request_id, %err, "failed to sign oracle response");
                    Self::retry_later(&task);
                    return;
                }
            };

        let message = OracleSignatureMessage {
            request_id,
            public_key,
            signature: signature.clone(),
        };
        let finalized = {
            let mut guard = task.lock();
            if guard.state != RequestState::Fetching {
                debug!(
                    target: "neo::oracle",
                    request_id,
                    state = ?guard.state,
                    "discarding oracle response for inactive request"
                );
                return;
            }

            let mut signatures = SignatureSet::new(Arc::clone(&committee));
            signatures.record_transaction(built.transaction);
            signatures.admit(public_key, signature, hash);
            for (key, buffered) in mem::take(&mut guard.buffered) {
                self.admit_verified(request_id, &mut signatures, key, buffered);
            }

            guard.signatures = Some(signatures);
            guard.local_message = Some(message.clone());
            guard.broadcast_at = Some(Instant::now());
            guard.state = RequestState::Signed;
            Self::try_finalize(&mut guard)
        };

        self.broadcaster.broadcast_signature(message);
        debug!(
            target: "neo::oracle",
            request_id,
            tx = %hash,
            code = %built.response.code,
            "oracle response signed"
        );

        if let Some(tx) = finalized {
            self.complete(request_id, tx);
        }
    }

    /// Verifies a peer signature against the set's hash and admits it.
    pub(in super::super) fn admit_verified(
        &self,
        request_id: u64,
        signatures: &mut SignatureSet,
        key: ECPoint,
        signature: Vec<u8>,
    ) -> Option<AdmitResult> {
        let hash = signatures.hash()?;
        if !verify_oracle_signature(&key, &hash, self.settings.network, &signature) {
            debug!(target: "neo::oracle", request_id, %key, "invalid oracle response signature");
            self.metrics.signature_rejected("invalid_signature");
            return None;
        }
        let result = signatures.admit(key, signature, hash);
        match result {
            AdmitResult::Accepted => self.metrics.signature_accepted(),
            rejected => {
                debug!(
                    target: "neo::oracle",
                    request_id,
                    %key,
                    reason = rejected.as_str(),
                    "oracle response signature not admitted"
                );
                self.metrics.signature_rejected(rejected.as_str());
            }
        }
        Some(result)
    }
}
