use super::{
    AdmitResult, OracleService, OracleTask, RequestState, MAX_BUFFERED_SIGNATURES,
    MAX_TRACKED_TASKS,
};
use crate::crypto::ECPoint;
use crate::payloads::Transaction;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What happened to a signature received from a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureStatus {
    /// Verified against the local hash and offered to the signature set.
    Admitted(AdmitResult),
    /// Held until the local transaction hash is known.
    Buffered,
    /// Dropped: no room to hold it until the local hash is known.
    BufferFull,
    /// Dropped: the committee has not been read from the chain yet.
    CommitteeUnknown,
    /// The request is already finalized or expired.
    Finished,
    NotDesignated,
    /// Does not verify against the local transaction hash.
    InvalidSignature,
}

impl OracleService {
    /// Handles a peer's signature over its response transaction.
    ///
    /// Signatures for requests this node has not built yet are buffered and
    /// checked once the local hash is known; a node never co-signs a hash it
    /// did not compute itself. Nothing is held before the committee is known.
    pub fn on_signature_received(
        &self,
        request_id: u64,
        public_key: ECPoint,
        signature: Vec<u8>,
    ) -> SignatureStatus {
        if self.is_request_finished(request_id) {
            return SignatureStatus::Finished;
        }
        let Some(committee) = self.committee() else {
            debug!(target: "neo::oracle", request_id, "signature before the committee is known");
            return SignatureStatus::CommitteeUnknown;
        };
        if !committee.contains(&public_key) {
            debug!(target: "neo::oracle", request_id, key = %public_key, "signature from undesignated key");
            self.metrics.signature_rejected(AdmitResult::NotDesignated.as_str());
            return SignatureStatus::NotDesignated;
        }

        let existing = self.tasks.get(&request_id).map(|entry| Arc::clone(entry.value()));
        let task = match existing {
            Some(task) => task,
            None if self.tasks.len() >= MAX_TRACKED_TASKS => {
                warn!(target: "neo::oracle", request_id, "too many tracked oracle requests, dropping signature");
                return SignatureStatus::BufferFull;
            }
            None => Arc::clone(
                self.tasks
                    .entry(request_id)
                    .or_insert_with(|| Arc::new(Mutex::new(OracleTask::new())))
                    .value(),
            ),
        };

        let (status, finalized) = {
            let mut guard = task.lock();
            if guard.state.is_terminal() {
                return SignatureStatus::Finished;
            }
            let Some(signatures) = guard.signatures.as_mut() else {
                if guard.buffered.len() >= MAX_BUFFERED_SIGNATURES
                    && !guard.buffered.contains_key(&public_key)
                {
                    warn!(target: "neo::oracle", request_id, "oracle signature buffer full");
                    return SignatureStatus::BufferFull;
                }
                guard.buffered.entry(public_key).or_insert(signature);
                return SignatureStatus::Buffered;
            };
            match self.admit_verified(request_id, signatures, public_key, signature) {
                Some(AdmitResult::Accepted) => (
                    SignatureStatus::Admitted(AdmitResult::Accepted),
                    Self::try_finalize(&mut guard),
                ),
                Some(result) => (SignatureStatus::Admitted(result), None),
                None => (SignatureStatus::InvalidSignature, None),
            }
        };

        if let Some(tx) = finalized {
            self.complete(request_id, tx);
        }
        status
    }

    /// Assembles the witnessed transaction if the threshold is reached.
    /// Only the caller that wins the set's check-and-set gets `Some`.
    pub(super) fn try_finalize(task: &mut OracleTask) -> Option<Transaction> {
        let tx = task.signatures.as_mut()?.assemble()?;
        task.state = RequestState::Finalized;
        Some(tx)
    }

    /// Records the request as finalized and hands the transaction to the
    /// relay channel. Must not be called with the task lock held.
    pub(super) fn complete(&self, request_id: u64, tx: Transaction) {
        let hash = tx.hash();
        self.finish(request_id, RequestState::Finalized);
        self.metrics.transaction_finalized();
        info!(target: "neo::oracle", request_id, tx = %hash, "oracle response finalized");
        if self.relay.send(tx).is_err() {
            warn!(target: "neo::oracle", request_id, "relay channel closed, dropping finalized tx");
        }
    }
}
