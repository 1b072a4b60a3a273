use super::super::{OracleService, OracleServiceError, OracleStatus};
use crate::interfaces::TransactionRelay;
use crate::payloads::Transaction;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

impl OracleService {
    /// Starts the request polling loop and the timer loop.
    ///
    /// Fails if the chain cannot be read or the local key is not part of
    /// the designated committee.
    pub async fn start(self: &Arc<Self>) -> Result<(), OracleServiceError> {
        if self.is_running() {
            return Ok(());
        }

        let committee = self.chain.current_committee().await.map_err(|err| {
            warn!(target: "neo::oracle", %err, "failed to load designated oracle list");
            err
        })?;
        if !committee.contains(&self.signer.public_key()) {
            warn!(target: "neo::oracle", "oracle service unavailable (local key is not designated)");
            return Err(OracleServiceError::NotDesignated(
                self.signer.public_key().to_string(),
            ));
        }
        self.set_committee(Arc::new(committee));

        self.cancel.store(false, Ordering::SeqCst);
        self.status
            .store(OracleStatus::Running.as_u8(), Ordering::SeqCst);

        let request_task = {
            let service = Arc::clone(self);
            tokio::spawn(async move {
                service.process_requests_loop().await;
            })
        };

        let timer_task = {
            let service = Arc::clone(self);
            tokio::spawn(async move {
                service.timer_loop().await;
            })
        };

        *self.request_task.lock() = Some(request_task);
        *self.timer_task.lock() = Some(timer_task);

        info!(target: "neo::oracle", "oracle service started");
        Ok(())
    }

    pub fn stop(&self) {
        self.cancel.store(true, Ordering::SeqCst);
        self.status
            .store(OracleStatus::Stopped.as_u8(), Ordering::SeqCst);
        if let Some(handle) = self.request_task.lock().take() {
            handle.abort();
        }
        if let Some(handle) = self.timer_task.lock().take() {
            handle.abort();
        }
        self.tasks.clear();
        info!(target: "neo::oracle", "oracle service stopped");
    }
}

/// Drains finalized transactions into the relay collaborator until the
/// service is dropped. Submission failures are logged, never retried.
pub fn spawn_relay(
    mut finalized: mpsc::UnboundedReceiver<Transaction>,
    relay: Arc<dyn TransactionRelay>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(tx) = finalized.recv().await {
            let hash = tx.hash();
            match relay.submit(tx).await {
                Ok(()) => debug!(target: "neo::oracle", tx = %hash, "oracle response tx relayed"),
                Err(error) => {
                    warn!(target: "neo::oracle", tx = %hash, %error, "failed to relay oracle response tx")
                }
            }
        }
    })
}
