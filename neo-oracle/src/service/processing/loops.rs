use super::super::{
    OracleService, OracleServiceError, OracleStatus, OracleTask, RequestState, TaskRef,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

impl OracleService {
    pub(in super::super) async fn process_requests_loop(self: Arc<Self>) {
        while !self.cancel.load(Ordering::SeqCst) {
            if let Err(err) = self.poll_once().await {
                debug!(target: "neo::oracle", %err, "oracle poll failed");
            }
            if self.cancel.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(self.settings.poll_interval).await;
        }

        self.status
            .store(OracleStatus::Stopped.as_u8(), Ordering::SeqCst);
    }

    /// One poll of the chain: refreshes the committee, expires requests
    /// past their validity height and schedules new pending requests.
    /// Returns the number of requests scheduled.
    ///
    /// A chain failure suspends intake until a later poll succeeds; tasks
    /// already in flight are left alone.
    pub async fn poll_once(self: &Arc<Self>) -> Result<usize, OracleServiceError> {
        let snapshot = async {
            let height = self.chain.current_height().await?;
            let committee = self.chain.current_committee().await?;
            let requests = self.chain.pending_requests().await?;
            Ok::<_, OracleServiceError>((height, committee, requests))
        }
        .await;
        let (height, committee, requests) = match snapshot {
            Ok(snapshot) => snapshot,
            Err(err) => {
                if !self.is_intake_suspended() {
                    error!(target: "neo::oracle", %err, "oracle chain unavailable, suspending intake");
                }
                self.suspend_intake();
                return Err(err);
            }
        };

        self.set_committee(Arc::new(committee));
        self.resume_intake();
        self.expire_requests(height);
        Ok(self.add_requests(requests))
    }

    /// Drops every request whose response would no longer be valid at
    /// `height`. Returns how many were expired.
    pub fn expire_requests(&self, height: u32) -> usize {
        let expired = self.sweep(|task| task.valid_until.is_some_and(|until| until <= height));
        if expired > 0 {
            info!(target: "neo::oracle", height, expired, "oracle requests expired");
        }
        expired
    }

    pub(in super::super) async fn timer_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.settings.refresh_interval);
        loop {
            interval.tick().await;
            if self.cancel.load(Ordering::SeqCst) {
                break;
            }
            self.on_timer(Instant::now());
        }
    }

    /// Timer work: prunes the finished cache, drops tasks that never learned
    /// their validity height within `max_task_timeout` and re-sends the
    /// local signature for requests still collecting signatures.
    pub fn on_timer(&self, now: Instant) {
        self.cleanup_finished_cache(now);

        let max_age = self.settings.max_task_timeout;
        self.sweep(|task| {
            task.valid_until.is_none() && now.saturating_duration_since(task.created) > max_age
        });

        let mut resend = Vec::new();
        for task in self.task_refs() {
            let mut guard = task.lock();
            if guard.state != RequestState::Signed {
                continue;
            }
            let due = guard.broadcast_at.map_or(true, |sent| {
                now.saturating_duration_since(sent) > self.settings.refresh_interval
            });
            if !due {
                continue;
            }
            if let Some(message) = guard.local_message.clone() {
                guard.broadcast_at = Some(now);
                resend.push(message);
            }
        }
        for message in resend {
            debug!(target: "neo::oracle", request_id = message.request_id, "re-sending oracle signature");
            self.broadcaster.broadcast_signature(message);
        }

        self.metrics.pending_tasks(self.tasks.len());
    }

    /// Marks matching non-terminal tasks expired, then removes them.
    fn sweep<F>(&self, should_expire: F) -> usize
    where
        F: Fn(&OracleTask) -> bool,
    {
        let mut expired = Vec::new();
        for (request_id, task) in self.task_refs_with_ids() {
            let mut guard = task.lock();
            if !guard.state.is_terminal() && should_expire(&*guard) {
                guard.state = RequestState::Expired;
                expired.push(request_id);
            }
        }
        for request_id in &expired {
            self.finish(*request_id, RequestState::Expired);
        }
        if !expired.is_empty() {
            self.metrics.requests_expired(expired.len());
        }
        expired.len()
    }

    /// Clones out the task handles so no map shard lock is held while a
    /// task mutex is taken.
    fn task_refs_with_ids(&self) -> Vec<(u64, TaskRef)> {
        self.tasks
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect()
    }

    fn task_refs(&self) -> Vec<TaskRef> {
        self.tasks
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }
}
