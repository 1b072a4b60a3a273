//! Observability sink for the oracle service.
//!
//! The service reports through an injected [`OracleMetrics`] instead of
//! process-global registries. [`PrometheusMetrics`] registers its
//! collectors into a registry owned by the caller.

use neo_primitives::OracleResponseCode;
use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};

/// Events the service reports. All methods default to no-ops.
pub trait OracleMetrics: Send + Sync {
    fn request_scheduled(&self) {}

    fn fetch_completed(&self, _code: OracleResponseCode) {}

    fn signature_accepted(&self) {}

    fn signature_rejected(&self, _reason: &'static str) {}

    fn transaction_finalized(&self) {}

    fn requests_expired(&self, _count: usize) {}

    fn pending_tasks(&self, _count: usize) {}
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl OracleMetrics for NoopMetrics {}

/// Prometheus-backed metrics.
#[derive(Clone)]
pub struct PrometheusMetrics {
    requests_scheduled: IntCounter,
    fetches: IntCounterVec,
    signatures_accepted: IntCounter,
    signatures_rejected: IntCounterVec,
    transactions_finalized: IntCounter,
    requests_expired: IntCounter,
    pending_tasks: IntGauge,
}

impl PrometheusMetrics {
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let requests_scheduled = IntCounter::new(
            "neo_oracle_requests_scheduled_total",
            "Oracle requests scheduled for fetching",
        )?;
        let fetches = IntCounterVec::new(
            Opts::new("neo_oracle_fetches_total", "Completed fetches by response code"),
            &["code"],
        )?;
        let signatures_accepted = IntCounter::new(
            "neo_oracle_signatures_accepted_total",
            "Signatures admitted into a signature set",
        )?;
        let signatures_rejected = IntCounterVec::new(
            Opts::new(
                "neo_oracle_signatures_rejected_total",
                "Signatures rejected by reason",
            ),
            &["reason"],
        )?;
        let transactions_finalized = IntCounter::new(
            "neo_oracle_transactions_finalized_total",
            "Response transactions assembled and relayed",
        )?;
        let requests_expired = IntCounter::new(
            "neo_oracle_requests_expired_total",
            "Requests dropped after their validity window",
        )?;
        let pending_tasks = IntGauge::new(
            "neo_oracle_pending_tasks",
            "Requests with in-memory state",
        )?;

        registry.register(Box::new(requests_scheduled.clone()))?;
        registry.register(Box::new(fetches.clone()))?;
        registry.register(Box::new(signatures_accepted.clone()))?;
        registry.register(Box::new(signatures_rejected.clone()))?;
        registry.register(Box::new(transactions_finalized.clone()))?;
        registry.register(Box::new(requests_expired.clone()))?;
        registry.register(Box::new(pending_tasks.clone()))?;

        Ok(Self {
            requests_scheduled,
            fetches,
            signatures_accepted,
            signatures_rejected,
            transactions_finalized,
            requests_expired,
            pending_tasks,
        })
    }
}

impl OracleMetrics for PrometheusMetrics {
    fn request_scheduled(&self) {
        self.requests_scheduled.inc();
    }

    fn fetch_completed(&self, code: OracleResponseCode) {
        self.fetches.with_label_values(&[code.as_str()]).inc();
    }

    fn signature_accepted(&self) {
        self.signatures_accepted.inc();
    }

    fn signature_rejected(&self, reason: &'static str) {
        self.signatures_rejected.with_label_values(&[reason]).inc();
    }

    fn transaction_finalized(&self) {
        self.transactions_finalized.inc();
    }

    fn requests_expired(&self, count: usize) {
        self.requests_expired.inc_by(count as u64);
    }

    fn pending_tasks(&self, count: usize) {
        self.pending_tasks.set(count as i64);
    }
}
