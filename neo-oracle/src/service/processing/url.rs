use super::super::OracleService;
use crate::https::FetchOutcome;
use neo_primitives::OracleResponseCode;
use tracing::debug;

impl OracleService {
    /// Fetches `url` under the fetch policy, bounded overall by
    /// `max_oracle_timeout`.
    pub(in super::super) async fn process_url(&self, url: &str) -> FetchOutcome {
        let fetch = self
            .fetch_policy
            .fetch(self.http.as_ref(), self.admission.as_ref(), url);
        match tokio::time::timeout(self.settings.max_oracle_timeout, fetch).await {
            Ok(outcome) => outcome,
            Err(_) => {
                debug!(target: "neo::oracle", url, "oracle url processing timed out");
                FetchOutcome::failure(OracleResponseCode::Timeout)
            }
        }
    }
}
