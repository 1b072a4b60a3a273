use super::{status_to_code, FetchOutcome, FetchPolicy};
use crate::interfaces::{HttpClientError, OracleHttpClient, UrlValidator};
use futures::StreamExt;
use neo_primitives::OracleResponseCode;
use tracing::debug;

impl FetchPolicy {
    /// Performs one GET of `url`.
    ///
    /// Unparseable or denied URLs become `Forbidden` without any network
    /// I/O. Nothing is retried and no shared state is touched.
    pub async fn fetch(
        &self,
        client: &dyn OracleHttpClient,
        admission: &dyn UrlValidator,
        url: &str,
    ) -> FetchOutcome {
        let uri = match url::Url::parse(url) {
            Ok(uri) => uri,
            Err(err) => {
                debug!(target: "neo::oracle", url, %err, "unparseable oracle url");
                return FetchOutcome::failure(OracleResponseCode::Forbidden);
            }
        };

        if let Err(reason) = admission.validate(&uri) {
            debug!(target: "neo::oracle", url, reason = %reason, "oracle url denied");
            return FetchOutcome::failure(OracleResponseCode::Forbidden);
        }

        if !matches!(uri.scheme(), "http" | "https") {
            return FetchOutcome::failure(OracleResponseCode::ProtocolNotSupported);
        }

        match tokio::time::timeout(self.timeout, self.get_and_read(client, &uri)).await {
            Ok(outcome) => outcome,
            Err(_) => FetchOutcome::failure(OracleResponseCode::Timeout),
        }
    }

    async fn get_and_read(&self, client: &dyn OracleHttpClient, uri: &url::Url) -> FetchOutcome {
        let response = match client.get(uri).await {
            Ok(response) => response,
            Err(err) => {
                debug!(target: "neo::oracle", url = %uri, error = %err, "oracle request failed");
                return FetchOutcome::failure(client_error_code(&err));
            }
        };

        let code = status_to_code(response.status);
        if code != OracleResponseCode::Success {
            return FetchOutcome::failure(code);
        }

        if !self.is_content_type_allowed(response.content_type.as_deref()) {
            return FetchOutcome::failure(OracleResponseCode::ContentTypeNotSupported);
        }

        if let Some(len) = response.content_length {
            if len > self.max_bytes as u64 {
                return FetchOutcome::failure(OracleResponseCode::ResponseTooLarge);
            }
        }

        let mut body = Vec::new();
        let mut stream = response.body;
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => return FetchOutcome::failure(client_error_code(&err)),
            };
            if body.len() + chunk.len() > self.max_bytes {
                return FetchOutcome::failure(OracleResponseCode::ResponseTooLarge);
            }
            body.extend_from_slice(&chunk);
        }

        FetchOutcome::success(body)
    }
}

fn client_error_code(err: &HttpClientError) -> OracleResponseCode {
    match err {
        HttpClientError::Timeout => OracleResponseCode::Timeout,
        HttpClientError::Forbidden(_) => OracleResponseCode::Forbidden,
        HttpClientError::Transport(_) => OracleResponseCode::Error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::HttpResponse;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use url::Url;

    struct Fixed {
        status: u16,
        content_type: Option<&'static str>,
        declared: Option<u64>,
        chunks: Vec<Vec<u8>>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn ok(chunks: Vec<Vec<u8>>) -> Self {
            Self {
                status: 200,
                content_type: None,
                declared: None,
                chunks,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl OracleHttpClient for Fixed {
        async fn get(&self, _url: &Url) -> Result<HttpResponse, HttpClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let chunks: Vec<Result<Bytes, HttpClientError>> = self
                .chunks
                .iter()
                .map(|chunk| Ok(Bytes::from(chunk.clone())))
                .collect();
            Ok(HttpResponse {
                status: self.status,
                content_type: self.content_type.map(str::to_string),
                content_length: self.declared,
                body: futures::stream::iter(chunks).boxed(),
            })
        }
    }

    struct Failing(HttpClientError);

    #[async_trait]
    impl OracleHttpClient for Failing {
        async fn get(&self, _url: &Url) -> Result<HttpResponse, HttpClientError> {
            Err(self.0.clone())
        }
    }

    struct AllowAll;

    impl UrlValidator for AllowAll {
        fn validate(&self, _url: &Url) -> Result<(), String> {
            Ok(())
        }
    }

    struct DenyAll;

    impl UrlValidator for DenyAll {
        fn validate(&self, _url: &Url) -> Result<(), String> {
            Err("denied".to_string())
        }
    }

    fn policy(max_bytes: usize) -> FetchPolicy {
        FetchPolicy::new(Duration::from_secs(1), max_bytes, Vec::new())
    }

    #[tokio::test]
    async fn test_success_reads_whole_body() {
        let client = Fixed::ok(vec![vec![1, 2], vec![3, 4]]);
        let outcome = policy(16).fetch(&client, &AllowAll, "http://x/ok").await;
        assert_eq!(outcome, FetchOutcome::success(vec![1, 2, 3, 4]));
    }

    #[tokio::test]
    async fn test_denied_url_performs_no_io() {
        let client = Fixed::ok(vec![vec![1]]);
        let outcome = policy(16).fetch(&client, &DenyAll, "http://x/forbidden").await;
        assert_eq!(outcome.code, OracleResponseCode::Forbidden);
        assert!(outcome.body.is_empty());
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);

        let outcome = policy(16).fetch(&client, &AllowAll, "not a url").await;
        assert_eq!(outcome.code, OracleResponseCode::Forbidden);
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unsupported_scheme() {
        let client = Fixed::ok(vec![]);
        let outcome = policy(16).fetch(&client, &AllowAll, "ftp://x/file").await;
        assert_eq!(outcome.code, OracleResponseCode::ProtocolNotSupported);
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_admission_runs_before_scheme_check() {
        let client = Fixed::ok(vec![]);
        let outcome = policy(16).fetch(&client, &DenyAll, "ftp://x/file").await;
        assert_eq!(outcome.code, OracleResponseCode::Forbidden);
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_streamed_body_over_cap_is_too_large() {
        let client = Fixed::ok(vec![vec![0; 3], vec![0; 3]]);
        let outcome = policy(5).fetch(&client, &AllowAll, "http://x/big").await;
        assert_eq!(outcome, FetchOutcome::failure(OracleResponseCode::ResponseTooLarge));

        let exact = Fixed::ok(vec![vec![0; 3], vec![0; 2]]);
        let outcome = policy(5).fetch(&exact, &AllowAll, "http://x/big").await;
        assert_eq!(outcome.code, OracleResponseCode::Success);
        assert_eq!(outcome.body.len(), 5);
    }

    #[tokio::test]
    async fn test_declared_length_over_cap_is_too_large() {
        let mut client = Fixed::ok(vec![vec![0; 1]]);
        client.declared = Some(6);
        let outcome = policy(5).fetch(&client, &AllowAll, "http://x/big").await;
        assert_eq!(outcome.code, OracleResponseCode::ResponseTooLarge);
    }

    #[tokio::test]
    async fn test_status_table() {
        for (status, code) in [
            (403, OracleResponseCode::Forbidden),
            (404, OracleResponseCode::NotFound),
            (408, OracleResponseCode::Timeout),
            (500, OracleResponseCode::Error),
            (302, OracleResponseCode::Error),
            (401, OracleResponseCode::Error),
            (201, OracleResponseCode::Error),
            (204, OracleResponseCode::Error),
            (206, OracleResponseCode::Error),
        ] {
            let mut client = Fixed::ok(vec![vec![1]]);
            client.status = status;
            let outcome = policy(16).fetch(&client, &AllowAll, "http://x/").await;
            assert_eq!(outcome, FetchOutcome::failure(code), "status {status}");
        }
    }

    #[tokio::test]
    async fn test_client_errors() {
        for (error, code) in [
            (HttpClientError::Timeout, OracleResponseCode::Timeout),
            (
                HttpClientError::Forbidden("private".to_string()),
                OracleResponseCode::Forbidden,
            ),
            (
                HttpClientError::Transport("reset".to_string()),
                OracleResponseCode::Error,
            ),
        ] {
            let outcome = policy(16)
                .fetch(&Failing(error), &AllowAll, "http://x/")
                .await;
            assert_eq!(outcome.code, code);
        }
    }

    #[tokio::test]
    async fn test_slow_server_times_out() {
        let mut client = Fixed::ok(vec![vec![1]]);
        client.delay = Duration::from_millis(200);
        let policy = FetchPolicy::new(Duration::from_millis(20), 16, Vec::new());
        let outcome = policy.fetch(&client, &AllowAll, "http://x/slow").await;
        assert_eq!(outcome.code, OracleResponseCode::Timeout);
    }

    #[tokio::test]
    async fn test_content_type_filter() {
        let policy = FetchPolicy::new(
            Duration::from_secs(1),
            16,
            vec!["application/json".to_string()],
        );
        let mut client = Fixed::ok(vec![b"{}".to_vec()]);
        client.content_type = Some("application/json; charset=utf-8");
        assert_eq!(
            policy.fetch(&client, &AllowAll, "http://x/").await.code,
            OracleResponseCode::Success
        );

        client.content_type = Some("text/html");
        assert_eq!(
            policy.fetch(&client, &AllowAll, "http://x/").await.code,
            OracleResponseCode::ContentTypeNotSupported
        );

        client.content_type = None;
        assert_eq!(
            policy.fetch(&client, &AllowAll, "http://x/").await.code,
            OracleResponseCode::ContentTypeNotSupported
        );
    }
}
