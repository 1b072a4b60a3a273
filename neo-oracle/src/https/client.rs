use super::security::{is_internal_ip, is_localhost_name, HostRefused};
use crate::interfaces::{HttpClientError, HttpResponse, OracleHttpClient, UrlValidator};
use crate::service::OracleServiceError;
use crate::settings::OracleServiceSettings;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::error::Error as StdError;
use std::net::SocketAddr;
use std::sync::Arc;
use url::Url;

/// Redirects followed before the fetch fails.
pub const MAX_REDIRECTS: usize = 2;

type BoxError = Box<dyn StdError + Send + Sync>;

/// [`OracleHttpClient`] backed by `reqwest`.
///
/// Each redirect target is re-admitted through the URL validator. Unless
/// private hosts are allowed, DNS answers naming private addresses are refused.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
    accept: Option<String>,
}

impl ReqwestHttpClient {
    pub fn new(
        settings: &OracleServiceSettings,
        admission: Arc<dyn UrlValidator>,
    ) -> Result<Self, OracleServiceError> {
        let policy = reqwest::redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() > MAX_REDIRECTS {
                return attempt.error("too many redirects");
            }
            match admission.validate(attempt.url()) {
                Ok(()) => attempt.follow(),
                Err(reason) => attempt.error(HostRefused(reason)),
            }
        });

        let mut builder = reqwest::Client::builder()
            .redirect(policy)
            .user_agent(concat!("neo-oracle/", env!("CARGO_PKG_VERSION")));
        if !settings.allow_private_host {
            builder = builder.dns_resolver(Arc::new(PublicOnlyResolver));
        }
        let client = builder
            .build()
            .map_err(|err| OracleServiceError::Config(err.to_string()))?;

        let accept = (!settings.allowed_content_types.is_empty())
            .then(|| settings.allowed_content_types.join(", "));
        Ok(Self { client, accept })
    }
}

#[async_trait]
impl OracleHttpClient for ReqwestHttpClient {
    async fn get(&self, url: &Url) -> Result<HttpResponse, HttpClientError> {
        let mut request = self.client.get(url.clone());
        if let Some(accept) = &self.accept {
            request = request.header(ACCEPT, accept);
        }
        let response = request.send().await.map_err(map_error)?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        Ok(HttpResponse {
            status: response.status().as_u16(),
            content_type,
            content_length: response.content_length(),
            body: response
                .bytes_stream()
                .map(|chunk| chunk.map_err(map_error))
                .boxed(),
        })
    }
}

fn map_error(err: reqwest::Error) -> HttpClientError {
    if err.is_timeout() {
        return HttpClientError::Timeout;
    }
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(refused) = cause.downcast_ref::<HostRefused>() {
            return HttpClientError::Forbidden(refused.0.clone());
        }
        source = cause.source();
    }
    HttpClientError::Transport(err.to_string())
}

/// Resolver that fails for hosts naming any private or reserved address.
struct PublicOnlyResolver;

impl Resolve for PublicOnlyResolver {
    fn resolve(&self, name: Name) -> Resolving {
        Box::pin(resolve_public(name.as_str().to_string()))
    }
}

async fn resolve_public(host: String) -> Result<Addrs, BoxError> {
    if is_localhost_name(&host) {
        return Err(Box::new(HostRefused(host)));
    }
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host.as_str(), 0))
        .await?
        .collect();
    if addrs.iter().any(|addr| is_internal_ip(addr.ip())) {
        return Err(Box::new(HostRefused(host)));
    }
    Ok(Box::new(addrs.into_iter()))
}
