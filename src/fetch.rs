use std::future::Future;

use bytes::{Bytes, BytesMut};
use reqwest::{redirect::Policy, Client, StatusCode};
use tracing::debug;
use url::{Host, Url};

use crate::config::UpdaterConfig;
use crate::error::FetchError;
use crate::types::RawContent;

/// Source of the page every section is derived from.
///
/// Implementations never fail: problems are reported as
/// [`RawContent::Unavailable`] and the caller decides how to log them.
pub trait Fetcher: Send + Sync {
    fn fetch(&self) -> impl Future<Output = RawContent> + Send;
}

#[derive(Clone)]
pub struct HttpFetcher {
    http: Client,
    endpoint: Url,
    max_body_bytes: usize,
}

impl HttpFetcher {
    pub fn new(config: &UpdaterConfig) -> Result<Self, FetchError> {
        let mut builder = Client::builder()
            .user_agent(config.user_agent.as_str())
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .redirect(Policy::limited(8))
            .timeout(config.timeout);
        if is_loopback(&config.endpoint) {
            builder = builder.no_proxy();
        }
        let http = builder.build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            max_body_bytes: config.max_body_bytes,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Status, content type and body. Bodies over the configured limit are
    /// refused rather than buffered.
    pub async fn fetch_bytes(&self) -> Result<(StatusCode, String, Bytes), FetchError> {
        let mut res = self.http.get(self.endpoint.clone()).send().await?;
        let status = res.status();
        let ct = res
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let limit = self.max_body_bytes;
        let too_large = FetchError::TooLarge { limit };
        if res
            .content_length()
            .is_some_and(|n| n > u64::try_from(limit).unwrap_or(u64::MAX))
        {
            return Err(too_large);
        }
        let mut body = BytesMut::new();
        while let Some(chunk) = res.chunk().await? {
            if body.len() + chunk.len() > limit {
                return Err(too_large);
            }
            body.extend_from_slice(&chunk);
        }
        Ok((status, ct, body.freeze()))
    }

    /// One GET, no retries. Non-2xx is an error.
    pub async fn fetch_page(&self) -> Result<String, FetchError> {
        let (status, ct, body) = self.fetch_bytes().await?;
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        debug!(url = %self.endpoint, content_type = %ct, bytes = body.len(), "fetched page");

        // assume utf-8; invalid sequences are replaced rather than rejected
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        Some(Host::Domain(d)) => d.eq_ignore_ascii_case("localhost"),
        None => false,
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self) -> RawContent {
        match self.fetch_page().await {
            Ok(body) => RawContent::Body(body),
            Err(e) => RawContent::Unavailable {
                reason: e.to_string(),
            },
        }
    }
}
