//! Network asset fetching with reqwest.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpRequest, HttpResponse},
};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Overall ceiling for a fetch when the request carries no timeout. The
/// loader normally passes its own, shorter, per-candidate deadline.
const FALLBACK_TIMEOUT: Duration = Duration::from_secs(30);

/// `HttpClient` over a pooled reqwest client (rustls).
///
/// Root-relative asset URIs such as `/audio/boot.mp3` only make sense against
/// a site, so set [`with_base_url`](Self::with_base_url) when the catalog uses
/// them.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Client,
    base_url: Option<String>,
}

impl ReqwestHttpClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(FALLBACK_TIMEOUT)
            .connect_timeout(Duration::from_secs(5))
            .pool_max_idle_per_host(4)
            .user_agent(concat!("retro-sfx/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BridgeError::NotAvailable(format!("HTTP client: {e}")))?;
        Ok(Self::from_client(client))
    }

    pub fn from_client(client: Client) -> Self {
        Self {
            client,
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base_url = Some(base.into().trim_end_matches('/').to_string());
        self
    }

    fn absolute(&self, uri: &str) -> String {
        match &self.base_url {
            Some(base) if uri.starts_with('/') => format!("{base}{uri}"),
            _ => uri.to_string(),
        }
    }
}

fn transport_error(err: reqwest::Error, timeout: Option<Duration>) -> BridgeError {
    if err.is_timeout() {
        BridgeError::Timeout(timeout.unwrap_or(FALLBACK_TIMEOUT))
    } else if err.is_connect() {
        BridgeError::OperationFailed(format!("connect: {err}"))
    } else {
        BridgeError::OperationFailed(err.to_string())
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = self.absolute(&request.url);
        let timeout = request.timeout;

        let mut builder = self.client.get(&url);
        for (key, value) in request.headers {
            builder = builder.header(key, value);
        }
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        let status = response.status().as_u16();
        let mut out = HttpResponse::new(status, bytes::Bytes::new());
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                out = out.with_header(name.as_str(), value);
            }
        }
        out.body = response
            .bytes()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        debug!(url = %url, status, bytes = out.body.len(), "Fetched asset");
        Ok(out)
    }
}
