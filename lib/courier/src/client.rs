//! HTTP transport implementation using hyper-util.

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use courier_core::{Error, HttpClient, Request, Response, Result};
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use tracing::trace;

use crate::{config::ClientConfig, connector::https_connector};

/// Pooled HTTP/HTTPS transport backed by hyper.
///
/// Cloning is cheap: clones share the same connection pool.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use courier::HyperClient;
///
/// let client = HyperClient::builder()
///     .connect_timeout(Duration::from_secs(2))
///     .user_agent("inventory-sync/1.4")
///     .build();
/// ```
#[derive(Clone)]
pub struct HyperClient {
    inner: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    config: ClientConfig,
}

impl std::fmt::Debug for HyperClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HyperClient {
    /// Create a transport with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a transport with the given configuration.
    #[must_use]
    pub fn with_config(config: ClientConfig) -> Self {
        let connector = https_connector(&config);

        let inner = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(config.idle_timeout())
            .pool_max_idle_per_host(config.max_idle_per_host())
            .build(connector);

        Self { inner, config }
    }

    /// Create a builder.
    #[must_use]
    pub fn builder() -> HyperClientBuilder {
        HyperClientBuilder::default()
    }

    /// The configuration this transport was built with.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn build_hyper_request(
        request: Request<Bytes>,
        user_agent: Option<&str>,
    ) -> Result<http::Request<Full<Bytes>>> {
        let (method, url, headers, body) = request.into_parts();

        let mut builder = http::Request::builder()
            .method(http::Method::from(method))
            .uri(url.as_str());

        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(agent) = user_agent
            && !headers.keys().any(|name| name.eq_ignore_ascii_case("user-agent"))
        {
            builder = builder.header(http::header::USER_AGENT, agent);
        }

        let body = body.map_or_else(Full::default, Full::new);
        builder
            .body(body)
            .map_err(|e| Error::invalid_request(e.to_string()))
    }

    fn extract_headers(headers: &http::HeaderMap) -> HashMap<String, String> {
        headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect()
    }

    #[allow(clippy::needless_pass_by_value)]
    fn map_hyper_error(err: hyper_util::client::legacy::Error) -> Error {
        let msg = err.to_string();

        if err.is_connect() {
            return Error::connection(msg);
        }

        if msg.contains("ssl") || msg.contains("tls") || msg.contains("certificate") {
            return Error::tls(msg);
        }

        Error::connection(msg)
    }
}

impl Default for HyperClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for HyperClient {
    async fn execute(&self, request: Request<Bytes>) -> Result<Response<Bytes>> {
        let hyper_request = Self::build_hyper_request(request, self.config.user_agent())?;
        trace!(uri = %hyper_request.uri(), "sending request");

        let round_trip = async {
            let response = self
                .inner
                .request(hyper_request)
                .await
                .map_err(Self::map_hyper_error)?;

            let status = response.status().as_u16();
            let headers = Self::extract_headers(response.headers());

            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| Error::connection(e.to_string()))?
                .to_bytes();

            Ok(Response::new(status, headers, body))
        };

        match self.config.request_timeout() {
            Some(limit) => tokio::time::timeout(limit, round_trip)
                .await
                .map_err(|_| Error::Timeout)?,
            None => round_trip.await,
        }
    }
}

/// Builder for [`HyperClient`], forwarding to [`ClientConfig`].
#[derive(Debug, Default)]
pub struct HyperClientBuilder {
    config: ClientConfig,
}

impl HyperClientBuilder {
    /// Bound every round trip, independently of endpoint timeouts.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_request_timeout(timeout);
        self
    }

    /// Limit connection attempts.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_connect_timeout(Some(timeout));
        self
    }

    /// Keep at most `count` idle connections per host.
    #[must_use]
    pub fn max_idle_per_host(mut self, count: usize) -> Self {
        self.config = self.config.with_max_idle_per_host(count);
        self
    }

    /// Close idle connections after `timeout`.
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_idle_timeout(Some(timeout));
        self
    }

    /// Default `User-Agent` for requests that do not set one.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config = self.config.with_user_agent(Some(user_agent));
        self
    }

    /// Build the transport.
    #[must_use]
    pub fn build(self) -> HyperClient {
        HyperClient::with_config(self.config)
    }
}
