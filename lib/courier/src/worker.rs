//! The request pipeline.
//!
//! A [`Worker`] executes [`Endpoint`]s through an [`HttpClient`]. Each call
//! runs as one supervised unit: address parsing, decorators, parameter
//! encoding, sending, verification and decoding all happen inside the
//! [`Supervisor`] race against the endpoint timeout and the worker's
//! cancellation token.

use std::future::Future;
use std::time::Instant;

use bytes::Bytes;
use courier_core::{HttpClient, Request, RequestBuilder, Response, WorkerError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::endpoint::Endpoint;
use crate::supervisor::Supervisor;

/// Executes endpoint calls over a shared transport.
///
/// # Example
///
/// ```ignore
/// use courier::{Endpoint, HyperClient, Method, ParameterEncoding, Worker};
///
/// let worker = Worker::new(HyperClient::new());
/// let search = Endpoint::builder("https://api.example.com", "/search", Method::Get)
///     .parameters::<Query>(ParameterEncoding::QueryItems)
///     .response::<Hits>(ResponseDecoding::Json)
///     .verify_status()
///     .build();
///
/// let hits = worker.fetch_with(&search, Query { q: "rust".into() }).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Worker<C> {
    client: C,
    supervisor: Supervisor,
}

impl<C> Worker<C>
where
    C: HttpClient + Clone + 'static,
{
    /// A worker with its own cancellation token.
    pub fn new(client: C) -> Self {
        Self {
            client,
            supervisor: Supervisor::new(),
        }
    }

    /// A worker sharing this transport whose calls observe `token`.
    #[must_use]
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            client: self.client.clone(),
            supervisor: Supervisor::with_cancellation(token),
        }
    }

    /// The transport.
    pub const fn client(&self) -> &C {
        &self.client
    }

    /// The supervisor running this worker's calls.
    pub const fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    /// Call an endpoint without parameters, discarding the response body.
    ///
    /// # Errors
    ///
    /// Any pipeline failure, see [`WorkerError`].
    pub async fn make_request<P, R>(&self, endpoint: &Endpoint<P, R>) -> Result<(), WorkerError>
    where
        P: 'static,
        R: 'static,
    {
        let client = self.client.clone();
        let target = endpoint.clone();
        self.supervise(endpoint, async move {
            let request = prepare(&target).await?;
            send(&client, &target, request).await.map(drop)
        })
        .await
    }

    /// Call an endpoint with parameters, discarding the response body.
    ///
    /// # Errors
    ///
    /// Any pipeline failure, see [`WorkerError`].
    pub async fn make_request_with<P, R>(
        &self,
        endpoint: &Endpoint<P, R>,
        parameters: P,
    ) -> Result<(), WorkerError>
    where
        P: Serialize + Send + 'static,
        R: 'static,
    {
        let client = self.client.clone();
        let target = endpoint.clone();
        self.supervise(endpoint, async move {
            let request = prepare(&target).await?;
            let request = encode(&target, &parameters, request)?;
            send(&client, &target, request).await.map(drop)
        })
        .await
    }

    /// Call an endpoint without parameters and decode the response.
    ///
    /// # Errors
    ///
    /// Any pipeline failure, see [`WorkerError`].
    pub async fn fetch<P, R>(&self, endpoint: &Endpoint<P, R>) -> Result<R, WorkerError>
    where
        P: 'static,
        R: DeserializeOwned + Send + 'static,
    {
        let client = self.client.clone();
        let target = endpoint.clone();
        self.supervise(endpoint, async move {
            let request = prepare(&target).await?;
            let response = send(&client, &target, request).await?;
            decode(&target, &response)
        })
        .await
    }

    /// Call an endpoint with parameters and decode the response.
    ///
    /// # Errors
    ///
    /// Any pipeline failure, see [`WorkerError`].
    pub async fn fetch_with<P, R>(
        &self,
        endpoint: &Endpoint<P, R>,
        parameters: P,
    ) -> Result<R, WorkerError>
    where
        P: Serialize + Send + 'static,
        R: DeserializeOwned + Send + 'static,
    {
        let client = self.client.clone();
        let target = endpoint.clone();
        self.supervise(endpoint, async move {
            let request = prepare(&target).await?;
            let request = encode(&target, &parameters, request)?;
            let response = send(&client, &target, request).await?;
            decode(&target, &response)
        })
        .await
    }

    async fn supervise<P, R, T, F>(
        &self,
        endpoint: &Endpoint<P, R>,
        operation: F,
    ) -> Result<T, WorkerError>
    where
        F: Future<Output = Result<T, WorkerError>> + Send + 'static,
        T: Send + 'static,
    {
        let span = info_span!(
            "worker_request",
            method = %endpoint.method(),
            url = %endpoint.address(),
        );
        let start = Instant::now();

        let result = self
            .supervisor
            .run(operation.instrument(span.clone()), endpoint.timeout())
            .await;

        if let Err(err) = &result {
            let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
            warn!(parent: &span, error = %err, elapsed_ms, "request failed");
        }
        result
    }
}

async fn prepare<P, R>(endpoint: &Endpoint<P, R>) -> Result<RequestBuilder<Bytes>, WorkerError> {
    let url = endpoint.url()?;
    let mut request = Request::builder(endpoint.method(), url);

    if !endpoint.headers().is_empty() {
        for header in endpoint.headers() {
            let (name, value) = header.resolve().await?;
            check_header(&name, &value)?;
            request = request.header(name, value);
        }
        debug!(count = endpoint.headers().len(), "applied headers");
    }

    if let Some(authorization) = endpoint.authorization() {
        let value = authorization.header_value().await?;
        check_header("Authorization", &value)?;
        request = request.header("Authorization", value);
    }

    if !endpoint.query_parameters().is_empty() {
        let mut items = Vec::with_capacity(endpoint.query_parameters().len());
        for parameter in endpoint.query_parameters() {
            items.push(parameter.resolve().await?);
        }
        debug!(count = items.len(), "applied query parameters");
        request = request.query_items(items);
    }

    Ok(request)
}

/// Rejects names and values the transport could not put on the wire.
fn check_header(name: &str, value: &str) -> Result<(), WorkerError> {
    http::HeaderName::from_bytes(name.as_bytes())
        .map_err(|err| WorkerError::RequestPreparation(Box::new(err)))?;
    http::HeaderValue::from_str(value)
        .map_err(|err| WorkerError::RequestPreparation(Box::new(err)))?;
    Ok(())
}

fn encode<P, R>(
    endpoint: &Endpoint<P, R>,
    parameters: &P,
    request: RequestBuilder<Bytes>,
) -> Result<RequestBuilder<Bytes>, WorkerError>
where
    P: Serialize,
{
    let encoding = endpoint.encoding();
    debug!(%encoding, "encoding parameters");
    encoding.encode(parameters, request)
}

async fn send<C, P, R>(
    client: &C,
    endpoint: &Endpoint<P, R>,
    request: RequestBuilder<Bytes>,
) -> Result<Response<Bytes>, WorkerError>
where
    C: HttpClient,
{
    let request = request.build();
    if let Some(inspect) = endpoint.inspector() {
        inspect(request.clone())
            .await
            .map_err(WorkerError::from_provider)?;
    }

    let start = Instant::now();
    let response = client
        .execute(request)
        .await
        .map_err(|e| WorkerError::Transport(e.to_string()))?;

    let status = response.status();
    let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    info!(status, elapsed_ms, "response received");

    if let Some(verifier) = endpoint.verifier() {
        verifier.verify(&response)?;
    }
    Ok(response)
}

fn decode<P, R>(endpoint: &Endpoint<P, R>, response: &Response<Bytes>) -> Result<R, WorkerError>
where
    R: DeserializeOwned + 'static,
{
    let decoding = endpoint.decoding();
    debug!(%decoding, bytes = response.body().len(), "decoding response");
    decoding.decode(response.body())
}
