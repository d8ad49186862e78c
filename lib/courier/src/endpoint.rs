//! Endpoint descriptors.
//!
//! An [`Endpoint`] declares everything needed to call one remote operation:
//! where it lives, which method to use, how parameters and responses are
//! encoded, and which optional capabilities apply (timeout, extra headers,
//! authorization, extra query items, response verification).
//!
//! ```
//! use std::time::Duration;
//! use courier::{Endpoint, Method, ParameterEncoding, ResponseDecoding, StaticToken};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize)]
//! struct Search { q: String }
//!
//! #[derive(Deserialize)]
//! struct Hits { total: u64 }
//!
//! let endpoint = Endpoint::builder("https://api.example.com", "/search", Method::Get)
//!     .parameters::<Search>(ParameterEncoding::QueryItems)
//!     .response::<Hits>(ResponseDecoding::Json)
//!     .timeout(Duration::from_secs(2))
//!     .bearer(StaticToken::new("secret"))
//!     .verify_status()
//!     .build();
//! # let _ = endpoint;
//! ```

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use courier_core::{BoxError, Method, Request, WorkerError};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::codec::{ParameterEncoding, ResponseDecoding};
use crate::decorator::{
    Authorization, HeaderField, QueryParameter, ResponseVerifier, StatusCodeVerifier,
};
use crate::provider::{TokenProvider, ValueProvider};

/// Asynchronous hook receiving a copy of the fully prepared request, right
/// before it is sent.
///
/// Returning an error aborts the call with
/// [`WorkerError::RequestPreparation`], or with a cancellation when the error
/// is a [`Cancelled`](courier_core::Cancelled) marker.
pub type RequestInspector =
    Arc<dyn Fn(Request<Bytes>) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

/// Declarative description of one remote operation.
///
/// `P` is the parameter type and `R` the decoded response type. Both default
/// to `()` for endpoints that take no parameters or whose response is not
/// decoded.
pub struct Endpoint<P = (), R = ()> {
    base_path: String,
    path: String,
    method: Method,
    encoding: ParameterEncoding,
    decoding: ResponseDecoding,
    timeout: Option<Duration>,
    headers: Vec<HeaderField>,
    authorization: Option<Authorization>,
    query_parameters: Vec<QueryParameter>,
    verifier: Option<Arc<dyn ResponseVerifier>>,
    inspector: Option<RequestInspector>,
    _types: PhantomData<fn(P) -> R>,
}

impl Endpoint {
    /// Start describing an endpoint at `base_path` + `path`.
    pub fn builder(
        base_path: impl Into<String>,
        path: impl Into<String>,
        method: Method,
    ) -> EndpointBuilder {
        EndpointBuilder {
            endpoint: Self {
                base_path: base_path.into(),
                path: path.into(),
                method,
                encoding: ParameterEncoding::default(),
                decoding: ResponseDecoding::default(),
                timeout: None,
                headers: Vec::new(),
                authorization: None,
                query_parameters: Vec::new(),
                verifier: None,
                inspector: None,
                _types: PhantomData,
            },
        }
    }
}

impl<P, R> Endpoint<P, R> {
    /// The base path, e.g. `https://api.example.com`.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// The path appended to the base path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The concatenation of base path and path.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}{}", self.base_path, self.path)
    }

    /// Parse the address.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::MalformedAddress`] if the address is not a valid
    /// absolute URL.
    pub fn url(&self) -> Result<url::Url, WorkerError> {
        let address = self.address();
        url::Url::parse(&address).map_err(|_| WorkerError::malformed_address(address))
    }

    /// The HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// How parameters are encoded.
    #[must_use]
    pub const fn encoding(&self) -> ParameterEncoding {
        self.encoding
    }

    /// How the response is decoded.
    #[must_use]
    pub const fn decoding(&self) -> ResponseDecoding {
        self.decoding
    }

    /// The declared timeout, if any.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Extra headers.
    #[must_use]
    pub fn headers(&self) -> &[HeaderField] {
        &self.headers
    }

    /// Authorization, if declared.
    #[must_use]
    pub const fn authorization(&self) -> Option<&Authorization> {
        self.authorization.as_ref()
    }

    /// Extra query items.
    #[must_use]
    pub fn query_parameters(&self) -> &[QueryParameter] {
        &self.query_parameters
    }

    /// Response verifier, if declared.
    #[must_use]
    pub fn verifier(&self) -> Option<&dyn ResponseVerifier> {
        self.verifier.as_deref()
    }

    /// Request inspector, if declared.
    #[must_use]
    pub const fn inspector(&self) -> Option<&RequestInspector> {
        self.inspector.as_ref()
    }

    fn retype<P2, R2>(self) -> Endpoint<P2, R2> {
        Endpoint {
            base_path: self.base_path,
            path: self.path,
            method: self.method,
            encoding: self.encoding,
            decoding: self.decoding,
            timeout: self.timeout,
            headers: self.headers,
            authorization: self.authorization,
            query_parameters: self.query_parameters,
            verifier: self.verifier,
            inspector: self.inspector,
            _types: PhantomData,
        }
    }
}

impl<P, R> Clone for Endpoint<P, R> {
    fn clone(&self) -> Self {
        Self {
            base_path: self.base_path.clone(),
            path: self.path.clone(),
            method: self.method,
            encoding: self.encoding,
            decoding: self.decoding,
            timeout: self.timeout,
            headers: self.headers.clone(),
            authorization: self.authorization.clone(),
            query_parameters: self.query_parameters.clone(),
            verifier: self.verifier.clone(),
            inspector: self.inspector.clone(),
            _types: PhantomData,
        }
    }
}

impl<P, R> fmt::Debug for Endpoint<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("method", &self.method)
            .field("address", &self.address())
            .field("encoding", &self.encoding)
            .field("decoding", &self.decoding)
            .field("timeout", &self.timeout)
            .field("headers", &self.headers)
            .field("authorization", &self.authorization)
            .field("query_parameters", &self.query_parameters)
            .field("verifier", &self.verifier.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Endpoint`].
pub struct EndpointBuilder<P = (), R = ()> {
    endpoint: Endpoint<P, R>,
}

impl<P, R> fmt::Debug for EndpointBuilder<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointBuilder")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl<P, R> EndpointBuilder<P, R> {
    /// Declare the parameter type and its encoding.
    #[must_use]
    pub fn parameters<P2>(self, encoding: ParameterEncoding) -> EndpointBuilder<P2, R> {
        let mut endpoint = self.endpoint.retype::<P2, R>();
        endpoint.encoding = encoding;
        EndpointBuilder { endpoint }
    }

    /// Declare the response type and its decoding.
    #[must_use]
    pub fn response<R2>(self, decoding: ResponseDecoding) -> EndpointBuilder<P, R2> {
        let mut endpoint = self.endpoint.retype::<P, R2>();
        endpoint.decoding = decoding;
        EndpointBuilder { endpoint }
    }

    /// Bound the whole call, from header resolution to decoding.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.endpoint.timeout = Some(timeout);
        self
    }

    /// Add a header whose value is a constant or a [`ValueProvider`].
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<ValueProvider>) -> Self {
        self.endpoint.headers.push(HeaderField::new(name, value));
        self
    }

    /// Add several headers.
    #[must_use]
    pub fn headers(mut self, headers: impl IntoIterator<Item = HeaderField>) -> Self {
        self.endpoint.headers.extend(headers);
        self
    }

    /// Set the authorization.
    #[must_use]
    pub fn authorization(mut self, authorization: Authorization) -> Self {
        self.endpoint.authorization = Some(authorization);
        self
    }

    /// `Bearer` authorization from a token provider.
    #[must_use]
    pub fn bearer(self, provider: impl TokenProvider + 'static) -> Self {
        self.authorization(Authorization::bearer(provider))
    }

    /// `Basic` authorization from a token provider.
    #[must_use]
    pub fn basic(self, provider: impl TokenProvider + 'static) -> Self {
        self.authorization(Authorization::basic(provider))
    }

    /// Add a query item whose value is a constant or a [`ValueProvider`].
    #[must_use]
    pub fn query_parameter(
        mut self,
        name: impl Into<String>,
        value: impl Into<ValueProvider>,
    ) -> Self {
        self.endpoint
            .query_parameters
            .push(QueryParameter::new(name, value));
        self
    }

    /// Add several query items.
    #[must_use]
    pub fn query_parameters(mut self, parameters: impl IntoIterator<Item = QueryParameter>) -> Self {
        self.endpoint.query_parameters.extend(parameters);
        self
    }

    /// Reject responses outside `200..=299`.
    #[must_use]
    pub fn verify_status(self) -> Self {
        self.verifier(StatusCodeVerifier::default())
    }

    /// Set a custom response verifier.
    #[must_use]
    pub fn verifier(mut self, verifier: impl ResponseVerifier + 'static) -> Self {
        self.endpoint.verifier = Some(Arc::new(verifier));
        self
    }

    /// Observe the prepared request right before it is sent.
    #[must_use]
    pub fn inspect_request<F, Fut>(mut self, inspector: F) -> Self
    where
        F: Fn(Request<Bytes>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.endpoint.inspector = Some(Arc::new(move |request| inspector(request).boxed()));
        self
    }

    /// Finish the endpoint.
    ///
    /// The address is validated when the endpoint is called, not here.
    #[must_use]
    pub fn build(self) -> Endpoint<P, R> {
        self.endpoint
    }
}
