//! Request decorators and response verifiers attached to an endpoint.

use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use bytes::Bytes;
use courier_core::{Response, WorkerError};
use tracing::debug;

use crate::provider::{TokenProvider, ValueProvider};

/// A name paired with a lazily evaluated value.
///
/// Used for both extra headers ([`HeaderField`]) and extra query items
/// ([`QueryParameter`]).
#[derive(Debug, Clone)]
pub struct NamedValue {
    name: String,
    value: ValueProvider,
}

/// An extra header added to every request of an endpoint.
pub type HeaderField = NamedValue;

/// An extra query item added to every request of an endpoint.
pub type QueryParameter = NamedValue;

impl NamedValue {
    /// Pair `name` with a constant or a [`ValueProvider`].
    pub fn new(name: impl Into<String>, value: impl Into<ValueProvider>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// The name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluate the value and return the `(name, value)` pair.
    ///
    /// # Errors
    ///
    /// Provider failures are mapped with [`WorkerError::from_provider`].
    pub async fn resolve(&self) -> Result<(String, String), WorkerError> {
        let value = self
            .value
            .value()
            .await
            .map_err(WorkerError::from_provider)?;
        Ok((self.name.clone(), value))
    }
}

/// Scheme prefix of an `Authorization` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum AuthScheme {
    /// `Bearer <token>`
    #[display("Bearer")]
    Bearer,
    /// `Basic <token>`
    #[display("Basic")]
    Basic,
}

/// Produces the `Authorization` header of an endpoint.
///
/// The provider's token is used as-is; use
/// [`BasicCredentials`](crate::BasicCredentials) to get the base64 form of
/// a username and password.
#[derive(Clone)]
pub struct Authorization {
    scheme: AuthScheme,
    provider: Arc<dyn TokenProvider>,
}

impl Authorization {
    /// Authorization with an explicit scheme.
    pub fn new(scheme: AuthScheme, provider: impl TokenProvider + 'static) -> Self {
        Self {
            scheme,
            provider: Arc::new(provider),
        }
    }

    /// `Bearer` authorization.
    pub fn bearer(provider: impl TokenProvider + 'static) -> Self {
        Self::new(AuthScheme::Bearer, provider)
    }

    /// `Basic` authorization.
    pub fn basic(provider: impl TokenProvider + 'static) -> Self {
        Self::new(AuthScheme::Basic, provider)
    }

    /// The scheme.
    #[must_use]
    pub const fn scheme(&self) -> AuthScheme {
        self.scheme
    }

    /// Fetch the token and format the header value.
    ///
    /// # Errors
    ///
    /// Provider failures are mapped with [`WorkerError::from_provider`].
    pub async fn header_value(&self) -> Result<String, WorkerError> {
        let token = self
            .provider
            .token()
            .await
            .map_err(WorkerError::from_provider)?;
        debug!(scheme = %self.scheme, "resolved authorization token");
        Ok(format!("{} {token}", self.scheme))
    }
}

impl fmt::Debug for Authorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authorization")
            .field("scheme", &self.scheme)
            .finish_non_exhaustive()
    }
}

/// Checks a response before it is handed back or decoded.
pub trait ResponseVerifier: Send + Sync {
    /// Accept or reject the response.
    ///
    /// # Errors
    ///
    /// The returned error becomes the outcome of the call.
    fn verify(&self, response: &Response<Bytes>) -> Result<(), WorkerError>;
}

impl<F> ResponseVerifier for F
where
    F: Fn(&Response<Bytes>) -> Result<(), WorkerError> + Send + Sync,
{
    fn verify(&self, response: &Response<Bytes>) -> Result<(), WorkerError> {
        self(response)
    }
}

/// Rejects responses whose status is outside an accepted range.
///
/// The default range is `200..=299`. Rejections carry the status and the raw
/// body in [`WorkerError::Status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCodeVerifier {
    accepted: RangeInclusive<u16>,
}

impl StatusCodeVerifier {
    /// Verifier accepting exactly `accepted`.
    #[must_use]
    pub const fn accepting(accepted: RangeInclusive<u16>) -> Self {
        Self { accepted }
    }

    /// The accepted range.
    #[must_use]
    pub const fn accepted(&self) -> &RangeInclusive<u16> {
        &self.accepted
    }
}

impl Default for StatusCodeVerifier {
    fn default() -> Self {
        Self::accepting(200..=299)
    }
}

impl ResponseVerifier for StatusCodeVerifier {
    fn verify(&self, response: &Response<Bytes>) -> Result<(), WorkerError> {
        let status = response.status();
        if self.accepted.contains(&status) {
            Ok(())
        } else {
            Err(WorkerError::status_code(status, response.body().clone()))
        }
    }
}
