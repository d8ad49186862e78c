//! Asynchronous value sources for headers, query parameters and credentials.
//!
//! Providers are evaluated once per request, right before the request is
//! sent. A provider failure aborts the request with
//! [`WorkerError::RequestPreparation`](courier_core::WorkerError::RequestPreparation),
//! unless the failure is a [`Cancelled`](courier_core::Cancelled) marker, in
//! which case the request reports a cancellation.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use courier_core::BoxError;
use futures_util::FutureExt;
use futures_util::future::{self, BoxFuture};

/// Future returned by providers.
pub type ProviderFuture<'a> = BoxFuture<'a, Result<String, BoxError>>;

/// A source of a string value: either a constant or an async closure.
///
/// ```
/// use courier::ValueProvider;
///
/// let fixed = ValueProvider::constant("en-US");
/// let dynamic = ValueProvider::from_fn(|| async { Ok("computed".to_string()) });
/// # let _ = (fixed, dynamic);
/// ```
#[derive(Clone)]
pub struct ValueProvider(Arc<dyn Fn() -> ProviderFuture<'static> + Send + Sync>);

impl ValueProvider {
    /// A provider that always yields `value`.
    pub fn constant(value: impl Into<String>) -> Self {
        let value: Arc<str> = Arc::from(value.into());
        Self(Arc::new(move || {
            future::ready(Ok::<_, BoxError>(value.to_string())).boxed()
        }))
    }

    /// A provider backed by an async closure.
    pub fn from_fn<F, Fut>(provider: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, BoxError>> + Send + 'static,
    {
        Self(Arc::new(move || provider().boxed()))
    }

    /// Evaluate the provider.
    pub fn value(&self) -> ProviderFuture<'static> {
        (self.0)()
    }
}

impl fmt::Debug for ValueProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ValueProvider(..)")
    }
}

impl From<&str> for ValueProvider {
    fn from(value: &str) -> Self {
        Self::constant(value)
    }
}

impl From<String> for ValueProvider {
    fn from(value: String) -> Self {
        Self::constant(value)
    }
}

/// Supplies the credential part of an `Authorization` header.
///
/// Implemented for async closures returning `Result<String, BoxError>`, for
/// [`StaticToken`] and for [`BasicCredentials`].
pub trait TokenProvider: Send + Sync {
    /// Fetch the current token.
    fn token(&self) -> ProviderFuture<'_>;
}

impl<F, Fut> TokenProvider for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, BoxError>> + Send + 'static,
{
    fn token(&self) -> ProviderFuture<'_> {
        self().boxed()
    }
}

/// A fixed token, sent as-is.
#[derive(Clone)]
pub struct StaticToken(Arc<str>);

impl StaticToken {
    /// Wrap a token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(Arc::from(token.into()))
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticToken([REDACTED])")
    }
}

impl TokenProvider for StaticToken {
    fn token(&self) -> ProviderFuture<'_> {
        future::ready(Ok(self.0.to_string())).boxed()
    }
}

/// Username and password, yielded as base64 of `username:password`.
#[derive(Clone)]
pub struct BasicCredentials {
    username: String,
    encoded: Arc<str>,
}

impl BasicCredentials {
    /// Encode the credentials once.
    pub fn new(username: impl Into<String>, password: impl AsRef<str>) -> Self {
        let username = username.into();
        let encoded = STANDARD.encode(format!("{username}:{}", password.as_ref()));
        Self {
            username,
            encoded: Arc::from(encoded),
        }
    }

    /// The username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl TokenProvider for BasicCredentials {
    fn token(&self) -> ProviderFuture<'_> {
        future::ready(Ok(self.encoded.to_string())).boxed()
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};
    use courier_core::Cancelled;

    use super::*;

    #[tokio::test]
    async fn constant_provider_yields_value() {
        let provider = ValueProvider::constant("fixed");
        let_assert!(Ok(value) = provider.value().await);
        check!(value == "fixed");
    }

    #[tokio::test]
    async fn closure_provider_is_evaluated_each_time() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let provider = ValueProvider::from_fn(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Ok(format!("call-{n}")) }
        });

        let_assert!(Ok(first) = provider.value().await);
        let_assert!(Ok(second) = provider.value().await);
        check!(first == "call-1");
        check!(second == "call-2");
    }

    #[tokio::test]
    async fn closure_token_provider_propagates_errors() {
        let provider = || async { Err::<String, BoxError>(Box::new(Cancelled)) };
        let_assert!(Err(err) = provider.token().await);
        check!(err.is::<Cancelled>());
    }

    #[tokio::test]
    async fn basic_credentials_are_base64_encoded() {
        let credentials = BasicCredentials::new("aladdin", "opensesame");
        let_assert!(Ok(token) = credentials.token().await);
        check!(token == "YWxhZGRpbjpvcGVuc2VzYW1l");
    }

    #[test]
    fn debug_hides_secrets() {
        let token = StaticToken::new("secret-token");
        let credentials = BasicCredentials::new("user", "hunter2");

        check!(!format!("{token:?}").contains("secret-token"));
        check!(!format!("{credentials:?}").contains("hunter2"));
    }
}
