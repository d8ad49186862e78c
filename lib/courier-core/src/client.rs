//! Transport trait.
//!
//! [`HttpClient`] is the only thing the request pipeline needs from the
//! network: send one prepared request, hand back status, headers and bytes.
//! Pooling, TLS and connection timeouts are the implementation's business.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;

use crate::{Request, Response, Result};

/// Core HTTP transport.
///
/// Implementations are shared by many concurrent calls and must not keep
/// per-request state.
///
/// # Example
///
/// A canned transport for tests:
///
/// ```
/// use std::collections::HashMap;
/// use bytes::Bytes;
/// use courier_core::{HttpClient, Request, Response, Result};
///
/// #[derive(Clone)]
/// struct Canned(&'static str);
///
/// impl HttpClient for Canned {
///     async fn execute(&self, _request: Request<Bytes>) -> Result<Response<Bytes>> {
///         Ok(Response::new(200, HashMap::new(), Bytes::from_static(self.0.as_bytes())))
///     }
/// }
/// ```
pub trait HttpClient: Send + Sync {
    /// Execute an HTTP request and return the response.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails for any reason:
    /// - Network errors
    /// - TLS errors
    /// - Transport timeouts
    fn execute(
        &self,
        request: Request<Bytes>,
    ) -> impl Future<Output = Result<Response<Bytes>>> + Send;
}

impl<C: HttpClient> HttpClient for Arc<C> {
    fn execute(
        &self,
        request: Request<Bytes>,
    ) -> impl Future<Output = Result<Response<Bytes>>> + Send {
        self.as_ref().execute(request)
    }
}
