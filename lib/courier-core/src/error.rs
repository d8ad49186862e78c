//! Error types for courier.
//!
//! Two layers:
//! - [`Error`] is what transports, serializers and encoders report.
//! - [`WorkerError`] is the closed taxonomy every pipeline call resolves to.
//!   Lower-level failures are wrapped into it at the step that detects them.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use derive_more::{Display, Error, From};

use crate::value::EncodeError;

/// Boxed error used for failures coming from user-supplied providers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// ============================================================================
// Transport / serialization errors
// ============================================================================

/// Error reported by transports, serializers and encoders.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(#[error(not(source))] String),

    /// Transport-level timeout.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// The request could not be turned into a wire request.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// JSON serialization error.
    #[display("JSON serialization error: {_0}")]
    #[from]
    JsonSerialization(serde_json::Error),

    /// JSON deserialization error with path context.
    #[display("JSON deserialization error at '{path}': {message}")]
    #[from(skip)]
    JsonDeserialization {
        /// JSON path to the error (e.g., "user.address.city").
        path: String,
        /// Error message.
        message: String,
    },

    /// Structural query encoding error.
    #[display("query encoding error: {_0}")]
    #[from]
    QueryEncoding(EncodeError),

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create a JSON deserialization error with path context.
    #[must_use]
    pub fn json_deserialization(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::JsonDeserialization {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

// ============================================================================
// Cancellation
// ============================================================================

/// Marker error a provider returns to signal that it was cancelled.
///
/// The pipeline passes it through as [`WorkerError::Cancelled`] instead of
/// wrapping it as a preparation failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, Error)]
#[display("operation cancelled")]
pub struct Cancelled;

/// Why a call was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller cancelled the call.
    External,
    /// The endpoint timeout elapsed first.
    Timeout(Duration),
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::External => f.write_str("cancelled by caller"),
            Self::Timeout(after) => write!(f, "timed out after {after:?}"),
        }
    }
}

// ============================================================================
// Worker Error
// ============================================================================

/// The single error surface of a pipeline call.
#[derive(Debug, Display)]
pub enum WorkerError {
    /// Base path and endpoint do not form a valid URL.
    #[display("malformed address: {address}")]
    MalformedAddress {
        /// The concatenated address that failed to parse.
        address: String,
    },

    /// Parameters could not be encoded (structural or JSON).
    #[display("failed to encode parameters: {_0}")]
    ParameterEncoding(String),

    /// The response could not be decoded into the requested type.
    #[display("failed to decode response: {_0}")]
    Decode(String),

    /// The transport failed to send the request.
    #[display("request failed: {_0}")]
    Transport(String),

    /// The response status code is outside `200..=299`.
    #[display("unexpected HTTP status {code}")]
    Status {
        /// HTTP status code.
        code: u16,
        /// Response body.
        body: Bytes,
    },

    /// A decorator (headers, authorization, extra query items) failed.
    #[display("failed to prepare request: {_0}")]
    RequestPreparation(BoxError),

    /// The call was cancelled by the caller or by its own timeout.
    #[display("request cancelled: {_0}")]
    Cancelled(CancelReason),

    /// Any other failure.
    #[display("{_0}")]
    Other(BoxError),
}

impl std::error::Error for WorkerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::RequestPreparation(source) | Self::Other(source) => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl WorkerError {
    /// Create a malformed-address error.
    #[must_use]
    pub fn malformed_address(address: impl Into<String>) -> Self {
        Self::MalformedAddress {
            address: address.into(),
        }
    }

    /// Create a status error.
    #[must_use]
    pub const fn status_code(code: u16, body: Bytes) -> Self {
        Self::Status { code, body }
    }

    /// Wrap a provider failure.
    ///
    /// A [`Cancelled`] marker becomes [`WorkerError::Cancelled`]; anything else
    /// becomes [`WorkerError::RequestPreparation`].
    #[must_use]
    pub fn from_provider(error: BoxError) -> Self {
        if error.is::<Cancelled>() {
            Self::Cancelled(CancelReason::External)
        } else {
            Self::RequestPreparation(error)
        }
    }

    /// Wrap any error as [`WorkerError::Other`].
    #[must_use]
    pub fn other(error: impl Into<BoxError>) -> Self {
        Self::Other(error.into())
    }

    /// Returns `true` if the call was cancelled, by the caller or a timeout.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// Returns `true` if the call was cancelled by its timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Cancelled(CancelReason::Timeout(_)))
    }

    /// Returns the HTTP status code if this is a status error.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns the response body if this is a status error.
    #[must_use]
    pub const fn body(&self) -> Option<&Bytes> {
        match self {
            Self::Status { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Try to decode the body of a status error as JSON.
    ///
    /// Returns `None` if this is not a status error or the body is empty.
    pub fn decode_body<T: serde::de::DeserializeOwned>(&self) -> Option<Result<T>> {
        self.body()
            .filter(|body| !body.is_empty())
            .map(|body| crate::from_json(body))
    }
}
