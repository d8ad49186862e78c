//! Core types for the courier request toolkit.
//!
//! This crate provides the transport-independent building blocks:
//! - [`FieldPath`] - Location of a node inside a nested value
//! - [`EncodedValue`] and [`to_value`] - Reduction of any `Serialize` value to a closed tree
//! - [`QueryEncoder`], [`QueryItem`], [`QueryItems`] - Structural query encoding
//! - [`Method`] - HTTP method enum
//! - [`Request`] and [`RequestBuilder`] - HTTP request types
//! - [`Response`] - HTTP response type
//! - [`Error`] and [`Result`] - Transport and serialization errors
//! - [`WorkerError`] - The error surface of pipeline calls
//! - [`HttpClient`] - Transport trait

mod body;
mod client;
mod error;
mod method;
mod path;
pub mod prelude;
mod query;
mod request;
mod response;
mod value;

pub use body::{ContentType, from_json, to_json};
pub use client::HttpClient;
pub use error::{BoxError, CancelReason, Cancelled, Error, Result, WorkerError};
pub use method::Method;
pub use path::{FieldPath, PathSegment};
pub use query::{NIL_SENTINEL, QueryEncoder, QueryItem, QueryItems};
pub use request::{Request, RequestBuilder};
pub use response::Response;
pub use value::{EncodeError, EncodedValue, ValueSerializer, to_value};

// Re-export http crate types for status codes and headers
pub use http::{StatusCode, header};
