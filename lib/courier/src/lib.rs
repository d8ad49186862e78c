//! Declarative HTTP endpoints with structural query encoding and supervised,
//! cancellable calls.
//!
//! Describe an endpoint once with [`Endpoint::builder`], then execute it with
//! a [`Worker`]. Parameters are either flattened into query items or sent as
//! a JSON body, responses are decoded from JSON or taken as text, and every
//! call races against the endpoint timeout and the worker's cancellation
//! token.
//!
//! # Example
//!
//! ```ignore
//! use courier::prelude::*;
//!
//! #[derive(Serialize)]
//! struct Filter {
//!     name: String,
//!     tags: Vec<String>,
//! }
//!
//! #[derive(Debug, Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! let users = Endpoint::builder("https://api.example.com", "/users", Method::Get)
//!     .parameters::<Filter>(ParameterEncoding::QueryItems)
//!     .response::<Vec<User>>(ResponseDecoding::Json)
//!     .timeout(Duration::from_secs(5))
//!     .bearer(StaticToken::new(token))
//!     .verify_status()
//!     .build();
//!
//! let worker = Worker::new(HyperClient::new());
//! // GET https://api.example.com/users?name=ada&tags.0=admin
//! let found = worker
//!     .fetch_with(&users, Filter { name: "ada".into(), tags: vec!["admin".into()] })
//!     .await?;
//! ```

mod client;
mod codec;
mod config;
mod connector;
mod decorator;
pub mod endpoint;
pub mod prelude;
mod provider;
pub mod supervisor;
pub mod worker;

pub use client::{HyperClient, HyperClientBuilder};
pub use codec::{ParameterEncoding, ResponseDecoding};
pub use config::{ClientConfig, DEFAULT_USER_AGENT};
pub use decorator::{
    AuthScheme, Authorization, HeaderField, NamedValue, QueryParameter, ResponseVerifier,
    StatusCodeVerifier,
};
pub use endpoint::{Endpoint, EndpointBuilder, RequestInspector};
pub use provider::{BasicCredentials, ProviderFuture, StaticToken, TokenProvider, ValueProvider};
pub use supervisor::{CancellableUnit, Supervisor};
pub use worker::Worker;

pub use courier_core::{
    BoxError, CancelReason, Cancelled, EncodeError, EncodedValue, Error, FieldPath, HttpClient,
    Method, NIL_SENTINEL, PathSegment, QueryEncoder, QueryItem, QueryItems, Request,
    RequestBuilder, Response, Result, WorkerError, from_json, to_json, to_value,
};

pub use courier_core::{StatusCode, header};

pub use tokio_util::sync::CancellationToken;
pub use url;
