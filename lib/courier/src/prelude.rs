//! Prelude module for convenient imports.
//!
//! ```ignore
//! use courier::prelude::*;
//! ```

pub use std::time::Duration;

pub use crate::{
    Authorization, BasicCredentials, CancelReason, CancellationToken, Endpoint, HttpClient,
    HyperClient, Method, ParameterEncoding, ResponseDecoding, StaticToken, ValueProvider, Worker,
    WorkerError,
};
pub use serde::{Deserialize, Serialize};
