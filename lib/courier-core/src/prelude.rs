//! Prelude module for convenient imports.
//!
//! ```ignore
//! use courier_core::prelude::*;
//! ```

pub use crate::{
    CancelReason, ContentType, EncodedValue, Error, FieldPath, HttpClient, Method, QueryEncoder,
    QueryItem, Request, RequestBuilder, Response, Result, WorkerError, from_json, to_json,
};
