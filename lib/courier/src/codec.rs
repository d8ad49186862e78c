//! Parameter encoding and response decoding strategies.

use std::any::{Any, type_name};

use bytes::Bytes;
use courier_core::{QueryEncoder, RequestBuilder, WorkerError, from_json};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

/// How request parameters are placed on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, derive_more::Display)]
pub enum ParameterEncoding {
    /// Serialize the parameters as a JSON body, with JSON `Content-Type`
    /// and `Accept` headers.
    #[display("json-body")]
    JsonBody,
    /// Flatten the parameters into URL query items.
    #[default]
    #[display("query-items")]
    QueryItems,
}

impl ParameterEncoding {
    /// Apply the parameters to a request under construction.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::ParameterEncoding`] if the parameters cannot be
    /// represented in this encoding.
    pub fn encode<P>(
        self,
        parameters: &P,
        request: RequestBuilder<Bytes>,
    ) -> Result<RequestBuilder<Bytes>, WorkerError>
    where
        P: Serialize + ?Sized,
    {
        match self {
            Self::JsonBody => request
                .json(parameters)
                .map_err(|e| WorkerError::ParameterEncoding(e.to_string())),
            Self::QueryItems => {
                let items = QueryEncoder::new()
                    .encode(parameters)
                    .map_err(|e| WorkerError::ParameterEncoding(e.to_string()))?;
                debug!(count = items.len(), "encoded query items");
                Ok(request.query_items(items))
            }
        }
    }
}

/// How a response body is turned into a value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, derive_more::Display)]
pub enum ResponseDecoding {
    /// Decode the body as JSON.
    #[default]
    #[display("json")]
    Json,
    /// Use the raw UTF-8 body; the target type must be `String`.
    #[display("text")]
    Text,
}

impl ResponseDecoding {
    /// Decode `body` into `R`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Decode`] if the body does not match `R`. For
    /// [`Text`](Self::Text) that includes any `R` other than `String`.
    pub fn decode<R>(self, body: &Bytes) -> Result<R, WorkerError>
    where
        R: DeserializeOwned + 'static,
    {
        match self {
            Self::Json => from_json(body).map_err(|e| WorkerError::Decode(e.to_string())),
            Self::Text => {
                let text = std::str::from_utf8(body)
                    .map_err(|e| WorkerError::Decode(format!("response body is not UTF-8: {e}")))?;
                let text: Box<dyn Any> = Box::new(text.to_owned());
                text.downcast::<R>().map(|value| *value).map_err(|_| {
                    WorkerError::Decode(format!(
                        "text response cannot be decoded into `{}`",
                        type_name::<R>()
                    ))
                })
            }
        }
    }
}
