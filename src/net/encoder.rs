//! Body encoding.
//!
//! Turns the single active [`Body`] of a request into the bytes (or stream) that go
//! on the wire, together with the matching `Content-Type` and `Content-Length`.
//! Exactly one strategy runs per request:
//!
//! | body        | content type                          |
//! |-------------|---------------------------------------|
//! | `Multipart` | `multipart/form-data; boundary=...`   |
//! | `Form`      | `application/x-www-form-urlencoded`   |
//! | `Json`      | `application/json`                    |
//! | `Xml`       | `application/xml`                     |
//! | `Raw`       | none, passed through unchanged        |
//! | `Empty`     | none                                  |
//!
//! Every failure here happens before the transport is called.
mod multipart;

use crate::errors::RequestError;
use crate::net::options::{Body, RawBody};
use bytes::Bytes;
use indexmap::IndexMap;
use std::fmt;
use tokio::io::AsyncRead;

pub use multipart::generate_boundary;

/// Body ready to be handed to the transport.
pub enum RequestBody {
    /// Fully buffered body
    Full(Bytes),
    /// Caller supplied reader, streamed as-is
    Stream(Box<dyn AsyncRead + Send + Sync + Unpin>),
}

impl RequestBody {
    /// Returns the buffered bytes, or `None` for a streamed body.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            RequestBody::Full(bytes) => Some(bytes),
            RequestBody::Stream(_) => None,
        }
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestBody::Full(bytes) => f.debug_tuple("Full").field(&bytes.len()).finish(),
            RequestBody::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Output of the encoder.
#[derive(Debug)]
pub struct EncodedBody {
    pub body: RequestBody,
    /// `Content-Type` to send, if the strategy defines one
    pub content_type: Option<String>,
    /// `Content-Length` to send, when known up front
    pub content_length: Option<u64>,
}

impl EncodedBody {
    fn empty() -> Self {
        Self {
            body: RequestBody::Full(Bytes::new()),
            content_type: None,
            content_length: None,
        }
    }

    fn full<B: Into<Bytes>>(bytes: B, content_type: Option<String>) -> Self {
        let bytes = bytes.into();
        Self {
            content_length: Some(bytes.len() as u64),
            body: RequestBody::Full(bytes),
            content_type,
        }
    }
}

/// Encodes `body`, reading any file uploads to their end.
pub async fn encode(body: Body) -> Result<EncodedBody, RequestError> {
    match body {
        Body::Multipart { fields, files } => {
            let boundary = generate_boundary();
            let encoded = multipart::encode(&boundary, &fields, files).await?;
            Ok(EncodedBody::full(
                encoded,
                Some(format!("multipart/form-data; boundary={boundary}")),
            ))
        }
        Body::Form(fields) => Ok(EncodedBody::full(
            encode_form(&fields),
            Some("application/x-www-form-urlencoded".to_string()),
        )),
        Body::Json(payload) => Ok(EncodedBody::full(
            payload.to_json()?,
            Some("application/json".to_string()),
        )),
        Body::Xml(payload) => Ok(EncodedBody::full(
            payload.to_xml()?,
            Some("application/xml".to_string()),
        )),
        Body::Raw(RawBody::Bytes(bytes)) => Ok(EncodedBody::full(bytes, None)),
        Body::Raw(RawBody::Reader { reader, length }) => Ok(EncodedBody {
            body: RequestBody::Stream(reader),
            content_type: None,
            content_length: length,
        }),
        Body::Empty => Ok(EncodedBody::empty()),
    }
}

/// `application/x-www-form-urlencoded` in insertion order.
pub fn encode_form(fields: &IndexMap<String, String>) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields.iter())
        .finish()
}
