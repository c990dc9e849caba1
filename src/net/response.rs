//! HTTP response wrapper.
//!
//! A [`Response`] wraps exactly one completed exchange: final URL, status, headers
//! and a body stream that has not been read yet. The body can be observed **once**:
//!
//! ```text
//!   Unread --bytes/text/json/xml/discard--> Consumed
//! ```
//!
//! The first accessor drains the stream and moves the response to `Consumed`.
//! Every later accessor sees an empty result instead of an error:
//!
//! | accessor | first call                 | after consumption |
//! |----------|----------------------------|-------------------|
//! | `bytes`  | `Some(body)`               | `None`            |
//! | `text`   | body as text               | `""`              |
//! | `json`   | `Ok(Some(value))` / error  | `Ok(None)`        |
//! | `xml`    | `Ok(Some(value))` / error  | `Ok(None)`        |
//!
//! `bytes` and `text` never return errors. A failure while reading the stream is
//! latched and can be inspected through [`Response::error`].
use crate::errors::RequestError;
use crate::net::transport::{BodyStream, RawResponse};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use std::fmt;
use url::Url;

enum BodyState {
    Unread(BodyStream),
    Consumed,
}

/// Response of a single request.
pub struct Response {
    url: Url,
    status: StatusCode,
    headers: HeaderMap,
    body: BodyState,
    error: Option<RequestError>,
}

impl Response {
    pub fn new(raw: RawResponse) -> Self {
        Self {
            url: raw.url,
            status: raw.status,
            headers: raw.headers,
            body: BodyState::Unread(raw.body),
            error: None,
        }
    }

    /// Final URL of the response (after redirects, if any).
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Numeric HTTP status code (e.g., `200`, `404`).
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// True iff the status is in the `200..300` range.
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    /// Response headers as a case-insensitive map.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The error hit while reading the body in [`Response::bytes`] or [`Response::text`].
    pub fn error(&self) -> Option<&RequestError> {
        self.error.as_ref()
    }

    /// True once an accessor has taken the body.
    pub fn is_consumed(&self) -> bool {
        matches!(self.body, BodyState::Consumed)
    }

    /// Drains the body into memory and marks the response consumed.
    ///
    /// `None` when the body was already consumed.
    async fn take_body(&mut self) -> Option<Result<Bytes, RequestError>> {
        let BodyState::Unread(mut stream) = std::mem::replace(&mut self.body, BodyState::Consumed) else {
            return None;
        };

        let mut buf = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(chunk) => buf.extend_from_slice(&chunk),
                Err(e) => return Some(Err(e)),
            }
        }
        Some(Ok(buf.freeze()))
    }

    /// Reads the whole body. Returns `None` once the body has been consumed, or when
    /// reading failed (see [`Response::error`]).
    pub async fn bytes(&mut self) -> Option<Bytes> {
        match self.take_body().await? {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                log::warn!("Reading response body from {} failed: {e}", self.url);
                self.error = Some(e);
                None
            }
        }
    }

    /// Reads the whole body as text, replacing invalid UTF-8. Empty once consumed.
    pub async fn text(&mut self) -> String {
        self.bytes()
            .await
            .map(|body| String::from_utf8_lossy(&body).into_owned())
            .unwrap_or_default()
    }

    /// Decodes the body as JSON.
    ///
    /// `Ok(None)` when the body was already consumed. An empty or malformed body
    /// fails with [`RequestError::JsonDecodeError`].
    pub async fn json<T: DeserializeOwned>(&mut self) -> Result<Option<T>, RequestError> {
        let Some(body) = self.take_body().await else {
            return Ok(None);
        };
        serde_json::from_slice(&body?)
            .map(Some)
            .map_err(RequestError::JsonDecodeError)
    }

    /// Decodes the body as XML.
    ///
    /// `Ok(None)` when the body was already consumed. An empty or malformed body
    /// fails with [`RequestError::XmlDecodeError`].
    pub async fn xml<T: DeserializeOwned>(&mut self) -> Result<Option<T>, RequestError> {
        let Some(body) = self.take_body().await else {
            return Ok(None);
        };
        let body = body?;
        quick_xml::de::from_reader(&body[..])
            .map(Some)
            .map_err(RequestError::XmlDecodeError)
    }

    /// Drops the body without reading it.
    pub fn discard(&mut self) {
        self.body = BodyState::Consumed;
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("url", &self.url.as_str())
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("consumed", &self.is_consumed())
            .field("error", &self.error)
            .finish()
    }
}
