//! Declarative request options.
//!
//! [`RequestOptions`] is the configuration bag a caller hands to a verb function or
//! a [`Session`](crate::session::Session). It is built fluently:
//!
//! ```rust
//! use gosub_requests::net::RequestOptions;
//! use std::time::Duration;
//!
//! let opts = RequestOptions::new()
//!     .param("page", "2")
//!     .header("X-Trace", "abc")
//!     .basic_auth("user", "secret")
//!     .timeout(Duration::from_secs(5))
//!     .data("One", "Two");
//! ```
//!
//! # Body precedence
//!
//! The body is a single [`Body`] value, so two body kinds can never be active at
//! the same time. When several body setters are called, the highest ranked one
//! stays active:
//!
//! 1. files and form data (`file`, `data`); data alongside files is sent as multipart
//! 2. JSON (`json`)
//! 3. XML (`xml`)
//! 4. raw bytes or a reader (`body`, `body_reader`)
//!
//! Setting a lower ranked body while a higher ranked one is active is a no-op.
use crate::net::payload::Payload;
use crate::net::upload::FileUpload;
use bytes::Bytes;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio::io::AsyncRead;

/// A raw request body supplied by the caller.
pub enum RawBody {
    /// Bytes sent unchanged; the length is known.
    Bytes(Bytes),
    /// A reader streamed unchanged; `length` is sent as `Content-Length` when known.
    Reader {
        reader: Box<dyn AsyncRead + Send + Sync + Unpin>,
        length: Option<u64>,
    },
}

/// The single active body of a request.
#[derive(Default)]
pub enum Body {
    #[default]
    Empty,
    Raw(RawBody),
    Form(IndexMap<String, String>),
    Multipart {
        fields: IndexMap<String, String>,
        files: Vec<FileUpload>,
    },
    Json(Payload),
    Xml(Payload),
}

impl Body {
    /// Precedence of the body kind. Higher wins.
    fn rank(&self) -> u8 {
        match self {
            Body::Empty => 0,
            Body::Raw(_) => 1,
            Body::Xml(_) => 2,
            Body::Json(_) => 3,
            Body::Form(_) | Body::Multipart { .. } => 4,
        }
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Body::Empty => "empty",
            Body::Raw(_) => "raw",
            Body::Form(_) => "form",
            Body::Multipart { .. } => "multipart",
            Body::Json(_) => "json",
            Body::Xml(_) => "xml",
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => f.write_str("Empty"),
            Body::Raw(RawBody::Bytes(b)) => f.debug_tuple("Raw").field(&b.len()).finish(),
            Body::Raw(RawBody::Reader { length, .. }) => {
                f.debug_struct("RawReader").field("length", length).finish()
            }
            Body::Form(fields) => f.debug_tuple("Form").field(fields).finish(),
            Body::Multipart { fields, files } => f
                .debug_struct("Multipart")
                .field("fields", fields)
                .field("files", files)
                .finish(),
            Body::Json(_) => f.write_str("Json(..)"),
            Body::Xml(_) => f.write_str("Xml(..)"),
        }
    }
}

/// Username/password pair sent as HTTP Basic authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

/// Settings handed through to the transport untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportOptions {
    /// Deadline for the whole exchange
    pub timeout: Option<Duration>,
    /// Maximum number of redirects to follow. `Some(0)` disables redirects.
    pub redirect_limit: Option<usize>,
    /// Accept invalid TLS certificates
    pub insecure_skip_verify: Option<bool>,
}

impl TransportOptions {
    /// True when nothing deviates from the transport defaults.
    pub fn is_default(&self) -> bool {
        self == &TransportOptions::default()
    }

    fn merged_over(self, defaults: &TransportOptions) -> TransportOptions {
        TransportOptions {
            timeout: self.timeout.or(defaults.timeout),
            redirect_limit: self.redirect_limit.or(defaults.redirect_limit),
            insecure_skip_verify: self.insecure_skip_verify.or(defaults.insecure_skip_verify),
        }
    }
}

/// Everything needed to describe one request besides its method and URL.
#[derive(Debug, Default)]
pub struct RequestOptions {
    /// Query parameters appended to the URL, in insertion order
    pub params: IndexMap<String, String>,
    /// Caller headers. Names are compared case-insensitively; later entries win.
    pub headers: Vec<(String, String)>,
    /// Basic authentication credentials
    pub auth: Option<BasicAuth>,
    /// Proxy URL per target scheme (`"http"`, `"https"`)
    pub proxies: IndexMap<String, String>,
    /// Adds `X-Requested-With: XMLHttpRequest` when `Some(true)`. `None` defers to
    /// the session defaults.
    pub is_ajax: Option<bool>,
    /// Extra cookies sent with the request, as name/value pairs
    pub cookies: IndexMap<String, String>,
    /// Overrides the configured user agent
    pub user_agent: Option<String>,
    /// Settings passed through to the transport
    pub transport: TransportOptions,
    /// The request body
    pub body: Body,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn header<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn basic_auth<U: Into<String>, P: Into<String>>(mut self, username: U, password: P) -> Self {
        self.auth = Some(BasicAuth {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    pub fn proxy<S: Into<String>, U: Into<String>>(mut self, scheme: S, proxy_url: U) -> Self {
        self.proxies.insert(scheme.into().to_ascii_lowercase(), proxy_url.into());
        self
    }

    pub fn cookie<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn ajax(mut self, on: bool) -> Self {
        self.is_ajax = Some(on);
        self
    }

    pub fn user_agent<S: Into<String>>(mut self, ua: S) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.transport.timeout = Some(timeout);
        self
    }

    pub fn redirect_limit(mut self, limit: usize) -> Self {
        self.transport.redirect_limit = Some(limit);
        self
    }

    pub fn insecure_skip_verify(mut self, on: bool) -> Self {
        self.transport.insecure_skip_verify = Some(on);
        self
    }

    /// Adds a form field. Sent url-encoded, or as a multipart field once files are added.
    pub fn data<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        match &mut self.body {
            Body::Form(fields) | Body::Multipart { fields, .. } => {
                fields.insert(key.into(), value.into());
            }
            _ => {
                let mut fields = IndexMap::new();
                fields.insert(key.into(), value.into());
                self.body = Body::Form(fields);
            }
        }
        self
    }

    /// Adds a file upload. Any form data already set becomes multipart fields.
    pub fn file(mut self, upload: FileUpload) -> Self {
        match std::mem::take(&mut self.body) {
            Body::Multipart { fields, mut files } => {
                files.push(upload);
                self.body = Body::Multipart { fields, files };
            }
            Body::Form(fields) => {
                self.body = Body::Multipart {
                    fields,
                    files: vec![upload],
                };
            }
            _ => {
                self.body = Body::Multipart {
                    fields: IndexMap::new(),
                    files: vec![upload],
                };
            }
        }
        self
    }

    /// Adds several file uploads in order.
    pub fn files<I: IntoIterator<Item = FileUpload>>(self, uploads: I) -> Self {
        uploads.into_iter().fold(self, |opts, upload| opts.file(upload))
    }

    /// Sends `value` as a JSON document.
    pub fn json<T: Serialize + Send + Sync + 'static>(self, value: T) -> Self {
        self.set_body(Body::Json(Payload::new(value)))
    }

    /// Sends `value` as an XML document.
    pub fn xml<T: Serialize + Send + Sync + 'static>(self, value: T) -> Self {
        self.set_body(Body::Xml(Payload::new(value)))
    }

    /// Sends raw bytes unchanged.
    pub fn body<B: Into<Bytes>>(self, bytes: B) -> Self {
        self.set_body(Body::Raw(RawBody::Bytes(bytes.into())))
    }

    /// Streams a reader unchanged. `length` becomes the `Content-Length` when given.
    pub fn body_reader<R>(self, reader: R, length: Option<u64>) -> Self
    where
        R: AsyncRead + Send + Sync + Unpin + 'static,
    {
        self.set_body(Body::Raw(RawBody::Reader {
            reader: Box::new(reader),
            length,
        }))
    }

    fn set_body(mut self, body: Body) -> Self {
        if body.rank() >= self.body.rank() {
            self.body = body;
        } else {
            log::debug!(
                "Keeping {} body, ignoring lower precedence {} body",
                self.body.kind(),
                body.kind()
            );
        }
        self
    }

    /// Layers these per-call options over session `defaults`.
    ///
    /// Per-call values win on conflicting params, headers, cookies and proxies. The
    /// body is never taken from the defaults.
    pub fn merged_over(self, defaults: &RequestOptions) -> RequestOptions {
        let mut params = defaults.params.clone();
        params.extend(self.params);

        let mut headers = defaults.headers.clone();
        headers.extend(self.headers);

        let mut proxies = defaults.proxies.clone();
        proxies.extend(self.proxies);

        let mut cookies = defaults.cookies.clone();
        cookies.extend(self.cookies);

        RequestOptions {
            params,
            headers,
            auth: self.auth.or_else(|| defaults.auth.clone()),
            proxies,
            is_ajax: self.is_ajax.or(defaults.is_ajax),
            cookies,
            user_agent: self.user_agent.or_else(|| defaults.user_agent.clone()),
            transport: self.transport.merged_over(&defaults.transport),
            body: self.body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_then_file_becomes_multipart() {
        let opts = RequestOptions::new()
            .data("One", "Two")
            .file(FileUpload::from_bytes("a.txt", "A"));

        match opts.body {
            Body::Multipart { fields, files } => {
                assert_eq!(fields.get("One").map(String::as_str), Some("Two"));
                assert_eq!(files.len(), 1);
            }
            other => panic!("unexpected body {other:?}"),
        }
    }

    #[test]
    fn file_then_data_adds_field() {
        let opts = RequestOptions::new()
            .file(FileUpload::from_bytes("a.txt", "A"))
            .data("One", "Two");
        assert!(matches!(opts.body, Body::Multipart { ref fields, .. } if fields.len() == 1));
    }

    #[test]
    fn precedence_is_enforced() {
        let opts = RequestOptions::new().data("k", "v").json(1).xml(2).body("raw");
        assert_eq!(opts.body.kind(), "form");

        let opts = RequestOptions::new().body("raw").xml(2).json(1);
        assert_eq!(opts.body.kind(), "json");

        let opts = RequestOptions::new().json(1).xml(2);
        assert_eq!(opts.body.kind(), "json");
    }

    #[test]
    fn merge_prefers_per_call_values() {
        let defaults = RequestOptions::new()
            .param("a", "1")
            .param("b", "1")
            .header("X-One", "default")
            .cookie("c", "default")
            .timeout(Duration::from_secs(3))
            .data("ignored", "yes");

        let merged = RequestOptions::new()
            .param("b", "2")
            .header("x-one", "call")
            .redirect_limit(0)
            .merged_over(&defaults);

        assert_eq!(merged.params.get("a").map(String::as_str), Some("1"));
        assert_eq!(merged.params.get("b").map(String::as_str), Some("2"));
        assert_eq!(merged.headers.last().unwrap().1, "call");
        assert_eq!(merged.cookies.get("c").map(String::as_str), Some("default"));
        assert_eq!(merged.transport.timeout, Some(Duration::from_secs(3)));
        assert_eq!(merged.transport.redirect_limit, Some(0));
        assert!(matches!(merged.body, Body::Empty));
    }

    #[test]
    fn call_can_switch_ajax_off() {
        let defaults = RequestOptions::new().ajax(true);

        let off = RequestOptions::new().ajax(false).merged_over(&defaults);
        assert_eq!(off.is_ajax, Some(false));

        let inherited = RequestOptions::new().merged_over(&defaults);
        assert_eq!(inherited.is_ajax, Some(true));
    }
}
