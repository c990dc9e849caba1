//! The transport seam.
//!
//! The client layer never touches the network itself. It hands a finished
//! [`Request`] to a [`Transport`] and gets a [`RawResponse`] back. The default
//! implementation, [`ReqwestTransport`], uses `reqwest`; tests plug in doubles.
use crate::cookies::{CookieJarHandle, JarCookieProvider};
use crate::errors::RequestError;
use crate::net::encoder::RequestBody;
use crate::net::request::Request;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use http::header::{HeaderValue, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, LOCATION};
use http::{HeaderMap, Method, StatusCode};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::io::ReaderStream;
use url::Url;

/// Redirects followed when the request sets no limit.
const DEFAULT_REDIRECT_LIMIT: usize = 10;

/// Response body as delivered by a transport.
pub type BodyStream = BoxStream<'static, Result<Bytes, RequestError>>;

/// One completed exchange as seen by the transport, body still unread.
pub struct RawResponse {
    /// Final URL (after redirects, if the transport follows them)
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: BodyStream,
}

impl RawResponse {
    /// Response whose body is a single in-memory chunk.
    pub fn from_bytes<B: Into<Bytes>>(url: Url, status: StatusCode, headers: HeaderMap, body: B) -> Self {
        let body = body.into();
        Self {
            url,
            status,
            headers,
            body: stream::once(async move { Ok(body) }).boxed(),
        }
    }

    fn from_reqwest(res: reqwest::Response) -> Self {
        let url = res.url().clone();
        let status = res.status();
        let headers = res.headers().clone();
        let body = res.bytes_stream().map_err(RequestError::from).boxed();

        Self {
            url,
            status,
            headers,
            body,
        }
    }
}

impl fmt::Debug for RawResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawResponse")
            .field("url", &self.url.as_str())
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Sends requests. Implementations may block on I/O and fail with
/// [`RequestError::NetworkError`] at any point.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> Result<RawResponse, RequestError>;
}

/// [`Transport`] backed by a `reqwest::Client`.
///
/// Timeouts are applied per request. Proxy, redirect and TLS overrides are client
/// wide in reqwest, so a request carrying any of them gets a one-off client.
///
/// A transport bound to a cookie jar follows redirects itself: every hop gets a
/// `Cookie` header rebuilt from the jar, so cookies set by one hop are sent on the
/// next. Cookies set by hops that completed stay in the jar even when a later hop
/// fails.
pub struct ReqwestTransport {
    client: reqwest::Client,
    cookies: Option<Arc<JarCookieProvider>>,
}

impl ReqwestTransport {
    /// Transport without cookie handling of its own.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            cookies: None,
        }
    }

    /// Transport that keeps `jar` up to date on every hop, redirects included.
    pub fn with_cookie_jar(jar: CookieJarHandle) -> Self {
        let cookies = Arc::new(JarCookieProvider::new(jar));
        let client = reqwest::Client::builder()
            .cookie_provider(cookies.clone())
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Cannot build cookie aware client, redirect cookies will be lost: {e}");
                reqwest::Client::new()
            });

        Self {
            client,
            cookies: Some(cookies),
        }
    }

    /// Wraps an already configured client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client, cookies: None }
    }

    fn client_for(&self, request: &Request) -> Result<reqwest::Client, RequestError> {
        let overrides = &request.transport;
        // Cookie aware transports count redirects themselves
        let redirect_override = self.cookies.is_none() && overrides.redirect_limit.is_some();
        if request.proxy.is_none() && overrides.insecure_skip_verify.is_none() && !redirect_override {
            return Ok(self.client.clone());
        }

        let mut builder = reqwest::Client::builder();
        if let Some(proxy) = &request.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy.as_str())?);
        }
        if let Some(insecure) = overrides.insecure_skip_verify {
            builder = builder.danger_accept_invalid_certs(insecure);
        }
        if let Some(cookies) = &self.cookies {
            builder = builder
                .cookie_provider(cookies.clone())
                .redirect(reqwest::redirect::Policy::none());
        } else if let Some(limit) = overrides.redirect_limit {
            builder = builder.redirect(match limit {
                0 => reqwest::redirect::Policy::none(),
                n => reqwest::redirect::Policy::limited(n),
            });
        }

        log::debug!("Building dedicated client for {}", request.url);
        Ok(builder.build()?)
    }

    /// Sends `request`, following redirects by hand and refreshing the `Cookie`
    /// header from the jar before every hop.
    async fn send_with_jar(
        &self,
        client: &reqwest::Client,
        jar: &JarCookieProvider,
        request: Request,
    ) -> Result<RawResponse, RequestError> {
        let Request {
            mut method,
            mut url,
            mut headers,
            body,
            cookies,
            transport,
            ..
        } = request;

        let limit = transport.redirect_limit.unwrap_or(DEFAULT_REDIRECT_LIMIT);
        let origin = url.clone();
        // Only buffered bodies can be sent again on a 307 or 308
        let mut replay = body.as_bytes().cloned();
        let mut body = body;
        let mut hops = 0;

        loop {
            let res = prepare(client, method.clone(), url.clone(), headers.clone(), body, transport.timeout)
                .send()
                .await?;

            let Some(next) = redirect_target(&res) else {
                return Ok(RawResponse::from_reqwest(res));
            };
            if limit == 0 {
                return Ok(RawResponse::from_reqwest(res));
            }
            if hops >= limit {
                return Err(RequestError::network(format!(
                    "too many redirects ({limit}) while fetching {origin}"
                )));
            }
            hops += 1;

            if matches!(res.status(), StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT) {
                if replay.is_none() {
                    log::debug!("Not following {} from {url}: streamed body cannot be sent twice", res.status());
                    return Ok(RawResponse::from_reqwest(res));
                }
            } else {
                if method != Method::HEAD {
                    method = Method::GET;
                }
                replay = Some(Bytes::new());
                headers.remove(CONTENT_TYPE);
                headers.remove(CONTENT_LENGTH);
            }

            let same_host = next.host_str() == origin.host_str() && next.port_or_known_default() == origin.port_or_known_default();
            if !same_host {
                headers.remove(AUTHORIZATION);
            }

            log::debug!("{} redirect {url} -> {next}", res.status());
            url = next;
            set_cookie_header(&mut headers, jar.request_cookies(&url), same_host.then_some(&cookies))?;
            body = RequestBody::Full(replay.clone().unwrap_or_default());
        }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: Request) -> Result<RawResponse, RequestError> {
        let client = self.client_for(&request)?;

        if let Some(jar) = &self.cookies {
            return self.send_with_jar(&client, jar, request).await;
        }

        let Request {
            method,
            url,
            headers,
            body,
            transport,
            ..
        } = request;

        let res = prepare(&client, method, url, headers, body, transport.timeout)
            .send()
            .await?;
        Ok(RawResponse::from_reqwest(res))
    }
}

fn prepare(
    client: &reqwest::Client,
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: RequestBody,
    timeout: Option<Duration>,
) -> reqwest::RequestBuilder {
    let mut builder = client.request(method, url).headers(headers);
    builder = match body {
        RequestBody::Full(bytes) if bytes.is_empty() => builder,
        RequestBody::Full(bytes) => builder.body(bytes),
        RequestBody::Stream(reader) => builder.body(reqwest::Body::wrap_stream(ReaderStream::new(reader))),
    };
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
}

/// Where a redirect response points, if it is one the client follows.
fn redirect_target(res: &reqwest::Response) -> Option<Url> {
    if !matches!(
        res.status(),
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    ) {
        return None;
    }

    let location = res.headers().get(LOCATION)?.to_str().ok()?;
    let next = res.url().join(location).ok()?;
    matches!(next.scheme(), "http" | "https").then_some(next)
}

/// Replaces the `Cookie` header with the jar cookies followed by the per-request ones.
fn set_cookie_header(
    headers: &mut HeaderMap,
    from_jar: Option<String>,
    extra: Option<&IndexMap<String, String>>,
) -> Result<(), RequestError> {
    let mut pairs: Vec<String> = from_jar.into_iter().collect();
    if let Some(extra) = extra {
        pairs.extend(extra.iter().map(|(name, value)| format!("{name}={value}")));
    }

    headers.remove(COOKIE);
    if !pairs.is_empty() {
        let value = HeaderValue::from_str(&pairs.join("; "))
            .map_err(|_| RequestError::InvalidRequest("cookie header cannot be sent".to_string()))?;
        headers.insert(COOKIE, value);
    }
    Ok(())
}
