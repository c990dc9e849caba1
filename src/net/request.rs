//! Request building.
//!
//! Combines the resolved options, the encoded body, the client configuration and
//! the session cookies into one transport-ready [`Request`]. Header precedence,
//! lowest to highest:
//!
//! 1. configured defaults (`Accept`, `User-Agent`, extra default headers)
//! 2. body headers (`Content-Type`, `Content-Length`)
//! 3. `X-Requested-With` for ajax requests
//! 4. caller headers (case-insensitive, last write wins)
//! 5. `Authorization` from basic auth credentials
//!
//! The `Cookie` header joins the jar cookies with the per-request cookies.
use crate::config::ClientConfig;
use crate::cookies::{read_jar, CookieJarHandle};
use crate::errors::RequestError;
use crate::net::encoder::{EncodedBody, RequestBody};
use crate::net::options::{BasicAuth, TransportOptions};
use crate::net::resolver::ResolvedOptions;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use http::header::{
    HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, USER_AGENT,
};
use http::{HeaderMap, Method};
use indexmap::IndexMap;
use url::Url;

/// A request ready to be sent by a [`Transport`](crate::net::Transport).
#[derive(Debug)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: RequestBody,
    /// Per-request cookies, kept apart so transports can rebuild the `Cookie`
    /// header on redirect hops
    pub cookies: IndexMap<String, String>,
    /// Proxy to route the request through
    pub proxy: Option<Url>,
    /// Timeout, redirect and TLS settings for the transport
    pub transport: TransportOptions,
}

/// Builds the transport request.
///
/// Fails with [`RequestError::InvalidRequest`] when the URL is not http(s) or a
/// caller header cannot be represented on the wire.
pub fn build(
    config: &ClientConfig,
    resolved: ResolvedOptions,
    encoded: EncodedBody,
    jar: Option<&CookieJarHandle>,
) -> Result<Request, RequestError> {
    check_target(&resolved.url)?;

    let mut headers = HeaderMap::new();

    headers.insert(ACCEPT, header_value(&config.accept)?);
    let user_agent = resolved.user_agent.as_deref().unwrap_or(&config.user_agent);
    headers.insert(USER_AGENT, header_value(user_agent)?);
    for (key, value) in &config.default_headers {
        headers.insert(header_name(key)?, header_value(value)?);
    }

    if let Some(content_type) = &encoded.content_type {
        headers.insert(CONTENT_TYPE, header_value(content_type)?);
    }
    if let Some(length) = encoded.content_length {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
    }

    if resolved.is_ajax {
        headers.insert(
            HeaderName::from_static("x-requested-with"),
            HeaderValue::from_static("XMLHttpRequest"),
        );
    }

    for (key, value) in &resolved.headers {
        headers.insert(header_name(key)?, header_value(value)?);
    }

    if let Some(auth) = &resolved.auth {
        headers.insert(AUTHORIZATION, basic_auth(auth)?);
    }

    if let Some(cookie) = cookie_header(&resolved, jar) {
        headers.insert(COOKIE, header_value(&cookie)?);
    }

    Ok(Request {
        method: resolved.method,
        url: resolved.url,
        headers,
        body: encoded.body,
        cookies: resolved.cookies,
        proxy: resolved.proxy,
        transport: resolved.transport,
    })
}

fn check_target(url: &Url) -> Result<(), RequestError> {
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(()),
        "http" | "https" => Err(RequestError::InvalidRequest(format!("URL {url} has no host"))),
        scheme => Err(RequestError::InvalidRequest(format!(
            "unsupported URL scheme {scheme:?}, expected http or https"
        ))),
    }
}

fn header_name(key: &str) -> Result<HeaderName, RequestError> {
    HeaderName::try_from(key).map_err(|_| RequestError::InvalidRequest(format!("invalid header name {key:?}")))
}

fn header_value(value: &str) -> Result<HeaderValue, RequestError> {
    HeaderValue::from_str(value)
        .map_err(|_| RequestError::InvalidRequest(format!("invalid header value {value:?}")))
}

fn basic_auth(auth: &BasicAuth) -> Result<HeaderValue, RequestError> {
    let encoded = STANDARD.encode(format!("{}:{}", auth.username, auth.password));
    let mut value = header_value(&format!("Basic {encoded}"))?;
    value.set_sensitive(true);
    Ok(value)
}

fn cookie_header(resolved: &ResolvedOptions, jar: Option<&CookieJarHandle>) -> Option<String> {
    let mut pairs: Vec<String> = Vec::new();

    if let Some(from_jar) = jar.and_then(|jar| read_jar(jar).get_request_cookies(&resolved.url)) {
        pairs.push(from_jar);
    }
    pairs.extend(resolved.cookies.iter().map(|(name, value)| format!("{name}={value}")));

    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookies::{write_jar, DefaultCookieJar};
    use crate::net::encoder::encode;
    use crate::net::options::RequestOptions;
    use crate::net::resolver::resolve;

    async fn build_for(url: &str, opts: RequestOptions, jar: Option<&CookieJarHandle>) -> Result<Request, RequestError> {
        let mut resolved = resolve(Method::POST, url, Some(opts))?;
        let encoded = encode(std::mem::take(&mut resolved.body)).await?;
        build(&ClientConfig::default(), resolved, encoded, jar)
    }

    #[tokio::test]
    async fn default_headers_are_set() {
        let req = build_for("http://example.com/post", RequestOptions::new().data("One", "Two"), None)
            .await
            .unwrap();

        assert_eq!(req.headers[ACCEPT], "*/*");
        assert!(req.headers[USER_AGENT].to_str().unwrap().starts_with("gosub-requests/"));
        assert_eq!(req.headers[CONTENT_TYPE], "application/x-www-form-urlencoded");
        assert_eq!(req.headers[CONTENT_LENGTH], "7");
        assert!(req.headers.get("x-requested-with").is_none());
    }

    #[tokio::test]
    async fn caller_headers_override_case_insensitively() {
        let opts = RequestOptions::new()
            .header("accept", "application/json")
            .header("X-Custom", "one")
            .header("x-custom", "two")
            .user_agent("Special/1.0");
        let req = build_for("http://example.com/", opts, None).await.unwrap();

        assert_eq!(req.headers[ACCEPT], "application/json");
        assert_eq!(req.headers.get_all("x-custom").iter().count(), 1);
        assert_eq!(req.headers["x-custom"], "two");
        assert_eq!(req.headers[USER_AGENT], "Special/1.0");
    }

    #[tokio::test]
    async fn ajax_and_basic_auth() {
        let opts = RequestOptions::new().ajax(true).basic_auth("user", "passwd");
        let req = build_for("http://example.com/", opts, None).await.unwrap();

        assert_eq!(req.headers["x-requested-with"], "XMLHttpRequest");
        assert_eq!(req.headers[AUTHORIZATION], "Basic dXNlcjpwYXNzd2Q=");
        assert!(req.headers[AUTHORIZATION].is_sensitive());
    }

    #[tokio::test]
    async fn cookies_from_jar_and_options() {
        let jar = DefaultCookieJar::new_handle();
        write_jar(&jar).store_set_cookie(&"http://example.com/".parse().unwrap(), "session=abc; Path=/");

        let opts = RequestOptions::new().cookie("extra", "1");
        let req = build_for("http://example.com/page", opts, Some(&jar)).await.unwrap();
        assert_eq!(req.headers[COOKIE], "session=abc; extra=1");
    }

    #[tokio::test]
    async fn non_http_scheme_is_invalid() {
        let err = build_for("ftp://example.com/file", RequestOptions::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn invalid_header_is_invalid_request() {
        let opts = RequestOptions::new().header("bad header", "x");
        let err = build_for("http://example.com/", opts, None).await.unwrap_err();
        assert!(matches!(err, RequestError::InvalidRequest(_)));
    }
}
