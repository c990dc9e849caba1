//! Options resolution.
//!
//! Validates a [`RequestOptions`] bag against the target URL and produces the
//! normalized [`ResolvedOptions`] the encoder and request builder work from. This
//! is a pure transform: nothing is read from streams and nothing is sent.
use crate::errors::RequestError;
use crate::net::options::{BasicAuth, Body, RequestOptions, TransportOptions};
use http::Method;
use indexmap::IndexMap;
use url::Url;

const PROXY_SCHEMES: [&str; 4] = ["http", "https", "socks5", "socks5h"];

/// Request options after validation, with the query merged into the URL.
#[derive(Debug)]
pub struct ResolvedOptions {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub auth: Option<BasicAuth>,
    /// Proxy selected for the URL's scheme
    pub proxy: Option<Url>,
    pub cookies: IndexMap<String, String>,
    pub is_ajax: bool,
    pub user_agent: Option<String>,
    pub transport: TransportOptions,
    pub body: Body,
}

/// Resolves `options` for a `method` request to `raw_url`. `None` means all defaults.
///
/// Fails with [`RequestError::InvalidOptions`] when the URL, the credentials, a cookie
/// or a proxy URL is malformed. The URL is checked before the params are looked at.
pub fn resolve(
    method: Method,
    raw_url: &str,
    options: Option<RequestOptions>,
) -> Result<ResolvedOptions, RequestError> {
    let options = options.unwrap_or_default();

    let mut url = parse_url(raw_url)?;
    if !options.params.is_empty() {
        url.query_pairs_mut().extend_pairs(options.params.iter());
    }

    if let Some(auth) = &options.auth {
        validate_auth(auth)?;
    }
    validate_cookies(&options.cookies)?;
    let proxy = select_proxy(&options.proxies, url.scheme())?;

    Ok(ResolvedOptions {
        method,
        url,
        headers: options.headers,
        auth: options.auth,
        proxy,
        cookies: options.cookies,
        is_ajax: options.is_ajax.unwrap_or(false),
        user_agent: options.user_agent,
        transport: options.transport,
        body: options.body,
    })
}

fn parse_url(raw_url: &str) -> Result<Url, RequestError> {
    check_escapes(raw_url)?;
    Url::parse(raw_url)
        .map_err(|e| RequestError::InvalidOptions(format!("cannot parse URL {raw_url:?}: {e}")))
}

/// Every `%` must start a two digit hex escape. The URL parser lets broken ones through.
fn check_escapes(raw_url: &str) -> Result<(), RequestError> {
    let bytes = raw_url.as_bytes();
    for (idx, _) in raw_url.match_indices('%') {
        let valid = bytes
            .get(idx + 1..idx + 3)
            .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
        if !valid {
            let end = (idx + 3).min(raw_url.len());
            let escape = raw_url.get(idx..end).unwrap_or("%");
            return Err(RequestError::InvalidOptions(format!(
                "invalid URL escape {escape:?} in {raw_url:?}"
            )));
        }
    }
    Ok(())
}

fn validate_auth(auth: &BasicAuth) -> Result<(), RequestError> {
    if auth.username.is_empty() {
        return Err(RequestError::InvalidOptions("basic auth username is empty".to_string()));
    }
    if auth.username.contains(':') {
        return Err(RequestError::InvalidOptions(
            "basic auth username must not contain ':'".to_string(),
        ));
    }
    if auth.username.chars().chain(auth.password.chars()).any(char::is_control) {
        return Err(RequestError::InvalidOptions(
            "basic auth credentials contain control characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_cookies(cookies: &IndexMap<String, String>) -> Result<(), RequestError> {
    for (name, value) in cookies {
        let bad_name = name.is_empty()
            || name
                .chars()
                .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '=' | ';' | ','));
        let bad_value = value.chars().any(|c| c.is_control() || matches!(c, ';' | ','));
        if bad_name || bad_value {
            return Err(RequestError::InvalidOptions(format!("invalid cookie {name:?}")));
        }
    }
    Ok(())
}

/// Parses every configured proxy and returns the one for `scheme`.
fn select_proxy(
    proxies: &IndexMap<String, String>,
    scheme: &str,
) -> Result<Option<Url>, RequestError> {
    let mut selected = None;

    for (target, raw) in proxies {
        let proxy = Url::parse(raw)
            .map_err(|e| RequestError::InvalidOptions(format!("cannot parse proxy {raw:?}: {e}")))?;

        if !PROXY_SCHEMES.contains(&proxy.scheme()) || proxy.host_str().is_none() {
            return Err(RequestError::InvalidOptions(format!("unsupported proxy {raw:?}")));
        }

        if target.eq_ignore_ascii_case(scheme) {
            selected = Some(proxy);
        }
    }

    Ok(selected)
}
