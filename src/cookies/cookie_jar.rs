//! Cookie jar abstraction and a simple in-memory implementation.
//!
//! A **cookie jar** represents all cookies belonging to a single session. The
//! session passes request/response metadata to the jar so it can update and
//! query cookies appropriately.
//!
//! This module defines the [`CookieJar`] trait and a reference implementation,
//! [`DefaultCookieJar`], which stores cookies **in memory only** and parses the
//! RFC 6265 `Set-Cookie` attributes a client needs.
//!
//! ## Notes & limitations
//! - Attributes handled: `Path`, `Domain`, `Expires`, `Max-Age`, `SameSite`,
//!   `Secure`, `HttpOnly`. Priorities, size limits and public-suffix checks are not.
//! - Cookies are bucketed by **domain**. Within a bucket a cookie is identified by
//!   its name and path; a later `Set-Cookie` for the same pair replaces it.
//! - This module is **not** internally synchronized. Use it via a
//!   `CookieJarHandle = Arc<RwLock<dyn CookieJar + Send + Sync>>`.
//!
use crate::cookies::{Cookie, CookieJarHandle};
use http::HeaderMap;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};
use url::Url;

/// A cookie jar keeps the cookies for one single session.
pub trait CookieJar: Send + Sync {
    /// Stores the cookie described by one `Set-Cookie` header value received from `url`.
    ///
    /// Invalid headers are ignored. An already expired cookie removes the stored one.
    fn store_set_cookie(&mut self, url: &Url, header: &str);

    /// Stores cookies found in response `headers` for the given `url`.
    fn store_response_cookies(&mut self, url: &Url, headers: &HeaderMap) {
        for header in headers.get_all(http::header::SET_COOKIE) {
            if let Ok(header_str) = header.to_str() {
                self.store_set_cookie(url, header_str);
            }
        }
    }

    /// Returns the `Cookie` request header value to send for `url`, if any.
    ///
    /// `None` means no cookies match the request.
    fn get_request_cookies(&self, url: &Url) -> Option<String>;

    /// Returns the live cookies that would be sent to `url`.
    fn cookies(&self, url: &Url) -> Vec<Cookie>;

    /// Returns every live cookie in the jar.
    fn all_cookies(&self) -> Vec<Cookie>;

    /// Removes a single cookie with `cookie_name` that would be sent to `url`.
    fn remove_cookie(&mut self, url: &Url, cookie_name: &str);

    /// Removes all cookies from the jar.
    fn clear(&mut self);
}

/// Default cookie jar which holds cookies for a single session.
///
/// This implementation is **in-memory only** and performs **no persistence**.
#[derive(Debug, Clone, Default)]
pub struct DefaultCookieJar {
    /// Cookies bucketed by **domain** (lowercase, no leading dot).
    pub entries: HashMap<String, Vec<Cookie>>,
}

impl DefaultCookieJar {
    /// Creates an empty in-memory cookie jar.
    pub fn new() -> Self {
        DefaultCookieJar {
            entries: HashMap::new(),
        }
    }

    /// Creates an empty jar wrapped in a shareable handle.
    pub fn new_handle() -> CookieJarHandle {
        Arc::new(RwLock::new(DefaultCookieJar::new()))
    }

    fn matching(&self, url: &Url, now: i64) -> Vec<&Cookie> {
        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        let path = url.path();
        let is_https = url.scheme() == "https";

        let mut matched: Vec<&Cookie> = self
            .entries
            .iter()
            .filter(|(domain, _)| domain_matches(&host, domain))
            .flat_map(|(_, cookies)| cookies.iter())
            .filter(|cookie| !cookie.host_only || cookie.domain == host)
            .filter(|cookie| path_matches(path, &cookie.path))
            .filter(|cookie| !cookie.secure || is_https)
            .filter(|cookie| !cookie.is_expired(now))
            .collect();

        // Longer paths first
        matched.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        matched
    }
}

impl CookieJar for DefaultCookieJar {
    fn store_set_cookie(&mut self, url: &Url, header: &str) {
        let now = now();
        let Some(cookie) = parse_set_cookie(url, header, now) else {
            log::debug!("Ignoring invalid Set-Cookie from {url}: {header}");
            return;
        };

        let bucket = self.entries.entry(cookie.domain.clone()).or_default();
        let existing = bucket
            .iter()
            .position(|c| c.name == cookie.name && c.path == cookie.path);

        if cookie.is_expired(now) {
            if let Some(idx) = existing {
                bucket.remove(idx);
            }
            return;
        }

        log::debug!("Storing cookie {} for {}{}", cookie.name, cookie.domain, cookie.path);

        // Replace existing cookie with same name and path
        match existing {
            Some(idx) => bucket[idx] = cookie,
            None => bucket.push(cookie),
        }
    }

    fn get_request_cookies(&self, url: &Url) -> Option<String> {
        let header = self
            .matching(url, now())
            .iter()
            .map(|c| c.pair())
            .collect::<Vec<_>>()
            .join("; ");

        if header.is_empty() {
            None
        } else {
            Some(header)
        }
    }

    fn cookies(&self, url: &Url) -> Vec<Cookie> {
        self.matching(url, now()).into_iter().cloned().collect()
    }

    fn all_cookies(&self) -> Vec<Cookie> {
        let now = now();
        self.entries
            .values()
            .flat_map(|cookies| cookies.iter())
            .filter(|c| !c.is_expired(now))
            .cloned()
            .collect()
    }

    fn remove_cookie(&mut self, url: &Url, cookie_name: &str) {
        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        for (domain, cookies) in self.entries.iter_mut() {
            if domain_matches(&host, domain) {
                cookies.retain(|c| c.name != cookie_name);
            }
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

fn now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

fn domain_matches(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{}", domain))
}

fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/') || request_path[cookie_path.len()..].starts_with('/'))
}

fn default_path(url: &Url) -> String {
    url.path()
        .rsplit_once('/')
        .map_or("/", |(a, _)| if a.is_empty() { "/" } else { a })
        .to_string()
}

/// Parses `Expires` in IMF-fixdate form and the older dash separated form.
fn parse_expires(value: &str) -> Option<i64> {
    let fixdate = format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
    );
    let dashed = format_description!(
        "[weekday repr:short], [day]-[month repr:short]-[year] [hour]:[minute]:[second] GMT"
    );

    PrimitiveDateTime::parse(value, fixdate)
        .or_else(|_| PrimitiveDateTime::parse(value, dashed))
        .ok()
        .map(|dt| dt.assume_utc().unix_timestamp())
}

fn parse_set_cookie(url: &Url, header: &str, now: i64) -> Option<Cookie> {
    let host = url.host_str()?.to_ascii_lowercase();

    let mut parts = header.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let mut cookie = Cookie {
        name: name.to_string(),
        value: value.trim().trim_matches('"').to_string(),
        domain: host.clone(),
        host_only: true,
        path: default_path(url),
        secure: false,
        http_only: false,
        same_site: None,
        expires_at: None,
    };

    let mut max_age: Option<i64> = None;

    for part in parts {
        let part = part.trim();
        let (key, val) = match part.split_once('=') {
            Some((k, v)) => (k.trim(), v.trim()),
            None => (part, ""),
        };

        match key.to_ascii_lowercase().as_str() {
            "path" if val.starts_with('/') => cookie.path = val.to_string(),
            "domain" if !val.is_empty() => {
                let domain = val.trim_start_matches('.').to_ascii_lowercase();
                // A server may only set cookies for its own domain or a parent of it
                if !domain_matches(&host, &domain) {
                    return None;
                }
                cookie.domain = domain;
                cookie.host_only = false;
            }
            "expires" => {
                if let Some(at) = parse_expires(val) {
                    cookie.expires_at = Some(at);
                }
            }
            "max-age" => {
                if let Ok(secs) = val.parse::<i64>() {
                    max_age = Some(secs);
                }
            }
            "samesite" => {
                // normalize to "Lax" | "Strict" | "None"
                cookie.same_site = Some(if val.eq_ignore_ascii_case("lax") {
                    "Lax".to_string()
                } else if val.eq_ignore_ascii_case("strict") {
                    "Strict".to_string()
                } else if val.eq_ignore_ascii_case("none") {
                    "None".to_string()
                } else {
                    val.to_string()
                });
            }
            "secure" => cookie.secure = true,
            "httponly" => cookie.http_only = true,
            _ => {}
        }
    }

    // Max-Age wins over Expires
    if let Some(secs) = max_age {
        cookie.expires_at = Some(if secs <= 0 { i64::MIN } else { now.saturating_add(secs) });
    }

    Some(cookie)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn url(s: &str) -> Url {
        s.parse().unwrap()
    }

    fn headers(values: &[&str]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for v in values {
            map.append(http::header::SET_COOKIE, HeaderValue::from_str(v).unwrap());
        }
        map
    }

    #[test]
    fn stores_and_returns_cookies() {
        let mut jar = DefaultCookieJar::new();
        let u = url("http://example.com/cookies/set");
        jar.store_response_cookies(&u, &headers(&["one=two; Path=/", "two=three; Path=/"]));

        let header = jar.get_request_cookies(&url("http://example.com/")).unwrap();
        assert!(header.contains("one=two"));
        assert!(header.contains("two=three"));
        assert_eq!(jar.all_cookies().len(), 2);
    }

    #[test]
    fn same_name_and_path_replaces() {
        let mut jar = DefaultCookieJar::new();
        let u = url("http://example.com/");
        jar.store_set_cookie(&u, "one=two; Path=/");
        jar.store_set_cookie(&u, "one=three; Path=/");

        let cookies = jar.cookies(&u);
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].value, "three");
    }

    #[test]
    fn default_path_is_derived_from_request() {
        let mut jar = DefaultCookieJar::new();
        jar.store_set_cookie(&url("http://example.com/a/b/page"), "k=v");

        assert!(jar.get_request_cookies(&url("http://example.com/a/b/other")).is_some());
        assert!(jar.get_request_cookies(&url("http://example.com/a")).is_none());
        assert!(jar.get_request_cookies(&url("http://example.com/a/bc")).is_none());
    }

    #[test]
    fn host_only_cookies_skip_subdomains() {
        let mut jar = DefaultCookieJar::new();
        jar.store_set_cookie(&url("http://example.com/"), "host=1; Path=/");
        jar.store_set_cookie(&url("http://example.com/"), "wide=1; Path=/; Domain=.example.com");

        let sub = jar.get_request_cookies(&url("http://www.example.com/")).unwrap();
        assert_eq!(sub, "wide=1");
    }

    #[test]
    fn foreign_domain_is_rejected() {
        let mut jar = DefaultCookieJar::new();
        jar.store_set_cookie(&url("http://example.com/"), "evil=1; Domain=other.org");
        assert!(jar.all_cookies().is_empty());
    }

    #[test]
    fn secure_cookie_needs_https() {
        let mut jar = DefaultCookieJar::new();
        jar.store_set_cookie(&url("https://example.com/"), "s=1; Path=/; Secure");

        assert!(jar.get_request_cookies(&url("http://example.com/")).is_none());
        assert_eq!(jar.get_request_cookies(&url("https://example.com/")).unwrap(), "s=1");
    }

    #[test]
    fn max_age_zero_deletes() {
        let mut jar = DefaultCookieJar::new();
        let u = url("http://example.com/");
        jar.store_set_cookie(&u, "one=two; Path=/");
        jar.store_set_cookie(&u, "one=; Path=/; Max-Age=0");
        assert!(jar.all_cookies().is_empty());
    }

    #[test]
    fn past_expires_deletes() {
        let mut jar = DefaultCookieJar::new();
        let u = url("http://example.com/");
        jar.store_set_cookie(&u, "one=two; Path=/");
        jar.store_set_cookie(&u, "one=; Expires=Thu, 01-Jan-1970 00:00:00 GMT; Path=/");
        assert!(jar.all_cookies().is_empty());

        jar.store_set_cookie(&u, "two=3; Expires=Fri, 01 Jan 2100 00:00:00 GMT; Path=/");
        assert_eq!(jar.all_cookies().len(), 1);
    }

    #[test]
    fn remove_and_clear() {
        let mut jar = DefaultCookieJar::new();
        let u = url("http://example.com/");
        jar.store_set_cookie(&u, "a=1; Path=/");
        jar.store_set_cookie(&u, "b=2; Path=/");

        jar.remove_cookie(&u, "a");
        assert_eq!(jar.get_request_cookies(&u).unwrap(), "b=2");

        jar.clear();
        assert!(jar.get_request_cookies(&u).is_none());
    }

    #[test]
    fn handle_is_shared() {
        let a = DefaultCookieJar::new_handle();
        let b = a.clone();
        let u = url("http://example.com/");

        crate::cookies::write_jar(&a).store_set_cookie(&u, "x=y; Path=/");
        assert_eq!(crate::cookies::read_jar(&b).get_request_cookies(&u).unwrap(), "x=y");
    }
}
