//! Lets reqwest read and fill a session jar, so cookies set on redirect hops
//! are not lost when the client follows redirects internally.
use crate::cookies::{read_jar, write_jar, CookieJarHandle};
use http::HeaderValue;
use url::Url;

pub(crate) struct JarCookieProvider {
    jar: CookieJarHandle,
}

impl JarCookieProvider {
    pub(crate) fn new(jar: CookieJarHandle) -> Self {
        Self { jar }
    }

    /// `Cookie` header value the jar holds for `url`.
    pub(crate) fn request_cookies(&self, url: &Url) -> Option<String> {
        read_jar(&self.jar).get_request_cookies(url)
    }
}

impl reqwest::cookie::CookieStore for JarCookieProvider {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        // One write lock for the whole response
        let mut jar = write_jar(&self.jar);
        for header in cookie_headers {
            if let Ok(value) = header.to_str() {
                jar.store_set_cookie(url, value);
            }
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let header = self.request_cookies(url)?;
        HeaderValue::from_str(&header).ok()
    }
}
