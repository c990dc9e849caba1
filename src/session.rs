//! Sessions.
//!
//! A [`Session`] owns a transport and a cookie jar that live as long as the
//! session. Every verb call layers its options over the session defaults, sends
//! the jar cookies along and stores the cookies the server sets.
//!
//! ```rust,no_run
//! use gosub_requests::net::RequestOptions;
//! use gosub_requests::session::Session;
//!
//! # async fn run() -> Result<(), gosub_requests::errors::RequestError> {
//! let session = Session::new(Some(RequestOptions::new().header("X-Api-Key", "secret")));
//!
//! session.get("http://httpbin.org/cookies/set", Some(RequestOptions::new().param("one", "two"))).await?;
//! let mut resp = session.post("http://httpbin.org/post", Some(RequestOptions::new().data("one", "two"))).await?;
//! println!("{}", resp.text().await);
//! # Ok(()) }
//! ```
//!
//! Sessions are `Send + Sync`; concurrent calls are independent exchanges that
//! only share the jar, which serializes its updates.
use crate::config::ClientConfig;
use crate::cookies::{read_jar, Cookie, CookieJarHandle, DefaultCookieJar};
use crate::errors::RequestError;
use crate::net::{fetch, Body, RequestOptions, ReqwestTransport, Response, Transport};
use http::Method;
use std::sync::Arc;
use url::Url;

pub struct Session {
    /// Options layered under every call. Never carries a body.
    defaults: RequestOptions,
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    jar: CookieJarHandle,
}

impl Session {
    /// Creates a session with its own cookie jar and a reqwest transport bound to it.
    /// Can use None when no default options are needed.
    pub fn new(defaults: Option<RequestOptions>) -> Self {
        Self::with_config(defaults, ClientConfig::default())
    }

    /// Creates a session using `config` for its default headers.
    pub fn with_config(defaults: Option<RequestOptions>, config: ClientConfig) -> Self {
        let jar = DefaultCookieJar::new_handle();
        let transport = Arc::new(ReqwestTransport::with_cookie_jar(jar.clone()));
        Self::build(defaults, config, transport, jar)
    }

    /// Creates a session that sends through `transport` instead of reqwest.
    pub fn with_transport(
        defaults: Option<RequestOptions>,
        config: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self::build(defaults, config, transport, DefaultCookieJar::new_handle())
    }

    fn build(
        defaults: Option<RequestOptions>,
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        jar: CookieJarHandle,
    ) -> Self {
        let mut defaults = defaults.unwrap_or_default();
        if !matches!(defaults.body, Body::Empty) {
            log::warn!("Ignoring {} body in session defaults", defaults.body.kind());
            defaults.body = Body::Empty;
        }

        Self {
            defaults,
            config,
            transport,
            jar,
        }
    }

    /// Returns the session's cookie jar.
    pub fn cookie_jar(&self) -> CookieJarHandle {
        self.jar.clone()
    }

    /// Returns the cookies the session would send to `url`.
    pub fn cookies(&self, url: &Url) -> Vec<Cookie> {
        read_jar(&self.jar).cookies(url)
    }

    /// Sends a `method` request, merging `options` over the session defaults.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        options: Option<RequestOptions>,
    ) -> Result<Response, RequestError> {
        let options = options.unwrap_or_default().merged_over(&self.defaults);
        fetch(
            self.transport.as_ref(),
            &self.config,
            Some(&self.jar),
            method,
            url,
            Some(options),
        )
        .await
    }

    pub async fn get(&self, url: &str, options: Option<RequestOptions>) -> Result<Response, RequestError> {
        self.request(Method::GET, url, options).await
    }

    pub async fn post(&self, url: &str, options: Option<RequestOptions>) -> Result<Response, RequestError> {
        self.request(Method::POST, url, options).await
    }

    pub async fn put(&self, url: &str, options: Option<RequestOptions>) -> Result<Response, RequestError> {
        self.request(Method::PUT, url, options).await
    }

    pub async fn patch(&self, url: &str, options: Option<RequestOptions>) -> Result<Response, RequestError> {
        self.request(Method::PATCH, url, options).await
    }

    pub async fn delete(&self, url: &str, options: Option<RequestOptions>) -> Result<Response, RequestError> {
        self.request(Method::DELETE, url, options).await
    }

    pub async fn head(&self, url: &str, options: Option<RequestOptions>) -> Result<Response, RequestError> {
        self.request(Method::HEAD, url, options).await
    }

    pub async fn options(&self, url: &str, options: Option<RequestOptions>) -> Result<Response, RequestError> {
        self.request(Method::OPTIONS, url, options).await
    }
}
