//! Client configuration.
//!
//! `ClientConfig` holds the headers every outgoing request starts from. It is an
//! immutable value: sessions and the top-level verb functions take it at
//! construction time and never mutate it afterwards.
//!
//! # Examples
//!
//! ## Use defaults
//! ```rust
//! use gosub_requests::config::ClientConfig;
//! let cfg = ClientConfig::default();
//! assert_eq!(cfg.accept, "*/*");
//! ```
//!
//! ## Customize with the builder
//! ```rust
//! use gosub_requests::config::ClientConfig;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = ClientConfig::builder()
//!     .user_agent("MyCrawler/2.0")
//!     .default_header("Accept-Language", "en-US,en;q=0.9")
//!     .build()?; // returns Result<ClientConfig, ConfigError>
//! # Ok(()) }
//! ```
//!
//! # Errors
//!
//! Builder validation returns [`ConfigError`] when the user agent or one of the
//! default headers cannot be sent as an HTTP header.
use crate::errors::ConfigError;
use http::header::{HeaderName, HeaderValue};

const DEFAULT_USER_AGENT: &str = concat!("gosub-requests/", env!("CARGO_PKG_VERSION"));

/// Headers and identity applied to every request unless overridden per request.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// User agent string for HTTP requests
    pub user_agent: String,
    /// Value of the `Accept` header
    pub accept: String,
    /// Extra headers added to every request, in order
    pub default_headers: Vec<(String, String)>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept: "*/*".to_string(),
            default_headers: Vec::new(),
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    inner: ClientConfig,
}

impl ClientConfigBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut ClientConfig)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn user_agent<S: Into<String>>(self, ua: S) -> Self { self.map(|c| c.user_agent = ua.into()) }
    pub fn accept<S: Into<String>>(self, accept: S) -> Self { self.map(|c| c.accept = accept.into()) }
    pub fn default_header<K: Into<String>, V: Into<String>>(self, key: K, value: V) -> Self {
        self.map(|c| c.default_headers.push((key.into(), value.into())))
    }

    /// Validate and build the final config.
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        validate(&self.inner)?;
        Ok(self.inner)
    }
}

// ---------- Validation ----------

fn validate(c: &ClientConfig) -> Result<(), ConfigError> {
    if HeaderValue::from_str(&c.user_agent).is_err() {
        return Err(ConfigError::InvalidUserAgent(c.user_agent.clone()));
    }
    if HeaderValue::from_str(&c.accept).is_err() {
        return Err(ConfigError::InvalidHeader(format!("Accept: {}", c.accept)));
    }
    for (key, value) in &c.default_headers {
        if HeaderName::try_from(key.as_str()).is_err() || HeaderValue::from_str(value).is_err() {
            return Err(ConfigError::InvalidHeader(format!("{key}: {value}")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_user_agent_names_the_crate() {
        let cfg = ClientConfig::default();
        assert!(cfg.user_agent.starts_with("gosub-requests/"));
        assert!(cfg.default_headers.is_empty());
    }

    #[test]
    fn builder_rejects_bad_header() {
        let err = ClientConfig::builder()
            .default_header("bad header", "x")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidHeader(_)));

        let err = ClientConfig::builder().user_agent("line\nbreak").build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUserAgent(_)));
    }
}
