//! Cookie core types.
//!
//! This module defines the **type-erased handle** used by sessions and the
//! [`Cookie`] record the jar stores.
//!
//! # Concurrency model
//! - [`CookieJarHandle`] is `Arc<RwLock<dyn CookieJar + Send + Sync>>`.
//!   - Callers take a **read lock** for queries and a **write lock** for
//!     mutations. All `Set-Cookie` headers of one response are applied under a
//!     single write lock, so concurrent responses never lose each other's updates.
//!
//! # Typical usage
//! ```ignore
//! let jar = session.cookie_jar(); // -> CookieJarHandle
//! let header = read_jar(&jar).get_request_cookies(&url);
//! write_jar(&jar).store_response_cookies(&url, &headers);
//! ```
//!
//! ```rust
//! use gosub_requests::cookies::Cookie;
//!
//! let c = Cookie {
//!     name: "session".into(),
//!     value: "abc123".into(),
//!     domain: "example.com".into(),
//!     host_only: true,
//!     path: "/".into(),
//!     secure: true,
//!     http_only: true,
//!     same_site: Some("Lax".into()),
//!     expires_at: None,
//! };
//! assert_eq!(c.pair(), "session=abc123");
//! ```

use crate::cookies::CookieJar;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A handle to a cookie jar trait.
///
/// This is a reference-counted, read/write-locked pointer to a type-erased
/// [`CookieJar`]. Obtain a **read lock** for queries and a **write lock** for
/// mutations.
pub type CookieJarHandle = Arc<RwLock<dyn CookieJar + Send + Sync>>;

/// Takes the read lock on a jar. A poisoned lock still holds consistent data
/// because every jar mutation completes before the guard is released.
pub(crate) fn read_jar(jar: &CookieJarHandle) -> RwLockReadGuard<'_, dyn CookieJar + Send + Sync + 'static> {
    jar.read().unwrap_or_else(PoisonError::into_inner)
}

/// Takes the write lock on a jar.
pub(crate) fn write_jar(jar: &CookieJarHandle) -> RwLockWriteGuard<'_, dyn CookieJar + Send + Sync + 'static> {
    jar.write().unwrap_or_else(PoisonError::into_inner)
}

/// A cookie as stored by the jar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    /// Cookie name (case-sensitive).
    pub name: String,

    /// Raw cookie value (not URL-decoded).
    pub value: String,

    /// Domain the cookie belongs to, without a leading dot.
    pub domain: String,

    /// If `true`, the cookie is only sent to exactly `domain` (no `Domain` attribute
    /// was present). Otherwise subdomains receive it too.
    pub host_only: bool,

    /// Path scoping (e.g., `"/"`).
    pub path: String,

    /// If `true`, cookie is sent only over HTTPS.
    pub secure: bool,

    /// If `true`, cookie is blocked from access by client-side scripts.
    pub http_only: bool,

    /// SameSite policy (`"Strict"`, `"Lax"`, or `"None"`).
    pub same_site: Option<String>,

    /// Expiration as a unix timestamp in seconds. Session cookies have `None`.
    pub expires_at: Option<i64>,
}

impl Cookie {
    /// Returns the `name=value` pair as sent in a `Cookie` request header.
    pub fn pair(&self) -> String {
        format!("{}={}", self.name, self.value)
    }

    /// True when the cookie expired at or before `now` (unix seconds).
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}
