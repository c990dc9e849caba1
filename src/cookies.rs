// src/cookies.rs
//! Cookies: [`CookieJar`], the in-memory [`DefaultCookieJar`] and the reqwest adapter.

mod cookies;
mod cookie_jar;
mod provider;

pub use cookies::Cookie;
pub use cookies::CookieJarHandle;
pub(crate) use cookies::{read_jar, write_jar};

pub use cookie_jar::CookieJar;
pub use cookie_jar::DefaultCookieJar;

pub(crate) use provider::JarCookieProvider;
