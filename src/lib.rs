//! Convenience HTTP client.
//!
//! One call per verb, an options bag describing everything besides the method and
//! URL, and a response whose body can be read once:
//!
//! ```rust,no_run
//! use gosub_requests::net::RequestOptions;
//!
//! # async fn run() -> Result<(), gosub_requests::errors::RequestError> {
//! let mut resp = gosub_requests::post(
//!     "http://httpbin.org/post",
//!     Some(RequestOptions::new().data("One", "Two")),
//! )
//! .await?;
//! println!("{}", resp.text().await);
//! # Ok(()) }
//! ```
//!
//! Top level calls share nothing with each other. Use a [`Session`] to keep
//! cookies and default options between requests.
pub mod config;
pub mod cookies;
pub mod errors;
pub mod net;
pub mod session;

pub use config::ClientConfig;
pub use errors::RequestError;
pub use net::{FileUpload, RequestOptions, Response};
pub use session::Session;

use http::Method;
use net::ReqwestTransport;

/// Sends a one-off `method` request with the default configuration and no cookie jar.
pub async fn request(method: Method, url: &str, options: Option<RequestOptions>) -> Result<Response, RequestError> {
    let transport = ReqwestTransport::new();
    net::fetch(&transport, &ClientConfig::default(), None, method, url, options).await
}

pub async fn get(url: &str, options: Option<RequestOptions>) -> Result<Response, RequestError> {
    request(Method::GET, url, options).await
}

pub async fn post(url: &str, options: Option<RequestOptions>) -> Result<Response, RequestError> {
    request(Method::POST, url, options).await
}

pub async fn put(url: &str, options: Option<RequestOptions>) -> Result<Response, RequestError> {
    request(Method::PUT, url, options).await
}

pub async fn patch(url: &str, options: Option<RequestOptions>) -> Result<Response, RequestError> {
    request(Method::PATCH, url, options).await
}

pub async fn delete(url: &str, options: Option<RequestOptions>) -> Result<Response, RequestError> {
    request(Method::DELETE, url, options).await
}

pub async fn head(url: &str, options: Option<RequestOptions>) -> Result<Response, RequestError> {
    request(Method::HEAD, url, options).await
}

pub async fn options(url: &str, options: Option<RequestOptions>) -> Result<Response, RequestError> {
    request(Method::OPTIONS, url, options).await
}
