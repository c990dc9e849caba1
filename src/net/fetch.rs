use crate::config::ClientConfig;
use crate::cookies::{write_jar, CookieJarHandle};
use crate::errors::RequestError;
use crate::net::options::RequestOptions;
use crate::net::response::Response;
use crate::net::transport::Transport;
use crate::net::{encoder, request, resolver};
use http::Method;

/// Runs one request through the pipeline: resolve, encode, build, send, wrap.
///
/// Every pre-flight failure returns before `transport` is called. When a `jar` is
/// given, its cookies are sent and the final response's `Set-Cookie` headers are
/// stored back into it, under a single write lock, once the exchange completed.
/// A transport bound to the same jar may already have stored cookies from redirect
/// hops; those are kept even when a later hop fails.
pub async fn fetch(
    transport: &dyn Transport,
    config: &ClientConfig,
    jar: Option<&CookieJarHandle>,
    method: Method,
    url: &str,
    options: Option<RequestOptions>,
) -> Result<Response, RequestError> {
    let mut resolved = resolver::resolve(method, url, options)?;

    let body = std::mem::take(&mut resolved.body);
    log::debug!("{} {} ({} body)", resolved.method, resolved.url, body.kind());
    let encoded = encoder::encode(body).await?;

    let request = request::build(config, resolved, encoded, jar)?;

    let raw = match transport.send(request).await {
        Ok(raw) => raw,
        Err(e) => {
            log::error!("Request to {url} failed: {e}");
            return Err(e);
        }
    };

    if let Some(jar) = jar {
        write_jar(jar).store_response_cookies(&raw.url, &raw.headers);
    }

    log::debug!("{} <- {}", raw.status, raw.url);
    Ok(Response::new(raw))
}
