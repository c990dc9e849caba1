#![allow(dead_code)]

use async_trait::async_trait;
use gosub_requests::errors::RequestError;
use gosub_requests::net::{RawResponse, Request, Transport};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Respond, ResponseTemplate};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Echoes the request back the way httpbin does: `args`, `headers`, `form`, `files`,
/// `json`, `data` and `url`.
pub struct Echo;

impl Respond for Echo {
    fn respond(&self, req: &wiremock::Request) -> ResponseTemplate {
        let args: Map<String, Value> = req
            .url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), Value::from(v.into_owned())))
            .collect();

        let mut headers = Map::new();
        for (name, value) in req.headers.iter() {
            headers.insert(title_case(name.as_str()), Value::from(value.to_str().unwrap_or_default()));
        }

        let content_type = req
            .headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let mut form = Map::new();
        let mut files = Map::new();
        let mut data = String::new();
        if content_type.starts_with("application/x-www-form-urlencoded") {
            for (k, v) in url::form_urlencoded::parse(&req.body) {
                form.insert(k.into_owned(), Value::from(v.into_owned()));
            }
        } else if let Some(boundary) = content_type.split("boundary=").nth(1) {
            for part in parse_multipart(&req.body, boundary) {
                match part.file_name {
                    Some(_) => files.insert(part.name, Value::from(part.content)),
                    None => form.insert(part.name, Value::from(part.content)),
                };
            }
        } else {
            data = String::from_utf8_lossy(&req.body).into_owned();
        }

        let json_body = if content_type.starts_with("application/json") {
            serde_json::from_slice(&req.body).unwrap_or(Value::Null)
        } else {
            Value::Null
        };

        ResponseTemplate::new(200).set_body_json(json!({
            "args": args,
            "headers": headers,
            "form": form,
            "files": files,
            "json": json_body,
            "data": data,
            "url": req.url.as_str(),
        }))
    }
}

/// `/cookies/set?k=v` sets one cookie per query pair and redirects to `/cookies`,
/// which reports the cookies it received.
pub struct Cookies;

impl Respond for Cookies {
    fn respond(&self, req: &wiremock::Request) -> ResponseTemplate {
        if req.url.path() == "/cookies/set" {
            let mut template = ResponseTemplate::new(302).insert_header("Location", "/cookies");
            for (k, v) in req.url.query_pairs() {
                template = template.append_header("Set-Cookie", format!("{k}={v}; Path=/"));
            }
            return template;
        }

        let cookies: Map<String, Value> = req
            .headers
            .get("cookie")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .split("; ")
            .filter_map(|pair| pair.split_once('='))
            .map(|(k, v)| (k.to_string(), Value::from(v)))
            .collect();

        ResponseTemplate::new(200).set_body_json(json!({ "cookies": cookies }))
    }
}

/// Mock server answering every method on `/anything` style paths with [`Echo`] and
/// `/cookies*` with [`Cookies`].
pub async fn httpbin() -> MockServer {
    init_logging();
    let server = MockServer::start().await;

    for p in ["/cookies", "/cookies/set"] {
        Mock::given(path(p)).respond_with(Cookies).mount(&server).await;
    }
    for m in ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"] {
        Mock::given(method(m))
            .and(path(format!("/{}", m.to_lowercase())))
            .respond_with(Echo)
            .mount(&server)
            .await;
    }
    Mock::given(method("HEAD")).respond_with(ResponseTemplate::new(200)).mount(&server).await;
    Mock::given(path("/status/404")).respond_with(ResponseTemplate::new(404)).mount(&server).await;

    server
}

/// Transport double that counts calls and refuses to send anything.
#[derive(Default)]
pub struct NoSend {
    pub calls: AtomicUsize,
}

impl NoSend {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for NoSend {
    async fn send(&self, request: Request) -> Result<RawResponse, RequestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RequestError::network(format!("unexpected send to {}", request.url)))
    }
}

struct Part {
    name: String,
    file_name: Option<String>,
    content: String,
}

fn parse_multipart(body: &[u8], boundary: &str) -> Vec<Part> {
    let body = String::from_utf8_lossy(body);
    let delimiter = format!("--{boundary}");

    body.split(delimiter.as_str())
        .filter_map(|chunk| {
            let chunk = chunk.strip_prefix("\r\n")?;
            let (head, content) = chunk.split_once("\r\n\r\n")?;
            let disposition = head
                .lines()
                .find(|l| l.to_ascii_lowercase().starts_with("content-disposition"))?;

            Some(Part {
                name: disposition_param(disposition, "name")?,
                file_name: disposition_param(disposition, "filename"),
                content: content.strip_suffix("\r\n").unwrap_or(content).to_string(),
            })
        })
        .collect()
}

fn disposition_param(disposition: &str, key: &str) -> Option<String> {
    disposition
        .split("; ")
        .filter_map(|p| p.split_once('='))
        .find(|(k, _)| k.trim() == key)
        .map(|(_, v)| v.trim_matches('"').to_string())
}

fn title_case(name: &str) -> String {
    name.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}
