mod common;

use common::NoSend;
use gosub_requests::config::ClientConfig;
use gosub_requests::net::encoder::encode;
use gosub_requests::net::{fetch, RequestOptions};
use gosub_requests::{FileUpload, RequestError};
use http::Method;
use std::collections::BTreeMap;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};

async fn send(transport: &NoSend, url: &str, opts: RequestOptions) -> RequestError {
    common::init_logging();
    fetch(transport, &ClientConfig::default(), None, Method::POST, url, Some(opts))
        .await
        .unwrap_err()
}

struct BrokenReader;

impl AsyncRead for BrokenReader {
    fn poll_read(self: Pin<&mut Self>, _cx: &mut Context<'_>, _buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::new(io::ErrorKind::ConnectionAborted, "Random Error")))
    }
}

#[tokio::test]
async fn non_finite_json_is_never_sent() {
    let transport = NoSend::default();
    let opts = RequestOptions::new().json(BTreeMap::from([("value", f64::NAN)]));

    let err = send(&transport, "http://example.com/post", opts).await;
    assert!(matches!(err, RequestError::JsonEncodeError(_)));
    assert_eq!(transport.calls(), 0);

    let opts = RequestOptions::new().json(vec![f64::INFINITY]);
    let err = send(&transport, "http://example.com/post", opts).await;
    assert!(matches!(err, RequestError::JsonEncodeError(_)));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn xml_map_is_never_sent() {
    let transport = NoSend::default();
    let opts = RequestOptions::new().xml(BTreeMap::from([("One", "Two")]));

    let err = send(&transport, "http://example.com/post", opts).await;
    assert!(matches!(err, RequestError::XmlEncodeError(_)));
    assert!(err.is_preflight());
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn malformed_url_is_invalid_options() {
    let transport = NoSend::default();

    let err = send(&transport, "%../dir/", RequestOptions::new()).await;
    assert!(matches!(err, RequestError::InvalidOptions(_)));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn unsupported_scheme_is_invalid_request() {
    let transport = NoSend::default();

    let err = send(&transport, "ftp://example.com/file", RequestOptions::new()).await;
    assert!(matches!(err, RequestError::InvalidRequest(_)));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn bad_proxy_is_invalid_options() {
    let transport = NoSend::default();
    let opts = RequestOptions::new().proxy("http", "not a url");

    let err = send(&transport, "http://example.com/", opts).await;
    assert!(matches!(err, RequestError::InvalidOptions(_)));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn upload_without_contents_is_invalid() {
    let transport = NoSend::default();
    let mut upload = FileUpload::from_bytes("nil.txt", "");
    upload.contents = None;

    let err = send(&transport, "http://example.com/post", RequestOptions::new().file(upload)).await;
    assert!(matches!(err, RequestError::InvalidFileUpload(_)));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn upload_read_error_aborts_the_request() {
    let transport = NoSend::default();
    let opts = RequestOptions::new()
        .data("One", "Two")
        .file(FileUpload::new("Random.test", BrokenReader));

    let err = send(&transport, "http://example.com/post", opts).await;
    assert!(matches!(err, RequestError::FileReadError { .. }));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn empty_upload_reaches_the_transport() {
    let transport = NoSend::default();
    let opts = RequestOptions::new().file(FileUpload::new("empty.txt", tokio::io::empty()));

    // Encoding succeeds, so the double is called and refuses
    let err = send(&transport, "http://example.com/post", opts).await;
    assert!(matches!(err, RequestError::NetworkError(_)));
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn form_encoding_is_stable() {
    let opts = || RequestOptions::new().data("One", "Two").data("a b", "c&d");

    let first = encode(opts().body).await.unwrap();
    let second = encode(opts().body).await.unwrap();
    assert_eq!(first.body.as_bytes(), second.body.as_bytes());
    assert_eq!(first.content_type, second.content_type);
}

#[tokio::test]
async fn multipart_boundary_changes_per_encode() {
    let opts = || {
        RequestOptions::new()
            .data("One", "Two")
            .file(FileUpload::from_bytes("a.txt", "A"))
    };

    let first = encode(opts().body).await.unwrap();
    let second = encode(opts().body).await.unwrap();
    assert_ne!(first.content_type, second.content_type);

    let boundary = |ct: &Option<String>| ct.as_deref().unwrap().split("boundary=").nth(1).unwrap().to_string();
    let strip = |bytes: &[u8], boundary: &str| String::from_utf8_lossy(bytes).replace(boundary, "BOUNDARY");

    let a = strip(first.body.as_bytes().unwrap(), &boundary(&first.content_type));
    let b = strip(second.body.as_bytes().unwrap(), &boundary(&second.content_type));
    assert_eq!(a, b);
}
