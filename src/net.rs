//! Request pipeline: options, body encoding, request building, transport and response.

pub mod encoder;
pub mod options;
pub mod request;
pub mod resolver;
pub mod response;
pub mod transport;
mod fetch;
mod payload;
mod upload;

pub use fetch::fetch;
pub use options::{BasicAuth, Body, RawBody, RequestOptions, TransportOptions};
pub use payload::Payload;
pub use request::Request;
pub use response::Response;
pub use transport::{BodyStream, RawResponse, ReqwestTransport, Transport};
pub use upload::FileUpload;
