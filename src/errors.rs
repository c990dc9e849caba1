/// Boxed error type used for transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Every failure a request can run into, from option resolution to decoding the response.
///
/// Variants up to and including [`RequestError::InvalidRequest`] are raised before the
/// transport is ever called. Nothing is sent on the wire for those.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("Invalid file upload: {0}")]
    InvalidFileUpload(String),

    #[error("Cannot read file upload '{file_name}': {source}")]
    FileReadError {
        file_name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON encode error: {0}")]
    JsonEncodeError(String),

    #[error("XML encode error: {0}")]
    XmlEncodeError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(#[source] BoxError),

    #[error("JSON decode error: {0}")]
    JsonDecodeError(#[source] serde_json::Error),

    #[error("XML decode error: {0}")]
    XmlDecodeError(#[source] quick_xml::DeError),
}

impl RequestError {
    /// Wraps any transport failure into a [`RequestError::NetworkError`].
    pub fn network<E: Into<BoxError>>(err: E) -> Self {
        RequestError::NetworkError(err.into())
    }

    /// True when the request was rejected before reaching the transport.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            RequestError::InvalidOptions(_)
                | RequestError::InvalidFileUpload(_)
                | RequestError::FileReadError { .. }
                | RequestError::JsonEncodeError(_)
                | RequestError::XmlEncodeError(_)
                | RequestError::InvalidRequest(_)
        )
    }
}

impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        // reqwest refuses some method/url combinations only when building the request
        if err.is_builder() {
            RequestError::InvalidRequest(err.to_string())
        } else {
            RequestError::NetworkError(Box::new(err))
        }
    }
}

/// Errors raised while validating a [`ClientConfig`](crate::config::ClientConfig).
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("User agent {0:?} is not a valid header value")]
    InvalidUserAgent(String),

    #[error("Default header {0:?} has an invalid name or value")]
    InvalidHeader(String),
}
