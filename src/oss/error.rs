//! Error types for OSS operations

use thiserror::Error;

use crate::oss::transport::{HttpResponse, TransportError};

/// A failed exchange with the storage service.
///
/// Carries the response when the service answered with a non-2xx status, so
/// callers can tell "could not reach the service" apart from "the service
/// rejected the request".
#[derive(Error, Debug, Clone)]
#[error("{message}{}", status_suffix(.response.as_ref()))]
pub struct RequestError {
    message: String,
    response: Option<HttpResponse>,
}

impl RequestError {
    /// Error for a failure that never produced a response (connect, TLS, timeout)
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            response: None,
        }
    }

    /// Error for a response the service rejected
    pub fn with_response(message: impl Into<String>, response: HttpResponse) -> Self {
        Self {
            message: message.into(),
            response: Some(response),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn has_response(&self) -> bool {
        self.response.is_some()
    }

    pub fn response(&self) -> Option<&HttpResponse> {
        self.response.as_ref()
    }

    /// HTTP status of the embedded response, if any
    pub fn status(&self) -> Option<u16> {
        self.response.as_ref().map(|r| r.status)
    }

}

fn status_suffix(response: Option<&HttpResponse>) -> String {
    response
        .map(|r| format!(" (HTTP {})", r.status))
        .unwrap_or_default()
}

impl From<TransportError> for RequestError {
    fn from(err: TransportError) -> Self {
        Self {
            message: err.message,
            response: err.response,
        }
    }
}

/// OSS client errors
#[derive(Error, Debug)]
pub enum OssError {
    #[error("Request failed: {0}")]
    Request(#[from] RequestError),

    #[error("Resource [{0}] does not exist")]
    ResourceNotFound(String),

    #[error("Method [{0}] is not supported")]
    UnsupportedOperation(String),

    #[error("XML parse error: {0}")]
    XmlParse(String),
}

impl From<quick_xml::Error> for OssError {
    fn from(err: quick_xml::Error) -> Self {
        OssError::XmlParse(err.to_string())
    }
}

impl OssError {
    /// The embedded request error, when this is a failed exchange
    pub fn as_request_error(&self) -> Option<&RequestError> {
        match self {
            OssError::Request(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, OssError>;

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_request_error_without_response() {
        let err = RequestError::new("connection refused");
        assert!(!err.has_response());
        assert_eq!(err.status(), None);
        assert_eq!(err.to_string(), "connection refused");
    }

    #[test]
    fn test_request_error_with_response() {
        let response = HttpResponse {
            status: 403,
            headers: Vec::new(),
            body: Bytes::from_static(b"<Error><Code>AccessDenied</Code></Error>"),
        };
        let err = RequestError::with_response("AccessDenied", response);
        assert!(err.has_response());
        assert_eq!(err.status(), Some(403));
        assert_eq!(err.to_string(), "AccessDenied (HTTP 403)");

        let oss: OssError = err.into();
        assert_eq!(oss.as_request_error().and_then(|e| e.status()), Some(403));
    }

    #[test]
    fn test_unsupported_operation_message() {
        let err = OssError::UnsupportedOperation("Select".to_string());
        assert_eq!(err.to_string(), "Method [Select] is not supported");
    }
}
