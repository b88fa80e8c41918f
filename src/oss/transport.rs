//! HTTP transport contract and the hyper-backed implementation
//!
//! The client never constructs a transport on its own: one is passed to
//! `OssClient::new`, which keeps the exchange substitutable in tests.
//!
//! `HyperTransport` settings:
//! - HTTP/1.1 only
//! - TCP_NODELAY for low latency
//! - native-tls (OpenSSL) for TLS
//! - Whole body collected into `Bytes` once
//! - No retries; every HTTP status is returned as `Ok`

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request};
use hyper_tls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as HyperClient;
use hyper_util::rt::TokioExecutor;
use native_tls::TlsConnector;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// A finalized request, ready for the wire
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

/// A complete response as received from the service
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Header names with every value received for them, in arrival order
    pub headers: Vec<(String, Vec<String>)>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Append a header value (builder style, mostly for tests and mocks)
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        match self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some((_, values)) => values.push(value.to_string()),
            None => self.headers.push((name.to_string(), vec![value.to_string()])),
        }
        self
    }

    /// First value of a header, case-insensitive
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failure reported by a transport.
///
/// A transport that treats non-2xx statuses as errors attaches the response,
/// which is then surfaced to the caller for inspection.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    pub response: Option<HttpResponse>,
}

impl TransportError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            response: None,
        }
    }

    pub fn with_response(message: impl Into<String>, response: HttpResponse) -> Self {
        Self {
            message: message.into(),
            response: Some(response),
        }
    }
}

/// The single suspension point of every operation
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
        (**self).send(request)
    }
}

/// Settings for [`HyperTransport`]
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Whole-exchange timeout, including reading the body
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// Skip certificate and hostname verification
    pub insecure_tls: bool,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            insecure_tls: false,
        }
    }
}

/// Transport over a hyper client
///
/// Clone is cheap - the underlying HTTP client uses Arc internally.
#[derive(Clone)]
pub struct HyperTransport {
    client: HyperClient<HttpsConnector<HttpConnector>, Full<Bytes>>,
    timeout: Duration,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HyperTransport {
    pub fn new(options: TransportOptions) -> Result<Self, TransportError> {
        let mut http = HttpConnector::new();
        http.set_nodelay(true);
        http.enforce_http(false);
        http.set_connect_timeout(Some(options.connect_timeout));

        let tls = if options.insecure_tls {
            tracing::warn!("INSECURE TLS MODE ENABLED: Certificate verification is disabled!");
            TlsConnector::builder()
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true)
                .build()
        } else {
            TlsConnector::new()
        };
        let tls = tls
            .map_err(|e| TransportError::connection(format!("Failed to build TLS connector: {}", e)))?;

        let https = HttpsConnector::from((http, tls.into()));

        let client = HyperClient::builder(TokioExecutor::new())
            .set_host(true)
            .build(https);

        Ok(Self {
            client,
            timeout: options.request_timeout,
        })
    }

    async fn exchange(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| TransportError::connection(format!("Invalid method: {}", e)))?;

        let mut req = Request::builder().method(method).uri(&request.url);
        for (key, value) in request.headers.iter() {
            req = req.header(key.as_str(), value.as_str());
        }

        let req = req
            .body(Full::new(request.body))
            .map_err(|e| TransportError::connection(format!("Request build error: {}", e)))?;

        let response = self
            .client
            .request(req)
            .await
            .map_err(|e| TransportError::connection(format!("Request failed: {}", e)))?;

        let status = response.status().as_u16();

        let mut headers: Vec<(String, Vec<String>)> = Vec::with_capacity(response.headers().len());
        for (name, value) in response.headers() {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            match headers.iter_mut().find(|(n, _)| n == name.as_str()) {
                Some((_, values)) => values.push(value),
                None => headers.push((name.as_str().to_string(), vec![value])),
            }
        }

        let body = response
            .collect()
            .await
            .map_err(|e| TransportError::connection(format!("Body error: {}", e)))?
            .to_bytes();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

impl Transport for HyperTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        match tokio::time::timeout(self.timeout, self.exchange(request)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::connection(format!(
                "Request timed out after {:?}",
                self.timeout
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_header_lookup_is_case_insensitive() {
        let response = HttpResponse::new(200, Bytes::new())
            .with_header("ETag", "\"abc\"")
            .with_header("x-oss-meta-a", "1")
            .with_header("X-OSS-META-A", "2");

        assert_eq!(response.header("etag"), Some("\"abc\""));
        assert_eq!(response.header("x-oss-meta-a"), Some("1"));
        assert_eq!(response.headers.len(), 2);
        assert_eq!(response.headers[1].1, vec!["1".to_string(), "2".to_string()]);
        assert_eq!(response.header("missing"), None);
    }

    #[test]
    fn test_is_success() {
        assert!(HttpResponse::new(200, Bytes::new()).is_success());
        assert!(HttpResponse::new(204, Bytes::new()).is_success());
        assert!(!HttpResponse::new(304, Bytes::new()).is_success());
        assert!(!HttpResponse::new(404, Bytes::new()).is_success());
    }

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::connection("connection refused");
        assert_eq!(err.to_string(), "connection refused");

        let err = TransportError::with_response("Forbidden", HttpResponse::new(403, Bytes::new()));
        assert_eq!(err.to_string(), "Forbidden");
        assert_eq!(err.response.map(|r| r.status), Some(403));
    }

    #[tokio::test]
    async fn test_hyper_transport_builds() {
        let transport = HyperTransport::new(TransportOptions::default());
        assert!(transport.is_ok());
    }
}
