//! Sends signed requests and turns failures into [`RequestError`]

use tracing::{debug, warn};

use crate::oss::error::{RequestError, Result};
use crate::oss::request::SignedRequest;
use crate::oss::transport::{HttpResponse, Transport, TransportError};

/// Thin wrapper around an injected transport. Never retries.
#[derive(Debug, Clone)]
pub struct Dispatcher<T> {
    transport: T,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send one request; only a 2xx response comes back as `Ok`
    pub async fn send(&self, request: SignedRequest) -> Result<HttpResponse> {
        let method = request.verb;
        let url = request.url.clone();
        debug!(%method, %url, "Sending OSS request");

        match self.transport.send(request.into_http_request()).await {
            Ok(response) if response.is_success() => {
                debug!(%method, %url, status = response.status, "OSS request succeeded");
                Ok(response)
            }
            Ok(response) => {
                let error = rejected(response);
                warn!(%method, %url, status = ?error.status(), "OSS request rejected");
                Err(error.into())
            }
            Err(TransportError {
                response: Some(response),
                ..
            }) => {
                let error = rejected(response);
                warn!(%method, %url, status = ?error.status(), "OSS request rejected");
                Err(error.into())
            }
            Err(TransportError { message, response: None }) => {
                warn!(%method, %url, error = %message, "OSS request failed");
                Err(RequestError::new(message).into())
            }
        }
    }
}

/// Error for a non-2xx response; the body becomes the message when present
fn rejected(response: HttpResponse) -> RequestError {
    let message = if response.body.is_empty() {
        format!("HTTP {}", response.status)
    } else {
        String::from_utf8_lossy(&response.body).into_owned()
    };
    RequestError::with_response(message, response)
}
