//! HTTP transport seam for the host-does-IO pattern.
//!
//! # Design
//! The client builds `HttpRequest` values and parses response bytes without
//! knowing how the round-trip happens. Anything that can POST a body and hand
//! back the response body implements `Transport`; `UreqTransport` is the
//! blocking backend used by default.
//!
//! Every call the remote API accepts is a POST, so the request carries no
//! method field.

use std::io::Read;

use tracing::trace;
use ureq::tls::TlsConfig;
use ureq::Agent;

/// Boxed error raised by a transport backend. Propagated to the caller as-is.
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";

/// A POST request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub content_type: String,
    pub body: Vec<u8>,
    /// `false` only for the API host, whose certificate does not match its
    /// advertised domain.
    pub verify_tls: bool,
}

/// Executes a POST and returns the raw response body.
pub trait Transport {
    fn post(&self, request: &HttpRequest) -> Result<Vec<u8>, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn post(&self, request: &HttpRequest) -> Result<Vec<u8>, TransportError> {
        (**self).post(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn post(&self, request: &HttpRequest) -> Result<Vec<u8>, TransportError> {
        (**self).post(request)
    }
}

/// Blocking transport built on `ureq`.
///
/// Keeps one agent with the platform's certificate checks and one with them
/// turned off, picking between them by `HttpRequest::verify_tls`. Bodies are
/// returned whatever the status; both the API and the OAuth server describe
/// failures in the body.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    verified: Agent,
    unverified: Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let verified = Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        let unverified = Agent::config_builder()
            .http_status_as_error(false)
            .tls_config(TlsConfig::builder().disable_verification(true).build())
            .build()
            .new_agent();
        Self { verified, unverified }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn post(&self, request: &HttpRequest) -> Result<Vec<u8>, TransportError> {
        let agent = if request.verify_tls {
            &self.verified
        } else {
            &self.unverified
        };
        trace!(url = %request.url, bytes = request.body.len(), "POST");

        let mut response = agent
            .post(request.url.as_str())
            .content_type(request.content_type.as_str())
            .send(&request.body[..])?;

        trace!(status = response.status().as_u16(), "response");
        let mut body = Vec::new();
        response.body_mut().as_reader().read_to_end(&mut body)?;
        Ok(body)
    }
}
