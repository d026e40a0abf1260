// crates/pelican-fs/src/transport.rs
// ============================================================================
// Module: HTTP Transport
// Description: reqwest-backed implementation of the delegated transport.
// Purpose: Perform one HEAD/GET/PUT against one resolved endpoint.
// Dependencies: bytes, pelican-core, reqwest, serde, thiserror
// ============================================================================

//! ## Overview
//! [`HttpTransport`] executes a [`TransportRequest`] and classifies every
//! failure into a stable [`TransportErrorKind`]. Any non-success status is a
//! failure so the failover engine can advance. Response bodies are capped at
//! the configured size.
//!
//! Transport-specific knobs arrive through the configuration pass-through
//! table as [`HttpTransportOptions`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use pelican_core::Operation;
use pelican_core::Transport;
use pelican_core::TransportError;
use pelican_core::TransportErrorKind;
use pelican_core::TransportRequest;
use pelican_core::TransportResponse;
use reqwest::Client;
use reqwest::Method;
use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use reqwest::header::CONTENT_LENGTH;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderName;
use reqwest::header::HeaderValue;
use reqwest::header::RANGE;
use reqwest::redirect::Policy;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Options
// ============================================================================

/// Default maximum response body size in bytes.
pub const DEFAULT_MAX_RESPONSE_BYTES: u64 = 256 * 1024 * 1024;
/// Default redirect limit.
const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Options recognized in the `access.passthrough` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HttpTransportOptions {
    /// TCP/TLS connect timeout in milliseconds.
    #[serde(default)]
    pub connect_timeout_ms: Option<u64>,
    /// Idle pooled connection lifetime in milliseconds.
    #[serde(default)]
    pub pool_idle_timeout_ms: Option<u64>,
    /// Maximum idle pooled connections per host.
    #[serde(default)]
    pub pool_max_idle_per_host: Option<usize>,
    /// Maximum response body size in bytes.
    #[serde(default)]
    pub max_response_bytes: Option<u64>,
    /// Maximum redirects followed by an endpoint request.
    #[serde(default)]
    pub max_redirects: Option<usize>,
}

/// Transport construction failure.
#[derive(Debug, Error)]
pub enum TransportBuildError {
    /// The HTTP client could not be built.
    #[error("http transport unavailable: {0}")]
    Client(String),
}

// ============================================================================
// SECTION: Transport
// ============================================================================

/// reqwest-backed endpoint transport.
///
/// # Invariants
/// - Only 2xx responses are returned as success.
/// - Bodies larger than `max_response_bytes` are reported as body failures.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// Shared HTTP client.
    client: Client,
    /// Response body cap.
    max_response_bytes: u64,
}

impl HttpTransport {
    /// Builds a transport from pass-through options.
    ///
    /// # Errors
    ///
    /// Returns [`TransportBuildError`] when the HTTP client cannot be built.
    pub fn new(
        user_agent: &str,
        options: &HttpTransportOptions,
    ) -> Result<Self, TransportBuildError> {
        let mut builder = Client::builder()
            .user_agent(user_agent.to_string())
            .redirect(Policy::limited(options.max_redirects.unwrap_or(DEFAULT_MAX_REDIRECTS)));
        if let Some(ms) = options.connect_timeout_ms {
            builder = builder.connect_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = options.pool_idle_timeout_ms {
            builder = builder.pool_idle_timeout(Duration::from_millis(ms));
        }
        if let Some(max) = options.pool_max_idle_per_host {
            builder = builder.pool_max_idle_per_host(max);
        }
        let client = builder.build().map_err(|err| TransportBuildError::Client(err.to_string()))?;
        Ok(Self {
            client,
            max_response_bytes: options.max_response_bytes.unwrap_or(DEFAULT_MAX_RESPONSE_BYTES),
        })
    }

    /// Builds the header map for one request.
    fn headers(request: &TransportRequest) -> Result<HeaderMap, TransportError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| request_error(format!("invalid header name {name}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| request_error(format!("invalid value for header {name}")))?;
            headers.insert(name, value);
        }
        if let Some(authorization) = &request.authorization {
            let mut value = HeaderValue::from_str(authorization)
                .map_err(|_| request_error("invalid authorization header"))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        if let Operation::Get {
            range: Some(range),
        } = &request.operation
        {
            let value = HeaderValue::from_str(&range.header_value())
                .map_err(|_| request_error("invalid range header"))?;
            headers.insert(RANGE, value);
        }
        Ok(headers)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        let headers = Self::headers(&request)?;
        let builder = match &request.operation {
            Operation::Head => self.client.request(Method::HEAD, request.url.clone()),
            Operation::Get {
                ..
            } => self.client.request(Method::GET, request.url.clone()),
            Operation::Put {
                body,
            } => self.client.request(Method::PUT, request.url.clone()).body(body.clone()),
        };
        let response = builder.headers(headers).send().await.map_err(|err| classify(&err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::new(
                TransportErrorKind::Status(status.as_u16()),
                format!("{} answered {status}", request.url),
            ));
        }
        let content_length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());
        let body = match &request.operation {
            Operation::Head
            | Operation::Put {
                ..
            } => Bytes::new(),
            Operation::Get {
                range,
            } => {
                if content_length.is_some_and(|len| len > self.max_response_bytes) {
                    return Err(TransportError::new(
                        TransportErrorKind::Body,
                        format!("response exceeds {} bytes", self.max_response_bytes),
                    ));
                }
                let body = response.bytes().await.map_err(|err| classify(&err))?;
                if u64::try_from(body.len()).map_or(true, |len| len > self.max_response_bytes) {
                    return Err(TransportError::new(
                        TransportErrorKind::Body,
                        format!("response exceeds {} bytes", self.max_response_bytes),
                    ));
                }
                match range {
                    Some(range) if status == StatusCode::OK => {
                        slice_range(&body, range.start(), range.end())
                    }
                    _ => body,
                }
            }
        };
        Ok(TransportResponse {
            status: status.as_u16(),
            content_length,
            body,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Maps a reqwest failure onto a stable error kind.
fn classify(err: &reqwest::Error) -> TransportError {
    let kind = if err.is_timeout() {
        TransportErrorKind::Timeout
    } else if err.is_connect() {
        TransportErrorKind::Connect
    } else if err.is_body() || err.is_decode() {
        TransportErrorKind::Body
    } else {
        TransportErrorKind::Request
    };
    TransportError::new(kind, err.to_string())
}

/// Builds a request-shaping failure.
fn request_error(message: impl Into<String>) -> TransportError {
    TransportError::new(TransportErrorKind::Request, message)
}

/// Cuts `[start, end)` out of a full body returned for a ranged request.
fn slice_range(body: &Bytes, start: u64, end: u64) -> Bytes {
    let len = body.len();
    let start = usize::try_from(start).unwrap_or(len).min(len);
    let end = usize::try_from(end).unwrap_or(len).min(len);
    body.slice(start .. end.max(start))
}

#[cfg(test)]
mod tests;
