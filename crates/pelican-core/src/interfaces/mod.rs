// crates/pelican-core/src/interfaces/mod.rs
// ============================================================================
// Module: Pelican Interfaces
// Description: Backend-agnostic seams for transport, resolution, and time.
// Purpose: Define the contract surfaces used by the failover engine.
// Dependencies: crate::core, async-trait, bytes
// ============================================================================

//! ## Overview
//! Interfaces define how the Pelican engine integrates with the byte-level
//! object transport and the federation director without embedding HTTP
//! details. Implementations must fail closed on missing or invalid data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use time::OffsetDateTime;
use url::Url;

use crate::core::CandidateList;
use crate::core::NamespaceInfo;
use crate::core::OperationClass;
use crate::core::PelicanError;

// ============================================================================
// SECTION: Operations
// ============================================================================

/// Half-open byte range `[start, end)`.
///
/// # Invariants
/// - `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    /// First byte offset, inclusive.
    start: u64,
    /// Last byte offset, exclusive.
    end: u64,
}

impl ByteRange {
    /// Builds a range, returning `None` when it would be empty.
    #[must_use]
    pub const fn new(start: u64, end: u64) -> Option<Self> {
        if start < end {
            Some(Self {
                start,
                end,
            })
        } else {
            None
        }
    }

    /// Returns the inclusive start offset.
    #[must_use]
    pub const fn start(&self) -> u64 {
        self.start
    }

    /// Returns the exclusive end offset.
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.end
    }

    /// Returns the number of bytes covered.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Ranges are never empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Renders the HTTP `Range` header value.
    #[must_use]
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end - 1)
    }
}

/// Byte-level operation delegated to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Metadata-only request.
    Head,
    /// Content read, optionally restricted to a byte range.
    Get {
        /// Requested range; `None` reads the whole object.
        range: Option<ByteRange>,
    },
    /// Object upload.
    Put {
        /// Object content.
        body: Bytes,
    },
}

impl Operation {
    /// Returns the operation class used to pick the required scope.
    #[must_use]
    pub const fn class(&self) -> OperationClass {
        match self {
            Self::Head | Self::Get {
                ..
            } => OperationClass::Read,
            Self::Put {
                ..
            } => OperationClass::Write,
        }
    }

    /// Returns the HTTP method name.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::Head => "HEAD",
            Self::Get {
                ..
            } => "GET",
            Self::Put {
                ..
            } => "PUT",
        }
    }
}

// ============================================================================
// SECTION: Transport
// ============================================================================

/// One physical request against a single candidate endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    /// Physical object URL.
    pub url: Url,
    /// Operation to perform.
    pub operation: Operation,
    /// `Authorization` header value, when a token is required.
    pub authorization: Option<String>,
    /// Extra caller-configured headers.
    pub headers: BTreeMap<String, String>,
}

/// Successful transport response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code (always a success status).
    pub status: u16,
    /// Declared content length, when known.
    pub content_length: Option<u64>,
    /// Response body; empty for `HEAD` and `PUT`.
    pub body: Bytes,
}

/// Transport failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// Connection could not be established.
    Connect,
    /// The request did not complete in time.
    Timeout,
    /// The endpoint answered with a non-success status.
    Status(u16),
    /// The request could not be built or sent.
    Request,
    /// The response body could not be read.
    Body,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => f.write_str("connect"),
            Self::Timeout => f.write_str("timeout"),
            Self::Status(status) => write!(f, "status:{status}"),
            Self::Request => f.write_str("request"),
            Self::Body => f.write_str("body"),
        }
    }
}

/// Per-candidate transport failure.
///
/// # Invariants
/// - Recovered locally by the failover engine; never surfaced directly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    /// Failure category.
    pub kind: TransportErrorKind,
    /// Human-readable detail.
    pub message: String,
}

impl TransportError {
    /// Builds a transport error.
    #[must_use]
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Returns the stable label stored in access records.
    #[must_use]
    pub fn error_kind(&self) -> String {
        self.kind.to_string()
    }
}

/// Delegated byte-level object transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Executes one request against one endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on connection failure, timeout, or any
    /// non-success status.
    async fn execute(&self, request: TransportRequest)
    -> Result<TransportResponse, TransportError>;
}

// ============================================================================
// SECTION: Namespace Resolution
// ============================================================================

/// Candidates and policy for one logical path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Director-ordered candidates.
    pub candidates: CandidateList,
    /// Governing namespace policy.
    pub namespace: NamespaceInfo,
}

/// Resolves logical paths into candidates and namespace policy.
#[async_trait]
pub trait NamespaceResolver: Send + Sync {
    /// Resolves `path` into its candidate list and namespace policy.
    ///
    /// The candidate list may be empty; callers decide whether configured
    /// endpoints can still serve the path.
    ///
    /// # Errors
    ///
    /// Returns [`PelicanError::Discovery`] on transport or protocol failure.
    async fn resolve(&self, path: &str) -> Result<Resolution, PelicanError>;
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Time source for expiry checks and access records.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> OffsetDateTime;
}

/// Wall-clock time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
