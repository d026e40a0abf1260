// crates/pelican-core/src/core/error.rs
// ============================================================================
// Module: Pelican Error Taxonomy
// Description: User-visible failures for resolution, failover, and credentials.
// Purpose: Keep enough structure for diagnostics without verbose logging.
// Dependencies: thiserror, url
// ============================================================================

//! ## Overview
//! Per-candidate and per-source failures are absorbed locally and only
//! surface folded into [`NoAvailableSource`] or [`NoCredentialsError`] once
//! every option is exhausted. Both keep the ordered list of reasons.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use url::Url;

use crate::core::candidate::CandidateKind;
use crate::core::token::TokenSource;

// ============================================================================
// SECTION: Discovery Errors
// ============================================================================

/// Federation or namespace resolution could not complete.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Never retried internally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    /// The discovery URL could not be interpreted.
    #[error("invalid discovery url: {0}")]
    InvalidUrl(String),
    /// The request never produced a response.
    #[error("discovery transport failure: {0}")]
    Transport(String),
    /// The server answered with an unexpected status.
    #[error("discovery request to {url} returned status {status}")]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },
    /// The federation metadata document was unusable.
    #[error("invalid federation metadata: {0}")]
    InvalidMetadata(String),
    /// The director response could not be interpreted.
    #[error("malformed director response: {0}")]
    MalformedResponse(String),
}

// ============================================================================
// SECTION: Failover Errors
// ============================================================================

/// One failed candidate attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFailure {
    /// Endpoint that failed.
    pub endpoint: Url,
    /// Endpoint kind.
    pub kind: CandidateKind,
    /// Stable failure label.
    pub error_kind: String,
}

/// Every known candidate failed, or resolution returned none.
///
/// # Invariants
/// - `failures` preserves attempt order; it is empty when nothing was attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no available source for {path}{}", render_failures(.failures))]
pub struct NoAvailableSource {
    /// Logical path that could not be served.
    pub path: String,
    /// Ordered per-candidate failures.
    pub failures: Vec<CandidateFailure>,
}

impl NoAvailableSource {
    /// Builds an error for a path with no usable candidates at all.
    #[must_use]
    pub fn empty(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            failures: Vec::new(),
        }
    }

    /// Returns the ordered failure labels.
    #[must_use]
    pub fn error_kinds(&self) -> Vec<&str> {
        self.failures.iter().map(|failure| failure.error_kind.as_str()).collect()
    }

    /// Returns true when every attempted candidate answered `404`.
    #[must_use]
    pub fn all_not_found(&self) -> bool {
        !self.failures.is_empty()
            && self.failures.iter().all(|failure| failure.error_kind == "status:404")
    }
}

/// Renders candidate failures for the error message.
fn render_failures(failures: &[CandidateFailure]) -> String {
    if failures.is_empty() {
        return String::new();
    }
    let rendered: Vec<String> = failures
        .iter()
        .map(|failure| format!("{} {}: {}", failure.kind, failure.endpoint, failure.error_kind))
        .collect();
    format!(" (attempted {})", rendered.join("; "))
}

// ============================================================================
// SECTION: Credential Errors
// ============================================================================

/// Why a discovered token was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenRejection {
    /// The source was configured but could not be read.
    #[error("unreadable: {0}")]
    Unreadable(String),
    /// The content could not be parsed as a token.
    #[error("malformed: {0}")]
    Malformed(String),
    /// The token expiry has passed.
    #[error("expired")]
    Expired,
    /// The issuer is not accepted by the namespace.
    #[error("issuer not allowed: {0}")]
    IssuerNotAllowed(String),
    /// The token lacks the required scope.
    #[error("missing scope {0}")]
    InsufficientScope(String),
    /// The scope is restricted to a path that does not cover the request.
    #[error("path not authorized: {0}")]
    PathNotAuthorized(String),
}

/// A token source that produced content which was then rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRejection {
    /// Source the content came from.
    pub source: TokenSource,
    /// Rejection reason.
    pub reason: TokenRejection,
}

/// No discovered token passed every validation predicate.
///
/// # Invariants
/// - `rejections` is ordered by discovery order; empty when no source was configured.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "no credentials for {path} in namespace {namespace} with scope {scope}{}",
    render_rejections(.rejections)
)]
pub struct NoCredentialsError {
    /// Namespace prefix whose policy demanded a token.
    pub namespace: String,
    /// Logical path credentials were requested for.
    pub path: String,
    /// Scope that was required.
    pub scope: String,
    /// Ordered rejections for sources that produced content.
    pub rejections: Vec<SourceRejection>,
}

/// Renders source rejections for the error message.
fn render_rejections(rejections: &[SourceRejection]) -> String {
    if rejections.is_empty() {
        return " (no token source configured)".to_string();
    }
    let rendered: Vec<String> = rejections
        .iter()
        .map(|rejection| format!("{}: {}", rejection.source, rejection.reason))
        .collect();
    format!(" (rejected {})", rendered.join("; "))
}

// ============================================================================
// SECTION: Top-Level Error
// ============================================================================

/// User-visible Pelican client failure.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PelicanError {
    /// Federation or namespace resolution failed.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    /// No candidate could serve the request.
    #[error(transparent)]
    NoAvailableSource(#[from] NoAvailableSource),
    /// The namespace requires a token and none was acceptable.
    #[error(transparent)]
    NoCredentials(#[from] NoCredentialsError),
    /// The logical path was rejected before resolution.
    #[error("invalid path: {0}")]
    InvalidPath(String),
    /// The path names a different federation than this client serves.
    #[error("federation mismatch: {0}")]
    FederationMismatch(String),
    /// The caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,
    /// The overall request deadline elapsed.
    #[error("request timed out")]
    TimedOut,
}
