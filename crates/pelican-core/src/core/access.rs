// crates/pelican-core/src/core/access.rs
// ============================================================================
// Module: Pelican Access Records
// Description: Immutable record of one endpoint attempt.
// Purpose: Feed the bounded per-path access history.
// Dependencies: time, url
// ============================================================================

//! ## Overview
//! Every candidate attempt made by the failover engine produces exactly one
//! [`AccessRecord`], keyed by the logical path rather than the endpoint.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use url::Url;

// ============================================================================
// SECTION: Access Record
// ============================================================================

/// Outcome of one endpoint attempt for a logical path.
///
/// # Invariants
/// - Immutable once created.
/// - `error_kind` is `None` exactly when `success` is true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRecord {
    /// Logical namespace path the attempt served.
    pub namespace_path: String,
    /// Endpoint that was attempted.
    pub endpoint_url: Url,
    /// Whether the attempt succeeded.
    pub success: bool,
    /// Stable failure label for unsuccessful attempts.
    pub error_kind: Option<String>,
    /// When the attempt completed.
    pub timestamp: OffsetDateTime,
}

impl AccessRecord {
    /// Builds a successful record.
    #[must_use]
    pub fn succeeded(
        namespace_path: impl Into<String>,
        endpoint_url: Url,
        timestamp: OffsetDateTime,
    ) -> Self {
        Self {
            namespace_path: namespace_path.into(),
            endpoint_url,
            success: true,
            error_kind: None,
            timestamp,
        }
    }

    /// Builds a failed record.
    #[must_use]
    pub fn failed(
        namespace_path: impl Into<String>,
        endpoint_url: Url,
        error_kind: impl Into<String>,
        timestamp: OffsetDateTime,
    ) -> Self {
        Self {
            namespace_path: namespace_path.into(),
            endpoint_url,
            success: false,
            error_kind: Some(error_kind.into()),
            timestamp,
        }
    }
}

impl fmt::Display for AccessRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let when = self.timestamp.format(&Rfc3339).unwrap_or_else(|_| "-".to_string());
        match &self.error_kind {
            Some(kind) if !self.success => {
                write!(f, "{when} {} failed ({kind})", self.endpoint_url)
            }
            _ => write!(f, "{when} {} ok", self.endpoint_url),
        }
    }
}
