// crates/pelican-core/src/core/namespace.rs
// ============================================================================
// Module: Pelican Namespace Model
// Description: Federation metadata, namespace policy, and path helpers.
// Purpose: Describe what a director says about a namespace prefix.
// Dependencies: serde, url
// ============================================================================

//! ## Overview
//! A federation is discovered once into [`FederationMetadata`]. Each resolved
//! namespace prefix carries a [`NamespaceInfo`] policy describing whether a
//! bearer token is required and which issuers may mint it. Prefix matching is
//! component aware: `/a/b` covers `/a/b/c` but not `/a/bc`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use url::Url;

// ============================================================================
// SECTION: Federation Metadata
// ============================================================================

/// Federation-wide endpoints resolved from the discovery document.
///
/// # Invariants
/// - `director_url` always ends with `/` so object paths can be joined onto it.
/// - Immutable once fetched; refetched only after explicit invalidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederationMetadata {
    /// Director endpoint used for namespace resolution.
    pub director_url: Url,
    /// Namespace registry endpoint, when advertised.
    pub namespace_registration_url: Option<Url>,
    /// Token issuers advertised at the federation level.
    pub token_issuer_urls: BTreeSet<Url>,
}

// ============================================================================
// SECTION: Namespace Policy
// ============================================================================

/// Where a namespace policy decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicySource {
    /// The director described the namespace in this response.
    Director,
    /// A previously seen registration covering the path was reused.
    Registry,
    /// No registration was known; the configured default applied.
    Default,
}

/// Authorization policy for one namespace prefix.
///
/// # Invariants
/// - `path_prefix` is normalized (leading `/`, no trailing `/` except root).
/// - A longer matching prefix always overrides a shorter ancestor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceInfo {
    /// Namespace prefix this policy governs.
    pub path_prefix: String,
    /// Whether operations require a bearer token.
    pub requires_token: bool,
    /// Issuers whose tokens are accepted for this namespace.
    pub allowed_issuers: BTreeSet<Url>,
    /// Maximum path depth a token scope may be restricted to.
    pub max_validity_depth: u32,
    /// Origin of this policy decision.
    pub source: PolicySource,
}

impl NamespaceInfo {
    /// Builds a policy for a prefix the director has never described.
    #[must_use]
    pub fn unregistered(path_prefix: impl Into<String>, requires_token: bool) -> Self {
        Self {
            path_prefix: path_prefix.into(),
            requires_token,
            allowed_issuers: BTreeSet::new(),
            max_validity_depth: 0,
            source: PolicySource::Default,
        }
    }

    /// Returns true when this namespace covers the provided logical path.
    #[must_use]
    pub fn covers(&self, path: &str) -> bool {
        path_has_prefix(path, &self.path_prefix)
    }
}

// ============================================================================
// SECTION: Path Helpers
// ============================================================================

/// Returns true when `prefix` is a component-wise prefix of (or equal to) `path`.
#[must_use]
pub fn path_has_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return path.starts_with('/');
    }
    path.strip_prefix(prefix).is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Normalizes a logical namespace path.
///
/// Adds a leading `/`, collapses repeated separators, and rejects `.` / `..`
/// segments. A trailing `/` is preserved because it marks a collection.
/// Returns `None` when the path is empty or contains traversal segments.
#[must_use]
pub fn normalize_path(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let trailing = trimmed.len() > 1 && trimmed.ends_with('/');
    let mut normalized = String::with_capacity(trimmed.len() + 1);
    for segment in trimmed.split('/').filter(|segment| !segment.is_empty()) {
        if segment == "." || segment == ".." {
            return None;
        }
        normalized.push('/');
        normalized.push_str(segment);
    }
    if normalized.is_empty() {
        return Some("/".to_string());
    }
    if trailing {
        normalized.push('/');
    }
    Some(normalized)
}
