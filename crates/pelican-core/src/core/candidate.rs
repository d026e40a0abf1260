// crates/pelican-core/src/core/candidate.rs
// ============================================================================
// Module: Pelican Candidate Model
// Description: Cache and origin endpoints returned by the director.
// Purpose: Represent the authoritative, priority-ordered endpoint list.
// Dependencies: serde, url
// ============================================================================

//! ## Overview
//! A [`CandidateList`] is produced fresh for each resolution. It is never
//! reordered in place; failover policies derive new sequences from it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use url::Url;

// ============================================================================
// SECTION: Candidate Types
// ============================================================================

/// Kind of serving endpoint.
///
/// # Invariants
/// - `Cache` sorts before `Origin`; origins are a last resort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
    /// Intermediate caching endpoint.
    Cache,
    /// Authoritative source-of-truth endpoint.
    Origin,
}

impl CandidateKind {
    /// Returns a stable label for logs and diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Origin => "origin",
        }
    }
}

impl fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One endpoint able to serve a namespace path.
///
/// # Invariants
/// - `url` is an endpoint base (scheme, host, port) with path `/` and no
///   query or fragment; the logical path is joined per request.
/// - Lower `priority` values are attempted first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheCandidate {
    /// Endpoint base URL.
    pub url: Url,
    /// Endpoint kind.
    pub kind: CandidateKind,
    /// Director-supplied priority hint.
    pub priority: u32,
}

impl CacheCandidate {
    /// Builds a candidate, reducing the URL to its endpoint base.
    #[must_use]
    pub fn new(url: &Url, kind: CandidateKind, priority: u32) -> Self {
        Self {
            url: endpoint_base(url),
            kind,
            priority,
        }
    }

    /// Returns the physical URL serving `path` on this endpoint.
    #[must_use]
    pub fn object_url(&self, path: &str) -> Url {
        let mut url = self.url.clone();
        url.set_path(path);
        url
    }
}

/// Reduces a URL to its endpoint base (no path, query, or fragment).
#[must_use]
pub fn endpoint_base(url: &Url) -> Url {
    let mut base = url.clone();
    base.set_path("/");
    base.set_query(None);
    base.set_fragment(None);
    base
}

// ============================================================================
// SECTION: Candidate List
// ============================================================================

/// Ordered candidate endpoints for one resolved path.
///
/// # Invariants
/// - Caches precede origins; within a kind, ascending priority with ties kept
///   in director order.
/// - No two candidates share the same endpoint URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateList {
    /// Ordered candidates.
    candidates: Vec<CacheCandidate>,
    /// Raw entries excluded because they failed to parse.
    rejected: Vec<String>,
}

impl CandidateList {
    /// Builds a list from director-supplied candidates.
    ///
    /// Duplicated endpoints keep their first occurrence.
    #[must_use]
    pub fn new(candidates: Vec<CacheCandidate>, rejected: Vec<String>) -> Self {
        let mut unique: Vec<CacheCandidate> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if !unique.iter().any(|existing| existing.url == candidate.url) {
                unique.push(candidate);
            }
        }
        unique.sort_by_key(|candidate| (candidate.kind, candidate.priority));
        Self {
            candidates: unique,
            rejected,
        }
    }

    /// Returns the ordered candidates.
    #[must_use]
    pub fn candidates(&self) -> &[CacheCandidate] {
        &self.candidates
    }

    /// Returns cache candidates in priority order.
    pub fn caches(&self) -> impl Iterator<Item = &CacheCandidate> {
        self.candidates.iter().filter(|candidate| candidate.kind == CandidateKind::Cache)
    }

    /// Returns origin candidates in priority order.
    pub fn origins(&self) -> impl Iterator<Item = &CacheCandidate> {
        self.candidates.iter().filter(|candidate| candidate.kind == CandidateKind::Origin)
    }

    /// Returns raw entries that were excluded as malformed.
    #[must_use]
    pub fn rejected(&self) -> &[String] {
        &self.rejected
    }

    /// Returns the number of usable candidates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Returns true when no usable candidate exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}
