// crates/pelican-core/src/core/token.rs
// ============================================================================
// Module: Pelican Token Model
// Description: Bearer tokens, their sources, and scope requirements.
// Purpose: Represent parsed credentials independently of how they were found.
// Dependencies: serde, time, url
// ============================================================================

//! ## Overview
//! A [`Token`] is created once by parsing discovered content and is never
//! mutated afterwards; refreshing a credential produces a new instance. The
//! raw credential is redacted from `Debug` output.
//! Scope claims follow the `permission[:resource]` grammar; the resource part
//! of a [`ScopeGrant`] is the path the grant is restricted to.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use url::Url;

use crate::core::namespace::path_has_prefix;

// ============================================================================
// SECTION: Token Sources
// ============================================================================

/// Where a token was discovered.
///
/// # Invariants
/// - Variants differ only in how the token is located; validation is uniform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TokenSource {
    /// Caller-supplied `Authorization` header value.
    Header,
    /// Explicitly configured token file.
    ConfiguredFile {
        /// Configured file path.
        path: PathBuf,
    },
    /// Environment variable holding a literal token.
    EnvVar {
        /// Variable name.
        variable: String,
    },
    /// Environment variable naming a token file.
    EnvFile {
        /// Variable name.
        variable: String,
        /// File path read from the variable.
        path: PathBuf,
    },
    /// Well-known default bearer token file.
    DefaultFile {
        /// Resolved default file path.
        path: PathBuf,
    },
    /// HTCondor credential directory entry.
    HtcondorCreds {
        /// Credential file path.
        path: PathBuf,
    },
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header => f.write_str("header"),
            Self::ConfiguredFile {
                path,
            } => write!(f, "configured file {}", path.display()),
            Self::EnvVar {
                variable,
            } => write!(f, "env {variable}"),
            Self::EnvFile {
                variable,
                path,
            } => write!(f, "env {variable} file {}", path.display()),
            Self::DefaultFile {
                path,
            } => write!(f, "default file {}", path.display()),
            Self::HtcondorCreds {
                path,
            } => write!(f, "htcondor creds {}", path.display()),
        }
    }
}

// ============================================================================
// SECTION: Scopes
// ============================================================================

/// Operation class used to select the required scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationClass {
    /// Read-only access (metadata and content).
    Read,
    /// Object creation.
    Write,
}

/// Scope strings required per operation class.
///
/// # Invariants
/// - Scope strings are non-empty and contain no whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeRequirements {
    /// Scope required for read-class operations.
    pub read: String,
    /// Scope required for write-class operations.
    pub write: String,
}

impl ScopeRequirements {
    /// Returns the scope required for the operation class.
    #[must_use]
    pub fn scope_for(&self, class: OperationClass) -> &str {
        match class {
            OperationClass::Read => &self.read,
            OperationClass::Write => &self.write,
        }
    }
}

impl Default for ScopeRequirements {
    fn default() -> Self {
        Self {
            read: "storage.read".to_string(),
            write: "storage.create".to_string(),
        }
    }
}

/// A single `permission[:resource]` grant from a token's scope claim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeGrant {
    /// Permission name, for example `storage.read`.
    pub permission: String,
    /// Path the grant is restricted to, when present.
    pub subject_path: Option<String>,
}

impl ScopeGrant {
    /// Parses one scope entry. Returns `None` for empty entries.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let (permission, resource) = match raw.split_once(':') {
            Some((permission, resource)) => (permission, Some(resource)),
            None => (raw, None),
        };
        if permission.is_empty() {
            return None;
        }
        let subject_path = resource.filter(|resource| !resource.is_empty()).map(|resource| {
            if resource.starts_with('/') { resource.to_string() } else { format!("/{resource}") }
        });
        Some(Self {
            permission: permission.to_string(),
            subject_path,
        })
    }

    /// Returns true when this grant authorizes `permission` on `path`.
    #[must_use]
    pub fn authorizes(&self, permission: &str, path: &str) -> bool {
        self.permission == permission
            && self.subject_path.as_deref().is_none_or(|subject| path_has_prefix(path, subject))
    }
}

// ============================================================================
// SECTION: Token
// ============================================================================

/// Parsed bearer token.
///
/// # Invariants
/// - Never mutated after parse.
/// - `expires_at` is the earliest of the embedded `exp` claim and any
///   `expires_in` declared alongside the token.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    /// Serialized credential.
    raw: String,
    /// Expiry instant.
    expires_at: OffsetDateTime,
    /// Issuer claim.
    issuer: Url,
    /// Audience claim, when it is a URL.
    audience: Option<Url>,
    /// Scope grants.
    scopes: Vec<ScopeGrant>,
    /// Where the token was found.
    source: TokenSource,
}

impl Token {
    /// Builds a token from parsed parts.
    #[must_use]
    pub const fn new(
        raw: String,
        expires_at: OffsetDateTime,
        issuer: Url,
        audience: Option<Url>,
        scopes: Vec<ScopeGrant>,
        source: TokenSource,
    ) -> Self {
        Self {
            raw,
            expires_at,
            issuer,
            audience,
            scopes,
            source,
        }
    }

    /// Returns the serialized credential.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Returns the `Authorization` header value for this token.
    #[must_use]
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.raw)
    }

    /// Returns the expiry instant.
    #[must_use]
    pub const fn expires_at(&self) -> OffsetDateTime {
        self.expires_at
    }

    /// Returns the issuer.
    #[must_use]
    pub const fn issuer(&self) -> &Url {
        &self.issuer
    }

    /// Returns the audience, when present.
    #[must_use]
    pub const fn audience(&self) -> Option<&Url> {
        self.audience.as_ref()
    }

    /// Returns the scope grants.
    #[must_use]
    pub fn scopes(&self) -> &[ScopeGrant] {
        &self.scopes
    }

    /// Returns the distinct permission names carried by the token.
    #[must_use]
    pub fn scope_names(&self) -> BTreeSet<&str> {
        self.scopes.iter().map(|grant| grant.permission.as_str()).collect()
    }

    /// Returns the discovery source.
    #[must_use]
    pub const fn source(&self) -> &TokenSource {
        &self.source
    }

    /// Returns true when the token has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("raw", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("issuer", &self.issuer.as_str())
            .field("audience", &self.audience.as_ref().map(Url::as_str))
            .field("scopes", &self.scopes)
            .field("source", &self.source)
            .finish()
    }
}
