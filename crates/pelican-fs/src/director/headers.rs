// crates/pelican-fs/src/director/headers.rs
// ============================================================================
// Module: Director Header Parsing
// Description: Parsers for the director's Link and X-Pelican-* headers.
// Purpose: Turn raw director response headers into typed values.
// Dependencies: url
// ============================================================================

//! ## Overview
//! The director answers object queries with endpoint candidates in a `Link`
//! header and namespace policy in `X-Pelican-*` headers:
//!
//! ```text
//! Link: <https://cache-a:8443/ns/obj>; rel="duplicate"; pri=1; depth=2,
//!       <https://cache-b/ns/obj>; pri=2
//! X-Pelican-Namespace: namespace=/ns, require-token=true
//! X-Pelican-Token-Generation: issuer=https://issuer.example, max-scope-depth=3
//! X-Pelican-Authorization: issuer=https://a.example, issuer=https://b.example
//! ```
//!
//! Malformed entries are reported back rather than dropped silently.

// ============================================================================
// SECTION: Imports
// ============================================================================

use url::Url;

// ============================================================================
// SECTION: Header Names
// ============================================================================

/// Namespace policy header.
pub const NAMESPACE_HEADER: &str = "x-pelican-namespace";
/// Token issuance header.
pub const TOKEN_GENERATION_HEADER: &str = "x-pelican-token-generation";
/// Accepted issuers header.
pub const AUTHORIZATION_HEADER: &str = "x-pelican-authorization";

// ============================================================================
// SECTION: Link Header
// ============================================================================

/// One endpoint entry from a `Link` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEntry {
    /// Endpoint URL as advertised.
    pub url: Url,
    /// Priority, lower first.
    pub priority: u32,
    /// Namespace depth hint, when advertised.
    pub depth: Option<u32>,
}

/// Parsed `Link` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkHeader {
    /// Entries that parsed, in header order.
    pub entries: Vec<LinkEntry>,
    /// Raw entries that did not parse.
    pub rejected: Vec<String>,
}

/// Parses a `Link` header value.
///
/// Entries lacking `pri` take their 1-based position as priority. Only
/// `http` and `https` targets are accepted.
#[must_use]
pub fn parse_link_header(value: &str) -> LinkHeader {
    let mut header = LinkHeader::default();
    for (index, raw) in split_link_entries(value).into_iter().enumerate() {
        let fallback = u32::try_from(index + 1).unwrap_or(u32::MAX);
        match parse_link_entry(raw, fallback) {
            Some(entry) => header.entries.push(entry),
            None => header.rejected.push(raw.to_string()),
        }
    }
    header
}

/// Splits a `Link` value on commas outside `<...>` targets.
fn split_link_entries(value: &str) -> Vec<&str> {
    let mut entries = Vec::new();
    let mut depth = 0_usize;
    let mut start = 0;
    for (index, ch) in value.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                entries.push(&value[start .. index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    entries.push(&value[start ..]);
    entries.into_iter().map(str::trim).filter(|entry| !entry.is_empty()).collect()
}

/// Parses one `<url>; key=value; ...` entry.
fn parse_link_entry(raw: &str, fallback_priority: u32) -> Option<LinkEntry> {
    let rest = raw.strip_prefix('<')?;
    let (target, params) = rest.split_once('>')?;
    let url = Url::parse(target.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }
    let mut priority = fallback_priority;
    let mut depth = None;
    for param in params.split(';') {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"');
        match key.trim().to_ascii_lowercase().as_str() {
            "pri" => priority = value.parse().ok()?,
            "depth" => depth = Some(value.parse().ok()?),
            _ => {}
        }
    }
    Some(LinkEntry {
        url,
        priority,
        depth,
    })
}

// ============================================================================
// SECTION: Key-Value Headers
// ============================================================================

/// Splits a `key=value, key=value` header into trimmed pairs.
fn key_values(value: &str) -> impl Iterator<Item = (String, &str)> {
    value.split(',').filter_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        Some((key.trim().to_ascii_lowercase(), value.trim().trim_matches('"')))
    })
}

/// Parsed `X-Pelican-Namespace` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceHeader {
    /// Namespace prefix.
    pub prefix: String,
    /// Explicit token requirement, when advertised.
    pub require_token: Option<bool>,
}

/// Parses an `X-Pelican-Namespace` header. Returns `None` without a prefix.
#[must_use]
pub fn parse_namespace_header(value: &str) -> Option<NamespaceHeader> {
    let mut prefix = None;
    let mut require_token = None;
    for (key, value) in key_values(value) {
        match key.as_str() {
            "namespace" if !value.is_empty() => prefix = Some(value.to_string()),
            "require-token" => require_token = value.parse::<bool>().ok(),
            _ => {}
        }
    }
    Some(NamespaceHeader {
        prefix: prefix?,
        require_token,
    })
}

/// Parsed issuer information from `X-Pelican-Token-Generation` or
/// `X-Pelican-Authorization`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssuerHeader {
    /// Issuers in header order.
    pub issuers: Vec<Url>,
    /// Maximum scope depth, when advertised.
    pub max_scope_depth: Option<u32>,
}

/// Parses an issuer header, merging into `into`. Unparseable issuers are skipped.
pub fn parse_issuer_header(value: &str, into: &mut IssuerHeader) {
    for (key, value) in key_values(value) {
        match key.as_str() {
            "issuer" => {
                if let Ok(url) = Url::parse(value)
                    && !into.issuers.contains(&url)
                {
                    into.issuers.push(url);
                }
            }
            "max-scope-depth" => {
                if let Ok(depth) = value.parse() {
                    into.max_scope_depth = Some(depth);
                }
            }
            _ => {}
        }
    }
}
