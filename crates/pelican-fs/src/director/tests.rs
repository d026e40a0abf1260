// crates/pelican-fs/src/director/tests.rs
// ============================================================================
// Module: Directory Client Unit Tests
// Description: Unit tests for director header parsing and policy lookup.
// Purpose: Validate candidate extraction and longest-prefix policy rules.
// Dependencies: pelican-fs
// ============================================================================

//! ## Overview
//! Exercises header parsers and the namespace registry without a network.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use pelican_core::CandidateKind;
use pelican_core::NamespaceInfo;
use pelican_core::PolicySource;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use reqwest::header::LINK;
use reqwest::header::LOCATION;
use url::Url;

use super::collect_caches;
use super::director_url_for;
use super::headers::IssuerHeader;
use super::headers::parse_issuer_header;
use super::headers::parse_link_header;
use super::headers::parse_namespace_header;
use super::registry::NamespaceRegistry;

// ============================================================================
// SECTION: Link Header
// ============================================================================

#[test]
fn link_header_yields_entries_with_priority_and_depth() {
    let header = parse_link_header(
        concat!(
            r#"<https://cache-a.example:8443/ns/obj>; rel="duplicate"; pri=2; depth=2, "#,
            r#"<https://cache-b.example/ns/obj>; rel="duplicate"; pri=1; depth=2"#,
        ),
    );
    assert!(header.rejected.is_empty());
    assert_eq!(header.entries.len(), 2);
    assert_eq!(header.entries[0].url.as_str(), "https://cache-a.example:8443/ns/obj");
    assert_eq!(header.entries[0].priority, 2);
    assert_eq!(header.entries[0].depth, Some(2));
    assert_eq!(header.entries[1].priority, 1);
}

#[test]
fn link_entries_without_priority_use_position() {
    let header = parse_link_header("<https://a.example/x>, <https://b.example/x>");
    let priorities: Vec<u32> = header.entries.iter().map(|entry| entry.priority).collect();
    assert_eq!(priorities, vec![1, 2]);
}

#[test]
fn malformed_link_entries_are_reported_not_dropped() {
    let header = parse_link_header(
        concat!(
            "<https://good.example/x>; pri=1, <not a url>; pri=2, ",
            "<ftp://files.example/x>; pri=3, <https://bad-pri.example/x>; pri=abc",
        ),
    );
    assert_eq!(header.entries.len(), 1);
    assert_eq!(header.rejected.len(), 3);
    assert!(header.rejected[0].contains("not a url"));
}

#[test]
fn commas_inside_targets_do_not_split_entries() {
    let header = parse_link_header("<https://a.example/x?q=1,2>; pri=1");
    assert_eq!(header.entries.len(), 1);
    assert!(header.rejected.is_empty());
}

// ============================================================================
// SECTION: Policy Headers
// ============================================================================

#[test]
fn namespace_header_reads_prefix_and_token_flag() {
    let header = parse_namespace_header("namespace=/ns/private, require-token=true").unwrap();
    assert_eq!(header.prefix, "/ns/private");
    assert_eq!(header.require_token, Some(true));
    let public = parse_namespace_header("namespace=/pub, require-token=false").unwrap();
    assert_eq!(public.require_token, Some(false));
    let silent = parse_namespace_header("namespace=/quiet").unwrap();
    assert_eq!(silent.require_token, None);
    assert!(parse_namespace_header("require-token=true").is_none());
}

#[test]
fn issuer_headers_merge_without_duplicates() {
    let mut issuers = IssuerHeader::default();
    parse_issuer_header(
        "issuer=https://a.example, max-scope-depth=3, strategy=OAuth2",
        &mut issuers,
    );
    parse_issuer_header(
        "issuer=https://a.example, issuer=https://b.example, issuer=nope",
        &mut issuers,
    );
    let urls: Vec<&str> = issuers.issuers.iter().map(Url::as_str).collect();
    assert_eq!(urls, vec!["https://a.example/", "https://b.example/"]);
    assert_eq!(issuers.max_scope_depth, Some(3));
}

// ============================================================================
// SECTION: Candidate Extraction
// ============================================================================

#[test]
fn location_is_used_only_without_link() {
    let mut headers = HeaderMap::new();
    headers.insert(LOCATION, HeaderValue::from_static("https://redirect.example:8443/ns/obj"));
    let mut candidates = Vec::new();
    let mut rejected = Vec::new();
    collect_caches(&headers, &mut candidates, &mut rejected);
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].url.as_str(), "https://redirect.example:8443/");
    assert_eq!(candidates[0].kind, CandidateKind::Cache);

    headers.insert(LINK, HeaderValue::from_static("<https://linked.example/ns/obj>; pri=1"));
    let mut candidates = Vec::new();
    collect_caches(&headers, &mut candidates, &mut rejected);
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].url.as_str(), "https://linked.example/");
}

#[test]
fn director_url_join_keeps_director_path() {
    let director = Url::parse("https://director.example/api/").unwrap();
    assert_eq!(
        director_url_for(&director, "/ns/a b/obj").as_str(),
        "https://director.example/api/ns/a%20b/obj"
    );
    let root = Url::parse("https://director.example/").unwrap();
    assert_eq!(director_url_for(&root, "/ns/obj").as_str(), "https://director.example/ns/obj");
}

// ============================================================================
// SECTION: Registry
// ============================================================================

fn policy(prefix: &str, requires_token: bool) -> NamespaceInfo {
    NamespaceInfo {
        requires_token,
        source: PolicySource::Director,
        ..NamespaceInfo::unregistered(prefix, requires_token)
    }
}

#[test]
fn registry_prefers_longest_matching_prefix() {
    let registry = NamespaceRegistry::default();
    registry.register(policy("/data", false));
    registry.register(policy("/data/secure", true));
    let info = registry.lookup("/data/secure/file").unwrap();
    assert_eq!(info.path_prefix, "/data/secure");
    assert!(info.requires_token);
    assert_eq!(info.source, PolicySource::Registry);
    let public = registry.lookup("/data/open/file").unwrap();
    assert_eq!(public.path_prefix, "/data");
    assert!(!public.requires_token);
}

#[test]
fn registry_matches_whole_components_only() {
    let registry = NamespaceRegistry::default();
    registry.register(policy("/data", false));
    assert!(registry.lookup("/database/file").is_none());
    assert_eq!(registry.len(), 1);
    registry.clear();
    assert!(registry.is_empty());
    assert!(registry.lookup("/data/file").is_none());
}
