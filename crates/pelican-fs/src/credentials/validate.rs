// crates/pelican-fs/src/credentials/validate.rs
// ============================================================================
// Module: Token Validation
// Description: Expiry, issuer, scope, and path predicates for tokens.
// Purpose: Decide whether a parsed token authorizes one operation.
// Dependencies: pelican-core, time, url
// ============================================================================

//! ## Overview
//! A token is acceptable only when all four predicates pass, checked in this
//! order: not expired, issuer allowed, scope present, path authorized. The
//! first failing predicate is reported.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use pelican_core::Token;
use pelican_core::TokenRejection;
use time::OffsetDateTime;
use url::Url;

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Inputs describing the operation a token must authorize.
#[derive(Debug, Clone, Copy)]
pub struct ValidationRequest<'a> {
    /// Requested logical path.
    pub path: &'a str,
    /// Scope the operation requires.
    pub required_scope: &'a str,
    /// Issuers accepted by the governing namespace.
    pub allowed_issuers: &'a BTreeSet<Url>,
    /// Evaluation instant.
    pub now: OffsetDateTime,
}

/// Checks every predicate against `token`.
///
/// # Errors
///
/// Returns the [`TokenRejection`] for the first predicate that fails.
pub fn validate_token(
    token: &Token,
    request: &ValidationRequest<'_>,
) -> Result<(), TokenRejection> {
    if token.is_expired(request.now) {
        return Err(TokenRejection::Expired);
    }
    if !request.allowed_issuers.contains(token.issuer()) {
        return Err(TokenRejection::IssuerNotAllowed(token.issuer().to_string()));
    }
    let mut grants =
        token.scopes().iter().filter(|grant| grant.permission == request.required_scope).peekable();
    if grants.peek().is_none() {
        return Err(TokenRejection::InsufficientScope(request.required_scope.to_string()));
    }
    if !grants.any(|grant| grant.authorizes(request.required_scope, request.path)) {
        return Err(TokenRejection::PathNotAuthorized(request.path.to_string()));
    }
    Ok(())
}
