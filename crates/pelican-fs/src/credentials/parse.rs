// crates/pelican-fs/src/credentials/parse.rs
// ============================================================================
// Module: Token Parsing
// Description: Token file decoding and JWT claim extraction.
// Purpose: Turn discovered token content into an immutable Token.
// Dependencies: base64, pelican-core, serde_json, time, url
// ============================================================================

//! ## Overview
//! Token content is either a JSON document carrying `access_token` (and
//! optionally `expires_in`) or the raw serialized token. Claims are read from
//! the JWT payload without verifying the signature; the serving endpoint is
//! responsible for that.

// ============================================================================
// SECTION: Imports
// ============================================================================

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use pelican_core::ScopeGrant;
use pelican_core::Token;
use pelican_core::TokenRejection;
use pelican_core::TokenSource;
use serde::Deserialize;
use time::Duration;
use time::OffsetDateTime;
use url::Url;

// ============================================================================
// SECTION: Token Content
// ============================================================================

/// Token string plus any lifetime declared alongside it.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenContent {
    /// Serialized token.
    pub token: String,
    /// Lifetime in seconds declared by a JSON wrapper.
    pub expires_in: Option<i64>,
}

/// JSON token document.
#[derive(Deserialize)]
struct TokenDocument {
    /// Serialized token.
    access_token: Option<String>,
    /// Lifetime in seconds.
    expires_in: Option<i64>,
}

/// Extracts the token string from discovered content.
///
/// Content whose trimmed form starts with `{` is tried as a JSON document;
/// a missing `access_token` or invalid JSON falls back to the raw text.
/// Returns `None` when nothing remains after trimming.
#[must_use]
pub fn extract_token(content: &str) -> Option<TokenContent> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with('{')
        && let Ok(document) = serde_json::from_str::<TokenDocument>(trimmed)
        && let Some(token) = document.access_token.map(|token| token.trim().to_string())
        && !token.is_empty()
    {
        return Some(TokenContent {
            token,
            expires_in: document.expires_in,
        });
    }
    Some(TokenContent {
        token: trimmed.to_string(),
        expires_in: None,
    })
}

// ============================================================================
// SECTION: JWT Claims
// ============================================================================

/// Audience claim, either a single value or a list.
#[derive(Deserialize)]
#[serde(untagged)]
enum AudienceClaim {
    /// Single audience.
    One(String),
    /// Several audiences.
    Many(Vec<String>),
}

/// Claims read from the JWT payload.
#[derive(Deserialize)]
struct Claims {
    /// Issuer.
    iss: Option<String>,
    /// Expiry as seconds since the epoch.
    exp: Option<i64>,
    /// Audience.
    aud: Option<AudienceClaim>,
    /// Space-separated scope grants.
    scope: Option<String>,
}

/// Parses token content into a [`Token`].
///
/// # Errors
///
/// Returns [`TokenRejection::Malformed`] when the token is not a JWT, lacks
/// an issuer, or has no determinable expiry.
pub fn parse_token(
    content: TokenContent,
    source: TokenSource,
    now: OffsetDateTime,
) -> Result<Token, TokenRejection> {
    let claims = decode_claims(&content.token)?;
    let issuer = claims
        .iss
        .as_deref()
        .ok_or_else(|| TokenRejection::Malformed("missing iss claim".to_string()))?;
    let issuer = Url::parse(issuer)
        .map_err(|err| TokenRejection::Malformed(format!("invalid iss claim: {err}")))?;
    let claimed_expiry = claims
        .exp
        .map(|exp| {
            OffsetDateTime::from_unix_timestamp(exp)
                .map_err(|err| TokenRejection::Malformed(format!("invalid exp claim: {err}")))
        })
        .transpose()?;
    let declared_expiry = content
        .expires_in
        .map(|seconds| {
            now.checked_add(Duration::seconds(seconds))
                .ok_or_else(|| TokenRejection::Malformed("expires_in out of range".to_string()))
        })
        .transpose()?;
    let expires_at = match (claimed_expiry, declared_expiry) {
        (Some(claimed), Some(declared)) => claimed.min(declared),
        (Some(expiry), None) | (None, Some(expiry)) => expiry,
        (None, None) => return Err(TokenRejection::Malformed("missing expiry".to_string())),
    };
    let audience = claims.aud.and_then(|aud| match aud {
        AudienceClaim::One(value) => Url::parse(&value).ok(),
        AudienceClaim::Many(values) => values.iter().find_map(|value| Url::parse(value).ok()),
    });
    let scopes: Vec<ScopeGrant> = claims
        .scope
        .as_deref()
        .unwrap_or_default()
        .split_whitespace()
        .filter_map(ScopeGrant::parse)
        .collect();
    Ok(Token::new(content.token, expires_at, issuer, audience, scopes, source))
}

/// Decodes the JWT payload segment into claims.
fn decode_claims(raw: &str) -> Result<Claims, TokenRejection> {
    let mut segments = raw.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (segments.next(), segments.next(), segments.next(), segments.next())
    else {
        return Err(TokenRejection::Malformed("not a serialized jwt".to_string()));
    };
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|err| TokenRejection::Malformed(format!("invalid jwt payload encoding: {err}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|err| TokenRejection::Malformed(format!("invalid jwt claims: {err}")))
}
