// crates/pelican-fs/src/credentials.rs
// ============================================================================
// Module: Credential Store
// Description: Token discovery, validation, and per-namespace memoization.
// Purpose: Provide a validated bearer token before any protected request.
// Dependencies: pelican-config, pelican-core, tokio, tracing
// ============================================================================

//! ## Overview
//! [`CredentialStore::find_token`] walks the planned token sources in order,
//! parses each, and accepts the first token passing every validation
//! predicate. A rejected token is skipped; only exhausting all sources yields
//! [`NoCredentialsError`]. Accepted tokens are memoized in a
//! [`ValidatedTokenCache`] keyed by namespace prefix and scope, and are
//! re-checked against the concrete path on every hit.
//! Token contents are never logged.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod discovery;
pub mod parse;
pub mod validate;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use pelican_config::TokenConfig;
use pelican_core::Clock;
use pelican_core::NamespaceInfo;
use pelican_core::NoCredentialsError;
use pelican_core::SourceRejection;
use pelican_core::Token;
use pelican_core::TokenRejection;
use pelican_core::TokenSource;
use tracing::debug;
use tracing::info;

pub use self::discovery::DiscoveryInputs;
pub use self::discovery::PlannedSource;
pub use self::discovery::TokenEnvironment;
pub use self::parse::TokenContent;
pub use self::validate::ValidationRequest;
use self::discovery::condor_credential_files;
use self::discovery::file_exists;
use self::discovery::plan_sources;
use self::discovery::read_token_file;
use self::parse::extract_token;
use self::parse::parse_token;
use self::validate::validate_token;

// ============================================================================
// SECTION: Validated Token Cache
// ============================================================================

/// Cache key: namespace prefix and required scope.
type CacheKey = (String, String);

/// Memoized validated tokens.
///
/// # Invariants
/// - At most one token per (namespace prefix, scope).
/// - Entries are replaced whole; readers never see a partial token.
#[derive(Debug, Default)]
pub struct ValidatedTokenCache {
    /// Tokens keyed by namespace prefix and scope.
    entries: Mutex<HashMap<CacheKey, Token>>,
}

impl ValidatedTokenCache {
    /// Returns the cached token for the key, if any.
    #[must_use]
    pub fn get(&self, namespace: &str, scope: &str) -> Option<Token> {
        self.lock().get(&(namespace.to_string(), scope.to_string())).cloned()
    }

    /// Stores a token for the key, replacing any previous entry.
    pub fn insert(&self, namespace: &str, scope: &str, token: Token) {
        self.lock().insert((namespace.to_string(), scope.to_string()), token);
    }

    /// Removes the entry for the key.
    pub fn remove(&self, namespace: &str, scope: &str) {
        self.lock().remove(&(namespace.to_string(), scope.to_string()));
    }

    /// Returns the number of cached tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drops every cached token.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Acquires the cache lock, recovering from poisoning.
    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, Token>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// SECTION: Credential Store
// ============================================================================

/// Locates and validates bearer tokens.
pub struct CredentialStore {
    /// Explicit `Authorization` header value.
    header: Option<String>,
    /// Configured token file.
    token_location: Option<PathBuf>,
    /// HTCondor credential name.
    token_name: Option<String>,
    /// Configured default token file override.
    default_token_file: Option<PathBuf>,
    /// Environment consulted during discovery.
    environment: TokenEnvironment,
    /// Time source for expiry checks.
    clock: Arc<dyn Clock>,
    /// Memoized validated tokens.
    cache: ValidatedTokenCache,
}

impl CredentialStore {
    /// Builds a credential store from token configuration.
    #[must_use]
    pub fn new(
        tokens: &TokenConfig,
        header: Option<&str>,
        environment: TokenEnvironment,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            header: header.map(ToString::to_string),
            token_location: tokens.token_location.clone(),
            token_name: tokens.token_name.clone(),
            default_token_file: tokens.default_token_file.clone(),
            environment,
            clock,
            cache: ValidatedTokenCache::default(),
        }
    }

    /// Returns the validated-token cache.
    #[must_use]
    pub const fn cache(&self) -> &ValidatedTokenCache {
        &self.cache
    }

    /// Drops every memoized token.
    pub fn reset(&self) {
        self.cache.clear();
    }

    /// Returns a token authorizing `required_scope` on `path`.
    ///
    /// A memoized token is reused when it still passes validation for this
    /// path; otherwise discovery runs again and the first acceptable token
    /// replaces the entry. Discovery happens outside the cache lock, so two
    /// concurrent misses may both search.
    ///
    /// # Errors
    ///
    /// Returns [`NoCredentialsError`] when no source yields an acceptable token.
    pub async fn find_token(
        &self,
        path: &str,
        namespace: &NamespaceInfo,
        required_scope: &str,
    ) -> Result<Token, NoCredentialsError> {
        let request = ValidationRequest {
            path,
            required_scope,
            allowed_issuers: &namespace.allowed_issuers,
            now: self.clock.now(),
        };
        if let Some(token) = self.cache.get(&namespace.path_prefix, required_scope) {
            match validate_token(&token, &request) {
                Ok(()) => return Ok(token),
                Err(reason) => {
                    debug!(
                        namespace = %namespace.path_prefix,
                        source = %token.source(),
                        reason = %reason,
                        "cached token no longer acceptable"
                    );
                    if reason == TokenRejection::Expired {
                        self.cache.remove(&namespace.path_prefix, required_scope);
                    }
                }
            }
        }
        let token = self.discover(&request).await.map_err(|rejections| NoCredentialsError {
            namespace: namespace.path_prefix.clone(),
            path: path.to_string(),
            scope: required_scope.to_string(),
            rejections,
        })?;
        info!(
            namespace = %namespace.path_prefix,
            scope = required_scope,
            source = %token.source(),
            issuer = %token.issuer(),
            "accepted bearer token"
        );
        self.cache.insert(&namespace.path_prefix, required_scope, token.clone());
        Ok(token)
    }

    /// Walks every source in order, returning the first acceptable token.
    async fn discover(
        &self,
        request: &ValidationRequest<'_>,
    ) -> Result<Token, Vec<SourceRejection>> {
        let inputs = DiscoveryInputs {
            header: self.header.as_deref(),
            token_location: self.token_location.as_deref(),
            default_token_file: self.default_token_file.as_deref(),
        };
        let mut rejections = Vec::new();
        for planned in plan_sources(inputs, &self.environment) {
            match planned {
                PlannedSource::Literal {
                    source,
                    content,
                } => {
                    if let Some(token) =
                        self.consider(source, Ok(content), request, &mut rejections)
                    {
                        return Ok(token);
                    }
                }
                PlannedSource::File {
                    source,
                    path,
                } => {
                    let content = read_token_file(&path).await;
                    if let Some(token) = self.consider(source, content, request, &mut rejections) {
                        return Ok(token);
                    }
                }
                PlannedSource::OptionalFile {
                    source,
                    path,
                } => {
                    if !file_exists(&path).await {
                        continue;
                    }
                    let content = read_token_file(&path).await;
                    if let Some(token) = self.consider(source, content, request, &mut rejections) {
                        return Ok(token);
                    }
                }
                PlannedSource::CondorDirectory {
                    dir,
                } => {
                    for path in condor_credential_files(&dir, self.token_name.as_deref()).await {
                        let content = read_token_file(&path).await;
                        let source = TokenSource::HtcondorCreds {
                            path,
                        };
                        if let Some(token) =
                            self.consider(source, content, request, &mut rejections)
                        {
                            return Ok(token);
                        }
                    }
                }
            }
        }
        Err(rejections)
    }

    /// Parses and validates content from one source, recording any rejection.
    fn consider(
        &self,
        source: TokenSource,
        content: Result<String, TokenRejection>,
        request: &ValidationRequest<'_>,
        rejections: &mut Vec<SourceRejection>,
    ) -> Option<Token> {
        let outcome = content.and_then(|content| {
            let content = extract_token(&content)
                .ok_or_else(|| TokenRejection::Malformed("empty token content".to_string()))?;
            let token = parse_token(content, source.clone(), self.clock.now())?;
            validate_token(&token, request)?;
            Ok(token)
        });
        match outcome {
            Ok(token) => Some(token),
            Err(reason) => {
                debug!(source = %source, reason = %reason, "token source rejected");
                rejections.push(SourceRejection {
                    source,
                    reason,
                });
                None
            }
        }
    }
}
