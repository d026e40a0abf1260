// crates/pelican-fs/src/failover.rs
// ============================================================================
// Module: Cache Failover Engine
// Description: Candidate ordering and sequential endpoint attempts.
// Purpose: Serve one logical-path operation from the first working endpoint.
// Dependencies: pelican-config, pelican-core, tokio, tokio-util, tracing
// ============================================================================

//! ## Overview
//! [`CacheFailoverEngine::access`] resolves a path, applies the configured
//! ordering policy ([`order_candidates`]), obtains a token when the namespace
//! requires one, and attempts each candidate strictly in order until one
//! succeeds. Every attempt appends exactly one [`AccessRecord`] keyed by the
//! logical path.
//!
//! Write-class operations are only ever attempted against origins.
//!
//! A per-candidate timeout counts as that candidate's failure and advances to
//! the next one. Cancelling the request aborts the attempt in flight and
//! returns [`PelicanError::Cancelled`] without trying later candidates; an
//! elapsed request deadline does the same and returns
//! [`PelicanError::TimedOut`].
//! Security posture: an unauthenticated attempt against a protected namespace
//! is never made.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use pelican_config::ConfigError;
use pelican_config::PelicanConfig;
use pelican_config::PreferredCaches;
use pelican_core::AccessRecord;
use pelican_core::CacheCandidate;
use pelican_core::CandidateFailure;
use pelican_core::CandidateKind;
use pelican_core::CandidateList;
use pelican_core::Clock;
use pelican_core::NamespaceResolver;
use pelican_core::NoAvailableSource;
use pelican_core::Operation;
use pelican_core::OperationClass;
use pelican_core::PelicanError;
use pelican_core::ScopeRequirements;
use pelican_core::Transport;
use pelican_core::TransportRequest;
use pelican_core::TransportResponse;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::credentials::CredentialStore;
use crate::stats::AccessStatistics;

// ============================================================================
// SECTION: Ordering Policy
// ============================================================================

/// Error kind recorded for an attempt cut short by the attempt timeout.
pub const TIMEOUT_ERROR_KIND: &str = "timeout";
/// Error kind recorded for an attempt aborted by cancellation.
pub const CANCELLED_ERROR_KIND: &str = "cancelled";

/// Produces the attempt order for a resolved candidate list.
///
/// 1. `direct_reads`: only origins, in director order.
/// 2. Preferred caches without the `+` sentinel: exactly the preferred
///    endpoints, in configured order.
/// 3. Preferred caches with `+`: the preferred endpoints, then the director's
///    candidates not already listed.
/// 4. Otherwise the director's order unchanged.
///
/// The director's list is never reordered in place.
#[must_use]
pub fn order_candidates(
    list: &CandidateList,
    direct_reads: bool,
    preferred: &PreferredCaches,
) -> Vec<CacheCandidate> {
    if direct_reads {
        return list.origins().cloned().collect();
    }
    if preferred.urls.is_empty() {
        return list.candidates().to_vec();
    }
    let mut order: Vec<CacheCandidate> = Vec::with_capacity(preferred.urls.len() + list.len());
    for (index, url) in preferred.urls.iter().enumerate() {
        let wanted = CacheCandidate::new(
            url,
            CandidateKind::Cache,
            u32::try_from(index).unwrap_or(u32::MAX),
        );
        if order.iter().any(|existing| existing.url == wanted.url) {
            continue;
        }
        let candidate = list
            .candidates()
            .iter()
            .find(|candidate| candidate.url == wanted.url)
            .cloned()
            .unwrap_or(wanted);
        order.push(candidate);
    }
    if preferred.include_director {
        for candidate in list.candidates() {
            if !order.iter().any(|existing| existing.url == candidate.url) {
                order.push(candidate.clone());
            }
        }
    }
    order
}

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Engine behavior derived from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Attempt only origins.
    pub direct_reads: bool,
    /// Preferred cache ordering.
    pub preferred: PreferredCaches,
    /// Scopes required per operation class.
    pub scopes: ScopeRequirements,
    /// Extra headers sent with every attempt.
    pub headers: BTreeMap<String, String>,
    /// Per-candidate attempt timeout.
    pub attempt_timeout: Duration,
    /// Deadline for a whole access call.
    pub request_timeout: Option<Duration>,
}

impl EngineSettings {
    /// Derives engine settings from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the preferred cache list is invalid.
    pub fn from_config(config: &PelicanConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            direct_reads: config.access.direct_reads,
            preferred: config.access.preferred()?,
            scopes: config.tokens.scopes(),
            headers: config.access.extra_headers(),
            attempt_timeout: Duration::from_millis(config.access.attempt_timeout_ms),
            request_timeout: config.access.request_timeout_ms.map(Duration::from_millis),
        })
    }
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// One logical-path operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRequest {
    /// Normalized logical path.
    pub path: String,
    /// Operation to perform.
    pub operation: Operation,
}

/// Cache failover orchestrator.
///
/// # Invariants
/// - Candidates are attempted sequentially, never in parallel.
/// - Each attempt produces exactly one access record for the logical path.
pub struct CacheFailoverEngine {
    /// Namespace resolution backend.
    resolver: Arc<dyn NamespaceResolver>,
    /// Byte-level operation backend.
    transport: Arc<dyn Transport>,
    /// Token discovery and validation.
    credentials: CredentialStore,
    /// Bounded per-path attempt history.
    statistics: AccessStatistics,
    /// Time source for access records.
    clock: Arc<dyn Clock>,
    /// Ordering, scope, and timeout settings.
    settings: EngineSettings,
}

impl CacheFailoverEngine {
    /// Builds an engine over the provided backends.
    #[must_use]
    pub fn new(
        resolver: Arc<dyn NamespaceResolver>,
        transport: Arc<dyn Transport>,
        credentials: CredentialStore,
        clock: Arc<dyn Clock>,
        settings: EngineSettings,
    ) -> Self {
        if settings.direct_reads && !settings.preferred.is_empty() {
            warn!("direct reads enabled; preferred caches are ignored");
        }
        Self {
            resolver,
            transport,
            credentials,
            statistics: AccessStatistics::new(),
            clock,
            settings,
        }
    }

    /// Returns the access statistics tracker.
    #[must_use]
    pub const fn statistics(&self) -> &AccessStatistics {
        &self.statistics
    }

    /// Returns the credential store.
    #[must_use]
    pub const fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Returns the engine settings.
    #[must_use]
    pub const fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Drops recorded history and memoized tokens.
    pub fn reset(&self) {
        self.statistics.reset();
        self.credentials.reset();
    }

    /// Performs `request` against the first working candidate.
    ///
    /// When a request timeout is configured and elapses, the attempt in flight
    /// is cancelled and no later candidate is tried.
    ///
    /// # Errors
    ///
    /// Returns [`PelicanError::Discovery`] when resolution fails,
    /// [`PelicanError::NoCredentials`] when a required token is unavailable,
    /// [`PelicanError::NoAvailableSource`] when every candidate fails or none
    /// exists, [`PelicanError::Cancelled`] when `cancel` fires, and
    /// [`PelicanError::TimedOut`] when the request timeout elapses.
    pub async fn access(
        &self,
        request: AccessRequest,
        cancel: &CancellationToken,
    ) -> Result<TransportResponse, PelicanError> {
        let Some(limit) = self.settings.request_timeout else {
            return self.attempt_candidates(request, cancel).await;
        };
        let deadline = cancel.child_token();
        let attempts = self.attempt_candidates(request, &deadline);
        tokio::pin!(attempts);
        tokio::select! {
            biased;
            outcome = &mut attempts => outcome,
            () = tokio::time::sleep(limit) => {
                deadline.cancel();
                match attempts.await {
                    Err(PelicanError::Cancelled) => {}
                    settled => debug!(
                        succeeded = settled.is_ok(),
                        "attempt settled after the deadline; outcome discarded"
                    ),
                }
                warn!(timeout_ms = limit.as_millis(), "request deadline elapsed");
                Err(PelicanError::TimedOut)
            }
        }
    }

    /// Resolves, authorizes, and attempts each candidate in order.
    async fn attempt_candidates(
        &self,
        request: AccessRequest,
        cancel: &CancellationToken,
    ) -> Result<TransportResponse, PelicanError> {
        let path = request.path.as_str();
        let resolution = until_cancelled(cancel, self.resolver.resolve(path)).await??;
        let origins_only =
            self.settings.direct_reads || request.operation.class() == OperationClass::Write;
        let order =
            order_candidates(&resolution.candidates, origins_only, &self.settings.preferred);
        if order.is_empty() {
            return Err(NoAvailableSource::empty(path).into());
        }
        let authorization = if resolution.namespace.requires_token {
            let scope = self.settings.scopes.scope_for(request.operation.class());
            let token = until_cancelled(
                cancel,
                self.credentials.find_token(path, &resolution.namespace, scope),
            )
            .await??;
            Some(token.bearer_header())
        } else {
            None
        };

        let mut failures = Vec::new();
        for candidate in order {
            let attempt = TransportRequest {
                url: candidate.object_url(path),
                operation: request.operation.clone(),
                authorization: authorization.clone(),
                headers: self.settings.headers.clone(),
            };
            debug!(
                path,
                endpoint = %candidate.url,
                kind = %candidate.kind,
                method = request.operation.method(),
                "attempting candidate"
            );
            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    self.record_failure(path, &candidate, CANCELLED_ERROR_KIND);
                    info!(path, endpoint = %candidate.url, "request cancelled");
                    return Err(PelicanError::Cancelled);
                }
                outcome = tokio::time::timeout(
                    self.settings.attempt_timeout,
                    self.transport.execute(attempt),
                ) => outcome,
            };
            let error_kind = match outcome {
                Ok(Ok(response)) => {
                    self.statistics.record(AccessRecord::succeeded(
                        path,
                        candidate.url.clone(),
                        self.clock.now(),
                    ));
                    debug!(
                        path,
                        endpoint = %candidate.url,
                        status = response.status,
                        "candidate served request"
                    );
                    return Ok(response);
                }
                Ok(Err(err)) => {
                    debug!(path, endpoint = %candidate.url, error = %err, "candidate failed");
                    err.error_kind()
                }
                Err(_) => TIMEOUT_ERROR_KIND.to_string(),
            };
            self.record_failure(path, &candidate, &error_kind);
            failures.push(CandidateFailure {
                endpoint: candidate.url,
                kind: candidate.kind,
                error_kind,
            });
        }
        warn!(path, attempts = failures.len(), "every candidate failed");
        Err(NoAvailableSource {
            path: path.to_string(),
            failures,
        }
        .into())
    }

    /// Appends a failed attempt to the history.
    fn record_failure(&self, path: &str, candidate: &CacheCandidate, error_kind: &str) {
        self.statistics.record(AccessRecord::failed(
            path,
            candidate.url.clone(),
            error_kind,
            self.clock.now(),
        ));
    }
}

/// Runs `future` unless `cancel` fires first.
async fn until_cancelled<F: Future>(
    cancel: &CancellationToken,
    future: F,
) -> Result<F::Output, PelicanError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(PelicanError::Cancelled),
        output = future => Ok(output),
    }
}
