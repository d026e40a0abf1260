// crates/pelican-fs/src/director.rs
// ============================================================================
// Module: Federation Directory Client
// Description: Federation discovery and director namespace resolution.
// Purpose: Turn logical paths into candidate endpoints and namespace policy.
// Dependencies: pelican-config, pelican-core, reqwest, serde, tracing, url
// ============================================================================

//! ## Overview
//! [`DirectorClient`] resolves the federation discovery document once, then
//! queries the director for each logical path. Object queries are sent with
//! redirects disabled so the director's `Link`/`Location` answer can be read
//! directly. Results are cached per path for the configured freshness window
//! and can be dropped with [`DirectorClient::invalidate`] or
//! [`DirectorClient::reset`].
//!
//! Namespace policy comes from the director's `X-Pelican-*` headers. Paths the
//! director does not describe fall back to the longest registered prefix, then
//! to the configured unregistered-namespace policy.
//! Security posture: discovery and director answers are untrusted input;
//! unusable entries are excluded and reported, never followed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod headers;
pub mod registry;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::time::Duration;

use async_trait::async_trait;
use pelican_config::FederationConfig;
use pelican_config::UnregisteredNamespacePolicy;
use pelican_core::CacheCandidate;
use pelican_core::CandidateKind;
use pelican_core::CandidateList;
use pelican_core::DiscoveryError;
use pelican_core::FederationMetadata;
use pelican_core::NamespaceInfo;
use pelican_core::NamespaceResolver;
use pelican_core::NoAvailableSource;
use pelican_core::PelicanError;
use pelican_core::PolicySource;
use pelican_core::Resolution;
use pelican_core::normalize_path;
use reqwest::Client;
use reqwest::Method;
use reqwest::Response;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use reqwest::header::LINK;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use serde::Deserialize;
use tokio::time::Instant;
use tracing::debug;
use tracing::info;
use tracing::warn;
use url::Url;

use self::headers::AUTHORIZATION_HEADER;
use self::headers::IssuerHeader;
use self::headers::LinkEntry;
use self::headers::NAMESPACE_HEADER;
use self::headers::TOKEN_GENERATION_HEADER;
use self::headers::parse_issuer_header;
use self::headers::parse_link_header;
use self::headers::parse_namespace_header;
pub use self::registry::NamespaceRegistry;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Discovery document location relative to the federation host.
pub const DISCOVERY_DOCUMENT_PATH: &str = ".well-known/pelican-configuration";
/// Director origin query prefix.
pub const ORIGIN_QUERY_PREFIX: &str = "/api/v1.0/director/origin";
/// Maximum accepted discovery document size in bytes.
const MAX_DISCOVERY_DOCUMENT_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: Discovery Document
// ============================================================================

/// Federation discovery document as served by the federation host.
#[derive(Debug, Deserialize)]
struct DiscoveryDocument {
    /// Director endpoint.
    director_endpoint: Option<String>,
    /// Namespace registry endpoint.
    namespace_registration_endpoint: Option<String>,
    /// Federation issuer.
    issuer: Option<String>,
    /// Additional federation token issuers.
    #[serde(default)]
    token_issuers: Vec<String>,
}

// ============================================================================
// SECTION: Directory Client
// ============================================================================

/// A cached resolution and when it was fetched.
#[derive(Debug, Clone)]
struct CachedResolution {
    /// Resolved candidates and policy.
    resolution: Resolution,
    /// Fetch instant.
    fetched_at: Instant,
}

/// Federation directory client.
///
/// # Invariants
/// - Federation metadata is fetched at most once until [`Self::reset`].
/// - A cached resolution is served only inside the freshness window.
/// - At most `resolution_capacity` resolutions are cached; inserting past the
///   bound drops expired entries first, then the oldest.
/// - Director redirects are never followed.
pub struct DirectorClient {
    /// `scheme://host[:port]/` serving the discovery document.
    discovery_base: Url,
    /// Whether cleartext director endpoints are accepted.
    allow_http: bool,
    /// HTTP client with redirects disabled.
    client: Client,
    /// Policy for namespaces the director never describes.
    unregistered: UnregisteredNamespacePolicy,
    /// Freshness window for cached resolutions.
    resolution_ttl: Duration,
    /// Maximum number of cached resolutions.
    resolution_capacity: usize,
    /// Federation metadata, once discovered.
    federation: Mutex<Option<FederationMetadata>>,
    /// Cached resolutions keyed by logical path.
    resolutions: Mutex<HashMap<String, CachedResolution>>,
    /// Namespace policies seen so far.
    registry: NamespaceRegistry,
}

impl DirectorClient {
    /// Builds a client for the configured federation.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError`] when the discovery URL is unusable or the
    /// HTTP client cannot be built.
    pub fn new(
        federation: &FederationConfig,
        unregistered: UnregisteredNamespacePolicy,
    ) -> Result<Self, DiscoveryError> {
        let discovery_base = federation
            .discovery_base()
            .map_err(|err| DiscoveryError::InvalidUrl(err.to_string()))?;
        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(Duration::from_millis(federation.request_timeout_ms))
            .user_agent(federation.user_agent.clone())
            .build()
            .map_err(|err| DiscoveryError::Transport(format!("http client unavailable: {err}")))?;
        Ok(Self {
            discovery_base,
            allow_http: federation.allow_http,
            client,
            unregistered,
            resolution_ttl: Duration::from_millis(federation.resolution_ttl_ms),
            resolution_capacity: federation.resolution_cache_entries.max(1),
            federation: Mutex::new(None),
            resolutions: Mutex::new(HashMap::new()),
            registry: NamespaceRegistry::default(),
        })
    }

    /// Returns the base URL the discovery document is fetched from.
    #[must_use]
    pub const fn discovery_base(&self) -> &Url {
        &self.discovery_base
    }

    /// Returns the namespace registry.
    #[must_use]
    pub const fn registry(&self) -> &NamespaceRegistry {
        &self.registry
    }

    /// Returns the number of cached resolutions.
    #[must_use]
    pub fn cached_resolutions(&self) -> usize {
        self.lock_resolutions().len()
    }

    /// Drops the cached resolution for `path`.
    pub fn invalidate(&self, path: &str) {
        self.lock_resolutions().remove(path);
    }

    /// Drops federation metadata, every cached resolution, and every
    /// registered namespace.
    pub fn reset(&self) {
        *self.lock_federation() = None;
        self.lock_resolutions().clear();
        self.registry.clear();
    }

    // ------------------------------------------------------------------------
    // Federation discovery
    // ------------------------------------------------------------------------

    /// Returns the federation metadata, fetching it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError`] on transport failure or when the document
    /// lacks a usable director endpoint.
    pub async fn resolve_federation(&self) -> Result<FederationMetadata, DiscoveryError> {
        if let Some(metadata) = self.lock_federation().clone() {
            return Ok(metadata);
        }
        let url = self
            .discovery_base
            .join(DISCOVERY_DOCUMENT_PATH)
            .map_err(|err| DiscoveryError::InvalidUrl(err.to_string()))?;
        let response = self.send(Method::GET, &url).await?;
        if !response.status().is_success() {
            return Err(DiscoveryError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        let oversized = |len: u64| {
            usize::try_from(len).map_or(true, |len| len > MAX_DISCOVERY_DOCUMENT_BYTES)
        };
        if response.content_length().is_some_and(oversized) {
            return Err(DiscoveryError::InvalidMetadata("document exceeds size limit".to_string()));
        }
        let body = response
            .bytes()
            .await
            .map_err(|err| DiscoveryError::Transport(format!("{url}: {err}")))?;
        if body.len() > MAX_DISCOVERY_DOCUMENT_BYTES {
            return Err(DiscoveryError::InvalidMetadata("document exceeds size limit".to_string()));
        }
        let document: DiscoveryDocument = serde_json::from_slice(&body)
            .map_err(|err| DiscoveryError::InvalidMetadata(err.to_string()))?;
        let metadata = self.metadata_from_document(document)?;
        info!(
            discovery = %self.discovery_base,
            director = %metadata.director_url,
            issuers = metadata.token_issuer_urls.len(),
            "federation discovered"
        );
        *self.lock_federation() = Some(metadata.clone());
        Ok(metadata)
    }

    /// Validates a discovery document into federation metadata.
    fn metadata_from_document(
        &self,
        document: DiscoveryDocument,
    ) -> Result<FederationMetadata, DiscoveryError> {
        let raw = document
            .director_endpoint
            .filter(|endpoint| !endpoint.trim().is_empty())
            .ok_or_else(|| {
                DiscoveryError::InvalidMetadata("missing director_endpoint".to_string())
            })?;
        let mut director_url = Url::parse(raw.trim()).map_err(|err| {
            DiscoveryError::InvalidMetadata(format!("invalid director_endpoint: {err}"))
        })?;
        match director_url.scheme() {
            "https" => {}
            "http" if self.allow_http => {}
            other => {
                return Err(DiscoveryError::InvalidMetadata(format!(
                    "director_endpoint scheme {other} is not permitted"
                )));
            }
        }
        if !director_url.path().ends_with('/') {
            let path = format!("{}/", director_url.path());
            director_url.set_path(&path);
        }
        let namespace_registration_url = document
            .namespace_registration_endpoint
            .as_deref()
            .and_then(|raw| Url::parse(raw.trim()).ok());
        let token_issuer_urls: BTreeSet<Url> = document
            .issuer
            .iter()
            .chain(document.token_issuers.iter())
            .filter_map(|raw| Url::parse(raw.trim()).ok())
            .collect();
        Ok(FederationMetadata {
            director_url,
            namespace_registration_url,
            token_issuer_urls,
        })
    }

    // ------------------------------------------------------------------------
    // Namespace resolution
    // ------------------------------------------------------------------------

    /// Resolves `path`, failing when the director offers no candidate.
    ///
    /// # Errors
    ///
    /// Returns [`PelicanError::Discovery`] on transport or protocol failure
    /// and [`PelicanError::NoAvailableSource`] for an empty candidate list.
    pub async fn resolve_namespace(&self, path: &str) -> Result<Resolution, PelicanError> {
        let resolution = self.cached_resolution(path).await?;
        if resolution.candidates.is_empty() {
            return Err(NoAvailableSource::empty(path).into());
        }
        Ok(resolution)
    }

    /// Returns a fresh cached resolution or queries the director.
    async fn cached_resolution(&self, path: &str) -> Result<Resolution, DiscoveryError> {
        if let Some(cached) = self.lock_resolutions().get(path)
            && cached.fetched_at.elapsed() < self.resolution_ttl
        {
            return Ok(cached.resolution.clone());
        }
        let resolution = self.query_director(path).await?;
        self.store_resolution(path, &resolution);
        Ok(resolution)
    }

    /// Caches `resolution`, evicting to stay within capacity.
    fn store_resolution(&self, path: &str, resolution: &Resolution) {
        let mut resolutions = self.lock_resolutions();
        if !resolutions.contains_key(path) && resolutions.len() >= self.resolution_capacity {
            let ttl = self.resolution_ttl;
            resolutions.retain(|_, cached| cached.fetched_at.elapsed() < ttl);
            while resolutions.len() >= self.resolution_capacity {
                let oldest = resolutions
                    .iter()
                    .min_by_key(|(_, cached)| cached.fetched_at)
                    .map(|(key, _)| key.clone());
                let Some(oldest) = oldest else {
                    break;
                };
                debug!(path = %oldest, "evicting oldest cached resolution");
                resolutions.remove(&oldest);
            }
        }
        resolutions.insert(
            path.to_string(),
            CachedResolution {
                resolution: resolution.clone(),
                fetched_at: Instant::now(),
            },
        );
    }

    /// Queries the director for `path` without consulting the cache.
    async fn query_director(&self, path: &str) -> Result<Resolution, DiscoveryError> {
        let metadata = self.resolve_federation().await?;
        let url = director_url_for(&metadata.director_url, path);
        let response = self.send(Method::GET, &url).await?;
        let status = response.status();
        let mut candidates = Vec::new();
        let mut rejected = Vec::new();
        if status == StatusCode::NOT_FOUND {
            debug!(path, "director reports no cache for path");
        } else if status.is_success() || status.is_redirection() {
            collect_caches(response.headers(), &mut candidates, &mut rejected);
        } else {
            return Err(DiscoveryError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let namespace = self.namespace_policy(path, response.headers(), &metadata);
        match self.query_origin(path, &metadata).await {
            Ok(Some(origin)) => {
                candidates.push(CacheCandidate::new(&origin, CandidateKind::Origin, 0));
            }
            Ok(None) => debug!(path, "director reports no origin for path"),
            Err(err) => debug!(path, error = %err, "origin query failed"),
        }
        if !rejected.is_empty() {
            warn!(path, rejected = rejected.len(), "director returned unusable candidates");
        }
        let candidates = CandidateList::new(candidates, rejected);
        debug!(
            path,
            candidates = candidates.len(),
            namespace = %namespace.path_prefix,
            requires_token = namespace.requires_token,
            "namespace resolved"
        );
        Ok(Resolution {
            candidates,
            namespace,
        })
    }

    /// Asks the director which origin serves `path`.
    ///
    /// Returns `Ok(None)` when the director knows no origin.
    async fn query_origin(
        &self,
        path: &str,
        metadata: &FederationMetadata,
    ) -> Result<Option<Url>, DiscoveryError> {
        let url = director_url_for(&metadata.director_url, &format!("{ORIGIN_QUERY_PREFIX}{path}"));
        let response = self.send(Method::GET, &url).await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() && !status.is_redirection() {
            return Err(DiscoveryError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let Some(location) = response.headers().get(LOCATION) else {
            return Ok(None);
        };
        let location = location
            .to_str()
            .ok()
            .and_then(|raw| Url::parse(raw.trim()).ok())
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .ok_or_else(|| {
                DiscoveryError::MalformedResponse("origin location is not a url".to_string())
            })?;
        Ok(Some(location))
    }

    /// Derives the namespace policy for `path` from a director response.
    fn namespace_policy(
        &self,
        path: &str,
        headers: &HeaderMap,
        metadata: &FederationMetadata,
    ) -> NamespaceInfo {
        let described = headers
            .get(NAMESPACE_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_namespace_header)
            .and_then(|header| Some((normalize_path(&header.prefix)?, header.require_token)));
        let Some((prefix, require_token)) = described else {
            return self.registry.lookup(path).unwrap_or_else(|| {
                let mut info =
                    NamespaceInfo::unregistered(path, self.unregistered.requires_token());
                info.allowed_issuers = metadata.token_issuer_urls.clone();
                info
            });
        };
        let mut issuers = IssuerHeader::default();
        for name in [TOKEN_GENERATION_HEADER, AUTHORIZATION_HEADER] {
            for value in headers.get_all(name) {
                if let Ok(value) = value.to_str() {
                    parse_issuer_header(value, &mut issuers);
                }
            }
        }
        let allowed_issuers = if issuers.issuers.is_empty() {
            metadata.token_issuer_urls.clone()
        } else {
            issuers.issuers.into_iter().collect()
        };
        let info = NamespaceInfo {
            path_prefix: prefix,
            requires_token: require_token.unwrap_or_else(|| self.unregistered.requires_token()),
            allowed_issuers,
            max_validity_depth: issuers.max_scope_depth.unwrap_or_default(),
            source: PolicySource::Director,
        };
        self.registry.register(info.clone());
        info
    }

    // ------------------------------------------------------------------------
    // Auxiliary lookups
    // ------------------------------------------------------------------------

    /// Returns the URL listing the collection at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PelicanError::Discovery`] when the director answer carries no
    /// `Link` header and [`PelicanError::NoAvailableSource`] on `404`.
    pub async fn resolve_listing(&self, path: &str) -> Result<Url, PelicanError> {
        let metadata = self.resolve_federation().await?;
        let url = director_url_for(&metadata.director_url, path);
        let method = Method::from_bytes(b"PROPFIND")
            .map_err(|err| DiscoveryError::MalformedResponse(err.to_string()))?;
        let response = self.send(method, &url).await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(NoAvailableSource::empty(path).into());
        }
        if !status.is_success() && !status.is_redirection() {
            return Err(DiscoveryError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }
        let entry = link_entries(response.headers()).0.into_iter().next().ok_or_else(|| {
            DiscoveryError::MalformedResponse("listing answer carries no link header".to_string())
        })?;
        Ok(CacheCandidate::new(&entry.url, CandidateKind::Origin, entry.priority).object_url(path))
    }

    /// Returns the origin URL serving `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PelicanError::NoAvailableSource`] when the director knows no
    /// origin and [`PelicanError::Discovery`] on protocol failure.
    pub async fn origin_url(&self, path: &str) -> Result<Url, PelicanError> {
        let metadata = self.resolve_federation().await?;
        self.query_origin(path, &metadata)
            .await?
            .ok_or_else(|| NoAvailableSource::empty(path).into())
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    /// Sends one request, mapping transport failures.
    async fn send(&self, method: Method, url: &Url) -> Result<Response, DiscoveryError> {
        debug!(method = %method, url = %url, "director request");
        self.client
            .request(method, url.clone())
            .send()
            .await
            .map_err(|err| DiscoveryError::Transport(format!("{url}: {err}")))
    }

    /// Acquires the federation metadata lock, recovering from poisoning.
    fn lock_federation(&self) -> MutexGuard<'_, Option<FederationMetadata>> {
        self.federation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquires the resolution cache lock, recovering from poisoning.
    fn lock_resolutions(&self) -> MutexGuard<'_, HashMap<String, CachedResolution>> {
        self.resolutions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl NamespaceResolver for DirectorClient {
    async fn resolve(&self, path: &str) -> Result<Resolution, PelicanError> {
        Ok(self.cached_resolution(path).await?)
    }
}

// ============================================================================
// SECTION: Response Helpers
// ============================================================================

/// Joins a logical path onto the director base URL.
fn director_url_for(director: &Url, path: &str) -> Url {
    let mut url = director.clone();
    let base = director.path().trim_end_matches('/');
    url.set_path(&format!("{base}/{}", path.trim_start_matches('/')));
    url
}

/// Collects every `Link` entry across all `Link` headers.
fn link_entries(headers: &HeaderMap) -> (Vec<LinkEntry>, Vec<String>) {
    let mut entries = Vec::new();
    let mut rejected = Vec::new();
    for value in headers.get_all(LINK) {
        match value.to_str() {
            Ok(value) => {
                let parsed = parse_link_header(value);
                entries.extend(parsed.entries);
                rejected.extend(parsed.rejected);
            }
            Err(_) => rejected.push(String::from_utf8_lossy(value.as_bytes()).into_owned()),
        }
    }
    (entries, rejected)
}

/// Collects cache candidates from `Link`, falling back to `Location`.
fn collect_caches(
    headers: &HeaderMap,
    candidates: &mut Vec<CacheCandidate>,
    rejected: &mut Vec<String>,
) {
    let (entries, link_rejected) = link_entries(headers);
    let had_link = !entries.is_empty() || !link_rejected.is_empty();
    candidates.extend(
        entries
            .iter()
            .map(|entry| CacheCandidate::new(&entry.url, CandidateKind::Cache, entry.priority)),
    );
    rejected.extend(link_rejected);
    if had_link {
        return;
    }
    if let Some(location) = headers.get(LOCATION) {
        let raw = String::from_utf8_lossy(location.as_bytes()).into_owned();
        match Url::parse(raw.trim()) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                candidates.push(CacheCandidate::new(&url, CandidateKind::Cache, 0));
            }
            _ => rejected.push(raw),
        }
    }
}

#[cfg(test)]
mod tests;
