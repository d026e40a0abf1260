// crates/pelican-config/src/config.rs
// ============================================================================
// Module: Pelican Configuration
// Description: Configuration loading and validation for the Pelican client.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: pelican-core, serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Only the options the client interprets are modeled; transport-specific
//! settings travel through the opaque `access.passthrough` table.
//! Missing sections fall back to defaults; invalid values fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use pelican_core::ScopeRequirements;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "pelican-fs.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "PELICAN_FS_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Host of the Open Science Data Federation.
pub const OSDF_FEDERATION_HOST: &str = "osg-htc.org";
/// Discovery URL used when none is configured.
pub const DEFAULT_DISCOVERY_URL: &str = "pelican://osg-htc.org";
/// Sentinel entry appending the director's caches after preferred ones.
pub const PREFERRED_CACHES_SENTINEL: &str = "+";
/// Maximum number of preferred cache entries.
pub(crate) const MAX_PREFERRED_CACHES: usize = 64;
/// Maximum number of extra request headers.
pub(crate) const MAX_HEADERS: usize = 64;
/// Maximum length of a header value.
pub(crate) const MAX_HEADER_VALUE_LENGTH: usize = 8192;
/// Minimum request and attempt timeout in milliseconds.
pub(crate) const MIN_TIMEOUT_MS: u64 = 100;
/// Maximum request and attempt timeout in milliseconds.
pub(crate) const MAX_TIMEOUT_MS: u64 = 300_000;
/// Default director and discovery request timeout in milliseconds.
pub(crate) const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;
/// Default per-candidate attempt timeout in milliseconds.
pub(crate) const DEFAULT_ATTEMPT_TIMEOUT_MS: u64 = 5_000;
/// Default candidate list freshness window in milliseconds.
pub(crate) const DEFAULT_RESOLUTION_TTL_MS: u64 = 15 * 60 * 1_000;
/// Maximum candidate list freshness window in milliseconds.
pub(crate) const MAX_RESOLUTION_TTL_MS: u64 = 24 * 60 * 60 * 1_000;
/// Default number of per-path resolutions kept by the directory client.
pub(crate) const DEFAULT_RESOLUTION_CACHE_ENTRIES: usize = 50;
/// Maximum number of per-path resolutions kept by the directory client.
pub(crate) const MAX_RESOLUTION_CACHE_ENTRIES: usize = 100_000;
/// Default `User-Agent` sent to directors and endpoints.
pub(crate) const DEFAULT_USER_AGENT: &str = concat!("pelican-fs/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Pelican client configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PelicanConfig {
    /// Federation discovery configuration.
    #[serde(default)]
    pub federation: FederationConfig,
    /// Candidate ordering and request configuration.
    #[serde(default)]
    pub access: AccessConfig,
    /// Token discovery configuration.
    #[serde(default)]
    pub tokens: TokenConfig,
}

impl PelicanConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: explicit path, then [`CONFIG_ENV_VAR`], then
    /// `pelican-fs.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.federation.validate()?;
        self.access.validate()?;
        self.tokens.validate()?;
        Ok(())
    }
}

/// Federation discovery configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FederationConfig {
    /// Discovery URL (`pelican://host`, `osdf://`, or `http(s)://host`).
    #[serde(default = "default_discovery_url")]
    pub discovery_url: String,
    /// Permit cleartext HTTP for discovery and director queries.
    #[serde(default)]
    pub allow_http: bool,
    /// Discovery and director request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Freshness window for per-path resolutions in milliseconds.
    #[serde(default = "default_resolution_ttl_ms")]
    pub resolution_ttl_ms: u64,
    /// Maximum number of per-path resolutions kept at once.
    #[serde(default = "default_resolution_cache_entries")]
    pub resolution_cache_entries: usize,
    /// `User-Agent` header value.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            discovery_url: default_discovery_url(),
            allow_http: false,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            resolution_ttl_ms: DEFAULT_RESOLUTION_TTL_MS,
            resolution_cache_entries: DEFAULT_RESOLUTION_CACHE_ENTRIES,
            user_agent: default_user_agent(),
        }
    }
}

impl FederationConfig {
    /// Validates federation configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.discovery_base()?;
        validate_timeout_range(
            "federation.request_timeout_ms",
            self.request_timeout_ms,
            MIN_TIMEOUT_MS,
            MAX_TIMEOUT_MS,
        )?;
        if self.resolution_ttl_ms > MAX_RESOLUTION_TTL_MS {
            return Err(ConfigError::Invalid(format!(
                "federation.resolution_ttl_ms must be at most {MAX_RESOLUTION_TTL_MS} milliseconds"
            )));
        }
        if self.resolution_cache_entries == 0
            || self.resolution_cache_entries > MAX_RESOLUTION_CACHE_ENTRIES
        {
            return Err(ConfigError::Invalid(format!(
                "federation.resolution_cache_entries must be between 1 and \
                 {MAX_RESOLUTION_CACHE_ENTRIES}"
            )));
        }
        if self.user_agent.trim().is_empty() || !is_header_value(&self.user_agent) {
            return Err(ConfigError::Invalid(
                "federation.user_agent must be a non-empty header value".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the `scheme://host[:port]/` base the discovery document is served from.
    ///
    /// `pelican://` maps to `https://`; `osdf://` always names the OSDF host.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the discovery URL is malformed or uses a
    /// scheme that is not permitted.
    pub fn discovery_base(&self) -> Result<Url, ConfigError> {
        let raw = self.discovery_url.trim();
        let parsed = Url::parse(raw).map_err(|err| {
            ConfigError::Invalid(format!("federation.discovery_url is invalid: {err}"))
        })?;
        if !parsed.username().is_empty() || parsed.password().is_some() {
            return Err(ConfigError::Invalid(
                "federation.discovery_url must not embed credentials".to_string(),
            ));
        }
        let (scheme, authority) = match parsed.scheme() {
            "osdf" => ("https", OSDF_FEDERATION_HOST.to_string()),
            "pelican" | "https" => ("https", url_authority(&parsed)?),
            "http" if self.allow_http => ("http", url_authority(&parsed)?),
            "http" => {
                return Err(ConfigError::Invalid(
                    "insecure http discovery requires federation.allow_http".to_string(),
                ));
            }
            other => {
                return Err(ConfigError::Invalid(format!(
                    "federation.discovery_url scheme {other} is not supported"
                )));
            }
        };
        Url::parse(&format!("{scheme}://{authority}/")).map_err(|err| {
            ConfigError::Invalid(format!("federation.discovery_url is invalid: {err}"))
        })
    }

    /// Returns the federation authority (`host[:port]`) logical paths are matched against.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the discovery URL is invalid.
    pub fn federation_host(&self) -> Result<String, ConfigError> {
        let base = self.discovery_base()?;
        url_authority(&base)
    }

    /// Returns true when this configuration targets the OSDF federation.
    #[must_use]
    pub fn is_osdf(&self) -> bool {
        self.federation_host().is_ok_and(|host| host == OSDF_FEDERATION_HOST)
    }
}

/// Candidate ordering and request configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessConfig {
    /// Attempt only origins, bypassing caches.
    #[serde(default)]
    pub direct_reads: bool,
    /// Ordered preferred cache URLs, optionally containing `"+"`.
    #[serde(default)]
    pub preferred_caches: Vec<String>,
    /// Per-candidate attempt timeout in milliseconds.
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,
    /// Deadline for a whole access call in milliseconds; unset means none.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
    /// Extra request headers; may carry an explicit `Authorization`.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Opaque transport-specific options.
    #[serde(default)]
    pub passthrough: Option<toml::Value>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            direct_reads: false,
            preferred_caches: Vec::new(),
            attempt_timeout_ms: DEFAULT_ATTEMPT_TIMEOUT_MS,
            request_timeout_ms: None,
            headers: BTreeMap::new(),
            passthrough: None,
        }
    }
}

impl AccessConfig {
    /// Validates access configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.preferred()?;
        validate_timeout_range(
            "access.attempt_timeout_ms",
            self.attempt_timeout_ms,
            MIN_TIMEOUT_MS,
            MAX_TIMEOUT_MS,
        )?;
        if let Some(timeout_ms) = self.request_timeout_ms {
            validate_timeout_range(
                "access.request_timeout_ms",
                timeout_ms,
                MIN_TIMEOUT_MS,
                MAX_TIMEOUT_MS,
            )?;
        }
        if self.headers.len() > MAX_HEADERS {
            return Err(ConfigError::Invalid(format!(
                "access.headers exceeds max entries ({MAX_HEADERS})"
            )));
        }
        let mut seen: BTreeSet<String> = BTreeSet::new();
        for (name, value) in &self.headers {
            if !is_header_name(name) {
                return Err(ConfigError::Invalid(format!(
                    "access.headers name {name} is not a valid header name"
                )));
            }
            if value.len() > MAX_HEADER_VALUE_LENGTH || !is_header_value(value) {
                return Err(ConfigError::Invalid(format!(
                    "access.headers value for {name} is not a valid header value"
                )));
            }
            if !seen.insert(name.to_ascii_lowercase()) {
                return Err(ConfigError::Invalid(format!(
                    "access.headers contains duplicate name {name}"
                )));
            }
        }
        if let Some(passthrough) = &self.passthrough
            && !passthrough.is_table()
        {
            return Err(ConfigError::Invalid("access.passthrough must be a table".to_string()));
        }
        Ok(())
    }

    /// Parses `preferred_caches` into its validated form.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an entry is not `"+"` or an absolute
    /// `http(s)` URL, when `"+"` repeats, or when an endpoint repeats.
    pub fn preferred(&self) -> Result<PreferredCaches, ConfigError> {
        if self.preferred_caches.len() > MAX_PREFERRED_CACHES {
            return Err(ConfigError::Invalid(format!(
                "access.preferred_caches exceeds max entries ({MAX_PREFERRED_CACHES})"
            )));
        }
        let mut urls: Vec<Url> = Vec::with_capacity(self.preferred_caches.len());
        let mut include_director = false;
        for entry in &self.preferred_caches {
            let entry = entry.trim();
            if entry == PREFERRED_CACHES_SENTINEL {
                if include_director {
                    return Err(ConfigError::Invalid(
                        "access.preferred_caches may contain \"+\" only once".to_string(),
                    ));
                }
                include_director = true;
                continue;
            }
            let url = parse_cache_url(entry)?;
            if urls.contains(&url) {
                return Err(ConfigError::Invalid(format!(
                    "access.preferred_caches contains duplicate entry {url}"
                )));
            }
            urls.push(url);
        }
        Ok(PreferredCaches {
            urls,
            include_director,
        })
    }

    /// Returns the explicit `Authorization` header value, if configured.
    #[must_use]
    pub fn authorization(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("authorization"))
            .map(|(_, value)| value.as_str())
    }

    /// Returns the configured headers other than `Authorization`.
    #[must_use]
    pub fn extra_headers(&self) -> BTreeMap<String, String> {
        self.headers
            .iter()
            .filter(|(name, _)| !name.eq_ignore_ascii_case("authorization"))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// Parses the pass-through table into a transport option type or returns the default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the table cannot be deserialized.
    pub fn parse_passthrough<T: for<'de> Deserialize<'de> + Default>(
        &self,
    ) -> Result<T, ConfigError> {
        self.passthrough.as_ref().map_or_else(
            || Ok(T::default()),
            |value| {
                value
                    .clone()
                    .try_into::<T>()
                    .map_err(|err| ConfigError::Invalid(format!("access.passthrough error: {err}")))
            },
        )
    }
}

/// Validated preferred cache list.
///
/// # Invariants
/// - `urls` are endpoint bases without duplicates, in configured order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferredCaches {
    /// Preferred endpoints in configured order.
    pub urls: Vec<Url>,
    /// Whether the director's own ordering follows the preferred entries.
    pub include_director: bool,
}

impl PreferredCaches {
    /// Returns true when no ordering preference is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty() && !self.include_director
    }
}

/// Policy applied to namespaces the director has never described.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnregisteredNamespacePolicy {
    /// Treat the namespace as protected.
    #[default]
    RequireToken,
    /// Treat the namespace as public.
    Public,
}

impl UnregisteredNamespacePolicy {
    /// Returns true when unregistered namespaces require a token.
    #[must_use]
    pub const fn requires_token(self) -> bool {
        matches!(self, Self::RequireToken)
    }
}

/// Token discovery configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    /// Explicit token file consulted right after the header.
    #[serde(default)]
    pub token_location: Option<PathBuf>,
    /// HTCondor credential name.
    #[serde(default)]
    pub token_name: Option<String>,
    /// Override for the default bearer token file location.
    #[serde(default)]
    pub default_token_file: Option<PathBuf>,
    /// Policy for namespaces without a known registration.
    #[serde(default)]
    pub unregistered_namespace: UnregisteredNamespacePolicy,
    /// Scope required for read-class operations.
    #[serde(default = "default_read_scope")]
    pub read_scope: String,
    /// Scope required for write-class operations.
    #[serde(default = "default_write_scope")]
    pub write_scope: String,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            token_location: None,
            token_name: None,
            default_token_file: None,
            unregistered_namespace: UnregisteredNamespacePolicy::RequireToken,
            read_scope: default_read_scope(),
            write_scope: default_write_scope(),
        }
    }
}

impl TokenConfig {
    /// Validates token discovery configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.token_location {
            validate_path_string("tokens.token_location", &path.to_string_lossy())?;
        }
        if let Some(path) = &self.default_token_file {
            validate_path_string("tokens.default_token_file", &path.to_string_lossy())?;
        }
        if let Some(name) = &self.token_name {
            let trimmed = name.trim();
            if trimmed.is_empty()
                || trimmed.contains('/')
                || trimmed.len() > MAX_PATH_COMPONENT_LENGTH
            {
                return Err(ConfigError::Invalid(
                    "tokens.token_name must be a non-empty file name".to_string(),
                ));
            }
        }
        validate_scope("tokens.read_scope", &self.read_scope)?;
        validate_scope("tokens.write_scope", &self.write_scope)?;
        Ok(())
    }

    /// Returns the scope requirements per operation class.
    #[must_use]
    pub fn scopes(&self) -> ScopeRequirements {
        ScopeRequirements {
            read: self.read_scope.trim().to_string(),
            write: self.write_scope.trim().to_string(),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default discovery URL.
fn default_discovery_url() -> String {
    DEFAULT_DISCOVERY_URL.to_string()
}

/// Default discovery and director request timeout.
const fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

/// Default resolution freshness window.
const fn default_resolution_ttl_ms() -> u64 {
    DEFAULT_RESOLUTION_TTL_MS
}

/// Default resolution cache capacity.
const fn default_resolution_cache_entries() -> usize {
    DEFAULT_RESOLUTION_CACHE_ENTRIES
}

/// Default per-candidate attempt timeout.
const fn default_attempt_timeout_ms() -> u64 {
    DEFAULT_ATTEMPT_TIMEOUT_MS
}

/// Default user agent.
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

/// Default read scope.
fn default_read_scope() -> String {
    ScopeRequirements::default().read
}

/// Default write scope.
fn default_write_scope() -> String {
    ScopeRequirements::default().write
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the caller or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates a timeout value against bounds.
fn validate_timeout_range(
    field: &str,
    value_ms: u64,
    min_ms: u64,
    max_ms: u64,
) -> Result<(), ConfigError> {
    if value_ms < min_ms || value_ms > max_ms {
        return Err(ConfigError::Invalid(format!(
            "{field} must be between {min_ms} and {max_ms} milliseconds",
        )));
    }
    Ok(())
}

/// Validates a scope string.
fn validate_scope(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
        return Err(ConfigError::Invalid(format!(
            "{field} must be non-empty without whitespace"
        )));
    }
    Ok(())
}

/// Parses one preferred cache entry into an endpoint base.
fn parse_cache_url(entry: &str) -> Result<Url, ConfigError> {
    let parsed = Url::parse(entry).map_err(|err| {
        ConfigError::Invalid(format!("access.preferred_caches entry {entry} is invalid: {err}"))
    })?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ConfigError::Invalid(format!(
            "access.preferred_caches entry {entry} must be an absolute http(s) url"
        )));
    }
    if !parsed.username().is_empty() || parsed.password().is_some() {
        return Err(ConfigError::Invalid(format!(
            "access.preferred_caches entry {entry} must not embed credentials"
        )));
    }
    Ok(pelican_core::endpoint_base(&parsed))
}

/// Returns `host[:port]` for a URL with a host.
fn url_authority(url: &Url) -> Result<String, ConfigError> {
    let host = url.host_str().filter(|host| !host.is_empty()).ok_or_else(|| {
        ConfigError::Invalid("federation.discovery_url must name a host".to_string())
    })?;
    Ok(url.port().map_or_else(|| host.to_string(), |port| format!("{host}:{port}")))
}

/// Returns true when `name` is a valid HTTP header field name.
fn is_header_name(name: &str) -> bool {
    const SEPARATORS: &[char] =
        &['!', '#', '$', '%', '&', '\'', '*', '+', '-', '.', '^', '_', '`', '|', '~'];
    !name.is_empty()
        && name.chars().all(|ch| ch.is_ascii_alphanumeric() || SEPARATORS.contains(&ch))
}

/// Returns true when `value` is a valid HTTP header field value.
fn is_header_value(value: &str) -> bool {
    value.chars().all(|ch| ch == '\t' || (' ' ..= '~').contains(&ch))
}
