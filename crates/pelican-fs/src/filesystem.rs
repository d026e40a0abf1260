// crates/pelican-fs/src/filesystem.rs
// ============================================================================
// Module: Pelican Filesystem
// Description: Logical-path facade over the directory client and engine.
// Purpose: Expose read, write, and lookup operations on federation paths.
// Dependencies: bytes, pelican-config, pelican-core, thiserror, tokio-util
// ============================================================================

//! ## Overview
//! [`PelicanFileSystem`] accepts logical paths in any of the forms a caller
//! may hold (`/ns/obj`, `pelican://host/ns/obj`, `osdf:///ns/obj`,
//! `host/ns/obj`), checks them against the configured federation, and routes
//! every data operation through the [`CacheFailoverEngine`].
//!
//! Each instance owns its federation metadata, resolution cache, validated
//! tokens, and access history; [`PelicanFileSystem::reset`] drops all of them.
//! Dropping an operation's future aborts it; [`PelicanFileSystem::access`]
//! accepts an explicit [`CancellationToken`] instead.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use bytes::Bytes;
use pelican_config::ConfigError;
use pelican_config::DEFAULT_DISCOVERY_URL;
use pelican_config::PelicanConfig;
use pelican_core::AccessRecord;
use pelican_core::ByteRange;
use pelican_core::Clock;
use pelican_core::DiscoveryError;
use pelican_core::NamespaceResolver;
use pelican_core::Operation;
use pelican_core::PelicanError;
use pelican_core::SystemClock;
use pelican_core::Transport;
use pelican_core::TransportResponse;
use pelican_core::normalize_path;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::credentials::CredentialStore;
use crate::credentials::TokenEnvironment;
use crate::director::DirectorClient;
use crate::failover::AccessRequest;
use crate::failover::CacheFailoverEngine;
use crate::failover::EngineSettings;
use crate::transport::HttpTransport;
use crate::transport::HttpTransportOptions;
use crate::transport::TransportBuildError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Filesystem construction failures.
#[derive(Debug, Error)]
pub enum FileSystemError {
    /// Configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The directory client could not be built.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    /// The HTTP transport could not be built.
    #[error(transparent)]
    Transport(#[from] TransportBuildError),
}

// ============================================================================
// SECTION: Object Info
// ============================================================================

/// Metadata for one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Logical path.
    pub name: String,
    /// Object size in bytes, when the endpoint declared it.
    pub size: Option<u64>,
}

// ============================================================================
// SECTION: Filesystem
// ============================================================================

/// Pelican federation filesystem.
///
/// # Invariants
/// - Every path reaching the engine is normalized and belongs to this
///   instance's federation.
pub struct PelicanFileSystem {
    /// Federation authority (`host[:port]`) accepted in qualified paths.
    federation_host: String,
    /// Whether this instance serves the OSDF federation.
    osdf: bool,
    /// Federation directory client.
    director: Arc<DirectorClient>,
    /// Failover engine.
    engine: CacheFailoverEngine,
}

impl PelicanFileSystem {
    /// Builds a filesystem for the configured federation.
    ///
    /// # Errors
    ///
    /// Returns [`FileSystemError`] when configuration is invalid or a client
    /// cannot be built.
    pub fn new(config: &PelicanConfig) -> Result<Self, FileSystemError> {
        let options: HttpTransportOptions = config.access.parse_passthrough()?;
        let transport = HttpTransport::new(&config.federation.user_agent, &options)?;
        Self::with_backends(
            config,
            Arc::new(transport),
            TokenEnvironment::process(),
            Arc::new(SystemClock),
        )
    }

    /// Builds a filesystem for the OSDF federation, ignoring the configured
    /// discovery URL.
    ///
    /// # Errors
    ///
    /// Returns [`FileSystemError`] when configuration is invalid or a client
    /// cannot be built.
    pub fn osdf(config: &PelicanConfig) -> Result<Self, FileSystemError> {
        let mut config = config.clone();
        config.federation.discovery_url = DEFAULT_DISCOVERY_URL.to_string();
        Self::new(&config)
    }

    /// Builds a filesystem over explicit transport, environment, and clock.
    ///
    /// # Errors
    ///
    /// Returns [`FileSystemError`] when configuration is invalid or the
    /// directory client cannot be built.
    pub fn with_backends(
        config: &PelicanConfig,
        transport: Arc<dyn Transport>,
        environment: TokenEnvironment,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, FileSystemError> {
        config.validate()?;
        let federation_host = config.federation.federation_host()?;
        let director = Arc::new(DirectorClient::new(
            &config.federation,
            config.tokens.unregistered_namespace,
        )?);
        let credentials = CredentialStore::new(
            &config.tokens,
            config.access.authorization(),
            environment,
            Arc::clone(&clock),
        );
        let resolver = Arc::clone(&director) as Arc<dyn NamespaceResolver>;
        let engine = CacheFailoverEngine::new(
            resolver,
            transport,
            credentials,
            clock,
            EngineSettings::from_config(config)?,
        );
        Ok(Self {
            federation_host,
            osdf: config.federation.is_osdf(),
            director,
            engine,
        })
    }

    /// Returns the directory client.
    #[must_use]
    pub fn director(&self) -> &DirectorClient {
        &self.director
    }

    /// Returns the failover engine.
    #[must_use]
    pub const fn engine(&self) -> &CacheFailoverEngine {
        &self.engine
    }

    // ------------------------------------------------------------------------
    // Path handling
    // ------------------------------------------------------------------------

    /// Normalizes a caller path into a logical path for this federation.
    ///
    /// Accepts `/ns/obj`, `pelican://host/ns/obj`, `osdf:///ns/obj` (OSDF
    /// only), `osdf://host/ns/obj`, and `host/ns/obj`.
    ///
    /// # Errors
    ///
    /// Returns [`PelicanError::FederationMismatch`] when the path names a
    /// different federation and [`PelicanError::InvalidPath`] when it cannot
    /// be normalized.
    pub fn check_path(&self, raw: &str) -> Result<String, PelicanError> {
        let raw = raw.trim();
        let path = if raw.starts_with('/') {
            raw.to_string()
        } else if let Some(rest) = raw.strip_prefix("osdf://") {
            if let Some(path) = rest.strip_prefix('/') {
                if !self.osdf {
                    return Err(PelicanError::FederationMismatch(format!(
                        "osdf path {raw} used with federation {}",
                        self.federation_host
                    )));
                }
                format!("/{path}")
            } else {
                self.qualified_path(raw, rest)?
            }
        } else if let Some(rest) = raw.strip_prefix("pelican://") {
            self.qualified_path(raw, rest)?
        } else if raw.contains("://") {
            return Err(PelicanError::InvalidPath(format!("unsupported scheme in {raw}")));
        } else {
            self.qualified_path(raw, raw)?
        };
        normalize_path(&path).ok_or_else(|| PelicanError::InvalidPath(raw.to_string()))
    }

    /// Splits `host/path`, requiring the host to match this federation.
    fn qualified_path(&self, raw: &str, rest: &str) -> Result<String, PelicanError> {
        let url = Url::parse(&format!("pelican://{rest}"))
            .map_err(|err| PelicanError::InvalidPath(format!("{raw}: {err}")))?;
        let host = url.host_str().unwrap_or_default();
        let authority =
            url.port().map_or_else(|| host.to_string(), |port| format!("{host}:{port}"));
        if authority != self.federation_host {
            return Err(PelicanError::FederationMismatch(format!(
                "{raw} does not belong to federation {}",
                self.federation_host
            )));
        }
        Ok(url.path().to_string())
    }

    /// Converts an endpoint URL back into its logical path.
    ///
    /// Inputs that are not absolute URLs are returned unchanged.
    #[must_use]
    pub fn strip_host(raw: &str) -> String {
        match Url::parse(raw) {
            Ok(url) if url.has_host() => url.path().to_string(),
            _ => raw.to_string(),
        }
    }

    // ------------------------------------------------------------------------
    // Data operations
    // ------------------------------------------------------------------------

    /// Runs an operation on a logical path with explicit cancellation.
    ///
    /// # Errors
    ///
    /// Returns [`PelicanError`] as described on [`CacheFailoverEngine::access`].
    pub async fn access(
        &self,
        path: &str,
        operation: Operation,
        cancel: &CancellationToken,
    ) -> Result<TransportResponse, PelicanError> {
        let request = AccessRequest {
            path: self.check_path(path)?,
            operation,
        };
        self.engine.access(request, cancel).await
    }

    /// Reads a whole object.
    ///
    /// # Errors
    ///
    /// Returns [`PelicanError`] when no candidate serves the object.
    pub async fn cat(&self, path: &str) -> Result<Bytes, PelicanError> {
        let operation = Operation::Get {
            range: None,
        };
        Ok(self.access(path, operation, &CancellationToken::new()).await?.body)
    }

    /// Reads bytes `[start, end)` of an object. An empty range reads nothing.
    ///
    /// # Errors
    ///
    /// Returns [`PelicanError`] when no candidate serves the object.
    pub async fn cat_range(&self, path: &str, start: u64, end: u64) -> Result<Bytes, PelicanError> {
        let Some(range) = ByteRange::new(start, end) else {
            self.check_path(path)?;
            return Ok(Bytes::new());
        };
        let operation = Operation::Get {
            range: Some(range),
        };
        Ok(self.access(path, operation, &CancellationToken::new()).await?.body)
    }

    /// Returns object metadata.
    ///
    /// # Errors
    ///
    /// Returns [`PelicanError`] when no candidate serves the object.
    pub async fn info(&self, path: &str) -> Result<ObjectInfo, PelicanError> {
        let name = self.check_path(path)?;
        let response = self.access(&name, Operation::Head, &CancellationToken::new()).await?;
        Ok(ObjectInfo {
            name,
            size: response.content_length,
        })
    }

    /// Returns whether the object exists.
    ///
    /// `false` when the director knows no endpoint or every attempted
    /// endpoint answered `404`.
    ///
    /// # Errors
    ///
    /// Returns [`PelicanError`] for any other failure.
    pub async fn exists(&self, path: &str) -> Result<bool, PelicanError> {
        match self.access(path, Operation::Head, &CancellationToken::new()).await {
            Ok(_) => Ok(true),
            Err(PelicanError::NoAvailableSource(failure))
                if failure.failures.is_empty() || failure.all_not_found() =>
            {
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    /// Uploads an object.
    ///
    /// # Errors
    ///
    /// Returns [`PelicanError`] when no origin accepts the upload.
    pub async fn put(&self, path: &str, body: Bytes) -> Result<(), PelicanError> {
        let operation = Operation::Put {
            body,
        };
        self.access(path, operation, &CancellationToken::new()).await?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------------

    /// Returns the origin URL serving a path.
    ///
    /// # Errors
    ///
    /// Returns [`PelicanError`] when the director knows no origin.
    pub async fn origin_url(&self, path: &str) -> Result<Url, PelicanError> {
        let path = self.check_path(path)?;
        self.director.origin_url(&path).await
    }

    /// Returns the URL listing a collection.
    ///
    /// # Errors
    ///
    /// Returns [`PelicanError`] when the director answer names no listing host.
    pub async fn listing_url(&self, path: &str) -> Result<Url, PelicanError> {
        let path = self.check_path(path)?;
        self.director.resolve_listing(&path).await
    }

    // ------------------------------------------------------------------------
    // Diagnostics and state
    // ------------------------------------------------------------------------

    /// Returns a path's recent attempts, newest first, and whether any exist.
    ///
    /// # Errors
    ///
    /// Returns [`PelicanError::InvalidPath`] when the path cannot be normalized.
    pub fn access_history(&self, path: &str) -> Result<(Vec<AccessRecord>, bool), PelicanError> {
        let path = self.check_path(path)?;
        Ok(self.engine.statistics().get_responses(&path))
    }

    /// Renders every tracked path's history.
    #[must_use]
    pub fn format_history(&self) -> String {
        self.engine.statistics().format_all()
    }

    /// Logs every tracked path's history.
    pub fn print_history(&self) {
        self.engine.statistics().print_all();
    }

    /// Drops the cached resolution for a path.
    ///
    /// # Errors
    ///
    /// Returns [`PelicanError::InvalidPath`] when the path cannot be normalized.
    pub fn invalidate(&self, path: &str) -> Result<(), PelicanError> {
        let path = self.check_path(path)?;
        self.director.invalidate(&path);
        Ok(())
    }

    /// Drops federation metadata, resolutions, tokens, and history.
    pub fn reset(&self) {
        self.director.reset();
        self.engine.reset();
    }
}
