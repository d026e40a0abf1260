// crates/pelican-fs/src/credentials/discovery.rs
// ============================================================================
// Module: Token Discovery
// Description: Ordered token sources and the environment they read from.
// Purpose: Locate candidate token content without validating it.
// Dependencies: pelican-core, tokio, tracing
// ============================================================================

//! ## Overview
//! Sources are planned up front from configuration and environment, then
//! read lazily so later sources are never touched once a token is accepted.
//! The order is fixed:
//! 1. Explicit `Authorization` header.
//! 2. Configured token file.
//! 3. `BEARER_TOKEN` (literal).
//! 4. `BEARER_TOKEN_FILE` (path).
//! 5. `TOKEN` (legacy path).
//! 6. Default bearer token file.
//! 7. HTCondor credentials: `$_CONDOR_CREDS`, then `./.condor_creds`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use pelican_core::TokenRejection;
use pelican_core::TokenSource;
use tracing::debug;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Literal token variable.
pub const BEARER_TOKEN_VAR: &str = "BEARER_TOKEN";
/// Token file path variable.
pub const BEARER_TOKEN_FILE_VAR: &str = "BEARER_TOKEN_FILE";
/// Legacy token file path variable.
pub const LEGACY_TOKEN_VAR: &str = "TOKEN";
/// HTCondor credential directory variable.
pub const CONDOR_CREDS_VAR: &str = "_CONDOR_CREDS";
/// Runtime directory variable used for the default token file.
pub const XDG_RUNTIME_DIR_VAR: &str = "XDG_RUNTIME_DIR";
/// Conventional HTCondor credential directory under the working directory.
const CONDOR_CREDS_DIR: &str = ".condor_creds";
/// Default HTCondor SciTokens credential file.
const SCITOKENS_USE_FILE: &str = "scitokens.use";
/// Extension of HTCondor credential files.
const USE_EXTENSION: &str = "use";
/// Maximum token file size in bytes.
pub(crate) const MAX_TOKEN_FILE_BYTES: u64 = 64 * 1024;

// ============================================================================
// SECTION: Environment
// ============================================================================

/// Environment consulted during token discovery.
///
/// # Invariants
/// - When `overrides` is present the process environment is never read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenEnvironment {
    /// Optional variable map used instead of the process environment.
    overrides: Option<BTreeMap<String, String>>,
    /// Working directory used for `.condor_creds`.
    working_dir: Option<PathBuf>,
    /// Replacement for the computed default token file.
    default_token_file: Option<PathBuf>,
}

impl TokenEnvironment {
    /// Reads variables from the process environment.
    #[must_use]
    pub fn process() -> Self {
        Self::default()
    }

    /// Reads variables only from `overrides`.
    #[must_use]
    pub fn with_overrides(overrides: BTreeMap<String, String>) -> Self {
        Self {
            overrides: Some(overrides),
            ..Self::default()
        }
    }

    /// Sets the working directory used for `.condor_creds`.
    #[must_use]
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Replaces the computed default token file location.
    #[must_use]
    pub fn default_token_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.default_token_file = Some(path.into());
        self
    }

    /// Returns a non-empty variable value.
    #[must_use]
    pub fn var(&self, key: &str) -> Option<String> {
        let value = match &self.overrides {
            Some(overrides) => overrides.get(key).cloned(),
            None => std::env::var(key).ok(),
        };
        value.filter(|value| !value.trim().is_empty())
    }

    /// Returns the default bearer token file location.
    ///
    /// `$XDG_RUNTIME_DIR/bt_u<uid>` when the runtime directory is set,
    /// otherwise `/tmp/bt_u<uid>`.
    #[must_use]
    pub fn default_bearer_token_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.default_token_file {
            return Some(path.clone());
        }
        let name = format!("bt_u{}", current_uid()?);
        let dir =
            self.var(XDG_RUNTIME_DIR_VAR).map_or_else(|| PathBuf::from("/tmp"), PathBuf::from);
        Some(dir.join(name))
    }

    /// Returns the HTCondor credential directories in search order.
    #[must_use]
    pub fn condor_creds_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::with_capacity(2);
        if let Some(dir) = self.var(CONDOR_CREDS_VAR) {
            dirs.push(PathBuf::from(dir));
        }
        let local = self
            .working_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONDOR_CREDS_DIR);
        if !dirs.contains(&local) {
            dirs.push(local);
        }
        dirs
    }
}

/// Returns the effective user id of this process.
#[cfg(unix)]
fn current_uid() -> Option<u32> {
    use std::os::unix::fs::MetadataExt as _;
    std::fs::metadata("/proc/self").map(|meta| meta.uid()).ok()
}

/// Returns the effective user id of this process.
#[cfg(not(unix))]
const fn current_uid() -> Option<u32> {
    None
}

// ============================================================================
// SECTION: Source Planning
// ============================================================================

/// A planned token source, not yet read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedSource {
    /// Content already in hand.
    Literal {
        /// Source label.
        source: TokenSource,
        /// Token content.
        content: String,
    },
    /// A file that must be read; absence is reported as a rejection.
    File {
        /// Source label.
        source: TokenSource,
        /// File to read.
        path: PathBuf,
    },
    /// A file that is silently skipped when absent.
    OptionalFile {
        /// Source label.
        source: TokenSource,
        /// File to read.
        path: PathBuf,
    },
    /// An HTCondor credential directory to expand.
    CondorDirectory {
        /// Directory to search.
        dir: PathBuf,
    },
}

/// Inputs for planning token sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscoveryInputs<'a> {
    /// Explicit `Authorization` header value.
    pub header: Option<&'a str>,
    /// Configured token file.
    pub token_location: Option<&'a Path>,
    /// Configured default token file override.
    pub default_token_file: Option<&'a Path>,
}

/// Removes a leading `Bearer` auth scheme, matched case-insensitively.
fn strip_bearer_scheme(header: &str) -> &str {
    match header.split_once(char::is_whitespace) {
        Some((scheme, credentials)) if scheme.eq_ignore_ascii_case("bearer") => credentials.trim(),
        _ => header,
    }
}

/// Plans every token source in discovery order.
#[must_use]
pub fn plan_sources(
    inputs: DiscoveryInputs<'_>,
    environment: &TokenEnvironment,
) -> Vec<PlannedSource> {
    let mut plan = Vec::new();
    if let Some(header) = inputs.header {
        let content = strip_bearer_scheme(header.trim());
        if !content.is_empty() {
            plan.push(PlannedSource::Literal {
                source: TokenSource::Header,
                content: content.to_string(),
            });
        }
    }
    if let Some(path) = inputs.token_location {
        plan.push(PlannedSource::File {
            source: TokenSource::ConfiguredFile {
                path: path.to_path_buf(),
            },
            path: path.to_path_buf(),
        });
    }
    if let Some(token) = environment.var(BEARER_TOKEN_VAR) {
        plan.push(PlannedSource::Literal {
            source: TokenSource::EnvVar {
                variable: BEARER_TOKEN_VAR.to_string(),
            },
            content: token,
        });
    }
    for variable in [BEARER_TOKEN_FILE_VAR, LEGACY_TOKEN_VAR] {
        if let Some(path) = environment.var(variable) {
            let path = PathBuf::from(path);
            plan.push(PlannedSource::File {
                source: TokenSource::EnvFile {
                    variable: variable.to_string(),
                    path: path.clone(),
                },
                path,
            });
        }
    }
    let default_file = inputs
        .default_token_file
        .map(Path::to_path_buf)
        .or_else(|| environment.default_bearer_token_file());
    if let Some(path) = default_file {
        plan.push(PlannedSource::OptionalFile {
            source: TokenSource::DefaultFile {
                path: path.clone(),
            },
            path,
        });
    }
    for dir in environment.condor_creds_dirs() {
        plan.push(PlannedSource::CondorDirectory {
            dir,
        });
    }
    plan
}

// ============================================================================
// SECTION: Reading
// ============================================================================

/// Reads a token file, enforcing the size limit.
///
/// # Errors
///
/// Returns [`TokenRejection::Unreadable`] when the file cannot be read or is
/// too large.
pub async fn read_token_file(path: &Path) -> Result<String, TokenRejection> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|err| TokenRejection::Unreadable(format!("{}: {err}", path.display())))?;
    if !metadata.is_file() {
        return Err(TokenRejection::Unreadable(format!("{} is not a file", path.display())));
    }
    if metadata.len() > MAX_TOKEN_FILE_BYTES {
        return Err(TokenRejection::Unreadable(format!(
            "{} exceeds {MAX_TOKEN_FILE_BYTES} bytes",
            path.display()
        )));
    }
    tokio::fs::read_to_string(path)
        .await
        .map_err(|err| TokenRejection::Unreadable(format!("{}: {err}", path.display())))
}

/// Returns true when `path` names an existing file.
pub async fn file_exists(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok_and(|meta| meta.is_file())
}

/// Lists HTCondor credential files in `dir` in search order.
///
/// With a credential name, `<name with dots as underscores>.use` then
/// `<name>.use` are tried first. Then `scitokens.use`, then every other
/// `*.use` file sorted by name. Hidden files are skipped.
pub async fn condor_credential_files(dir: &Path, token_name: Option<&str>) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Some(name) = token_name {
        let mut names = Vec::with_capacity(2);
        if name.contains('.') {
            names.push(name.replace('.', "_"));
        }
        names.push(name.to_string());
        for name in names {
            let path = dir.join(format!("{name}.{USE_EXTENSION}"));
            if file_exists(&path).await && !files.contains(&path) {
                files.push(path);
            }
        }
    }
    let scitokens = dir.join(SCITOKENS_USE_FILE);
    if file_exists(&scitokens).await && !files.contains(&scitokens) {
        files.push(scitokens);
    }
    let mut others = Vec::new();
    match tokio::fs::read_dir(dir).await {
        Ok(mut entries) => loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let path = entry.path();
                    let is_candidate = path.file_name().and_then(|name| name.to_str()).is_some_and(
                        |name| !name.starts_with('.') && name != SCITOKENS_USE_FILE,
                    ) && path.extension().is_some_and(|ext| ext == USE_EXTENSION);
                    if is_candidate && !files.contains(&path) {
                        others.push(path);
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    debug!(
                        dir = %dir.display(),
                        error = %err,
                        "condor credential listing interrupted"
                    );
                    break;
                }
            }
        },
        Err(err) => {
            debug!(dir = %dir.display(), error = %err, "condor credential directory unavailable");
        }
    }
    others.sort();
    files.extend(others);
    files
}
