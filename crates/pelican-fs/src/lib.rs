// crates/pelican-fs/src/lib.rs
// ============================================================================
// Module: Pelican FS Library
// Description: Federation client for Pelican and OSDF object namespaces.
// Purpose: Resolve namespaces, order caches, validate tokens, and fail over.
// Dependencies: pelican-config, pelican-core, reqwest, tokio, tracing
// ============================================================================

//! ## Overview
//! `pelican-fs` reads and writes objects in a Pelican data federation. The
//! [`DirectorClient`] discovers the federation and asks its director which
//! caches and origins serve a path; the [`CredentialStore`] finds a bearer
//! token the namespace accepts; the [`CacheFailoverEngine`] tries each
//! endpoint in order and keeps a short [`AccessStatistics`] history per path.
//! [`PelicanFileSystem`] wires them together behind logical paths.
//! Security posture: director answers and token files are untrusted input.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod credentials;
pub mod director;
pub mod failover;
pub mod filesystem;
pub mod stats;
pub mod transport;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use credentials::CredentialStore;
pub use credentials::TokenEnvironment;
pub use director::DirectorClient;
pub use failover::AccessRequest;
pub use failover::CacheFailoverEngine;
pub use failover::EngineSettings;
pub use failover::order_candidates;
pub use filesystem::FileSystemError;
pub use filesystem::ObjectInfo;
pub use filesystem::PelicanFileSystem;
pub use stats::AccessStatistics;
pub use transport::HttpTransport;
pub use transport::HttpTransportOptions;
