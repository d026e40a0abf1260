// crates/pelican-core/src/core/mod.rs
// ============================================================================
// Module: Pelican Core Model
// Description: Federation, namespace, candidate, token, and access records.
// Purpose: Group the data model used across the Pelican client crates.
// Dependencies: serde, time, url
// ============================================================================

//! ## Overview
//! Core model types shared across the workspace. Submodules are re-exported
//! at the crate root for ergonomic imports.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod access;
pub mod candidate;
pub mod error;
pub mod namespace;
pub mod token;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use access::AccessRecord;
pub use candidate::CacheCandidate;
pub use candidate::CandidateKind;
pub use candidate::CandidateList;
pub use candidate::endpoint_base;
pub use error::CandidateFailure;
pub use error::DiscoveryError;
pub use error::NoAvailableSource;
pub use error::NoCredentialsError;
pub use error::PelicanError;
pub use error::SourceRejection;
pub use error::TokenRejection;
pub use namespace::FederationMetadata;
pub use namespace::NamespaceInfo;
pub use namespace::PolicySource;
pub use namespace::normalize_path;
pub use namespace::path_has_prefix;
pub use token::OperationClass;
pub use token::ScopeGrant;
pub use token::ScopeRequirements;
pub use token::Token;
pub use token::TokenSource;
