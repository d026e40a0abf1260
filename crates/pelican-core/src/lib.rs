// crates/pelican-core/src/lib.rs
// ============================================================================
// Module: Pelican Core Library
// Description: Data model, error taxonomy, and backend-agnostic interfaces.
// Purpose: Shared vocabulary for namespace resolution, failover, and tokens.
// Dependencies: serde, thiserror, time, url
// ============================================================================

//! ## Overview
//! `pelican-core` defines the types exchanged between the directory client,
//! the credential store, the access statistics tracker, and the cache failover
//! engine. It performs no I/O; network and filesystem access live behind the
//! [`Transport`], [`NamespaceResolver`], and [`Clock`] interfaces.
//! Invariants:
//! - Candidate lists are ordered by kind (caches first) then ascending priority.
//! - Tokens and access records are immutable once constructed.
//! - Namespace prefix matching is path-component aware.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;
pub use interfaces::*;
