// crates/pelican-config/src/lib.rs
// ============================================================================
// Module: Pelican Config Library
// Description: Canonical config model and validation for the Pelican client.
// Purpose: Single source of truth for pelican-fs.toml semantics.
// Dependencies: pelican-core, serde, toml, url
// ============================================================================

//! ## Overview
//! `pelican-config` defines the closed configuration structure recognized by
//! the Pelican client: federation discovery, cache ordering preferences,
//! extra request headers, token discovery, and one opaque pass-through table
//! for transport-specific options. Validation is strict and fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
