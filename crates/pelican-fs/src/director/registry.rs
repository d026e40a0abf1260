// crates/pelican-fs/src/director/registry.rs
// ============================================================================
// Module: Namespace Registry
// Description: Namespace policies seen from director responses.
// Purpose: Longest-prefix policy lookup for paths the director left undescribed.
// Dependencies: pelican-core
// ============================================================================

//! ## Overview
//! Every namespace policy the director describes is registered by prefix.
//! Lookup returns the longest registered prefix covering a path, so a more
//! specific registration always overrides its ancestors.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use pelican_core::NamespaceInfo;
use pelican_core::PolicySource;

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Namespace policies keyed by prefix.
///
/// # Invariants
/// - One policy per prefix; later registrations replace earlier ones.
#[derive(Debug, Default)]
pub struct NamespaceRegistry {
    /// Policies keyed by normalized prefix.
    entries: Mutex<BTreeMap<String, NamespaceInfo>>,
}

impl NamespaceRegistry {
    /// Records a policy for its prefix.
    pub fn register(&self, info: NamespaceInfo) {
        self.lock().insert(info.path_prefix.clone(), info);
    }

    /// Returns the policy with the longest prefix covering `path`.
    ///
    /// The returned policy is marked [`PolicySource::Registry`].
    #[must_use]
    pub fn lookup(&self, path: &str) -> Option<NamespaceInfo> {
        let entries = self.lock();
        entries
            .values()
            .filter(|info| info.covers(path))
            .max_by_key(|info| info.path_prefix.trim_end_matches('/').len())
            .map(|info| NamespaceInfo {
                source: PolicySource::Registry,
                ..info.clone()
            })
    }

    /// Returns the number of registered prefixes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drops every registration.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Acquires the registry lock, recovering from poisoning.
    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, NamespaceInfo>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
