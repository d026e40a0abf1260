// crates/pelican-fs/src/stats.rs
// ============================================================================
// Module: Access Statistics
// Description: Bounded per-path history of endpoint attempts.
// Purpose: Passive diagnostics sink written by the failover engine.
// Dependencies: pelican-core, tracing
// ============================================================================

//! ## Overview
//! [`AccessStatistics`] keeps a fixed-capacity ring of [`AccessRecord`]s per
//! logical path. Inserting beyond capacity evicts the oldest record for that
//! path only. Recording never fails: a poisoned lock is recovered because
//! each record is published whole under the lock.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use pelican_core::AccessRecord;
use tracing::info;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Records retained per logical path.
pub const HISTORY_CAPACITY: usize = 3;

// ============================================================================
// SECTION: Access Statistics
// ============================================================================

/// Per-path access history owned by one engine instance.
///
/// # Invariants
/// - No path ever holds more than [`HISTORY_CAPACITY`] records.
/// - Readers never observe a partially inserted record.
#[derive(Debug, Default)]
pub struct AccessStatistics {
    /// Ring buffers keyed by logical path, oldest first.
    histories: Mutex<HashMap<String, VecDeque<AccessRecord>>>,
}

impl AccessStatistics {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record to its path's history, evicting the oldest when full.
    pub fn record(&self, record: AccessRecord) {
        let mut histories = self.lock();
        let history = histories
            .entry(record.namespace_path.clone())
            .or_insert_with(|| VecDeque::with_capacity(HISTORY_CAPACITY));
        if history.len() == HISTORY_CAPACITY {
            history.pop_front();
        }
        history.push_back(record);
    }

    /// Returns the records for `path`, newest first, and whether any exist.
    #[must_use]
    pub fn get_responses(&self, path: &str) -> (Vec<AccessRecord>, bool) {
        let histories = self.lock();
        let records: Vec<AccessRecord> = histories
            .get(path)
            .map(|history| history.iter().rev().cloned().collect())
            .unwrap_or_default();
        let has_data = !records.is_empty();
        (records, has_data)
    }

    /// Returns every tracked path in sorted order.
    #[must_use]
    pub fn tracked_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.lock().keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Renders every tracked path's history for human inspection.
    ///
    /// Paths are sorted; records within a path are newest first.
    #[must_use]
    pub fn format_all(&self) -> String {
        let snapshot = self.snapshot();
        let mut rendered = String::new();
        for (path, records) in snapshot {
            let _ = writeln!(rendered, "{path}:");
            for record in records {
                let _ = writeln!(rendered, "  {record}");
            }
        }
        rendered
    }

    /// Emits every tracked path's history as structured log events.
    pub fn print_all(&self) {
        for (path, records) in self.snapshot() {
            let rendered: Vec<String> = records.iter().map(ToString::to_string).collect();
            info!(
                path = %path,
                attempts = rendered.len(),
                history = %rendered.join("; "),
                "access history"
            );
        }
    }

    /// Drops all recorded history.
    pub fn reset(&self) {
        self.lock().clear();
    }

    /// Copies every history newest first, sorted by path.
    fn snapshot(&self) -> Vec<(String, Vec<AccessRecord>)> {
        let histories = self.lock();
        let mut snapshot: Vec<(String, Vec<AccessRecord>)> = histories
            .iter()
            .map(|(path, history)| (path.clone(), history.iter().rev().cloned().collect()))
            .collect();
        drop(histories);
        snapshot.sort_by(|left, right| left.0.cmp(&right.0));
        snapshot
    }

    /// Acquires the history lock, recovering from poisoning.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, VecDeque<AccessRecord>>> {
        self.histories.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
