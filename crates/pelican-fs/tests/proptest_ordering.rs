//! Candidate ordering property-based tests.
//!
//! ## Purpose
//! These tests exercise the ordering policy over randomized director lists and
//! preferred cache configurations.
//!
//! ## What is covered
//! - Direct reads never yield a cache.
//! - Preferred entries lead, in configured order, with or without `+`.
//! - Without `+` nothing outside the preferred list is attempted.
//! - With `+` every director candidate is attempted exactly once.
//!
//! ## What is intentionally out of scope
//! - Attempt execution (covered by the engine and federation access tests).
// crates/pelican-fs/tests/proptest_ordering.rs
// ============================================================================
// Module: Ordering Property-Based Tests
// Description: Invariants of the candidate ordering policy.
// Purpose: Ensure ordering never drops, duplicates, or misorders endpoints.
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeSet;

use pelican_config::PreferredCaches;
use pelican_core::CacheCandidate;
use pelican_core::CandidateKind;
use pelican_core::CandidateList;
use pelican_fs::order_candidates;
use proptest::prelude::*;
use url::Url;

fn host_url(index: u8) -> Url {
    Url::parse(&format!("https://cache{index}.example.org/")).unwrap()
}

fn director_list(caches: &[u8], origins: &[u8]) -> CandidateList {
    let mut candidates: Vec<CacheCandidate> = caches
        .iter()
        .enumerate()
        .map(|(pri, index)| {
            let priority = u32::try_from(pri).unwrap();
            CacheCandidate::new(&host_url(*index), CandidateKind::Cache, priority)
        })
        .collect();
    candidates.extend(origins.iter().map(|index| {
        CacheCandidate::new(&host_url(index + 100), CandidateKind::Origin, 0)
    }));
    CandidateList::new(candidates, Vec::new())
}

fn unique(values: Vec<u8>) -> Vec<u8> {
    let mut seen = BTreeSet::new();
    values.into_iter().filter(|value| seen.insert(*value)).collect()
}

fn preferred(indexes: &[u8], include_director: bool) -> PreferredCaches {
    PreferredCaches {
        urls: indexes.iter().map(|index| host_url(*index)).collect(),
        include_director,
    }
}

proptest! {
    #[test]
    fn direct_reads_only_yield_origins(
        caches in proptest::collection::vec(0_u8 .. 20, 0 .. 6),
        origins in proptest::collection::vec(0_u8 .. 3, 0 .. 3),
        wanted in proptest::collection::vec(0_u8 .. 20, 0 .. 4),
        sentinel in any::<bool>(),
    ) {
        let list = director_list(&unique(caches), &unique(origins));
        let order = order_candidates(&list, true, &preferred(&unique(wanted), sentinel));
        prop_assert!(order.iter().all(|candidate| candidate.kind == CandidateKind::Origin));
        prop_assert_eq!(order.len(), list.origins().count());
    }

    #[test]
    fn preferred_entries_lead_in_configured_order(
        caches in proptest::collection::vec(0_u8 .. 20, 0 .. 6),
        wanted in proptest::collection::vec(0_u8 .. 20, 1 .. 4),
        sentinel in any::<bool>(),
    ) {
        let wanted = unique(wanted);
        let list = director_list(&unique(caches), &[]);
        let order = order_candidates(&list, false, &preferred(&wanted, sentinel));
        let leading: Vec<Url> = order.iter().take(wanted.len()).map(|c| c.url.clone()).collect();
        let expected: Vec<Url> = wanted.iter().map(|index| host_url(*index)).collect();
        prop_assert_eq!(leading, expected);
        if !sentinel {
            prop_assert_eq!(order.len(), wanted.len());
        }
    }

    #[test]
    fn sentinel_keeps_every_director_candidate_once(
        caches in proptest::collection::vec(0_u8 .. 20, 0 .. 6),
        origins in proptest::collection::vec(0_u8 .. 3, 0 .. 3),
        wanted in proptest::collection::vec(0_u8 .. 20, 0 .. 4),
    ) {
        let list = director_list(&unique(caches), &unique(origins));
        let order = order_candidates(&list, false, &preferred(&unique(wanted), true));
        let urls: Vec<&Url> = order.iter().map(|candidate| &candidate.url).collect();
        let distinct: BTreeSet<&Url> = urls.iter().copied().collect();
        prop_assert_eq!(distinct.len(), urls.len());
        for candidate in list.candidates() {
            prop_assert!(distinct.contains(&candidate.url));
        }
    }

    #[test]
    fn empty_preferences_keep_director_order(
        caches in proptest::collection::vec(0_u8 .. 20, 0 .. 6),
        origins in proptest::collection::vec(0_u8 .. 3, 0 .. 3),
    ) {
        let list = director_list(&unique(caches), &unique(origins));
        let order = order_candidates(&list, false, &PreferredCaches::default());
        prop_assert_eq!(order, list.candidates().to_vec());
    }
}
