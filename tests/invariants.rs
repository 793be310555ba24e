//! Property-based tests over randomly generated single-entity
//! timelines, checking the chain, state-sum, and conservation
//! invariants from the specification's testable properties section.
//!
//! Coalescing only ever merges adjacent rectangles -- it sums
//! durations and state vectors rather than discarding them -- so the
//! total time an entity spent in each state is exactly preserved
//! regardless of how aggressively the budget forces merges. That
//! makes conservation checkable against budgets far below the number
//! of transitions, which is the regime most likely to expose a bug in
//! the merge bookkeeping.

mod common;

use common::{datum, ingest, rectangles};
use proptest::prelude::*;
use statemap::IngestConfig;

const NSTATES: u32 = 4;

/// Generates a strictly increasing sequence of `(time, state)` pairs
/// for a single entity "A", long enough to force repeated coalescing
/// under a small rectangle budget.
fn transition_sequence() -> impl Strategy<Value = Vec<(u64, u32)>> {
    proptest::collection::vec((1u64..=50, 0u32..NSTATES), 2..60).prop_map(|steps| {
        let mut time = 0u64;
        let mut out = Vec::with_capacity(steps.len() + 1);
        out.push((0u64, steps[0].1));
        for (delta, state) in steps {
            time += delta;
            out.push((time, state));
        }
        out
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn chain_is_contiguous_and_state_sums_match_duration(
        steps in transition_sequence(),
        maxrect in 1u32..6,
    ) {
        let data: Vec<_> = steps.iter().map(|&(t, s)| datum("A", t, s)).collect();
        let config = IngestConfig { maxrect, ..Default::default() };
        let (records, _) = ingest(NSTATES, &data, config);
        let rects = rectangles(&records);

        prop_assert!(!rects.is_empty());

        for w in rects.windows(2) {
            let (_, t0, d0, _) = w[0];
            let (_, t1, _, _) = w[1];
            prop_assert_eq!(t0 + d0, t1, "chain must be contiguous with no gaps or overlaps");
        }

        for &(_, _, duration, states) in &rects {
            let sum: u64 = states.iter().sum();
            prop_assert_eq!(sum, duration, "state durations must sum to the rectangle's duration");
        }
    }

    #[test]
    fn total_duration_per_state_is_conserved_across_coalescing(
        steps in transition_sequence(),
        maxrect in 1u32..6,
    ) {
        let data: Vec<_> = steps.iter().map(|&(t, s)| datum("A", t, s)).collect();

        let uncoalesced = ingest(NSTATES, &data, IngestConfig { maxrect: 1_000_000, ..Default::default() }).0;
        let coalesced = ingest(NSTATES, &data, IngestConfig { maxrect, ..Default::default() }).0;

        let expected = totals(&rectangles(&uncoalesced));
        let actual = totals(&rectangles(&coalesced));
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn budget_is_respected_in_final_emission(
        steps in transition_sequence(),
        maxrect in 1u32..6,
    ) {
        let data: Vec<_> = steps.iter().map(|&(t, s)| datum("A", t, s)).collect();
        let config = IngestConfig { maxrect, ..Default::default() };
        let (records, _) = ingest(NSTATES, &data, config);
        let rects = rectangles(&records);

        // A single entity always has a coalesce partner once it has
        // more than one rectangle, so the budget is never left
        // exceeded for this single-entity fixture.
        prop_assert!(rects.len() as u32 <= maxrect);
    }
}

fn totals(rects: &[(&str, u64, u64, &[u64])]) -> Vec<u64> {
    let mut totals = vec![0u64; NSTATES as usize];
    for &(_, _, _, states) in rects {
        for (i, s) in states.iter().enumerate() {
            totals[i] += s;
        }
    }
    totals
}
