//! Property-based tests for distance and matching.
//!
//! # Invariants tested
//!
//! - **Identity and symmetry:** `haversine(a, a) == 0` and
//!   `haversine(a, b) == haversine(b, a)`.
//! - **Radius compliance:** no match lies further than the radius.
//! - **Unlocated donors:** candidates without a coordinate never reach the
//!   classifier nor the result.
//! - **Unknown seeker:** an unlabelled seeker yields no matches.
//! - **Idempotence:** repeated searches agree, whatever the concurrency.
//! - **Membership:** the result is exactly the same-cluster set in range.

use std::collections::BTreeSet;

use lifeline_core::test_support::{RecordingClassifier, StubClassifier};
use lifeline_core::{
    ClusterLabel, Coordinate, DonorCandidate, GeoClassifier, MatchConfig, NearbyMatcher,
    NearbyOutcome, haversine_km,
};
use proptest::prelude::*;

fn coordinate_strategy() -> impl Strategy<Value = Coordinate> {
    (-90.0_f64..=90.0, -180.0_f64..=180.0).prop_map(|(latitude, longitude)| {
        Coordinate::new(latitude, longitude).expect("finite coordinate")
    })
}

fn label_strategy() -> impl Strategy<Value = ClusterLabel> {
    prop_oneof![
        4 => (0_u32..3).prop_map(ClusterLabel::Assigned),
        1 => Just(ClusterLabel::Unknown),
    ]
}

/// Donors scattered within roughly 25 km of the origin, some unlocated.
fn donor_strategy() -> impl Strategy<Value = Vec<(Option<(f64, f64)>, ClusterLabel)>> {
    prop::collection::vec(
        (
            prop::option::weighted(0.8, (-0.2_f64..0.2, -0.2_f64..0.2)),
            label_strategy(),
        ),
        0..24,
    )
}

struct Scenario {
    classifier: StubClassifier,
    candidates: Vec<DonorCandidate>,
}

fn build_scenario(
    seeker: Coordinate,
    seeker_label: ClusterLabel,
    donors: &[(Option<(f64, f64)>, ClusterLabel)],
) -> Scenario {
    let mut classifier =
        StubClassifier::uniform(ClusterLabel::Unknown).with_label(seeker, seeker_label);
    let mut candidates = Vec::with_capacity(donors.len());
    for (index, (position, label)) in donors.iter().enumerate() {
        let mut candidate = DonorCandidate::new(format!("donor-{index:02}"));
        if let Some((latitude, longitude)) = position {
            let at = Coordinate::new(*latitude, *longitude).expect("finite coordinate");
            classifier = classifier.with_label(at, *label);
            candidate = candidate.with_coordinate(at);
        }
        candidates.push(candidate);
    }
    Scenario {
        classifier,
        candidates,
    }
}

fn run<C: GeoClassifier>(
    matcher: &NearbyMatcher<C>,
    seeker: Coordinate,
    candidates: &[DonorCandidate],
) -> NearbyOutcome {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("runtime builds")
        .block_on(matcher.find_nearby(seeker, candidates))
}

fn matched_ids(outcome: &NearbyOutcome) -> BTreeSet<String> {
    outcome
        .matches
        .iter()
        .map(|m| m.candidate.id.clone())
        .collect()
}

fn classify(classifier: &StubClassifier, at: Coordinate) -> ClusterLabel {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("runtime builds")
        .block_on(classifier.classify(at))
        .map_or(ClusterLabel::Unknown, |assignment| assignment.label)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: the distance from a point to itself is zero.
    #[test]
    fn haversine_identity(a in coordinate_strategy()) {
        prop_assert_eq!(haversine_km(a, a), 0.0);
    }

    /// Property: distance does not depend on argument order.
    #[test]
    fn haversine_symmetry(a in coordinate_strategy(), b in coordinate_strategy()) {
        prop_assert_eq!(haversine_km(a, b), haversine_km(b, a));
    }

    /// Property: no result lies beyond the radius, and the result is exactly
    /// the set of same-cluster located donors within it.
    #[test]
    fn matches_are_same_cluster_and_within_radius(
        seeker_label in label_strategy(),
        donors in donor_strategy(),
        radius_km in 0.0_f64..30.0,
    ) {
        let seeker = Coordinate::new(0.0, 0.0).expect("origin");
        let scenario = build_scenario(seeker, seeker_label, &donors);
        let config = MatchConfig::new(radius_km, 4).expect("valid config");
        let matcher = NearbyMatcher::with_config(scenario.classifier.clone(), config)
            .expect("valid matcher");
        let outcome = run(&matcher, seeker, &scenario.candidates);

        for found in &outcome.matches {
            prop_assert!(found.distance_km <= radius_km);
        }

        let expected: BTreeSet<String> = scenario
            .candidates
            .iter()
            .filter_map(|candidate| {
                let at = candidate.coordinate?;
                let label = classify(&scenario.classifier, at);
                (label.matches(seeker_label) && haversine_km(seeker, at) <= radius_km)
                    .then(|| candidate.id.clone())
            })
            .collect();
        prop_assert_eq!(matched_ids(&outcome), expected);
    }

    /// Property: unlocated candidates never reach the classifier nor the
    /// result.
    #[test]
    fn unlocated_candidates_are_invisible(donors in donor_strategy()) {
        let seeker = Coordinate::new(0.0, 0.0).expect("origin");
        let scenario = build_scenario(seeker, ClusterLabel::Assigned(0), &donors);
        let matcher = NearbyMatcher::new(RecordingClassifier::wrapping(scenario.classifier));
        let outcome = run(&matcher, seeker, &scenario.candidates);

        let unlocated: BTreeSet<String> = scenario
            .candidates
            .iter()
            .filter(|candidate| candidate.coordinate.is_none())
            .map(|candidate| candidate.id.clone())
            .collect();
        prop_assert!(matched_ids(&outcome).is_disjoint(&unlocated));

        let located = scenario.candidates.len() - unlocated.len();
        let calls = matcher.classifier().calls();
        let expected_calls = if located == 0 { 0 } else { located + 1 };
        prop_assert_eq!(calls.len(), expected_calls);
        prop_assert_eq!(outcome.diagnostics.without_coordinate, unlocated.len());
    }

    /// Property: an unlabelled seeker never matches anyone.
    #[test]
    fn unknown_seeker_matches_nothing(donors in donor_strategy()) {
        let seeker = Coordinate::new(0.0, 0.0).expect("origin");
        let scenario = build_scenario(seeker, ClusterLabel::Unknown, &donors);
        let matcher = NearbyMatcher::new(scenario.classifier);
        let outcome = run(&matcher, seeker, &scenario.candidates);
        prop_assert!(outcome.matches.is_empty());
    }

    /// Property: identical inputs give identical results, independent of
    /// how many classification calls run at once.
    #[test]
    fn searches_are_idempotent(
        donors in donor_strategy(),
        concurrency in 1_usize..16,
    ) {
        let seeker = Coordinate::new(0.0, 0.0).expect("origin");
        let scenario = build_scenario(seeker, ClusterLabel::Assigned(1), &donors);
        let sequential = NearbyMatcher::with_config(
            scenario.classifier.clone(),
            MatchConfig::new(10.0, 1).expect("valid config"),
        )
        .expect("valid matcher");
        let parallel = NearbyMatcher::with_config(
            scenario.classifier,
            MatchConfig::new(10.0, concurrency).expect("valid config"),
        )
        .expect("valid matcher");

        let first = run(&sequential, seeker, &scenario.candidates);
        let second = run(&sequential, seeker, &scenario.candidates);
        let third = run(&parallel, seeker, &scenario.candidates);
        prop_assert_eq!(&first.matches, &second.matches);
        prop_assert_eq!(&first.matches, &third.matches);
    }
}
