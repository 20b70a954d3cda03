//! The nearby-match engine.
//!
//! [`NearbyMatcher::find_nearby`] resolves the seeker's cluster first, then
//! classifies every locatable candidate with bounded concurrency, keeps the
//! candidates sharing the seeker's cluster and finally drops those further
//! than the configured radius. Classification failures never abort a search:
//! they turn into [`ClusterLabel::Unknown`] and are counted in
//! [`MatchDiagnostics`].

use std::time::Duration;

use futures_util::{StreamExt, stream};
use log::{debug, info, warn};
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{
    ClassifierError, ClusterAssignment, ClusterLabel, Coordinate, DonorCandidate, GeoClassifier,
    ModelDiagnostics, haversine_km,
};

/// Search radius used when none is configured.
pub const DEFAULT_RADIUS_KM: f64 = 10.0;

/// Classification calls allowed in flight at once by default.
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Tunables for [`NearbyMatcher`].
///
/// # Examples
///
/// ```
/// use lifeline_core::MatchConfig;
///
/// # fn main() -> Result<(), lifeline_core::MatchConfigError> {
/// let config = MatchConfig::new(5.0, 4)?;
/// assert_eq!(config.radius_km, 5.0);
/// assert!(MatchConfig::new(-1.0, 4).is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct MatchConfig {
    /// Inclusive search radius in kilometres.
    pub radius_km: f64,
    /// Upper bound on concurrent classification calls.
    pub max_concurrency: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            radius_km: DEFAULT_RADIUS_KM,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

impl MatchConfig {
    /// Build and validate a configuration.
    ///
    /// # Errors
    ///
    /// See [`MatchConfig::validate`].
    pub fn new(radius_km: f64, max_concurrency: usize) -> Result<Self, MatchConfigError> {
        let config = Self {
            radius_km,
            max_concurrency,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the radius is finite and non-negative and concurrency is at
    /// least one.
    ///
    /// # Errors
    ///
    /// Returns [`MatchConfigError`] naming the offending value.
    pub fn validate(&self) -> Result<(), MatchConfigError> {
        if !self.radius_km.is_finite() || self.radius_km < 0.0 {
            return Err(MatchConfigError::InvalidRadius {
                radius_km: self.radius_km,
            });
        }
        if self.max_concurrency == 0 {
            return Err(MatchConfigError::ZeroConcurrency);
        }
        Ok(())
    }
}

/// Errors raised by [`MatchConfig::validate`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchConfigError {
    /// Radius was negative, NaN or infinite.
    #[error("search radius must be a finite, non-negative number of kilometres, got {radius_km}")]
    InvalidRadius {
        /// Rejected radius.
        radius_km: f64,
    },
    /// Concurrency was zero.
    #[error("max concurrency must be at least 1")]
    ZeroConcurrency,
}

/// A candidate that passed both the cluster and the radius filter.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MatchResult {
    /// The matched donor, with `cluster_label` set to the label it matched on.
    pub candidate: DonorCandidate,
    /// Great-circle distance from the seeker.
    pub distance_km: f64,
}

/// Counters describing how a search narrowed its candidate set.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MatchDiagnostics {
    /// Label resolved for the seeker.
    pub seeker_label: ClusterLabel,
    /// Diagnostics the classifier reported for the seeker, if any.
    pub seeker_diagnostics: Option<ModelDiagnostics>,
    /// Size of the candidate snapshot.
    pub candidates_total: usize,
    /// Candidates skipped for lacking a usable coordinate.
    pub without_coordinate: usize,
    /// Candidate classification calls that returned an error.
    pub classification_failures: usize,
    /// Candidates left without a label, failures included.
    pub unclassified_candidates: usize,
    /// Candidates labelled into a different cluster.
    pub cluster_mismatches: usize,
    /// Candidates sharing the seeker's cluster.
    pub cluster_matches: usize,
    /// Same-cluster candidates beyond the radius.
    pub outside_radius: usize,
    /// Wall-clock time spent in the search.
    pub search_time: Duration,
}

/// Why a search produced no matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EmptyReason {
    /// The snapshot was empty.
    NoCandidates,
    /// No candidate had a usable coordinate.
    NoLocatedCandidates,
    /// The seeker could not be labelled.
    SeekerUnclassified,
    /// No candidate shared the seeker's cluster.
    NoClusterMatch,
    /// Same-cluster candidates existed but all were too far away.
    NoneWithinRadius,
}

/// Matches plus the diagnostics explaining them.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NearbyOutcome {
    /// Matches sorted by ascending distance, then donor id.
    pub matches: Vec<MatchResult>,
    /// How the candidate set was narrowed.
    pub diagnostics: MatchDiagnostics,
}

impl NearbyOutcome {
    /// The cause of an empty result, or `None` when something matched.
    #[must_use]
    pub fn empty_reason(&self) -> Option<EmptyReason> {
        let diagnostics = &self.diagnostics;
        if !self.matches.is_empty() {
            None
        } else if diagnostics.candidates_total == 0 {
            Some(EmptyReason::NoCandidates)
        } else if diagnostics.candidates_total == diagnostics.without_coordinate {
            Some(EmptyReason::NoLocatedCandidates)
        } else if !diagnostics.seeker_label.is_known() {
            Some(EmptyReason::SeekerUnclassified)
        } else if diagnostics.cluster_matches == 0 {
            Some(EmptyReason::NoClusterMatch)
        } else {
            Some(EmptyReason::NoneWithinRadius)
        }
    }

    /// Whether no candidate matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Returned when a search was cancelled before it finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("nearby search was cancelled")]
pub struct MatchCancelled;

/// Filters donor candidates down to those near a seeker.
///
/// The classifier is injected, so tests substitute a deterministic stub and
/// production code passes an HTTP or on-device model.
///
/// # Examples
///
/// ```
/// use lifeline_core::test_support::StubClassifier;
/// use lifeline_core::{ClusterLabel, Coordinate, DonorCandidate, NearbyMatcher};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), lifeline_core::CoordinateError> {
/// let matcher = NearbyMatcher::new(StubClassifier::uniform(ClusterLabel::Assigned(1)));
/// let seeker = Coordinate::new(0.0, 0.0)?;
/// let donor = DonorCandidate::new("d1").with_coordinate(Coordinate::new(0.0, 0.05)?);
/// let outcome = matcher.find_nearby(seeker, &[donor]).await;
/// assert_eq!(outcome.matches.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct NearbyMatcher<C> {
    classifier: C,
    config: MatchConfig,
}

impl<C: GeoClassifier> NearbyMatcher<C> {
    /// A matcher using [`MatchConfig::default`].
    pub fn new(classifier: C) -> Self {
        Self {
            classifier,
            config: MatchConfig::default(),
        }
    }

    /// A matcher with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MatchConfigError`] when `config` does not validate.
    pub fn with_config(classifier: C, config: MatchConfig) -> Result<Self, MatchConfigError> {
        config.validate()?;
        Ok(Self { classifier, config })
    }

    /// Active configuration.
    pub const fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Borrow the injected classifier.
    pub const fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Release the classifier, for example to close it.
    pub fn into_classifier(self) -> C {
        self.classifier
    }

    /// Find the candidates sharing the seeker's cluster within the radius.
    ///
    /// The classifier is not consulted at all when no candidate has a
    /// coordinate. An unlabelled seeker short-circuits to an empty outcome
    /// because the unknown label never matches.
    pub async fn find_nearby(
        &self,
        seeker: Coordinate,
        candidates: &[DonorCandidate],
    ) -> NearbyOutcome {
        let started = Instant::now();
        let mut diagnostics = MatchDiagnostics {
            candidates_total: candidates.len(),
            ..MatchDiagnostics::default()
        };

        let located: Vec<(&DonorCandidate, Coordinate)> = candidates
            .iter()
            .filter_map(|candidate| candidate.coordinate.map(|at| (candidate, at)))
            .collect();
        diagnostics.without_coordinate = candidates.len() - located.len();

        if located.is_empty() {
            debug!(
                "no locatable candidates among {} donors; skipping classification",
                candidates.len()
            );
            return finish(Vec::new(), diagnostics, started);
        }

        match self.classifier.classify(seeker).await {
            Ok(ClusterAssignment { label, diagnostics: model }) => {
                diagnostics.seeker_label = label;
                diagnostics.seeker_diagnostics = model;
            }
            Err(err) => warn!("seeker classification failed for ({seeker}): {err}"),
        }
        debug!("seeker at ({seeker}) is in cluster {}", diagnostics.seeker_label);

        if !diagnostics.seeker_label.is_known() {
            return finish(Vec::new(), diagnostics, started);
        }

        let labels: Vec<Result<ClusterAssignment, ClassifierError>> =
            stream::iter(located.iter().map(|(_, at)| self.classifier.classify(*at)))
                .buffered(self.config.max_concurrency)
                .collect()
                .await;

        let mut matches = Vec::new();
        for ((candidate, at), assignment) in located.into_iter().zip(labels) {
            let label = match assignment {
                Ok(assignment) => assignment.label,
                Err(err) => {
                    warn!("classification failed for donor {}: {err}", candidate.id);
                    diagnostics.classification_failures += 1;
                    ClusterLabel::Unknown
                }
            };
            if !label.is_known() {
                diagnostics.unclassified_candidates += 1;
                continue;
            }
            if !label.matches(diagnostics.seeker_label) {
                diagnostics.cluster_mismatches += 1;
                continue;
            }
            diagnostics.cluster_matches += 1;

            let distance_km = haversine_km(seeker, at);
            if distance_km <= self.config.radius_km {
                let mut matched = candidate.clone();
                matched.cluster_label = label;
                matches.push(MatchResult {
                    candidate: matched,
                    distance_km,
                });
            } else {
                diagnostics.outside_radius += 1;
            }
        }

        matches.sort_by(|lhs, rhs| {
            lhs.distance_km
                .total_cmp(&rhs.distance_km)
                .then_with(|| lhs.candidate.id.cmp(&rhs.candidate.id))
        });
        finish(matches, diagnostics, started)
    }

    /// [`find_nearby`](Self::find_nearby), abandoned as soon as `cancel`
    /// fires.
    ///
    /// In-flight classification calls are dropped; classification is
    /// read-only so nothing needs undoing.
    ///
    /// # Errors
    ///
    /// Returns [`MatchCancelled`] when the token fires first.
    pub async fn find_nearby_cancellable(
        &self,
        seeker: Coordinate,
        candidates: &[DonorCandidate],
        cancel: &CancellationToken,
    ) -> Result<NearbyOutcome, MatchCancelled> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("nearby search cancelled");
                Err(MatchCancelled)
            }
            outcome = self.find_nearby(seeker, candidates) => Ok(outcome),
        }
    }
}

fn finish(
    matches: Vec<MatchResult>,
    mut diagnostics: MatchDiagnostics,
    started: Instant,
) -> NearbyOutcome {
    diagnostics.search_time = started.elapsed();
    let outcome = NearbyOutcome {
        matches,
        diagnostics,
    };
    match outcome.empty_reason() {
        None => info!(
            "found {} nearby donors out of {} candidates",
            outcome.matches.len(),
            outcome.diagnostics.candidates_total
        ),
        Some(reason) => info!(
            "no nearby donors among {} candidates ({reason:?})",
            outcome.diagnostics.candidates_total
        ),
    }
    outcome
}
