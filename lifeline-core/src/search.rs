//! End-to-end nearby search: locate the seeker, fetch donors, match.

use log::{debug, warn};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::{
    Coordinate, DonorSource, DonorSourceError, GeoClassifier, LocationError, LocationObserver,
    LocationPolicy, LocationProvider, LogObserver, NearbyMatcher, NearbyOutcome, acquire_location,
};

/// Errors that end a search invocation.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The seeker's position could not be obtained.
    #[error(transparent)]
    Location(#[from] LocationError),
    /// The donor snapshot could not be read.
    #[error("failed to fetch donor candidates")]
    CandidateFetch(#[source] DonorSourceError),
    /// The caller cancelled the search.
    #[error("nearby search was cancelled")]
    Cancelled,
}

impl SearchError {
    /// Whether the caller may offer to run the search again.
    ///
    /// Location and store failures are retryable, permission denial
    /// included, once the user has acted. Nothing is retried automatically.
    /// Cancellation was requested by the caller and is not.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

impl From<DonorSourceError> for SearchError {
    fn from(value: DonorSourceError) -> Self {
        Self::CandidateFetch(value)
    }
}

/// What a successful search found.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchReport {
    /// Position the search ran from.
    pub seeker: Coordinate,
    /// Matches and diagnostics.
    pub outcome: NearbyOutcome,
}

/// Wires location, donor store and matcher into one operation.
///
/// # Examples
///
/// ```
/// use lifeline_core::test_support::{MemoryDonorSource, StubClassifier};
/// use lifeline_core::{
///     ClusterLabel, Coordinate, DonorCandidate, FixedLocationProvider, NearbyMatcher, NearbySearch,
/// };
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let seeker = Coordinate::new(0.0, 0.0)?;
/// let donors = MemoryDonorSource::new(vec![
///     DonorCandidate::new("d1").with_coordinate(Coordinate::new(0.0, 0.01)?),
/// ]);
/// let search = NearbySearch::new(
///     NearbyMatcher::new(StubClassifier::uniform(ClusterLabel::Assigned(2))),
///     donors,
///     FixedLocationProvider::new(seeker),
/// );
/// let report = search.run(&CancellationToken::new()).await?;
/// assert_eq!(report.outcome.matches.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct NearbySearch<C, S, P, O = LogObserver> {
    matcher: NearbyMatcher<C>,
    source: S,
    provider: P,
    policy: LocationPolicy,
    observer: O,
}

impl<C, S, P> NearbySearch<C, S, P>
where
    C: GeoClassifier,
    S: DonorSource,
    P: LocationProvider,
{
    /// A search with the default location policy, logging location events.
    pub fn new(matcher: NearbyMatcher<C>, source: S, provider: P) -> Self {
        Self {
            matcher,
            source,
            provider,
            policy: LocationPolicy::default(),
            observer: LogObserver,
        }
    }
}

impl<C, S, P, O> NearbySearch<C, S, P, O>
where
    C: GeoClassifier,
    S: DonorSource,
    P: LocationProvider,
    O: LocationObserver,
{
    /// Replace the location policy.
    #[must_use]
    pub fn with_policy(mut self, policy: LocationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Route location events to `observer`.
    pub fn with_observer<T: LocationObserver>(self, observer: T) -> NearbySearch<C, S, P, T> {
        NearbySearch {
            matcher: self.matcher,
            source: self.source,
            provider: self.provider,
            policy: self.policy,
            observer,
        }
    }

    /// The matcher used for the final filtering step.
    pub const fn matcher(&self) -> &NearbyMatcher<C> {
        &self.matcher
    }

    /// Run one search.
    ///
    /// The donor snapshot is only fetched once the seeker is located, and
    /// matching never runs on a partial listing.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Location`] or [`SearchError::CandidateFetch`]
    /// when a prerequisite fails and [`SearchError::Cancelled`] when
    /// `cancel` fires first.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<SearchReport, SearchError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("nearby search cancelled by caller");
                Err(SearchError::Cancelled)
            }
            report = self.run_to_completion() => report,
        }
    }

    async fn run_to_completion(&self) -> Result<SearchReport, SearchError> {
        let seeker = acquire_location(&self.provider, &self.policy, &self.observer).await?;
        let candidates = self.source.list_donors().await.map_err(|err| {
            warn!("donor fetch failed: {err}");
            SearchError::CandidateFetch(err)
        })?;
        debug!("fetched {} donor candidates", candidates.len());
        let outcome = self.matcher.find_nearby(seeker, &candidates).await;
        Ok(SearchReport { seeker, outcome })
    }
}
