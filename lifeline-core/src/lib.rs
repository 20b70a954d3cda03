//! Core domain types and algorithms for the Lifeline donor-matching engine.
//!
//! The crate has no network or file I/O. External collaborators (the geo
//! classifier, the donor store and the platform location provider) are
//! traits injected by the caller, which keeps every algorithm here
//! deterministic under test.
//!
//! # Examples
//!
//! ```
//! use lifeline_core::{Coordinate, haversine_km};
//!
//! # fn main() -> Result<(), lifeline_core::CoordinateError> {
//! let london = Coordinate::new(51.5007, -0.1246)?;
//! let new_york = Coordinate::new(40.6892, -74.0445)?;
//! assert!((haversine_km(london, new_york) - 5574.84).abs() < 0.01);
//! # Ok(())
//! # }
//! ```

mod cluster;
mod coordinate;
mod distance;
mod donor;
mod location;
mod matching;
mod review;
mod search;
mod sentiment;
mod store;

#[doc(hidden)]
pub mod test_support;

pub use cluster::{
    ClassifierError, ClusterAssignment, ClusterLabel, GeoClassifier, ModelDiagnostics,
    SENTINEL_CLUSTER, classify_or_unknown, cluster_similarity,
};
pub use coordinate::{Coordinate, CoordinateError};
pub use distance::{EARTH_MEAN_RADIUS_KM, haversine_km};
pub use donor::{
    BloodGroup, DonorAttributes, DonorCandidate, DonorRecord, FEATURE_COUNT, Organ,
    clustering_features,
};
pub use location::{
    DEFAULT_FALLBACK_TIMEOUT, DEFAULT_FASTEST_INTERVAL, DEFAULT_UPDATE_INTERVAL,
    FixedLocationProvider, LocationError, LocationEvent, LocationFix, LocationObserver,
    LocationPolicy, LocationPriority, LocationProvider, LogObserver, UpdateRequest,
    acquire_location,
};
pub use matching::{
    DEFAULT_MAX_CONCURRENCY, DEFAULT_RADIUS_KM, EmptyReason, MatchCancelled, MatchConfig,
    MatchConfigError, MatchDiagnostics, MatchResult, NearbyMatcher, NearbyOutcome,
};
pub use review::{
    MAX_RATING, MIN_RATING, POSITIVE_RATING_THRESHOLD, ReviewBuckets, ReviewError, ReviewRecord,
};
pub use search::{NearbySearch, SearchError, SearchReport};
pub use sentiment::{
    NEGATIVE_KEYWORDS, POSITIVE_KEYWORDS, Sentiment, SentimentAnalyzer, SentimentModel,
    SentimentModelError, SentimentScores, TIE_BREAK_LENGTH, classify_sentiment,
};
pub use store::{DonorSource, DonorSourceError};
