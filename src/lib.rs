//! Facade crate for the Lifeline donor-matching engine.
//!
//! This crate re-exports the core domain types and exposes the classifier
//! and snapshot adapters behind the `adapters` feature flag.

#![forbid(unsafe_code)]

pub use lifeline_core::{
    ClassifierError, ClusterAssignment, ClusterLabel, Coordinate, CoordinateError, DonorCandidate,
    DonorSource, DonorSourceError, EmptyReason, GeoClassifier, LocationError, LocationPolicy,
    LocationProvider, MatchConfig, MatchDiagnostics, MatchResult, NearbyMatcher, NearbyOutcome,
    NearbySearch, ReviewBuckets, ReviewRecord, SearchError, SearchReport, Sentiment,
    SentimentAnalyzer, classify_sentiment, haversine_km,
};

#[cfg(feature = "adapters")]
pub use lifeline_data::{
    CentroidClassifier, HttpClusterClassifier, HttpClusterClassifierConfig, SnapshotDonorSource,
};
