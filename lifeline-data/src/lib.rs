//! Adapters connecting the Lifeline engine to its external collaborators.
//!
//! Responsibilities:
//! - Implement [`lifeline_core::GeoClassifier`] over HTTP and over a local
//!   centroid model.
//! - Read donor and review exports of the realtime database and serve them
//!   as a [`lifeline_core::DonorSource`].
//!
//! Boundaries:
//! - Do not encode matching rules (live in `lifeline-core`).
//! - Keep blocking I/O off async executors; prefer async-capable clients.
//!
//! Invariants:
//! - Thread-safe by default where feasible.
//! - No global mutable state.

pub mod classifier;
pub mod snapshot;

pub use classifier::{
    CentroidClassifier, CentroidModelError, HttpClusterClassifier, HttpClusterClassifierConfig,
    ProviderBuildError,
};
pub use snapshot::{
    ReviewSnapshot, SnapshotDonorSource, SnapshotError, load_donor_snapshot, load_review_snapshot,
    parse_donor_snapshot, parse_review_snapshot,
};
