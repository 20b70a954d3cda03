//! Geographic cluster labels and the classifier boundary.
//!
//! The clustering model itself is opaque. The engine only relies on the
//! [`GeoClassifier`] contract: a coordinate goes in, a [`ClusterLabel`] comes
//! out, and failures are reported per call. [`classify_or_unknown`] adapts
//! that contract to the matching loop by turning every failure into
//! [`ClusterLabel::Unknown`].

use async_trait::async_trait;
use log::warn;
use thiserror::Error;

use crate::Coordinate;

/// Raw value the clustering model uses for "no label".
pub const SENTINEL_CLUSTER: i64 = -1;

/// Cluster label assigned by the geo classifier.
///
/// Two labels match only when both are [`ClusterLabel::Assigned`] and equal;
/// the unknown label never matches anything, itself included.
///
/// # Examples
///
/// ```
/// use lifeline_core::ClusterLabel;
///
/// assert!(ClusterLabel::Assigned(3).matches(ClusterLabel::Assigned(3)));
/// assert!(!ClusterLabel::Unknown.matches(ClusterLabel::Unknown));
/// assert_eq!(ClusterLabel::from_raw(-1), ClusterLabel::Unknown);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(from = "i64", into = "i64")
)]
pub enum ClusterLabel {
    /// A concrete cluster identifier.
    Assigned(u32),
    /// No label is available.
    #[default]
    Unknown,
}

impl ClusterLabel {
    /// Interpret a raw model output. Negative or oversized values are unknown.
    #[must_use]
    pub fn from_raw(raw: i64) -> Self {
        u32::try_from(raw).map_or(Self::Unknown, Self::Assigned)
    }

    /// Raw representation, with [`SENTINEL_CLUSTER`] for unknown.
    #[must_use]
    pub fn as_raw(self) -> i64 {
        match self {
            Self::Assigned(id) => i64::from(id),
            Self::Unknown => SENTINEL_CLUSTER,
        }
    }

    /// Whether a concrete label is present.
    #[must_use]
    pub const fn is_known(self) -> bool {
        matches!(self, Self::Assigned(_))
    }

    /// Whether two labels place their points in the same cluster.
    #[must_use]
    pub fn matches(self, other: Self) -> bool {
        match (self, other) {
            (Self::Assigned(lhs), Self::Assigned(rhs)) => lhs == rhs,
            _ => false,
        }
    }
}

impl From<i64> for ClusterLabel {
    fn from(value: i64) -> Self {
        Self::from_raw(value)
    }
}

impl From<ClusterLabel> for i64 {
    fn from(value: ClusterLabel) -> Self {
        value.as_raw()
    }
}

impl std::fmt::Display for ClusterLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Assigned(id) => write!(f, "{id}"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// Non-authoritative details some classifiers report next to the label.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModelDiagnostics {
    /// Number of donors the service believes share the cluster.
    pub nearby_donors_hint: i64,
    /// Whether the trained model produced the label.
    pub model_used: bool,
    /// Free-form model status text.
    pub model_status: String,
}

/// Result of a single classification call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterAssignment {
    /// Assigned label, possibly [`ClusterLabel::Unknown`].
    pub label: ClusterLabel,
    /// Optional diagnostics; never used for matching.
    pub diagnostics: Option<ModelDiagnostics>,
}

impl ClusterAssignment {
    /// An assignment carrying only a label.
    #[must_use]
    pub const fn label(label: ClusterLabel) -> Self {
        Self {
            label,
            diagnostics: None,
        }
    }

    /// Attach model diagnostics.
    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: ModelDiagnostics) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }
}

/// Errors from [`GeoClassifier::classify`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifierError {
    /// The request did not complete within the configured timeout.
    #[error("classifier request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Endpoint that was called.
        url: String,
        /// Configured timeout in seconds.
        timeout_secs: u64,
    },
    /// The service answered with a non-success status.
    #[error("classifier at {url} returned HTTP {status}: {message}")]
    HttpError {
        /// Endpoint that was called.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Error text.
        message: String,
    },
    /// The request failed before a response arrived.
    #[error("classifier request to {url} failed: {message}")]
    NetworkError {
        /// Endpoint that was called.
        url: String,
        /// Error text.
        message: String,
    },
    /// The response body could not be decoded.
    #[error("failed to parse classifier response: {message}")]
    ParseError {
        /// Decoder error text.
        message: String,
    },
    /// The model is not loaded or has been closed.
    #[error("cluster model unavailable: {message}")]
    ModelUnavailable {
        /// Why the model cannot run.
        message: String,
    },
}

/// Map a coordinate to a cluster label.
///
/// Implementations must be independent per call: one coordinate's failure
/// must not influence the outcome for another. They must be `Send + Sync`
/// so the matching engine can classify candidates concurrently.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use lifeline_core::{
///     ClassifierError, ClusterAssignment, ClusterLabel, Coordinate, GeoClassifier,
/// };
///
/// struct Hemisphere;
///
/// #[async_trait]
/// impl GeoClassifier for Hemisphere {
///     async fn classify(
///         &self,
///         coordinate: Coordinate,
///     ) -> Result<ClusterAssignment, ClassifierError> {
///         let id = u32::from(coordinate.latitude() >= 0.0);
///         Ok(ClusterAssignment::label(ClusterLabel::Assigned(id)))
///     }
/// }
/// ```
#[async_trait]
pub trait GeoClassifier: Send + Sync {
    /// Classify a single coordinate.
    async fn classify(&self, coordinate: Coordinate) -> Result<ClusterAssignment, ClassifierError>;
}

#[async_trait]
impl<T: GeoClassifier + ?Sized> GeoClassifier for Box<T> {
    async fn classify(&self, coordinate: Coordinate) -> Result<ClusterAssignment, ClassifierError> {
        (**self).classify(coordinate).await
    }
}

#[async_trait]
impl<T: GeoClassifier + ?Sized> GeoClassifier for &T {
    async fn classify(&self, coordinate: Coordinate) -> Result<ClusterAssignment, ClassifierError> {
        (**self).classify(coordinate).await
    }
}

/// Classify `coordinate`, absorbing any failure into [`ClusterLabel::Unknown`].
pub async fn classify_or_unknown<C>(classifier: &C, coordinate: Coordinate) -> ClusterLabel
where
    C: GeoClassifier + ?Sized,
{
    match classifier.classify(coordinate).await {
        Ok(assignment) => assignment.label,
        Err(err) => {
            warn!("classification failed for ({coordinate}): {err}");
            ClusterLabel::Unknown
        }
    }
}

/// Coarse similarity between two labelled points: `1.0` for the same
/// cluster, `0.5` otherwise.
#[must_use]
pub fn cluster_similarity(lhs: ClusterLabel, rhs: ClusterLabel) -> f32 {
    if lhs.matches(rhs) { 1.0 } else { 0.5 }
}
