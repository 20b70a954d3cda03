//! Request and response bodies for the cluster service's `nearby-donors`
//! endpoint.

use lifeline_core::{ClusterAssignment, ClusterLabel, Coordinate, ModelDiagnostics};
use serde::{Deserialize, Serialize};

/// Body posted to the service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DonorRequest {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl From<Coordinate> for DonorRequest {
    fn from(value: Coordinate) -> Self {
        Self {
            latitude: value.latitude(),
            longitude: value.longitude(),
        }
    }
}

/// Service answer.
///
/// Only `cluster` is authoritative; the other fields are diagnostics and
/// default when absent.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterResponse {
    /// Cluster label, `-1` when the service could not assign one.
    pub cluster: i64,

    /// Number of donors the service counts in the same cluster.
    #[serde(default, alias = "nearbyDonorsCountHint")]
    pub nearby_donors: i64,

    /// Whether the trained model produced the label.
    #[serde(default)]
    pub model_used: bool,

    /// Free-form model status.
    #[serde(default)]
    pub model_status: String,
}

impl From<ClusterResponse> for ClusterAssignment {
    fn from(value: ClusterResponse) -> Self {
        Self::label(ClusterLabel::from_raw(value.cluster)).with_diagnostics(ModelDiagnostics {
            nearby_donors_hint: value.nearby_donors,
            model_used: value.model_used,
            model_status: value.model_status,
        })
    }
}
