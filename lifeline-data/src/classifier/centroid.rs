//! Offline nearest-centroid cluster model.
//!
//! The model file is JSON:
//!
//! ```json
//! {
//!   "max_distance_km": 50.0,
//!   "centroids": [
//!     { "cluster": 0, "latitude": 12.97, "longitude": 77.59 },
//!     { "cluster": 1, "latitude": 28.61, "longitude": 77.21 }
//!   ]
//! }
//! ```
//!
//! A coordinate is assigned the cluster of its nearest centroid by haversine
//! distance. When `max_distance_km` is set, points further than that from
//! every centroid are left unlabelled.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use lifeline_core::{
    ClassifierError, ClusterAssignment, ClusterLabel, Coordinate, CoordinateError, GeoClassifier,
    ModelDiagnostics, haversine_km,
};
use log::debug;
use serde::Deserialize;
use thiserror::Error;

/// One cluster centre.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Centroid {
    /// Cluster label reported for points closest to this centre.
    pub cluster: u32,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

/// Parsed model file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CentroidModel {
    /// Cluster centres; must not be empty.
    pub centroids: Vec<Centroid>,
    /// Optional cut-off beyond which points stay unlabelled.
    #[serde(default)]
    pub max_distance_km: Option<f64>,
}

/// Errors raised while loading a [`CentroidModel`].
#[derive(Debug, Error)]
pub enum CentroidModelError {
    /// The file could not be read.
    #[error("failed to read cluster model at {path}")]
    Io {
        /// Model path.
        path: Utf8PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not a valid model.
    #[error("failed to parse cluster model at {path}")]
    Parse {
        /// Model path.
        path: Utf8PathBuf,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },
    /// The model has no centroids.
    #[error("cluster model at {path} has no centroids")]
    Empty {
        /// Model path.
        path: Utf8PathBuf,
    },
    /// A centroid position is not finite.
    #[error("centroid {index} in {path} is invalid")]
    InvalidCentroid {
        /// Model path.
        path: Utf8PathBuf,
        /// Position in the centroid list.
        index: usize,
        /// Validation error.
        #[source]
        source: CoordinateError,
    },
    /// The cut-off distance is negative or not finite.
    #[error("cluster model at {path} has invalid max_distance_km {value}")]
    InvalidCutoff {
        /// Model path.
        path: Utf8PathBuf,
        /// Rejected value.
        value: f64,
    },
}

#[derive(Debug, Clone, Copy)]
struct Centre {
    label: ClusterLabel,
    at: Coordinate,
}

/// [`GeoClassifier`] assigning the nearest centroid of a local model.
#[derive(Debug)]
pub struct CentroidClassifier {
    centres: Vec<Centre>,
    max_distance_km: Option<f64>,
    open: AtomicBool,
}

impl CentroidClassifier {
    /// Load the model at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CentroidModelError`] when the file cannot be read or does
    /// not describe a usable model.
    pub fn open(path: &Utf8Path) -> Result<Self, CentroidModelError> {
        let contents =
            lifeline_fs::read_utf8_file(path).map_err(|source| CentroidModelError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let model: CentroidModel =
            serde_json::from_str(&contents).map_err(|source| CentroidModelError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_model(model, path)
    }

    /// Build from an already parsed model; `origin` names it in errors.
    ///
    /// # Errors
    ///
    /// Returns [`CentroidModelError`] for an empty model, a non-finite
    /// centroid or an invalid cut-off.
    pub fn from_model(model: CentroidModel, origin: &Utf8Path) -> Result<Self, CentroidModelError> {
        if model.centroids.is_empty() {
            return Err(CentroidModelError::Empty {
                path: origin.to_path_buf(),
            });
        }
        if let Some(value) = model.max_distance_km
            && (!value.is_finite() || value < 0.0)
        {
            return Err(CentroidModelError::InvalidCutoff {
                path: origin.to_path_buf(),
                value,
            });
        }
        let centres = model
            .centroids
            .iter()
            .enumerate()
            .map(|(index, centroid)| {
                Coordinate::new(centroid.latitude, centroid.longitude)
                    .map(|at| Centre {
                        label: ClusterLabel::Assigned(centroid.cluster),
                        at,
                    })
                    .map_err(|source| CentroidModelError::InvalidCentroid {
                        path: origin.to_path_buf(),
                        index,
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!("loaded {} centroids from {origin}", centres.len());
        Ok(Self {
            centres,
            max_distance_km: model.max_distance_km,
            open: AtomicBool::new(true),
        })
    }

    /// Release the model. Later calls fail with
    /// [`ClassifierError::ModelUnavailable`].
    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }

    /// Number of centroids in the model.
    #[must_use]
    pub fn len(&self) -> usize {
        self.centres.len()
    }

    /// Always `false`: empty models are rejected on load.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.centres.is_empty()
    }

    fn nearest(&self, coordinate: Coordinate) -> Option<(ClusterLabel, f64)> {
        self.centres
            .iter()
            .map(|centre| (centre.label, haversine_km(coordinate, centre.at)))
            .reduce(|best, next| if next.1 < best.1 { next } else { best })
    }
}

#[async_trait]
impl GeoClassifier for CentroidClassifier {
    async fn classify(&self, coordinate: Coordinate) -> Result<ClusterAssignment, ClassifierError> {
        if !self.open.load(Ordering::Acquire) {
            return Err(ClassifierError::ModelUnavailable {
                message: "cluster model has been closed".to_owned(),
            });
        }
        let (label, distance_km) =
            self.nearest(coordinate)
                .ok_or_else(|| ClassifierError::ModelUnavailable {
                    message: "cluster model has no centroids".to_owned(),
                })?;
        let within_cutoff = self.max_distance_km.is_none_or(|max| distance_km <= max);
        let label = if within_cutoff { label } else { ClusterLabel::Unknown };
        Ok(ClusterAssignment::label(label).with_diagnostics(ModelDiagnostics {
            nearby_donors_hint: 0,
            model_used: true,
            model_status: format!("nearest centroid {distance_km:.2} km away"),
        }))
    }
}
