//! Cluster classifiers for the nearby-match engine.
//!
//! Two implementations of [`lifeline_core::GeoClassifier`] live here:
//!
//! - [`HttpClusterClassifier`] posts coordinates to the cluster service.
//! - [`CentroidClassifier`] assigns the nearest centroid from a local model
//!   file, for offline use.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use lifeline_core::{Coordinate, GeoClassifier};
//! use lifeline_data::classifier::{HttpClusterClassifier, HttpClusterClassifierConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HttpClusterClassifierConfig::new("http://localhost:8080/api/")
//!     .with_timeout(Duration::from_secs(10));
//! let classifier = HttpClusterClassifier::open(config)?;
//! let assignment = classifier.classify(Coordinate::new(12.97, 77.59)?).await?;
//! println!("cluster {}", assignment.label);
//! classifier.close();
//! # Ok(())
//! # }
//! ```

mod centroid;
mod http;
mod wire;

pub use centroid::{Centroid, CentroidClassifier, CentroidModel, CentroidModelError};
pub use http::{
    DEFAULT_BASE_URL, DEFAULT_USER_AGENT, HttpClusterClassifier, HttpClusterClassifierConfig,
    ProviderBuildError,
};
