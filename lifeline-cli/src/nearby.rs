//! Nearby command implementation for the Lifeline CLI.

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use lifeline_core::{
    Coordinate, DEFAULT_MAX_CONCURRENCY, DEFAULT_RADIUS_KM, FixedLocationProvider, GeoClassifier,
    MatchConfig, NearbyMatcher, NearbySearch, SearchReport,
};
use lifeline_data::classifier::DEFAULT_BASE_URL;
use lifeline_data::{CentroidClassifier, HttpClusterClassifier, SnapshotDonorSource};
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::{
    ARG_NEARBY_CLASSIFIER_URL, ARG_NEARBY_CLUSTER_MODEL, ARG_NEARBY_DONORS, ARG_NEARBY_LATITUDE,
    ARG_NEARBY_LONGITUDE, ARG_NEARBY_MAX_CONCURRENCY, ARG_NEARBY_RADIUS_KM, CliError,
    ENV_NEARBY_DONORS, ENV_NEARBY_LATITUDE, ENV_NEARBY_LONGITUDE,
};

/// CLI arguments for the `nearby` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Match the seeker against a donor snapshot: classify every \
                 located donor, keep those sharing the seeker's cluster and \
                 lying within the radius, and print the result as JSON. \
                 Options can come from CLI flags, configuration files, or \
                 environment variables.",
    about = "Find same-cluster donors near a position"
)]
#[ortho_config(prefix = "LIFELINE")]
pub(crate) struct NearbyArgs {
    /// Path to a JSON export of the donor store.
    #[arg(long = ARG_NEARBY_DONORS, value_name = "path")]
    #[serde(default)]
    pub(crate) donors: Option<Utf8PathBuf>,
    /// Seeker latitude in degrees.
    #[arg(long = ARG_NEARBY_LATITUDE, value_name = "degrees", allow_hyphen_values = true)]
    #[serde(default)]
    pub(crate) latitude: Option<f64>,
    /// Seeker longitude in degrees.
    #[arg(long = ARG_NEARBY_LONGITUDE, value_name = "degrees", allow_hyphen_values = true)]
    #[serde(default)]
    pub(crate) longitude: Option<f64>,
    /// Search radius in kilometres (default 10).
    #[arg(long = ARG_NEARBY_RADIUS_KM, value_name = "km")]
    #[serde(default)]
    pub(crate) radius_km: Option<f64>,
    /// Upper bound on concurrent classification calls (default 8).
    #[arg(long = ARG_NEARBY_MAX_CONCURRENCY, value_name = "n")]
    #[serde(default)]
    pub(crate) max_concurrency: Option<usize>,
    /// Root URL of the cluster service (e.g. "http://localhost:8080/api/").
    #[arg(long = ARG_NEARBY_CLASSIFIER_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) classifier_url: Option<String>,
    /// Use a local centroid model instead of the cluster service.
    #[arg(long = ARG_NEARBY_CLUSTER_MODEL, value_name = "path")]
    #[serde(default)]
    pub(crate) cluster_model: Option<Utf8PathBuf>,
}

impl NearbyArgs {
    pub(crate) fn into_config(self) -> Result<NearbyConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        NearbyConfig::try_from(merged)
    }
}

/// Which classifier answers cluster queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ClassifierChoice {
    /// The remote cluster service.
    Service { base_url: String },
    /// A centroid model file.
    Model { path: Utf8PathBuf },
}

/// Resolved `nearby` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NearbyConfig {
    /// Donor snapshot path.
    pub(crate) donors: Utf8PathBuf,
    /// Seeker position.
    pub(crate) seeker: Coordinate,
    /// Radius and concurrency.
    pub(crate) match_config: MatchConfig,
    /// Classifier to use.
    pub(crate) classifier: ClassifierChoice,
}

impl NearbyConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        require_existing(&self.donors, ARG_NEARBY_DONORS)?;
        if let ClassifierChoice::Model { path } = &self.classifier {
            require_existing(path, ARG_NEARBY_CLUSTER_MODEL)?;
        }
        Ok(())
    }
}

pub(crate) fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
    match lifeline_fs::file_is_file(path) {
        Ok(true) => Ok(()),
        Ok(false) => Err(CliError::SourcePathNotFile {
            field,
            path: path.to_path_buf(),
        }),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            Err(CliError::MissingSourceFile {
                field,
                path: path.to_path_buf(),
            })
        }
        Err(source) => Err(CliError::InspectSourcePath {
            field,
            path: path.to_path_buf(),
            source,
        }),
    }
}

impl TryFrom<NearbyArgs> for NearbyConfig {
    type Error = CliError;

    fn try_from(args: NearbyArgs) -> Result<Self, Self::Error> {
        let donors = args.donors.ok_or(CliError::MissingArgument {
            field: ARG_NEARBY_DONORS,
            env: ENV_NEARBY_DONORS,
        })?;
        let latitude = args.latitude.ok_or(CliError::MissingArgument {
            field: ARG_NEARBY_LATITUDE,
            env: ENV_NEARBY_LATITUDE,
        })?;
        let longitude = args.longitude.ok_or(CliError::MissingArgument {
            field: ARG_NEARBY_LONGITUDE,
            env: ENV_NEARBY_LONGITUDE,
        })?;
        let seeker = Coordinate::new(latitude, longitude).map_err(CliError::InvalidSeeker)?;
        let match_config = MatchConfig::new(
            args.radius_km.unwrap_or(DEFAULT_RADIUS_KM),
            args.max_concurrency.unwrap_or(DEFAULT_MAX_CONCURRENCY),
        )?;

        let classifier = match (args.classifier_url, args.cluster_model) {
            (Some(_), Some(_)) => {
                return Err(CliError::ConflictingArguments {
                    first: ARG_NEARBY_CLASSIFIER_URL,
                    second: ARG_NEARBY_CLUSTER_MODEL,
                });
            }
            (None, Some(path)) => ClassifierChoice::Model { path },
            (base_url, None) => ClassifierChoice::Service {
                base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
            },
        };

        Ok(Self {
            donors,
            seeker,
            match_config,
            classifier,
        })
    }
}

/// Builds the classifier for the current nearby invocation.
pub(crate) trait NearbyClassifierBuilder {
    fn build(&self, config: &NearbyConfig) -> Result<Box<dyn GeoClassifier>, CliError>;
}

pub(crate) struct DefaultNearbyClassifierBuilder;

impl NearbyClassifierBuilder for DefaultNearbyClassifierBuilder {
    fn build(&self, config: &NearbyConfig) -> Result<Box<dyn GeoClassifier>, CliError> {
        match &config.classifier {
            ClassifierChoice::Service { base_url } => {
                let classifier = HttpClusterClassifier::new(base_url.clone()).map_err(|source| {
                    CliError::BuildClassifier {
                        base_url: base_url.clone(),
                        source,
                    }
                })?;
                Ok(Box::new(classifier))
            }
            ClassifierChoice::Model { path } => Ok(Box::new(CentroidClassifier::open(path)?)),
        }
    }
}

pub(crate) fn run_nearby(args: NearbyArgs) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    run_nearby_with(args, &DefaultNearbyClassifierBuilder, &mut stdout)
}

pub(crate) fn run_nearby_with(
    args: NearbyArgs,
    builder: &dyn NearbyClassifierBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let report = execute_nearby(args, builder)?;
    write_json(writer, &report)
}

fn execute_nearby(
    args: NearbyArgs,
    builder: &dyn NearbyClassifierBuilder,
) -> Result<SearchReport, CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    search(&config, builder)
}

pub(crate) fn search(
    config: &NearbyConfig,
    builder: &dyn NearbyClassifierBuilder,
) -> Result<SearchReport, CliError> {
    let classifier = builder.build(config)?;
    let matcher = NearbyMatcher::with_config(classifier, config.match_config)?;
    let nearby = NearbySearch::new(
        matcher,
        SnapshotDonorSource::new(config.donors.clone()),
        FixedLocationProvider::new(config.seeker),
    );
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    let report = runtime
        .block_on(nearby.run(&CancellationToken::new()))
        .map_err(CliError::Search)?;
    info!(
        "{} donors within {} km of ({})",
        report.outcome.matches.len(),
        config.match_config.radius_km,
        report.seeker
    );
    Ok(report)
}

pub(crate) fn write_json<T: Serialize + ?Sized>(
    writer: &mut dyn Write,
    value: &T,
) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(value).map_err(CliError::SerializeOutput)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<NearbyConfig, CliError> {
    let merged = NearbyArgs::merge_from_layers(layers).map_err(CliError::from)?;
    NearbyConfig::try_from(merged)
}
