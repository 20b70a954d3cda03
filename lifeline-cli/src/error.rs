//! Error types emitted by the Lifeline CLI.
//!
//! Keep this error type reasonably small, as many CLI helpers return
//! `Result<_, CliError>`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use lifeline_core::{CoordinateError, MatchConfigError, SearchError};
use lifeline_data::{CentroidModelError, ProviderBuildError, SnapshotError};
use thiserror::Error;

/// Errors emitted by the Lifeline CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Flag name.
        field: &'static str,
        /// Environment variable name.
        env: &'static str,
    },
    /// Two options that exclude each other were both supplied.
    #[error("--{first} and --{second} cannot be combined")]
    ConflictingArguments {
        /// First option.
        first: &'static str,
        /// Second option.
        second: &'static str,
    },
    /// A referenced input path does not exist on disk.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        /// Flag naming the path.
        field: &'static str,
        /// Missing path.
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        /// Flag naming the path.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        /// Flag naming the path.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The seeker position is not a valid coordinate.
    #[error("invalid seeker position: {0}")]
    InvalidSeeker(#[source] CoordinateError),
    /// Radius or concurrency were rejected.
    #[error("invalid match settings: {0}")]
    InvalidMatchConfig(#[from] MatchConfigError),
    /// Constructing the HTTP classifier failed.
    #[error("failed to build cluster classifier for {base_url:?}: {source}")]
    BuildClassifier {
        /// Configured service root.
        base_url: String,
        /// Underlying error.
        #[source]
        source: ProviderBuildError,
    },
    /// Loading the local cluster model failed.
    #[error(transparent)]
    LoadClusterModel(#[from] CentroidModelError),
    /// Reading a snapshot failed.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    /// The async runtime could not start.
    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// The nearby search failed.
    #[error("nearby search failed: {0}")]
    Search(#[source] SearchError),
    /// Serializing command output failed.
    #[error("failed to serialize output: {0}")]
    SerializeOutput(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
