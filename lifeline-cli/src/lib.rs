//! Command-line interface for the Lifeline donor-matching engine.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};

mod error;
mod nearby;
mod reviews;
mod sentiment;

pub use error::CliError;

use nearby::{NearbyArgs, run_nearby};
use reviews::{ReviewsArgs, run_reviews};
use sentiment::{SentimentArgs, run_sentiment};

pub(crate) const ARG_NEARBY_DONORS: &str = "donors";
pub(crate) const ARG_NEARBY_LATITUDE: &str = "latitude";
pub(crate) const ARG_NEARBY_LONGITUDE: &str = "longitude";
pub(crate) const ARG_NEARBY_RADIUS_KM: &str = "radius-km";
pub(crate) const ARG_NEARBY_MAX_CONCURRENCY: &str = "max-concurrency";
pub(crate) const ARG_NEARBY_CLASSIFIER_URL: &str = "classifier-url";
pub(crate) const ARG_NEARBY_CLUSTER_MODEL: &str = "cluster-model";
pub(crate) const ENV_NEARBY_DONORS: &str = "LIFELINE_CMDS_NEARBY_DONORS";
pub(crate) const ENV_NEARBY_LATITUDE: &str = "LIFELINE_CMDS_NEARBY_LATITUDE";
pub(crate) const ENV_NEARBY_LONGITUDE: &str = "LIFELINE_CMDS_NEARBY_LONGITUDE";

pub(crate) const ARG_REVIEWS_PATH: &str = "reviews";
pub(crate) const ARG_REVIEWS_HOSPITAL: &str = "hospital";
pub(crate) const ENV_REVIEWS_PATH: &str = "LIFELINE_CMDS_REVIEWS_REVIEWS";
pub(crate) const ENV_REVIEWS_HOSPITAL: &str = "LIFELINE_CMDS_REVIEWS_HOSPITAL";

/// Run the Lifeline CLI with the current process arguments and environment.
///
/// # Errors
///
/// Returns [`CliError`] when arguments or configuration are invalid, inputs
/// cannot be read, or the command itself fails.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Nearby(args) => run_nearby(args),
        Command::Sentiment(args) => run_sentiment(&args),
        Command::Reviews(args) => run_reviews(args),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "lifeline",
    about = "Nearby donor matching and review tooling for Lifeline",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Find same-cluster donors near a position.
    Nearby(NearbyArgs),
    /// Label a piece of text with the keyword sentiment heuristic.
    Sentiment(SentimentArgs),
    /// Bucket a hospital's reviews by rating.
    Reviews(ReviewsArgs),
}

#[cfg(test)]
mod tests;
