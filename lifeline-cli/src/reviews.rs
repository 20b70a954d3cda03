//! Reviews command implementation for the Lifeline CLI.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use lifeline_core::{ReviewBuckets, ReviewRecord, Sentiment, SentimentAnalyzer};
use lifeline_data::load_review_snapshot;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::nearby::{require_existing, write_json};
use crate::{
    ARG_REVIEWS_HOSPITAL, ARG_REVIEWS_PATH, CliError, ENV_REVIEWS_HOSPITAL, ENV_REVIEWS_PATH,
};

/// CLI arguments for the `reviews` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Read a hospital's reviews from a JSON export and split \
                 them into positive (rated 3 or more) and negative buckets. \
                 Each review is also labelled with the keyword sentiment \
                 heuristic.",
    about = "Bucket a hospital's reviews by rating"
)]
#[ortho_config(prefix = "LIFELINE")]
pub(crate) struct ReviewsArgs {
    /// Path to a JSON export holding `hospital_reviews`.
    #[arg(long = ARG_REVIEWS_PATH, value_name = "path")]
    #[serde(default)]
    pub(crate) reviews: Option<Utf8PathBuf>,
    /// Hospital whose reviews are listed.
    #[arg(long = ARG_REVIEWS_HOSPITAL, value_name = "id")]
    #[serde(default)]
    pub(crate) hospital: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReviewsConfig {
    pub(crate) reviews: Utf8PathBuf,
    pub(crate) hospital: String,
}

impl TryFrom<ReviewsArgs> for ReviewsConfig {
    type Error = CliError;

    fn try_from(args: ReviewsArgs) -> Result<Self, Self::Error> {
        let reviews = args.reviews.ok_or(CliError::MissingArgument {
            field: ARG_REVIEWS_PATH,
            env: ENV_REVIEWS_PATH,
        })?;
        let hospital = args.hospital.ok_or(CliError::MissingArgument {
            field: ARG_REVIEWS_HOSPITAL,
            env: ENV_REVIEWS_HOSPITAL,
        })?;
        Ok(Self { reviews, hospital })
    }
}

/// A review with the label the heuristic gives its comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct LabelledReview {
    #[serde(flatten)]
    pub(crate) review: ReviewRecord,
    pub(crate) sentiment: Sentiment,
}

/// Output of the `reviews` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ReviewReport {
    pub(crate) hospital: String,
    pub(crate) positive: Vec<LabelledReview>,
    pub(crate) negative: Vec<LabelledReview>,
}

impl ReviewReport {
    fn build(hospital: String, reviews: &[ReviewRecord], analyzer: &SentimentAnalyzer) -> Self {
        let buckets = ReviewBuckets::partition(reviews.iter().cloned());
        let label = |review: ReviewRecord| LabelledReview {
            sentiment: analyzer.analyze(&review.comment),
            review,
        };
        Self {
            hospital,
            positive: buckets.positive.into_iter().map(label).collect(),
            negative: buckets.negative.into_iter().map(label).collect(),
        }
    }
}

pub(crate) fn run_reviews(args: ReviewsArgs) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    run_reviews_with(args, &SentimentAnalyzer::keyword_only(), &mut stdout)
}

pub(crate) fn run_reviews_with(
    args: ReviewsArgs,
    analyzer: &SentimentAnalyzer,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = ReviewsConfig::try_from(merged)?;
    let report = review_report(&config, analyzer)?;
    write_json(writer, &report)
}

pub(crate) fn review_report(
    config: &ReviewsConfig,
    analyzer: &SentimentAnalyzer,
) -> Result<ReviewReport, CliError> {
    require_existing(&config.reviews, ARG_REVIEWS_PATH)?;
    let snapshot = load_review_snapshot(&config.reviews)?;
    Ok(ReviewReport::build(
        config.hospital.clone(),
        snapshot.reviews_for(&config.hospital),
        analyzer,
    ))
}
