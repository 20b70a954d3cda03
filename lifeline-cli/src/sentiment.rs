//! Sentiment command implementation for the Lifeline CLI.

use std::io::Write;

use clap::Parser;
use lifeline_core::{Sentiment, SentimentAnalyzer};

use crate::CliError;

/// CLI arguments for the `sentiment` subcommand.
#[derive(Debug, Clone, Parser, Default)]
#[command(about = "Label text as Positive, Negative or Neutral")]
pub(crate) struct SentimentArgs {
    /// Text to label. Several words are joined with single spaces.
    #[arg(value_name = "text", num_args = 0..)]
    pub(crate) text: Vec<String>,
}

impl SentimentArgs {
    fn joined(&self) -> String {
        self.text.join(" ")
    }
}

pub(crate) fn run_sentiment(args: &SentimentArgs) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    run_sentiment_with(args, &SentimentAnalyzer::keyword_only(), &mut stdout)
}

pub(crate) fn run_sentiment_with(
    args: &SentimentArgs,
    analyzer: &SentimentAnalyzer,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let label: Sentiment = analyzer.analyze(&args.joined());
    writeln!(writer, "{label}").map_err(CliError::WriteOutput)
}
