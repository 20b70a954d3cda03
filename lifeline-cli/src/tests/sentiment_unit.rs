//! Unit tests for the sentiment command.

use super::*;
use crate::sentiment::{SentimentArgs, run_sentiment_with};
use lifeline_core::SentimentAnalyzer;
use rstest::rstest;

#[rstest]
#[case(&["Great", "doctors,", "would", "recommend"], "Positive")]
#[case(&["rude", "staff"], "Negative")]
#[case(&[], "Neutral")]
fn prints_the_keyword_label(#[case] words: &[&str], #[case] expected: &str) {
    let args = SentimentArgs {
        text: words.iter().map(|word| (*word).to_owned()).collect(),
    };
    let mut buffer = Vec::new();

    run_sentiment_with(&args, &SentimentAnalyzer::keyword_only(), &mut buffer)
        .expect("command succeeds");

    assert_eq!(String::from_utf8(buffer).expect("utf-8 output"), format!("{expected}\n"));
}

#[rstest]
fn parses_free_text_words() {
    let cli = Cli::try_parse_from(["lifeline", "sentiment", "very", "good"]).expect("parses");

    match cli.command {
        Command::Sentiment(args) => assert_eq!(args.text, ["very", "good"]),
        other => panic!("expected sentiment command, found {other:?}"),
    }
}
