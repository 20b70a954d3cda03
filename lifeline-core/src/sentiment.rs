//! Review-text sentiment with a keyword fallback.
//!
//! [`classify_sentiment`] is the heuristic used whenever the neural model is
//! missing or fails. Matching is plain substring containment on the
//! lower-cased text, so `"badge"` counts as containing `"bad"`.
//!
//! # Examples
//! ```
//! use lifeline_core::{Sentiment, classify_sentiment};
//!
//! assert_eq!(classify_sentiment(""), Sentiment::Neutral);
//! assert_eq!(classify_sentiment("Good great service"), Sentiment::Positive);
//! ```

use log::{debug, warn};
use thiserror::Error;

/// Keywords counted towards a positive verdict.
pub const POSITIVE_KEYWORDS: [&str; 13] = [
    "good",
    "great",
    "excellent",
    "wonderful",
    "amazing",
    "love",
    "helpful",
    "satisfied",
    "best",
    "recommend",
    "happy",
    "professional",
    "perfect",
];

/// Keywords counted towards a negative verdict.
pub const NEGATIVE_KEYWORDS: [&str; 12] = [
    "bad",
    "poor",
    "terrible",
    "horrible",
    "awful",
    "worst",
    "rude",
    "disappointed",
    "disappointing",
    "inefficient",
    "slow",
    "unprofessional",
];

/// Texts longer than this many UTF-16 code units resolve keyword ties as
/// positive.
pub const TIE_BREAK_LENGTH: usize = 20;

/// Sentiment label for a piece of review text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Sentiment {
    /// Favourable.
    Positive,
    /// Unfavourable.
    Negative,
    /// No text to judge.
    Neutral,
}

impl Sentiment {
    /// Capitalised label, as shown next to reviews.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Negative => "Negative",
            Self::Neutral => "Neutral",
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Sentiment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "positive" => Ok(Self::Positive),
            "negative" => Ok(Self::Negative),
            "neutral" => Ok(Self::Neutral),
            _ => Err(format!("unknown sentiment '{s}'")),
        }
    }
}

/// Classify `text` by counting positive and negative keywords.
///
/// Each keyword counts at most once. On a tie, texts longer than
/// [`TIE_BREAK_LENGTH`] UTF-16 code units are positive and shorter ones
/// negative, so a character outside the BMP counts twice.
#[must_use]
pub fn classify_sentiment(text: &str) -> Sentiment {
    if text.is_empty() {
        return Sentiment::Neutral;
    }
    let lowered = text.to_lowercase();
    let positive = count_present(&lowered, &POSITIVE_KEYWORDS);
    let negative = count_present(&lowered, &NEGATIVE_KEYWORDS);
    match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => Sentiment::Positive,
        std::cmp::Ordering::Less => Sentiment::Negative,
        std::cmp::Ordering::Equal if text.encode_utf16().count() > TIE_BREAK_LENGTH => {
            Sentiment::Positive
        }
        std::cmp::Ordering::Equal => Sentiment::Negative,
    }
}

fn count_present(haystack: &str, keywords: &[&str]) -> usize {
    keywords
        .iter()
        .filter(|keyword| haystack.contains(*keyword))
        .count()
}

/// Output of a sentiment model: `[negative, positive]` scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentimentScores {
    /// Score for the negative class.
    pub negative: f32,
    /// Score for the positive class.
    pub positive: f32,
}

impl SentimentScores {
    /// Build from the model's two-element output.
    #[must_use]
    pub const fn from_array([negative, positive]: [f32; 2]) -> Self {
        Self { negative, positive }
    }

    /// Negative only when it strictly outscores positive.
    #[must_use]
    pub fn sentiment(&self) -> Sentiment {
        if self.negative > self.positive {
            Sentiment::Negative
        } else {
            Sentiment::Positive
        }
    }
}

/// Errors raised by a [`SentimentModel`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SentimentModelError {
    /// The model is not loaded.
    #[error("sentiment model unavailable: {message}")]
    Unavailable {
        /// Reason.
        message: String,
    },
    /// Inference failed.
    #[error("sentiment inference failed: {message}")]
    Inference {
        /// Reason.
        message: String,
    },
}

/// An opaque text classifier.
pub trait SentimentModel: Send + Sync {
    /// Score `text`.
    fn score(&self, text: &str) -> Result<SentimentScores, SentimentModelError>;
}

/// Classifies review text with a model when available, keywords otherwise.
///
/// ```
/// use lifeline_core::{Sentiment, SentimentAnalyzer};
///
/// let analyzer = SentimentAnalyzer::keyword_only();
/// assert_eq!(analyzer.analyze("The staff were rude"), Sentiment::Negative);
/// ```
#[derive(Default)]
pub struct SentimentAnalyzer {
    model: Option<Box<dyn SentimentModel>>,
}

impl std::fmt::Debug for SentimentAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentimentAnalyzer")
            .field("has_model", &self.model.is_some())
            .finish()
    }
}

impl SentimentAnalyzer {
    /// An analyzer relying solely on the keyword heuristic.
    #[must_use]
    pub fn keyword_only() -> Self {
        Self { model: None }
    }

    /// An analyzer backed by `model`.
    #[must_use]
    pub fn with_model(model: impl SentimentModel + 'static) -> Self {
        Self {
            model: Some(Box::new(model)),
        }
    }

    /// Classify `text`.
    #[must_use]
    pub fn analyze(&self, text: &str) -> Sentiment {
        if text.is_empty() {
            return Sentiment::Neutral;
        }
        let Some(model) = &self.model else {
            return classify_sentiment(text);
        };
        match model.score(text) {
            Ok(scores) => {
                debug!("sentiment scores: {scores:?}");
                scores.sentiment()
            }
            Err(err) => {
                warn!("sentiment model failed, using keywords: {err}");
                classify_sentiment(text)
            }
        }
    }
}
