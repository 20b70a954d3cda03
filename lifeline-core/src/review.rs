//! Hospital reviews and their rating buckets.

use thiserror::Error;

/// Lowest rating a review may carry.
pub const MIN_RATING: f32 = 0.0;
/// Highest rating a review may carry.
pub const MAX_RATING: f32 = 5.0;
/// Ratings at or above this value are bucketed as positive.
pub const POSITIVE_RATING_THRESHOLD: f32 = 3.0;

/// A single review left for a hospital.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReviewRecord {
    /// Store key of the review.
    pub id: String,
    /// Reviewer's user id.
    pub author_id: String,
    /// Reviewer's display name.
    pub author_name: String,
    /// Star rating between [`MIN_RATING`] and [`MAX_RATING`].
    pub rating: f32,
    /// Free-text comment.
    pub comment: String,
    /// Creation time in milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
}

/// Errors raised by [`ReviewRecord::validate`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReviewError {
    /// Rating was outside the allowed range or not a number.
    #[error("review {id} has rating {rating}, expected {MIN_RATING}..={MAX_RATING}")]
    RatingOutOfRange {
        /// Offending review.
        id: String,
        /// Rejected rating.
        rating: f32,
    },
}

impl ReviewRecord {
    /// Ensure the rating lies within the star range.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::RatingOutOfRange`] otherwise.
    pub fn validate(&self) -> Result<(), ReviewError> {
        if (MIN_RATING..=MAX_RATING).contains(&self.rating) {
            Ok(())
        } else {
            Err(ReviewError::RatingOutOfRange {
                id: self.id.clone(),
                rating: self.rating,
            })
        }
    }

    /// Whether the rating places this review in the positive bucket.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.rating >= POSITIVE_RATING_THRESHOLD
    }
}

/// Reviews split by rating.
///
/// # Examples
///
/// ```
/// use lifeline_core::{ReviewBuckets, ReviewRecord};
///
/// let review = |id: &str, rating: f32| ReviewRecord {
///     id: id.into(),
///     author_id: "u".into(),
///     author_name: "User".into(),
///     rating,
///     comment: String::new(),
///     timestamp_ms: 0,
/// };
/// let buckets = ReviewBuckets::partition(vec![review("a", 4.5), review("b", 2.0)]);
/// assert_eq!(buckets.positive.len(), 1);
/// assert_eq!(buckets.negative[0].id, "b");
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReviewBuckets {
    /// Reviews rated at least [`POSITIVE_RATING_THRESHOLD`].
    pub positive: Vec<ReviewRecord>,
    /// Every other review.
    pub negative: Vec<ReviewRecord>,
}

impl ReviewBuckets {
    /// Partition `reviews`, keeping input order within each bucket.
    pub fn partition<I>(reviews: I) -> Self
    where
        I: IntoIterator<Item = ReviewRecord>,
    {
        let (positive, negative) = reviews.into_iter().partition(ReviewRecord::is_positive);
        Self { positive, negative }
    }
}
