//! Readers for JSON exports of the realtime database.
//!
//! Donors live under `donor/<id>` and reviews under
//! `hospital_reviews/<hospitalId>/<reviewId>`. Both readers accept either the
//! full export or the subtree on its own. Entries are returned in key order
//! so repeated reads of the same export agree.

use std::collections::BTreeMap;

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use lifeline_core::{
    DonorCandidate, DonorRecord, DonorSource, DonorSourceError, ReviewError, ReviewRecord,
};
use log::{debug, warn};
use serde::Deserialize;
use thiserror::Error;

const DONOR_ROOT: &str = "donor";
const REVIEW_ROOT: &str = "hospital_reviews";

/// Errors raised while reading a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The file could not be read.
    #[error("failed to read snapshot at {path}")]
    Io {
        /// Snapshot path.
        path: Utf8PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The text is not a snapshot of the expected shape.
    #[error("failed to parse {what} snapshot")]
    Parse {
        /// Which subtree was being read.
        what: &'static str,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },
    /// A review carries an impossible rating.
    #[error("invalid review for hospital {hospital_id}")]
    InvalidReview {
        /// Hospital the review belongs to.
        hospital_id: String,
        /// Validation error.
        #[source]
        source: ReviewError,
    },
}

/// The subtree under `root`, or the whole document when it is already bare.
fn subtree<'a>(document: &'a serde_json::Value, root: &str) -> &'a serde_json::Value {
    document.get(root).unwrap_or(document)
}

/// Parse a donor snapshot.
///
/// # Errors
///
/// Returns [`SnapshotError::Parse`] when the text is not JSON or a donor entry
/// is not an object of donor fields.
///
/// # Examples
///
/// ```
/// use lifeline_data::snapshot::parse_donor_snapshot;
///
/// let json = r#"{"donor": {
///     "b": {"fullName": "Bo", "latitude": "12.9", "longitude": "77.6"},
///     "a": {"fullName": "Al", "latitude": 12.9}
/// }}"#;
/// let donors = parse_donor_snapshot(json).expect("valid snapshot");
/// assert_eq!(donors[0].id, "a");
/// assert!(donors[0].coordinate.is_none());
/// assert!(donors[1].coordinate.is_some());
/// ```
pub fn parse_donor_snapshot(text: &str) -> Result<Vec<DonorCandidate>, SnapshotError> {
    let parse = |source| SnapshotError::Parse {
        what: DONOR_ROOT,
        source,
    };
    let document: serde_json::Value = serde_json::from_str(text).map_err(parse)?;
    let records: BTreeMap<String, DonorRecord> =
        BTreeMap::deserialize(subtree(&document, DONOR_ROOT)).map_err(parse)?;
    Ok(records
        .into_iter()
        .map(|(id, record)| record.into_candidate(id))
        .collect())
}

/// Read and parse the donor snapshot at `path`.
///
/// # Errors
///
/// Returns [`SnapshotError::Io`] when the file cannot be read and
/// [`SnapshotError::Parse`] when it is malformed.
pub fn load_donor_snapshot(path: &Utf8Path) -> Result<Vec<DonorCandidate>, SnapshotError> {
    let text = lifeline_fs::read_utf8_file(path).map_err(|source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let donors = parse_donor_snapshot(&text)?;
    debug!("read {} donors from {path}", donors.len());
    Ok(donors)
}

/// [`DonorSource`] re-reading a snapshot file on every call.
#[derive(Debug, Clone)]
pub struct SnapshotDonorSource {
    path: Utf8PathBuf,
}

impl SnapshotDonorSource {
    /// Serve donors from the export at `path`.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Export location.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

#[async_trait]
impl DonorSource for SnapshotDonorSource {
    async fn list_donors(&self) -> Result<Vec<DonorCandidate>, DonorSourceError> {
        let path = self.path.clone();
        let loaded = tokio::task::spawn_blocking(move || load_donor_snapshot(&path))
            .await
            .map_err(|err| DonorSourceError::unavailable("snapshot reader stopped", err))?;
        loaded.map_err(|err| match err {
            SnapshotError::Parse { source, .. } => DonorSourceError::Malformed {
                message: source.to_string(),
            },
            other => DonorSourceError::unavailable(format!("cannot read {}", self.path), other),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StoredReview {
    user_id: String,
    user_name: String,
    rating: f32,
    comment: String,
    timestamp: i64,
}

impl Default for StoredReview {
    fn default() -> Self {
        Self {
            user_id: String::new(),
            user_name: String::new(),
            rating: f32::NAN,
            comment: String::new(),
            timestamp: 0,
        }
    }
}

/// Reviews grouped by hospital.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewSnapshot {
    hospitals: BTreeMap<String, Vec<ReviewRecord>>,
}

impl ReviewSnapshot {
    /// Reviews of `hospital_id` in key order; empty for unknown hospitals.
    #[must_use]
    pub fn reviews_for(&self, hospital_id: &str) -> &[ReviewRecord] {
        self.hospitals.get(hospital_id).map_or(&[], Vec::as_slice)
    }

    /// Hospitals with at least one stored review entry.
    pub fn hospital_ids(&self) -> impl Iterator<Item = &str> {
        self.hospitals.keys().map(String::as_str)
    }

    /// Total number of reviews.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hospitals.values().map(Vec::len).sum()
    }

    /// Whether the snapshot holds no reviews.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parse a review snapshot.
///
/// A review without a rating is rejected, as is one rated outside the star
/// range.
///
/// # Errors
///
/// Returns [`SnapshotError::Parse`] for malformed JSON and
/// [`SnapshotError::InvalidReview`] for an invalid rating.
pub fn parse_review_snapshot(text: &str) -> Result<ReviewSnapshot, SnapshotError> {
    let parse = |source| SnapshotError::Parse {
        what: REVIEW_ROOT,
        source,
    };
    let document: serde_json::Value = serde_json::from_str(text).map_err(parse)?;
    let stored: BTreeMap<String, BTreeMap<String, StoredReview>> =
        BTreeMap::deserialize(subtree(&document, REVIEW_ROOT)).map_err(parse)?;

    let mut hospitals = BTreeMap::new();
    for (hospital_id, entries) in stored {
        let mut reviews = Vec::with_capacity(entries.len());
        for (id, entry) in entries {
            let review = ReviewRecord {
                id,
                author_id: entry.user_id,
                author_name: entry.user_name,
                rating: entry.rating,
                comment: entry.comment,
                timestamp_ms: entry.timestamp,
            };
            if let Err(source) = review.validate() {
                warn!("rejecting review {} of hospital {hospital_id}", review.id);
                return Err(SnapshotError::InvalidReview {
                    hospital_id,
                    source,
                });
            }
            reviews.push(review);
        }
        hospitals.insert(hospital_id, reviews);
    }
    Ok(ReviewSnapshot { hospitals })
}

/// Read and parse the review snapshot at `path`.
///
/// # Errors
///
/// See [`parse_review_snapshot`]; unreadable files give [`SnapshotError::Io`].
pub fn load_review_snapshot(path: &Utf8Path) -> Result<ReviewSnapshot, SnapshotError> {
    let text = lifeline_fs::read_utf8_file(path).map_err(|source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_review_snapshot(&text)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    const DONORS: &str = r#"{
        "donor": {
            "d2": {
                "fullName": "Ravi",
                "bloodGroup": "B+",
                "organAvailable": "liver",
                "latitude": "12.9352",
                "longitude": "77.6245"
            },
            "d1": {
                "fullName": "Asha",
                "bloodGroup": "O-",
                "organAvailable": "kidney",
                "location": "Indiranagar",
                "ProfileImageUrl": "https://img.example/asha.png",
                "requestStatus": "pending",
                "latitude": "12.9716",
                "longitude": "77.5946"
            },
            "d3": { "fullName": "Meera", "latitude": 12.0, "longitude": "77.0" }
        },
        "users": {}
    }"#;

    #[rstest]
    fn donors_come_back_in_key_order() {
        let donors = parse_donor_snapshot(DONORS).expect("valid snapshot");

        let ids: Vec<&str> = donors.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["d1", "d2", "d3"]);
    }

    #[rstest]
    fn donor_fields_follow_the_store_names() {
        let donors = parse_donor_snapshot(DONORS).expect("valid snapshot");
        let asha = donors.first().expect("first donor");

        assert_eq!(asha.attributes.name, "Asha");
        assert_eq!(asha.attributes.blood_group, "O-");
        assert_eq!(asha.attributes.organ, "kidney");
        assert_eq!(asha.attributes.location_label.as_deref(), Some("Indiranagar"));
        assert_eq!(
            asha.attributes.image_url.as_deref(),
            Some("https://img.example/asha.png")
        );
        let at = asha.coordinate.expect("located");
        assert!((at.latitude() - 12.9716).abs() < 1e-12);
    }

    #[rstest]
    fn contact_request_keys_are_not_donor_attributes() {
        let donors = parse_donor_snapshot(DONORS).expect("valid snapshot");
        let asha = donors.first().expect("first donor");

        let attributes = serde_json::to_value(&asha.attributes).expect("serialise attributes");
        let mut keys: Vec<&str> = attributes
            .as_object()
            .expect("attributes object")
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            ["blood_group", "image_url", "location_label", "name", "organ"]
        );
    }

    #[rstest]
    fn numeric_coordinates_count_as_absent() {
        let donors = parse_donor_snapshot(DONORS).expect("valid snapshot");
        let meera = donors.iter().find(|d| d.id == "d3").expect("d3 present");

        assert!(meera.coordinate.is_none());
    }

    #[rstest]
    fn bare_donor_map_is_accepted() {
        let donors = parse_donor_snapshot(r#"{"x": {"fullName": "X"}}"#).expect("valid");

        assert_eq!(donors.len(), 1);
        assert_eq!(donors[0].id, "x");
    }

    #[rstest]
    #[case("not json")]
    #[case(r#"{"donor": {"d1": 42}}"#)]
    #[case(r#"{"donor": []}"#)]
    fn malformed_donor_snapshots_fail(#[case] text: &str) {
        let err = parse_donor_snapshot(text).expect_err("malformed");

        assert!(matches!(err, SnapshotError::Parse { what: "donor", .. }));
    }

    #[rstest]
    fn missing_file_is_an_io_error() {
        let dir = TempDir::new().expect("temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("absent.json")).expect("utf8 path");

        let err = load_donor_snapshot(&path).expect_err("missing file");

        assert!(matches!(err, SnapshotError::Io { .. }));
    }

    #[rstest]
    #[tokio::test]
    async fn source_rereads_the_file_each_call() {
        let dir = TempDir::new().expect("temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("donors.json")).expect("utf8 path");
        fs::write(&path, r#"{"donor": {"a": {}}}"#).expect("write snapshot");
        let source = SnapshotDonorSource::new(path.clone());

        let first = source.list_donors().await.expect("first read");
        fs::write(&path, r#"{"donor": {"a": {}, "b": {}}}"#).expect("rewrite snapshot");
        let second = source.list_donors().await.expect("second read");

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 2);
    }

    #[rstest]
    #[tokio::test]
    async fn source_reports_malformed_and_missing_exports() {
        let dir = TempDir::new().expect("temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("donors.json")).expect("utf8 path");
        let source = SnapshotDonorSource::new(path.clone());

        let missing = source.list_donors().await.expect_err("missing");
        fs::write(&path, "{").expect("write snapshot");
        let malformed = source.list_donors().await.expect_err("malformed");

        assert!(matches!(missing, DonorSourceError::Unavailable { .. }));
        assert!(matches!(malformed, DonorSourceError::Malformed { .. }));
    }

    const REVIEWS: &str = r#"{
        "hospital_reviews": {
            "h1": {
                "r2": {"userId": "u2", "userName": "Bea", "rating": 2.0, "comment": "slow", "timestamp": 20},
                "r1": {"userId": "u1", "userName": "Al", "rating": 4.5, "comment": "kind staff", "timestamp": 10}
            },
            "h2": {
                "r9": {"userId": "u9", "userName": "Cy", "rating": 3, "comment": "", "timestamp": 5}
            }
        }
    }"#;

    #[rstest]
    fn reviews_are_grouped_by_hospital() {
        let snapshot = parse_review_snapshot(REVIEWS).expect("valid snapshot");

        let h1 = snapshot.reviews_for("h1");
        assert_eq!(h1.len(), 2);
        assert_eq!(h1[0].id, "r1");
        assert_eq!(h1[0].author_name, "Al");
        assert_eq!(h1[0].timestamp_ms, 10);
        assert_eq!(snapshot.reviews_for("h2")[0].rating, 3.0);
        assert!(snapshot.reviews_for("unknown").is_empty());
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.hospital_ids().collect::<Vec<_>>(), ["h1", "h2"]);
    }

    #[rstest]
    #[case(r#"{"h1": {"r1": {"rating": 7.5}}}"#)]
    #[case(r#"{"h1": {"r1": {"comment": "no rating"}}}"#)]
    fn impossible_ratings_are_rejected(#[case] text: &str) {
        let err = parse_review_snapshot(text).expect_err("invalid rating");

        assert!(matches!(err, SnapshotError::InvalidReview { .. }));
    }
}
