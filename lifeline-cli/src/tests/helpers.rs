//! Test helpers for writing CLI fixtures into temporary workspaces.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tempfile::TempDir;

/// Temporary directory addressed with UTF-8 paths.
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self { _dir: dir, root }
    }

    pub(super) fn path(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }

    pub(super) fn root(&self) -> &Utf8Path {
        &self.root
    }
}

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    fs::write(path, contents).unwrap_or_else(|err| panic!("failed to write {path}: {err}"));
}

/// Donor export with one donor about 5.6 km and one about 55 km east of
/// the origin, plus one without a position.
pub(super) const DONOR_SNAPSHOT: &str = r#"{
    "donor": {
        "near": {
            "fullName": "Asha",
            "bloodGroup": "O+",
            "organAvailable": "kidney",
            "latitude": "0.0",
            "longitude": "0.05"
        },
        "far": {
            "fullName": "Ravi",
            "bloodGroup": "A-",
            "organAvailable": "liver",
            "latitude": "0.0",
            "longitude": "0.5"
        },
        "hidden": { "fullName": "Meera" }
    }
}"#;

pub(super) const REVIEW_SNAPSHOT: &str = r#"{
    "hospital_reviews": {
        "city-general": {
            "r1": {"userId": "u1", "userName": "Al", "rating": 4.5, "comment": "Kind staff, very helpful", "timestamp": 1},
            "r2": {"userId": "u2", "userName": "Bea", "rating": 2.0, "comment": "slow and rude", "timestamp": 2},
            "r3": {"userId": "u3", "userName": "Cy", "rating": 3.0, "comment": "", "timestamp": 3}
        }
    }
}"#;
