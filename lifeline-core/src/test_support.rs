//! Deterministic doubles for the engine's collaborators.
//!
//! These stand in for the geo classifier, the donor store, the platform
//! location provider and the status sink in unit and behaviour tests. None
//! of them touch the network or the clock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::{
    ClassifierError, ClusterAssignment, ClusterLabel, Coordinate, DonorCandidate, DonorSource,
    DonorSourceError, GeoClassifier, LocationError, LocationEvent, LocationFix, LocationObserver,
    LocationProvider, ModelDiagnostics, UpdateRequest,
};

type CoordinateKey = (u64, u64);

fn key(coordinate: Coordinate) -> CoordinateKey {
    (
        coordinate.latitude().to_bits(),
        coordinate.longitude().to_bits(),
    )
}

#[derive(Debug, Clone)]
enum StubEntry {
    Label(ClusterAssignment),
    Failure(ClassifierError),
}

/// Classifier answering from a lookup table keyed by exact coordinate.
///
/// Coordinates without an entry receive the default label.
///
/// ```
/// use lifeline_core::test_support::StubClassifier;
/// use lifeline_core::{ClusterLabel, Coordinate, GeoClassifier};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let special = Coordinate::new(1.0, 1.0)?;
/// let stub = StubClassifier::uniform(ClusterLabel::Assigned(1))
///     .with_label(special, ClusterLabel::Assigned(9));
/// assert_eq!(stub.classify(special).await?.label, ClusterLabel::Assigned(9));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct StubClassifier {
    default: ClusterLabel,
    entries: HashMap<CoordinateKey, StubEntry>,
}

impl StubClassifier {
    /// Every coordinate maps to `label`.
    #[must_use]
    pub fn uniform(label: ClusterLabel) -> Self {
        Self {
            default: label,
            entries: HashMap::new(),
        }
    }

    /// Map `coordinate` to `label`.
    #[must_use]
    pub fn with_label(mut self, coordinate: Coordinate, label: ClusterLabel) -> Self {
        self.entries.insert(
            key(coordinate),
            StubEntry::Label(ClusterAssignment::label(label)),
        );
        self
    }

    /// Report diagnostics for `coordinate`, keeping its current label.
    #[must_use]
    pub fn with_diagnostics(mut self, coordinate: Coordinate, diagnostics: ModelDiagnostics) -> Self {
        let label = match self.entries.get(&key(coordinate)) {
            Some(StubEntry::Label(assignment)) => assignment.label,
            _ => self.default,
        };
        self.entries.insert(
            key(coordinate),
            StubEntry::Label(ClusterAssignment::label(label).with_diagnostics(diagnostics)),
        );
        self
    }

    /// Fail with a network error for `coordinate`.
    #[must_use]
    pub fn with_failure(self, coordinate: Coordinate) -> Self {
        self.with_error(coordinate, network_error())
    }

    /// Fail with `error` for `coordinate`.
    #[must_use]
    pub fn with_error(mut self, coordinate: Coordinate, error: ClassifierError) -> Self {
        self.entries.insert(key(coordinate), StubEntry::Failure(error));
        self
    }

    fn answer(&self, coordinate: Coordinate) -> Result<ClusterAssignment, ClassifierError> {
        match self.entries.get(&key(coordinate)) {
            Some(StubEntry::Label(assignment)) => Ok(assignment.clone()),
            Some(StubEntry::Failure(error)) => Err(error.clone()),
            None => Ok(ClusterAssignment::label(self.default)),
        }
    }
}

#[async_trait]
impl GeoClassifier for StubClassifier {
    async fn classify(&self, coordinate: Coordinate) -> Result<ClusterAssignment, ClassifierError> {
        self.answer(coordinate)
    }
}

fn network_error() -> ClassifierError {
    ClassifierError::NetworkError {
        url: "stub://classifier".to_owned(),
        message: "connection refused".to_owned(),
    }
}

/// Classifier failing every call with the same error.
#[derive(Debug, Clone)]
pub struct FailingClassifier {
    error: ClassifierError,
}

impl FailingClassifier {
    /// Fail with `error`.
    #[must_use]
    pub const fn new(error: ClassifierError) -> Self {
        Self { error }
    }

    /// Fail with a connection error.
    #[must_use]
    pub fn network() -> Self {
        Self::new(network_error())
    }

    /// Fail with a timeout.
    #[must_use]
    pub fn timeout() -> Self {
        Self::new(ClassifierError::Timeout {
            url: "stub://classifier".to_owned(),
            timeout_secs: 30,
        })
    }
}

#[async_trait]
impl GeoClassifier for FailingClassifier {
    async fn classify(&self, _coordinate: Coordinate) -> Result<ClusterAssignment, ClassifierError> {
        Err(self.error.clone())
    }
}

/// [`StubClassifier`] that records every coordinate it is asked about.
#[derive(Debug)]
pub struct RecordingClassifier {
    inner: StubClassifier,
    calls: Mutex<Vec<Coordinate>>,
}

impl RecordingClassifier {
    /// Record calls answered by `inner`.
    #[must_use]
    pub const fn wrapping(inner: StubClassifier) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Record calls, labelling everything `label`.
    #[must_use]
    pub fn uniform(label: ClusterLabel) -> Self {
        Self::wrapping(StubClassifier::uniform(label))
    }

    /// Coordinates classified so far, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<Coordinate> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl GeoClassifier for RecordingClassifier {
    async fn classify(&self, coordinate: Coordinate) -> Result<ClusterAssignment, ClassifierError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(coordinate);
        self.inner.answer(coordinate)
    }
}

/// Donor store backed by a vector.
#[derive(Debug, Default)]
pub struct MemoryDonorSource {
    donors: Vec<DonorCandidate>,
    failure: Option<String>,
    fetches: AtomicUsize,
}

impl MemoryDonorSource {
    /// Serve `donors` on every fetch.
    #[must_use]
    pub const fn new(donors: Vec<DonorCandidate>) -> Self {
        Self {
            donors,
            failure: None,
            fetches: AtomicUsize::new(0),
        }
    }

    /// Fail every fetch with `message`.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Number of fetches served so far.
    #[must_use]
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DonorSource for MemoryDonorSource {
    async fn list_donors(&self) -> Result<Vec<DonorCandidate>, DonorSourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(DonorSourceError::Unavailable {
                message: message.clone(),
                source: None,
            }),
            None => Ok(self.donors.clone()),
        }
    }
}

#[derive(Debug, Clone)]
enum UpdateScript {
    Respond(Result<Option<LocationFix>, LocationError>),
    Pending,
}

/// Location provider replaying scripted answers.
///
/// By default both calls report "no fix".
#[derive(Debug)]
pub struct ScriptedLocationProvider {
    last_known: Result<Option<LocationFix>, LocationError>,
    update: UpdateScript,
    update_requests: AtomicUsize,
    last_request: Mutex<Option<UpdateRequest>>,
}

impl Default for ScriptedLocationProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedLocationProvider {
    /// A provider that never has a fix.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_known: Ok(None),
            update: UpdateScript::Respond(Ok(None)),
            update_requests: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Answer for the last-known query.
    #[must_use]
    pub fn with_last_known(mut self, answer: Result<Option<LocationFix>, LocationError>) -> Self {
        self.last_known = answer;
        self
    }

    /// Answer for the fallback update.
    #[must_use]
    pub fn with_update(mut self, answer: Result<Option<LocationFix>, LocationError>) -> Self {
        self.update = UpdateScript::Respond(answer);
        self
    }

    /// Make the fallback update never resolve.
    #[must_use]
    pub fn with_pending_update(mut self) -> Self {
        self.update = UpdateScript::Pending;
        self
    }

    /// Number of fallback updates requested.
    #[must_use]
    pub fn update_requests(&self) -> usize {
        self.update_requests.load(Ordering::SeqCst)
    }

    /// Parameters of the most recent fallback request.
    #[must_use]
    pub fn last_request(&self) -> Option<UpdateRequest> {
        *self
            .last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl LocationProvider for ScriptedLocationProvider {
    async fn last_known_location(&self) -> Result<Option<LocationFix>, LocationError> {
        self.last_known.clone()
    }

    async fn request_single_update(
        &self,
        request: &UpdateRequest,
    ) -> Result<Option<LocationFix>, LocationError> {
        self.update_requests.fetch_add(1, Ordering::SeqCst);
        *self
            .last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(*request);
        match &self.update {
            UpdateScript::Respond(answer) => answer.clone(),
            UpdateScript::Pending => std::future::pending().await,
        }
    }
}

/// Observer keeping every event it receives.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<LocationEvent>>,
}

impl RecordingObserver {
    /// Events received so far.
    #[must_use]
    pub fn events(&self) -> Vec<LocationEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LocationObserver for RecordingObserver {
    fn on_event(&self, event: &LocationEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
