//! Seeker location acquisition with a single-update fallback.
//!
//! [`acquire_location`] asks the platform provider for its last known fix
//! first. When that yields nothing usable it requests exactly one fresh
//! update and waits for it no longer than
//! [`LocationPolicy::fallback_timeout`]. Progress is reported to a
//! [`LocationObserver`] so callers can surface status messages.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use thiserror::Error;

use crate::Coordinate;

/// Requested interval between fallback updates.
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(10);
/// Fastest interval the fallback accepts updates at.
pub const DEFAULT_FASTEST_INTERVAL: Duration = Duration::from_secs(5);
/// Upper bound on the fallback wait.
pub const DEFAULT_FALLBACK_TIMEOUT: Duration = Duration::from_secs(15);

/// Parameters for the fallback update request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationPolicy {
    /// Accuracy asked of the fallback update.
    pub priority: LocationPriority,
    /// Desired update interval.
    pub update_interval: Duration,
    /// Fastest acceptable update interval.
    pub fastest_interval: Duration,
    /// Number of updates to request.
    pub max_updates: u32,
    /// How long to wait for the fallback update before giving up.
    pub fallback_timeout: Duration,
}

impl Default for LocationPolicy {
    fn default() -> Self {
        Self {
            priority: LocationPriority::HighAccuracy,
            update_interval: DEFAULT_UPDATE_INTERVAL,
            fastest_interval: DEFAULT_FASTEST_INTERVAL,
            max_updates: 1,
            fallback_timeout: DEFAULT_FALLBACK_TIMEOUT,
        }
    }
}

impl LocationPolicy {
    /// Override the fallback timeout.
    #[must_use]
    pub const fn with_fallback_timeout(mut self, timeout: Duration) -> Self {
        self.fallback_timeout = timeout;
        self
    }

    /// Override the accuracy requested on fallback.
    #[must_use]
    pub const fn with_priority(mut self, priority: LocationPriority) -> Self {
        self.priority = priority;
        self
    }

    /// The update request handed to the provider on fallback.
    #[must_use]
    pub const fn update_request(&self) -> UpdateRequest {
        UpdateRequest {
            priority: self.priority,
            interval: self.update_interval,
            fastest_interval: self.fastest_interval,
            max_updates: self.max_updates,
        }
    }
}

/// Accuracy requested from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationPriority {
    /// Best available accuracy, typically GPS.
    HighAccuracy,
    /// Coarser, cheaper fixes.
    Balanced,
}

/// A one-shot update subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateRequest {
    /// Requested accuracy.
    pub priority: LocationPriority,
    /// Desired interval.
    pub interval: Duration,
    /// Fastest acceptable interval.
    pub fastest_interval: Duration,
    /// Number of updates after which the subscription ends.
    pub max_updates: u32,
}

/// A raw fix as reported by the platform; not yet validated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationFix {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl LocationFix {
    /// Validate the fix.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoordinateError`] when either value is not finite.
    pub fn to_coordinate(self) -> Result<Coordinate, crate::CoordinateError> {
        Coordinate::new(self.latitude, self.longitude)
    }
}

impl From<Coordinate> for LocationFix {
    fn from(value: Coordinate) -> Self {
        Self {
            latitude: value.latitude(),
            longitude: value.longitude(),
        }
    }
}

/// Terminal location failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    /// The user has not granted location access.
    #[error("location permission not granted")]
    PermissionDenied,
    /// Neither the last known fix nor the fallback update produced a usable
    /// position.
    #[error("location unavailable: {message}")]
    Unavailable {
        /// What went missing.
        message: String,
    },
    /// The provider reported an error.
    #[error("location provider failed: {message}")]
    Provider {
        /// Provider error text.
        message: String,
    },
    /// The fallback update did not arrive in time.
    #[error("no location update within {timeout_secs}s")]
    TimedOut {
        /// Timeout that elapsed, in seconds.
        timeout_secs: u64,
    },
}

/// Platform location services.
///
/// `Ok(None)` is a legitimate "no fix" answer and triggers the fallback.
/// Errors are terminal.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// The most recent cached fix, if any.
    async fn last_known_location(&self) -> Result<Option<LocationFix>, LocationError>;

    /// Subscribe for `request.max_updates` updates and resolve on the first.
    ///
    /// Returning `Ok(None)` means the subscription ended without a fix.
    async fn request_single_update(
        &self,
        request: &UpdateRequest,
    ) -> Result<Option<LocationFix>, LocationError>;
}

/// Status transitions reported during acquisition.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationEvent {
    /// Querying the last known location.
    Requesting,
    /// Falling back to a fresh update.
    RequestingUpdate,
    /// A usable fix was obtained.
    Obtained(Coordinate),
    /// Permission is missing.
    PermissionDenied,
    /// Acquisition failed.
    Failed {
        /// Error text.
        message: String,
    },
}

/// Receives [`LocationEvent`]s; typically a status line in a UI.
pub trait LocationObserver: Send + Sync {
    /// Handle a single event.
    fn on_event(&self, event: &LocationEvent);
}

/// Forwards events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl LocationObserver for LogObserver {
    fn on_event(&self, event: &LocationEvent) {
        match event {
            LocationEvent::Requesting => info!("requesting location"),
            LocationEvent::RequestingUpdate => info!("requesting a fresh location update"),
            LocationEvent::Obtained(at) => info!("location obtained: {at}"),
            LocationEvent::PermissionDenied => warn!("location permission denied"),
            LocationEvent::Failed { message } => warn!("failed to get location: {message}"),
        }
    }
}

/// A provider that always reports the same position.
///
/// Useful when the seeker's position is already known, for example from
/// command-line arguments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedLocationProvider {
    fix: LocationFix,
}

impl FixedLocationProvider {
    /// Report `coordinate` for every query.
    #[must_use]
    pub fn new(coordinate: Coordinate) -> Self {
        Self {
            fix: coordinate.into(),
        }
    }
}

#[async_trait]
impl LocationProvider for FixedLocationProvider {
    async fn last_known_location(&self) -> Result<Option<LocationFix>, LocationError> {
        Ok(Some(self.fix))
    }

    async fn request_single_update(
        &self,
        _request: &UpdateRequest,
    ) -> Result<Option<LocationFix>, LocationError> {
        Ok(Some(self.fix))
    }
}

/// Obtain the seeker's position.
///
/// # Errors
///
/// - [`LocationError::PermissionDenied`] or [`LocationError::Provider`] as
///   reported by either provider call.
/// - [`LocationError::Unavailable`] when the fallback ends without a usable
///   fix.
/// - [`LocationError::TimedOut`] when the fallback exceeds
///   `policy.fallback_timeout`.
///
/// # Examples
///
/// ```
/// use lifeline_core::{
///     Coordinate, FixedLocationProvider, LocationPolicy, LogObserver, acquire_location,
/// };
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let here = Coordinate::new(12.97, 77.59)?;
/// let provider = FixedLocationProvider::new(here);
/// let found = acquire_location(&provider, &LocationPolicy::default(), &LogObserver).await?;
/// assert_eq!(found, here);
/// # Ok(())
/// # }
/// ```
pub async fn acquire_location<P, O>(
    provider: &P,
    policy: &LocationPolicy,
    observer: &O,
) -> Result<Coordinate, LocationError>
where
    P: LocationProvider + ?Sized,
    O: LocationObserver + ?Sized,
{
    observer.on_event(&LocationEvent::Requesting);
    match provider.last_known_location().await {
        Ok(Some(fix)) => match fix.to_coordinate() {
            Ok(coordinate) => return Ok(obtained(observer, coordinate)),
            Err(err) => debug!("ignoring last known location: {err}"),
        },
        Ok(None) => debug!("no last known location; falling back to a fresh update"),
        Err(err) => return Err(failed(observer, err)),
    }

    observer.on_event(&LocationEvent::RequestingUpdate);
    let request = policy.update_request();
    let update =
        tokio::time::timeout(policy.fallback_timeout, provider.request_single_update(&request))
            .await;
    let result = match update {
        Err(_elapsed) => Err(LocationError::TimedOut {
            timeout_secs: policy.fallback_timeout.as_secs(),
        }),
        Ok(Ok(Some(fix))) => fix.to_coordinate().map_err(|err| LocationError::Unavailable {
            message: err.to_string(),
        }),
        Ok(Ok(None)) => Err(LocationError::Unavailable {
            message: "location update ended without a fix".to_owned(),
        }),
        Ok(Err(err)) => Err(err),
    };
    match result {
        Ok(coordinate) => Ok(obtained(observer, coordinate)),
        Err(err) => Err(failed(observer, err)),
    }
}

fn obtained<O: LocationObserver + ?Sized>(observer: &O, coordinate: Coordinate) -> Coordinate {
    observer.on_event(&LocationEvent::Obtained(coordinate));
    coordinate
}

fn failed<O: LocationObserver + ?Sized>(observer: &O, err: LocationError) -> LocationError {
    let event = match &err {
        LocationError::PermissionDenied => LocationEvent::PermissionDenied,
        other => LocationEvent::Failed {
            message: other.to_string(),
        },
    };
    observer.on_event(&event);
    err
}
