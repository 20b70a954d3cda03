//! Behavioural tests for [`acquire_location`].
//!
//! Each scenario runs on a paused clock so the fallback timeout elapses
//! instantly.

use lifeline_core::test_support::ScriptedLocationProvider;
use lifeline_core::{
    Coordinate, LocationError, LocationFix, LocationPolicy, LocationPriority, LogObserver,
    acquire_location,
};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;

type ProviderCell = RefCell<Option<ScriptedLocationProvider>>;
type ResultCell = RefCell<Option<Result<Coordinate, LocationError>>>;

const CACHED: LocationFix = LocationFix {
    latitude: 12.9716,
    longitude: 77.5946,
};

const FRESH: LocationFix = LocationFix {
    latitude: 28.6139,
    longitude: 77.2090,
};

#[fixture]
fn provider() -> ProviderCell {
    RefCell::new(None)
}

#[fixture]
fn result() -> ResultCell {
    RefCell::new(None)
}

fn update_provider(
    provider: &ProviderCell,
    change: impl FnOnce(ScriptedLocationProvider) -> ScriptedLocationProvider,
) {
    let current = provider.take().unwrap_or_default();
    *provider.borrow_mut() = Some(change(current));
}

fn acquired(result: &ResultCell) -> Result<Coordinate, LocationError> {
    result
        .borrow()
        .clone()
        .expect("acquisition must have run")
}

// --- Given steps ---

#[given("a provider with a cached fix")]
fn cached_fix(#[from(provider)] provider: &ProviderCell) {
    update_provider(provider, |p| p.with_last_known(Ok(Some(CACHED))));
}

#[given("a provider without a cached fix")]
fn no_cached_fix(#[from(provider)] provider: &ProviderCell) {
    update_provider(provider, |p| p.with_last_known(Ok(None)));
}

#[given("a provider without location permission")]
fn no_permission(#[from(provider)] provider: &ProviderCell) {
    update_provider(provider, |p| {
        p.with_last_known(Err(LocationError::PermissionDenied))
            .with_update(Err(LocationError::PermissionDenied))
    });
}

#[given("a fallback update that delivers a fix")]
fn fallback_delivers(#[from(provider)] provider: &ProviderCell) {
    update_provider(provider, |p| p.with_update(Ok(Some(FRESH))));
}

#[given("a fallback update that never arrives")]
fn fallback_silent(#[from(provider)] provider: &ProviderCell) {
    update_provider(provider, ScriptedLocationProvider::with_pending_update);
}

// --- When steps ---

#[when("the seeker location is acquired")]
fn acquire(#[from(provider)] provider: &ProviderCell, #[from(result)] result: &ResultCell) {
    let guard = provider.borrow();
    let scripted = guard.as_ref().expect("provider must be configured");
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .expect("runtime builds");
    let found =
        runtime.block_on(acquire_location(scripted, &LocationPolicy::default(), &LogObserver));
    *result.borrow_mut() = Some(found);
}

// --- Then steps ---

#[then("the cached fix is returned")]
fn cached_returned(#[from(result)] result: &ResultCell) {
    let found = acquired(result).expect("location obtained");
    assert_eq!(LocationFix::from(found), CACHED);
}

#[then("the fallback fix is returned")]
fn fresh_returned(#[from(result)] result: &ResultCell) {
    let found = acquired(result).expect("location obtained");
    assert_eq!(LocationFix::from(found), FRESH);
}

#[then("no fallback update was requested")]
fn no_fallback(#[from(provider)] provider: &ProviderCell) {
    let guard = provider.borrow();
    let scripted = guard.as_ref().expect("provider must be configured");
    assert_eq!(scripted.update_requests(), 0);
}

#[then("one high-accuracy fallback update was requested")]
fn one_fallback(#[from(provider)] provider: &ProviderCell) {
    let guard = provider.borrow();
    let scripted = guard.as_ref().expect("provider must be configured");
    assert_eq!(scripted.update_requests(), 1);
    let request = scripted.last_request().expect("request recorded");
    assert_eq!(request.priority, LocationPriority::HighAccuracy);
    assert_eq!(request.max_updates, 1);
}

#[then("acquisition fails with a timeout")]
fn fails_with_timeout(#[from(result)] result: &ResultCell) {
    let err = acquired(result).expect_err("acquisition should fail");
    assert_eq!(err, LocationError::TimedOut { timeout_secs: 15 });
}

#[then("acquisition fails with a permission error")]
fn fails_with_permission(#[from(result)] result: &ResultCell) {
    let err = acquired(result).expect_err("acquisition should fail");
    assert_eq!(err, LocationError::PermissionDenied);
}

// --- Scenario registrations ---

macro_rules! register_scenario {
    ($fn_name:ident, $title:literal) => {
        #[scenario(path = "tests/features/location_acquisition.feature", name = $title)]
        fn $fn_name(provider: ProviderCell, result: ResultCell) {
            let _ = (provider, result);
        }
    };
}

register_scenario!(using_cached_fix, "using a cached fix directly");
register_scenario!(falling_back, "falling back to one fresh update");
register_scenario!(giving_up, "giving up on a silent fallback");
register_scenario!(
    stopping_without_permission,
    "stopping when permission is missing"
);
