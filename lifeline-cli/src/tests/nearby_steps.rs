//! Behaviour-driven step definitions driving the nearby CLI scenarios.

use super::helpers::{DONOR_SNAPSHOT, Workspace, write_utf8};
use super::*;
use crate::nearby::{NearbyClassifierBuilder, NearbyConfig, run_nearby_with};
use lifeline_core::test_support::StubClassifier;
use lifeline_core::{
    ClusterLabel, DonorSourceError, GeoClassifier, MatchConfigError, SearchError, SearchReport,
};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;

struct NearbyWorld {
    workspace: Workspace,
    include_donors: RefCell<bool>,
    classifier: RefCell<Option<StubClassifier>>,
    cli_args: RefCell<Vec<String>>,
    stdout: RefCell<Vec<u8>>,
    result: RefCell<Option<Result<(), CliError>>>,
}

impl NearbyWorld {
    fn new() -> Self {
        Self {
            workspace: Workspace::new(),
            include_donors: RefCell::new(true),
            classifier: RefCell::new(None),
            cli_args: RefCell::new(Vec::new()),
            stdout: RefCell::new(Vec::new()),
            result: RefCell::new(None),
        }
    }

    fn donors_path(&self) -> camino::Utf8PathBuf {
        self.workspace.path("donors.json")
    }

    fn build_command_line(&self) -> Vec<String> {
        let mut argv = vec!["lifeline".to_owned(), "nearby".to_owned()];
        if *self.include_donors.borrow() {
            argv.extend([
                format!("--{ARG_NEARBY_DONORS}"),
                self.donors_path().into_string(),
            ]);
        }
        argv.extend([
            format!("--{ARG_NEARBY_LATITUDE}"),
            "0".to_owned(),
            format!("--{ARG_NEARBY_LONGITUDE}"),
            "0".to_owned(),
        ]);
        argv.extend(self.cli_args.borrow().iter().cloned());
        argv
    }

    fn error(&self) -> std::cell::Ref<'_, CliError> {
        std::cell::Ref::map(self.result.borrow(), |result| {
            result
                .as_ref()
                .expect("result recorded")
                .as_ref()
                .expect_err("expected error")
        })
    }

    fn report(&self) -> SearchReport {
        let borrowed = self.result.borrow();
        let result = borrowed.as_ref().expect("result recorded");
        if let Err(err) = result {
            panic!("expected success, found {err:?}");
        }
        let stdout = String::from_utf8(self.stdout.borrow().clone()).expect("stdout utf-8");
        serde_json::from_str(&stdout).expect("output should be a JSON search report")
    }
}

#[fixture]
fn world() -> NearbyWorld {
    NearbyWorld::new()
}

struct StubNearbyClassifierBuilder {
    classifier: StubClassifier,
}

impl NearbyClassifierBuilder for StubNearbyClassifierBuilder {
    fn build(&self, _config: &NearbyConfig) -> Result<Box<dyn GeoClassifier>, CliError> {
        Ok(Box::new(self.classifier.clone()))
    }
}

#[given("a donor snapshot exists on disk")]
fn donor_snapshot_exists(#[from(world)] world: &NearbyWorld) {
    write_utf8(&world.donors_path(), DONOR_SNAPSHOT.as_bytes());
}

#[given("the donor snapshot contains invalid JSON")]
fn donor_snapshot_invalid(#[from(world)] world: &NearbyWorld) {
    write_utf8(&world.donors_path(), b"{ not valid json");
}

#[given("I omit the donor snapshot path")]
fn omit_donor_snapshot(#[from(world)] world: &NearbyWorld) {
    *world.include_donors.borrow_mut() = false;
}

#[given("a classifier placing everyone in one cluster")]
fn uniform_classifier(#[from(world)] world: &NearbyWorld) {
    *world.classifier.borrow_mut() = Some(StubClassifier::uniform(ClusterLabel::Assigned(1)));
}

#[given("I pass a radius of {radius} kilometres")]
fn pass_radius(#[from(world)] world: &NearbyWorld, radius: String) {
    world
        .cli_args
        .borrow_mut()
        .push(format!("--{ARG_NEARBY_RADIUS_KM}={radius}"));
}

#[when("I run the nearby command from the origin")]
fn run_nearby_command(#[from(world)] world: &NearbyWorld) {
    let invocation = world.build_command_line();
    let classifier = world
        .classifier
        .borrow()
        .clone()
        .expect("classifier must be configured");
    let parsed = Cli::try_parse_from(invocation).map_err(CliError::from);
    let outcome = parsed.and_then(|cli| match cli.command {
        Command::Nearby(args) => {
            let builder = StubNearbyClassifierBuilder { classifier };
            let mut buffer = world.stdout.borrow_mut();
            run_nearby_with(args, &builder, &mut *buffer)
        }
        other => panic!("expected nearby command, found {other:?}"),
    });

    world.result.replace(Some(outcome));
}

fn matched_ids(report: &SearchReport) -> Vec<String> {
    report
        .outcome
        .matches
        .iter()
        .map(|found| found.candidate.id.clone())
        .collect()
}

#[then("the command succeeds and prints only the nearby donor")]
fn prints_nearby_donor(#[from(world)] world: &NearbyWorld) {
    let report = world.report();
    assert_eq!(matched_ids(&report), ["near"]);
    assert_eq!(report.outcome.diagnostics.outside_radius, 1);
    assert_eq!(report.outcome.diagnostics.without_coordinate, 1);
}

#[then("the command prints both located donors in distance order")]
fn prints_both_donors(#[from(world)] world: &NearbyWorld) {
    let report = world.report();
    assert_eq!(matched_ids(&report), ["near", "far"]);
}

#[then("the command fails because the donor snapshot path is missing")]
fn fails_missing_donors(#[from(world)] world: &NearbyWorld) {
    match &*world.error() {
        CliError::MissingArgument { field, .. } => assert_eq!(*field, ARG_NEARBY_DONORS),
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[then("the command fails because the match settings are invalid")]
fn fails_invalid_settings(#[from(world)] world: &NearbyWorld) {
    match &*world.error() {
        CliError::InvalidMatchConfig(MatchConfigError::InvalidRadius { .. }) => {}
        other => panic!("expected InvalidMatchConfig, found {other:?}"),
    }
}

#[then("the command fails because the donor snapshot is malformed")]
fn fails_malformed_snapshot(#[from(world)] world: &NearbyWorld) {
    match &*world.error() {
        CliError::Search(SearchError::CandidateFetch(DonorSourceError::Malformed { .. })) => {}
        other => panic!("expected a malformed snapshot, found {other:?}"),
    }
}

macro_rules! register_nearby_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/nearby_command.feature", name = $scenario_title)]
        fn $fn_name(#[from(world)] world: NearbyWorld) {
            let _ = world;
        }
    };
}

register_nearby_scenario!(nearby_happy_path, "matching donors from a snapshot");
register_nearby_scenario!(nearby_wider_radius, "widening the radius");
register_nearby_scenario!(nearby_missing_donors, "rejecting missing donor snapshot paths");
register_nearby_scenario!(nearby_negative_radius, "rejecting a negative radius");
register_nearby_scenario!(nearby_malformed_snapshot, "reporting a malformed donor snapshot");
