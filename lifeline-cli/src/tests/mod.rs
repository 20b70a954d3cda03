//! Shared test harness modules for the Lifeline CLI.
#![expect(
    clippy::panic,
    reason = "Tests assert panic branches to surface unexpected CLI outcomes"
)]

use super::*;

mod helpers;
mod nearby_steps;
mod sentiment_unit;
