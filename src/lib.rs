//! pptest Library - black-box harness for a local package-query tool
//!
//! Materializes throwaway package databases in the on-disk local-database
//! format, runs the tool-under-test against them and collects every
//! mismatch before reporting a single verdict.

// Production-ready clippy configuration
#![warn(clippy::pedantic)]
#![warn(clippy::perf)]
#![warn(clippy::suspicious)]
// Allow documentation lints - internal code, not public API
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

pub mod assertions;
pub mod cli;
pub mod config;
pub mod core;
pub mod database;
pub mod fixture;
pub mod runner;
pub mod scenarios;

pub use assertions::{Harness, Target, Verdict};
pub use database::TestDatabase;
pub use fixture::{ChangelogOrder, InstallReason, PackageFixture};
pub use runner::{CapturedResult, EnvPolicy, ProcessRunner, RunOptions};
