//! Core module - error taxonomy and environment overrides

mod error;
pub mod paths;

pub use error::{EnvContext, FixtureError, HarnessError, Result};
