//! Command-line front end for running built-in scenarios

mod args;
pub mod style;

pub use args::Cli;
