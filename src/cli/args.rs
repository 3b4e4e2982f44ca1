//! Command-line argument definitions using clap derive macros.

use clap::Parser;
use std::path::PathBuf;

/// pptest - black-box scenarios for a local package-query tool
///
/// Builds throwaway package databases, runs the tool against them and
/// exits non-zero if any scenario recorded a mismatch.
#[derive(Parser, Debug)]
#[command(name = "pptest")]
#[command(version)]
#[command(about = "Black-box scenarios for a local package-query tool", long_about = None)]
pub struct Cli {
    /// Tool-under-test (path or name on PATH); overrides PPTEST_TOOL
    pub tool: Option<PathBuf>,

    /// Run only these scenarios (repeatable)
    #[arg(short, long = "scenario", value_name = "NAME")]
    pub scenarios: Vec<String>,

    /// List built-in scenarios and exit
    #[arg(short, long)]
    pub list: bool,

    /// Settings file (TOML); overrides PPTEST_CONFIG
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Kill the tool if a single run takes longer than this
    #[arg(short, long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Suppress per-scenario PASS lines
    #[arg(short, long)]
    pub quiet: bool,
}
