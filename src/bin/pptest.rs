//! pptest CLI Binary
//!
//! Runs the built-in scenarios against a package-query tool.

use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::Parser;

use pptest_lib::assertions::Harness;
use pptest_lib::cli::{Cli, style};
use pptest_lib::config::HarnessSettings;
use pptest_lib::scenarios::{self, ScenarioFn};

fn main() -> Result<ExitCode> {
    // Logs go to stderr so scenario output on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.list {
        for (name, _) in scenarios::ALL {
            println!("{name}");
        }
        return Ok(ExitCode::SUCCESS);
    }

    let mut settings = match &cli.config {
        Some(path) => HarnessSettings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?
            .with_env_overrides(),
        None => HarnessSettings::from_env().context("loading settings")?,
    };
    if let Some(tool) = cli.tool {
        settings.tool = tool;
    }
    if let Some(secs) = cli.timeout {
        settings.timeout_secs = Some(secs);
    }

    let selected: Vec<(&str, ScenarioFn)> = if cli.scenarios.is_empty() {
        scenarios::ALL.to_vec()
    } else {
        let mut picked = Vec::with_capacity(cli.scenarios.len());
        for name in &cli.scenarios {
            let Some(f) = scenarios::find(name) else {
                bail!("unknown scenario '{name}' (use --list to see them)");
            };
            picked.push((name.as_str(), f));
        }
        picked
    };

    let mut passed = 0usize;
    let mut failed = 0usize;

    for (name, scenario) in selected {
        let mut harness = Harness::with_settings(settings.clone());
        match scenario(&mut harness) {
            Ok(()) if !harness.failed() => {
                passed += 1;
                if !cli.quiet {
                    println!("{}", style::pass(name));
                }
            }
            Ok(()) => {
                failed += 1;
                println!("{}", style::fail(name));
                harness
                    .report_to(std::io::stderr().lock())
                    .context("writing diagnostics")?;
            }
            Err(e) => {
                failed += 1;
                println!("{}", style::error(name, &e.to_string()));
            }
        }
    }

    println!("{}", style::summary(passed, failed));

    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
