//! Non-fail-fast assertions over captured runs
//!
//! A [`Harness`] records every mismatch instead of stopping at the first one,
//! so a scenario can check many properties of one run and see them all.
//! The session starts clean and, once something fails, stays failed.
//! [`Harness::report`] turns the collected state into the process exit code.

use std::ffi::OsStr;
use std::fmt::Debug;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::HarnessSettings;
use crate::core::Result;
use crate::database::{TestDatabase, close_open_databases};
use crate::runner::{self, CapturedResult, ProcessRunner, RunOptions};

/// Which program a run should exec
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The configured tool-under-test
    ToolUnderTest,
    /// The configured reference tool, for differential checks
    Reference,
    /// Any other program
    Program(PathBuf),
}

/// Outcome of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub failures: Vec<String>,
}

impl Verdict {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn exit_code(&self) -> i32 {
        i32::from(!self.passed())
    }

    /// Write each diagnostic on its own line(s)
    pub fn write_to<W: Write>(&self, mut out: W) -> io::Result<()> {
        for msg in &self.failures {
            writeln!(out, "{msg}")?;
        }
        out.flush()
    }
}

/// One scenario's assertion session, bound to a tool-under-test
#[derive(Debug)]
pub struct Harness {
    settings: HarnessSettings,
    runner: ProcessRunner,
    failed: bool,
    failures: Vec<String>,
}

impl Harness {
    /// Harness for `tool` with default settings
    pub fn new(tool: impl Into<PathBuf>) -> Self {
        Self::with_settings(HarnessSettings::for_tool(tool))
    }

    pub fn with_settings(settings: HarnessSettings) -> Self {
        let options = RunOptions::default().timeout(settings.timeout());
        Self::with_options(settings, options)
    }

    /// Use explicit run options (environment, timeout, working directory)
    pub fn with_options(settings: HarnessSettings, options: RunOptions) -> Self {
        Self {
            settings,
            runner: ProcessRunner::new(options),
            failed: false,
            failures: Vec::new(),
        }
    }

    pub fn settings(&self) -> &HarnessSettings {
        &self.settings
    }

    pub fn tool(&self) -> &Path {
        &self.settings.tool
    }

    fn program(&self, target: &Target) -> PathBuf {
        match target {
            Target::ToolUnderTest => self.settings.tool.clone(),
            Target::Reference => self.settings.reference_tool.clone(),
            Target::Program(path) => path.clone(),
        }
    }

    /// Run the tool-under-test
    pub fn run<S: AsRef<OsStr>>(&self, args: &[S]) -> Result<CapturedResult> {
        self.run_target(&Target::ToolUnderTest, args)
    }

    /// Run the reference tool
    pub fn run_reference<S: AsRef<OsStr>>(&self, args: &[S]) -> Result<CapturedResult> {
        self.run_target(&Target::Reference, args)
    }

    /// Run an arbitrary program with this harness's options
    pub fn run_raw<S: AsRef<OsStr>>(&self, program: &Path, args: &[S]) -> Result<CapturedResult> {
        self.runner.run(program, args)
    }

    pub fn run_target<S: AsRef<OsStr>>(
        &self,
        target: &Target,
        args: &[S],
    ) -> Result<CapturedResult> {
        self.runner.run(&self.program(target), args)
    }

    /// Run the tool-under-test against a materialized database
    pub fn run_in<S: AsRef<OsStr>>(&self, db: &TestDatabase, args: &[S]) -> Result<CapturedResult> {
        self.runner.run_in(db, &self.settings.tool, args)
    }

    /// Run with explicit options, for one-off environment or timeout changes
    pub fn run_with<S: AsRef<OsStr>>(
        &self,
        target: &Target,
        args: &[S],
        options: &RunOptions,
    ) -> Result<CapturedResult> {
        runner::run(&self.program(target), args, options)
    }

    fn record(&mut self, message: &str, msg: String) {
        let msg = if message.is_empty() {
            msg
        } else {
            format!("{message}\n{msg}")
        };
        debug!(failure = %msg, "assertion failed");
        self.failed = true;
        self.failures.push(msg);
    }

    pub fn assert_equals<T>(&mut self, actual: &T, expected: &T, message: &str) -> bool
    where
        T: PartialEq + Debug + ?Sized,
    {
        if actual == expected {
            return true;
        }
        self.record(message, format!("Expected: {expected:?}\nActual: {actual:?}"));
        false
    }

    pub fn assert_contains(&mut self, haystack: &str, needle: &str, message: &str) -> bool {
        if haystack.contains(needle) {
            return true;
        }
        self.record(message, format!("Expected to find: {needle:?}\nIn: {haystack:?}"));
        false
    }

    pub fn assert_not_contains(&mut self, haystack: &str, needle: &str, message: &str) -> bool {
        if !haystack.contains(needle) {
            return true;
        }
        self.record(
            message,
            format!("Expected NOT to find: {needle:?}\nIn: {haystack:?}"),
        );
        false
    }

    pub fn assert_returncode(&mut self, result: &CapturedResult, expected: i32) -> bool {
        self.assert_equals(&result.returncode(), &expected, "Return code mismatch")
    }

    /// Record a failure unconditionally
    pub fn fail(&mut self, message: impl Into<String>) {
        let msg = message.into();
        debug!(failure = %msg, "explicit failure");
        self.failed = true;
        self.failures.push(msg);
    }

    /// Exit code and exact stdout
    pub fn test_exact_output<S: AsRef<OsStr>>(
        &mut self,
        args: &[S],
        expected_stdout: &str,
        expected_returncode: i32,
    ) -> Result<CapturedResult> {
        let result = self.run(args)?;
        self.assert_returncode(&result, expected_returncode);
        self.assert_equals(result.stdout(), expected_stdout, "Output mismatch");
        Ok(result)
    }

    /// Exit code and a stderr substring
    pub fn test_error_contains<S: AsRef<OsStr>>(
        &mut self,
        args: &[S],
        expected_error: &str,
        expected_returncode: i32,
    ) -> Result<CapturedResult> {
        let result = self.run(args)?;
        self.assert_returncode(&result, expected_returncode);
        self.assert_contains(result.stderr(), expected_error, "Error message mismatch");
        Ok(result)
    }

    /// Help flag succeeds and lists the usage banner and every operation
    pub fn test_help_output(&mut self, help_flag: &str) -> Result<CapturedResult> {
        let result = self.run(&[help_flag])?;
        self.assert_returncode(&result, 0);

        let banner = self.settings.profile.usage_banner(&self.settings.tool);
        self.assert_contains(result.stdout(), &banner, "Usage banner missing");
        self.assert_contains(result.stdout(), "operations:", "Operation list missing");
        let operations = self.settings.profile.operations.clone();
        for op in &operations {
            self.assert_contains(result.stdout(), op, "Operation marker missing");
        }
        Ok(result)
    }

    /// Verbose flag with no operation fails but dumps the configuration
    pub fn test_verbose_output(&mut self, verbose_flag: &str) -> Result<CapturedResult> {
        let result = self.run(&[verbose_flag])?;
        self.assert_returncode(&result, 1);

        let labels = self.settings.profile.verbose_labels.clone();
        for label in &labels {
            self.assert_contains(result.stdout(), label, "Configuration field missing");
        }
        Ok(result)
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    pub fn verdict(&self) -> Verdict {
        Verdict {
            failures: self.failures.clone(),
        }
    }

    /// Write diagnostics to `out` and return the exit code
    pub fn report_to<W: Write>(&self, out: W) -> io::Result<i32> {
        let verdict = self.verdict();
        verdict.write_to(out)?;
        Ok(verdict.exit_code())
    }

    /// Print diagnostics to stderr and exit: `0` if clean, `1` otherwise.
    ///
    /// Databases still open are removed first, since `exit` skips destructors.
    pub fn report(&self) -> ! {
        let code = self.report_to(io::stderr().lock()).unwrap_or(1);
        close_open_databases();
        std::process::exit(code)
    }
}
