//! Error types for the harness
//!
//! Only infrastructure problems are errors. A tool-under-test that exits
//! non-zero or prints the wrong thing is recorded by the assertion engine
//! instead.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Convenience Result type for harness operations
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Problems with a fixture's data or its registration in a database
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FixtureError {
    #[error("fixture name must not be empty")]
    EmptyName,

    #[error("fixture version must not be empty (package {0})")]
    EmptyVersion(String),

    /// Name and version become a directory name under `local/`
    #[error("fixture {field} {value:?} must not contain a path separator")]
    PathSeparator { field: &'static str, value: String },

    #[error("package {name} is already registered (as {name}-{version})")]
    DuplicatePackage { name: String, version: String },
}

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("invalid fixture: {0}")]
    Fixture(#[from] FixtureError),

    #[error("test environment error: {context}: {source}")]
    Environment {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to launch {}: {source}", program.display())]
    Launch {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} did not exit within {timeout:?}", program.display())]
    Timeout { program: PathBuf, timeout: Duration },

    #[error("configuration error: {0}")]
    Config(String),
}

impl HarnessError {
    /// Wrap an I/O error raised while preparing the test environment
    pub fn environment(context: impl Into<String>, source: io::Error) -> Self {
        Self::Environment {
            context: context.into(),
            source,
        }
    }

    /// Whether this error came from the filesystem rather than the tool
    #[must_use]
    pub fn is_environment(&self) -> bool {
        matches!(self, Self::Environment { .. })
    }
}

/// Attach environment context to I/O results, in the spirit of `anyhow::Context`
pub trait EnvContext<T> {
    fn env_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> EnvContext<T> for io::Result<T> {
    fn env_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|source| HarnessError::environment(f(), source))
    }
}
