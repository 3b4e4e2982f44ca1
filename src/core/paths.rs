//! Environment overrides for tool locations and harness knobs.

use std::path::PathBuf;

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Option<T> {
    std::env::var(var).ok().and_then(|v| v.trim().parse().ok())
}

/// Tool-under-test (default: `pacmanpp` on `PATH`).
#[must_use]
pub fn tool() -> PathBuf {
    env_path("PPTEST_TOOL").unwrap_or_else(|| PathBuf::from("pacmanpp"))
}

/// Reference tool for differential runs (default: `pacman` on `PATH`).
#[must_use]
pub fn reference_tool() -> PathBuf {
    env_path("PPTEST_REFERENCE_TOOL").unwrap_or_else(|| PathBuf::from("pacman"))
}

/// Child-process timeout in seconds, if one is configured.
#[must_use]
pub fn timeout_secs() -> Option<u64> {
    env_parse("PPTEST_TIMEOUT_SECS")
}

/// Local database format version override.
#[must_use]
pub fn db_version() -> Option<u32> {
    env_parse("PPTEST_DB_VERSION")
}

/// Optional settings file (default: none).
#[must_use]
pub fn config_file() -> Option<PathBuf> {
    env_path("PPTEST_CONFIG")
}
