//! Result line styling
//!
//! Respects the [NO_COLOR standard](https://no-color.org/) and `PPTEST_COLORS`.

use std::env;

use owo_colors::OwoColorize;
use supports_color::Stream;

/// Detect if colors should be enabled
#[must_use]
pub fn colors_enabled() -> bool {
    if env::var_os("NO_COLOR").is_some() {
        return false;
    }

    if let Ok(val) = env::var("PPTEST_COLORS") {
        match val.as_str() {
            "never" | "0" | "false" => return false,
            "always" | "1" | "true" => return true,
            _ => {}
        }
    }

    supports_color::on(Stream::Stdout).is_some_and(|level| level.has_basic)
}

fn maybe_color(text: &str, f: impl Fn(&str) -> String) -> String {
    if colors_enabled() {
        f(text)
    } else {
        text.to_string()
    }
}

/// `PASS <name>`
#[must_use]
pub fn pass(name: &str) -> String {
    format!("{} {name}", maybe_color("PASS", |s| s.green().bold().to_string()))
}

/// `FAIL <name>`
#[must_use]
pub fn fail(name: &str) -> String {
    format!("{} {name}", maybe_color("FAIL", |s| s.red().bold().to_string()))
}

/// `ERROR <name>: <reason>` for infrastructure failures
#[must_use]
pub fn error(name: &str, reason: &str) -> String {
    format!(
        "{} {name}: {reason}",
        maybe_color("ERROR", |s| s.red().bold().to_string())
    )
}

/// One-line run summary
#[must_use]
pub fn summary(passed: usize, failed: usize) -> String {
    let line = format!("{passed} passed, {failed} failed");
    if failed == 0 {
        maybe_color(&line, |s| s.green().to_string())
    } else {
        maybe_color(&line, |s| s.red().to_string())
    }
}
