//! Harness settings and tool profile

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::{EnvContext, HarnessError, Result, paths};

/// Default value written to `local/ALPM_DB_VERSION`
pub const DEFAULT_DB_VERSION: u32 = 9;

/// Harness configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessSettings {
    /// Tool-under-test
    pub tool: PathBuf,

    /// Reference tool for differential runs
    pub reference_tool: PathBuf,

    /// Child-process timeout; `None` waits forever
    pub timeout_secs: Option<u64>,

    /// Local database format version
    pub db_version: u32,

    /// Name prefix for temporary database roots
    pub temp_prefix: String,

    /// What the tool-under-test's help and verbose output look like
    pub profile: ToolProfile,
}

/// Expected shape of the tool-under-test's informational output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolProfile {
    /// Program name used in the usage banner; defaults to the tool's file name
    pub name: Option<String>,
    pub help_flag: String,
    pub verbose_flag: String,
    /// Operation markers that must appear in help output
    pub operations: Vec<String>,
    /// Configuration-dump labels that must appear in verbose output
    pub verbose_labels: Vec<String>,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            tool: PathBuf::from("pacmanpp"),
            reference_tool: PathBuf::from("pacman"),
            timeout_secs: None,
            db_version: DEFAULT_DB_VERSION,
            temp_prefix: "pptest_".to_string(),
            profile: ToolProfile::default(),
        }
    }
}

impl Default for ToolProfile {
    fn default() -> Self {
        Self {
            name: None,
            help_flag: "-h".to_string(),
            verbose_flag: "-v".to_string(),
            operations: vec!["{-h, --help}".to_string(), "{-Q, --query}".to_string()],
            verbose_labels: vec![
                "Root      : /".to_string(),
                "DB Path   : /var/lib/pacman".to_string(),
            ],
        }
    }
}

impl ToolProfile {
    /// The usage banner the help output must contain
    pub fn usage_banner(&self, tool: &Path) -> String {
        let name = self.name.clone().unwrap_or_else(|| {
            tool.file_name()
                .map_or_else(|| tool.display().to_string(), |n| n.to_string_lossy().into_owned())
        });
        format!("Usage: {name} <operation>")
    }
}

impl HarnessSettings {
    /// Settings for a specific tool-under-test, everything else default
    pub fn for_tool(tool: impl Into<PathBuf>) -> Self {
        Self {
            tool: tool.into(),
            ..Self::default()
        }
    }

    /// Parse settings from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| HarnessError::Config(e.to_string()))
    }

    /// Load settings from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .env_context(|| format!("reading {}", path.display()))?;
        Self::from_toml(&content)
    }

    /// Defaults, then the `PPTEST_CONFIG` file if set, then `PPTEST_*` overrides
    pub fn from_env() -> Result<Self> {
        let base = match paths::config_file() {
            Some(path) => Self::load(&path)?,
            None => Self::default(),
        };
        Ok(base.with_env_overrides())
    }

    /// Apply `PPTEST_*` environment overrides on top of these settings
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if std::env::var_os("PPTEST_TOOL").is_some() {
            self.tool = paths::tool();
        }
        if std::env::var_os("PPTEST_REFERENCE_TOOL").is_some() {
            self.reference_tool = paths::reference_tool();
        }
        if let Some(secs) = paths::timeout_secs() {
            self.timeout_secs = Some(secs);
        }
        if let Some(version) = paths::db_version() {
            self.db_version = version;
        }
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| HarnessError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_defaults() {
        let s = HarnessSettings::default();
        assert_eq!(s.db_version, 9);
        assert_eq!(s.timeout(), None);
        assert_eq!(s.profile.help_flag, "-h");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let s = HarnessSettings::from_toml(
            r#"
tool = "/usr/local/bin/pacmanpp"
timeout_secs = 30

[profile]
operations = ["{-h, --help}"]
"#,
        )
        .unwrap();
        assert_eq!(s.tool, PathBuf::from("/usr/local/bin/pacmanpp"));
        assert_eq!(s.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(s.profile.operations, vec!["{-h, --help}"]);
        assert_eq!(s.profile.verbose_flag, "-v");
        assert_eq!(s.reference_tool, PathBuf::from("pacman"));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = HarnessSettings::from_toml("tool = [").unwrap_err();
        assert!(matches!(err, HarnessError::Config(_)));
    }

    #[test]
    fn test_toml_roundtrip() {
        let s = HarnessSettings::for_tool("/bin/true");
        let back = HarnessSettings::from_toml(&s.to_toml().unwrap()).unwrap();
        assert_eq!(s, back);
    }

    #[test]
    fn test_usage_banner() {
        let profile = ToolProfile::default();
        assert_eq!(
            profile.usage_banner(Path::new("/build/src/pacmanpp")),
            "Usage: pacmanpp <operation>"
        );
        let named = ToolProfile {
            name: Some("yarp".into()),
            ..ToolProfile::default()
        };
        assert_eq!(named.usage_banner(Path::new("x")), "Usage: yarp <operation>");
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        temp_env::with_vars(
            [
                ("PPTEST_CONFIG", None),
                ("PPTEST_TOOL", Some("/tmp/tool")),
                ("PPTEST_REFERENCE_TOOL", None),
                ("PPTEST_TIMEOUT_SECS", Some("5")),
                ("PPTEST_DB_VERSION", Some("10")),
            ],
            || {
                let s = HarnessSettings::from_env().unwrap();
                assert_eq!(s.tool, PathBuf::from("/tmp/tool"));
                assert_eq!(s.reference_tool, PathBuf::from("pacman"));
                assert_eq!(s.timeout_secs, Some(5));
                assert_eq!(s.db_version, 10);
            },
        );
    }

    #[test]
    #[serial]
    fn test_config_file_from_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pptest.toml");
        std::fs::write(&path, "db_version = 8\n").unwrap();
        temp_env::with_vars(
            [
                ("PPTEST_CONFIG", Some(path.as_os_str())),
                ("PPTEST_DB_VERSION", None),
                ("PPTEST_TOOL", None),
                ("PPTEST_TIMEOUT_SECS", None),
            ],
            || {
                let s = HarnessSettings::from_env().unwrap();
                assert_eq!(s.db_version, 8);
                assert_eq!(s.tool, PathBuf::from("pacmanpp"));
            },
        );
    }
}
