//! Package fixtures for populating a test database

use crate::core::FixtureError;

use super::desc::StanzaWriter;
use super::version::compare_versions;

/// Description used when a fixture does not set one
pub const DEFAULT_DESCRIPTION: &str = "Test package";

/// How changelog entries are laid out in the rendered changelog
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChangelogOrder {
    /// The order `add_changelog_entry` was called in
    #[default]
    Insertion,
    /// Highest version label first, ties kept in insertion order
    NewestFirst,
}

/// Why a package is in the local database
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InstallReason {
    #[default]
    Explicit,
    Dependency,
}

/// One version's worth of changelog lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogEntry {
    pub version: String,
    pub changes: Vec<String>,
}

impl ChangelogEntry {
    pub fn new<I, S>(version: impl Into<String>, changes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            version: version.into(),
            changes: changes.into_iter().map(Into::into).collect(),
        }
    }

    /// `<version>:` followed by one change per line, no trailing newline
    pub fn render(&self) -> String {
        let mut out = format!("{}:", self.version);
        for change in &self.changes {
            out.push('\n');
            out.push_str(change);
        }
        out
    }
}

/// An installed package as it should appear in the local database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageFixture {
    name: String,
    version: String,
    description: String,
    arch: Option<String>,
    url: Option<String>,
    packager: Option<String>,
    licenses: Vec<String>,
    groups: Vec<String>,
    depends: Vec<String>,
    provides: Vec<String>,
    files: Vec<String>,
    reason: InstallReason,
    changelog: Vec<ChangelogEntry>,
    changelog_order: ChangelogOrder,
}

impl PackageFixture {
    /// Create a fixture. Name and version must be non-empty and free of `/`.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Result<Self, FixtureError> {
        let name = name.into();
        let version = version.into();
        if name.is_empty() {
            return Err(FixtureError::EmptyName);
        }
        if version.is_empty() {
            return Err(FixtureError::EmptyVersion(name));
        }
        for (field, value) in [("name", &name), ("version", &version)] {
            if value.contains('/') {
                return Err(FixtureError::PathSeparator {
                    field,
                    value: value.clone(),
                });
            }
        }

        Ok(Self {
            name,
            version,
            description: DEFAULT_DESCRIPTION.to_string(),
            arch: None,
            url: None,
            packager: None,
            licenses: Vec::new(),
            groups: Vec::new(),
            depends: Vec::new(),
            provides: Vec::new(),
            files: Vec::new(),
            reason: InstallReason::default(),
            changelog: Vec::new(),
            changelog_order: ChangelogOrder::default(),
        })
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = Some(arch.into());
        self
    }

    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    #[must_use]
    pub fn packager(mut self, packager: impl Into<String>) -> Self {
        self.packager = Some(packager.into());
        self
    }

    #[must_use]
    pub fn license(mut self, license: impl Into<String>) -> Self {
        self.licenses.push(license.into());
        self
    }

    #[must_use]
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    #[must_use]
    pub fn depends(mut self, dep: impl Into<String>) -> Self {
        self.depends.push(dep.into());
        self
    }

    #[must_use]
    pub fn provides(mut self, provision: impl Into<String>) -> Self {
        self.provides.push(provision.into());
        self
    }

    /// Add an owned file, relative to the install root (e.g. `usr/bin/foo`)
    #[must_use]
    pub fn file(mut self, path: impl Into<String>) -> Self {
        self.files.push(path.into());
        self
    }

    #[must_use]
    pub fn reason(mut self, reason: InstallReason) -> Self {
        self.reason = reason;
        self
    }

    #[must_use]
    pub fn changelog_order(mut self, order: ChangelogOrder) -> Self {
        self.changelog_order = order;
        self
    }

    /// Builder form of [`add_changelog_entry`](Self::add_changelog_entry)
    #[must_use]
    pub fn changelog<I, S>(mut self, version: impl Into<String>, changes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_changelog_entry(version, changes);
        self
    }

    /// Append a changelog entry. Entries are neither deduplicated nor sorted.
    pub fn add_changelog_entry<I, S>(&mut self, version: impl Into<String>, changes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.changelog.push(ChangelogEntry::new(version, changes));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn desc(&self) -> &str {
        &self.description
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn changelog_entries(&self) -> &[ChangelogEntry] {
        &self.changelog
    }

    pub fn has_changelog(&self) -> bool {
        !self.changelog.is_empty()
    }

    /// Directory name inside `local/`: `<name>-<version>`
    pub fn key(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }

    /// Render the `desc` file
    pub fn to_desc(&self) -> String {
        let mut w = StanzaWriter::new();
        w.field("NAME", &self.name)
            .field("VERSION", &self.version)
            .field("DESC", &self.description)
            .optional("URL", self.url.as_deref())
            .optional("ARCH", self.arch.as_deref())
            .optional("PACKAGER", self.packager.as_deref());
        if self.reason == InstallReason::Dependency {
            w.field("REASON", "1");
        }
        w.list("GROUPS", self.groups.iter().map(String::as_str))
            .list("LICENSE", self.licenses.iter().map(String::as_str))
            .list("DEPENDS", self.depends.iter().map(String::as_str))
            .list("PROVIDES", self.provides.iter().map(String::as_str));
        w.finish()
    }

    /// Render the `files` file, if the fixture owns any files
    pub fn to_files(&self) -> Option<String> {
        if self.files.is_empty() {
            return None;
        }
        let mut w = StanzaWriter::new();
        w.list("FILES", self.files.iter().map(String::as_str));
        Some(w.finish())
    }

    /// Render the changelog in the fixture's configured order
    pub fn changelog_text(&self) -> String {
        self.changelog_text_with(self.changelog_order)
    }

    /// Render the changelog; entries are separated by a blank line
    pub fn changelog_text_with(&self, order: ChangelogOrder) -> String {
        let mut entries: Vec<&ChangelogEntry> = self.changelog.iter().collect();
        if order == ChangelogOrder::NewestFirst {
            // stable sort keeps insertion order among equal versions
            entries.sort_by(|a, b| compare_versions(&b.version, &a.version));
        }
        entries
            .iter()
            .map(|e| e.render())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
