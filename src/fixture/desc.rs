//! Stanza encoding used by the local package database
//!
//! A stanza file is a series of blocks:
//!
//! ```text
//! %NAME%
//! foo
//!
//! %VERSION%
//! 1.0.0
//! ```
//!
//! Each block is `%KEY%\n` followed by one value per line. Blocks are
//! separated by a single blank line and the last block carries no trailing
//! blank line.

use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Ordered writer for `%KEY%` blocks
#[derive(Debug, Default)]
pub struct StanzaWriter {
    out: String,
}

impl StanzaWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single-valued block
    pub fn field(&mut self, key: &str, value: &str) -> &mut Self {
        self.list(key, std::iter::once(value))
    }

    /// Append a block if the value is present
    pub fn optional(&mut self, key: &str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value {
            self.field(key, value);
        }
        self
    }

    /// Append a multi-valued block, one value per line. Empty lists are skipped.
    pub fn list<'a, I>(&mut self, key: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut values = values.into_iter().peekable();
        if values.peek().is_none() {
            return self;
        }
        if !self.out.is_empty() {
            self.out.push('\n');
        }
        let _ = writeln!(self.out, "%{key}%");
        for value in values {
            self.out.push_str(value);
            self.out.push('\n');
        }
        self
    }

    pub fn finish(self) -> String {
        self.out
    }
}

/// Parse stanza text into key → values, in the way libalpm reads `desc` files.
///
/// Values are collected until the next blank line. Unknown keys are kept.
pub fn parse_stanza(content: &str) -> BTreeMap<String, Vec<String>> {
    let mut fields: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut current: Option<String> = None;

    for line in content.lines() {
        if line.is_empty() {
            current = None;
            continue;
        }

        if current.is_none()
            && let Some(key) = line.strip_prefix('%').and_then(|l| l.strip_suffix('%'))
            && !key.is_empty()
        {
            fields.entry(key.to_string()).or_default();
            current = Some(key.to_string());
            continue;
        }

        if let Some(key) = &current {
            fields.entry(key.clone()).or_default().push(line.to_string());
        }
    }

    fields
}

/// The subset of a `desc` file the harness cares to read back
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescRecord {
    pub name: String,
    pub version: String,
    pub desc: String,
    pub arch: Option<String>,
    pub url: Option<String>,
    pub packager: Option<String>,
    pub licenses: Vec<String>,
    pub groups: Vec<String>,
    pub depends: Vec<String>,
    pub provides: Vec<String>,
    pub explicit: bool,
}

/// Parse a local `desc` file
pub fn parse_desc(content: &str) -> DescRecord {
    let mut fields = parse_stanza(content);
    let first = |key: &str| fields.get(key).and_then(|v| v.first()).cloned();

    let name = first("NAME").unwrap_or_default();
    let version = first("VERSION").unwrap_or_default();
    let desc = first("DESC").unwrap_or_default();
    let arch = first("ARCH");
    let url = first("URL");
    let packager = first("PACKAGER");
    // REASON is absent for explicitly installed packages
    let explicit = first("REASON").is_none_or(|r| r == "0");

    let mut take = |key: &str| fields.remove(key).unwrap_or_default();
    DescRecord {
        name,
        version,
        desc,
        arch,
        url,
        packager,
        licenses: take("LICENSE"),
        groups: take("GROUPS"),
        depends: take("DEPENDS"),
        provides: take("PROVIDES"),
        explicit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_separates_blocks_with_blank_line() {
        let mut w = StanzaWriter::new();
        w.field("NAME", "foo").field("VERSION", "1.0.0");
        assert_eq!(w.finish(), "%NAME%\nfoo\n\n%VERSION%\n1.0.0\n");
    }

    #[test]
    fn test_writer_skips_absent_values() {
        let mut w = StanzaWriter::new();
        w.field("NAME", "foo")
            .optional("URL", None)
            .list("GROUPS", Vec::<&str>::new());
        assert_eq!(w.finish(), "%NAME%\nfoo\n");
    }

    #[test]
    fn test_writer_multi_value() {
        let mut w = StanzaWriter::new();
        w.list("GROUPS", ["base", "base-devel"]);
        assert_eq!(w.finish(), "%GROUPS%\nbase\nbase-devel\n");
    }

    #[test]
    fn test_parse_real_desc() {
        let content = "%NAME%\npacman\n\n%VERSION%\n5.2.2-3\n\n%DESC%\nA library-based package manager with dependency support\n\n%ARCH%\nx86_64\n\n%REASON%\n1\n\n%GROUPS%\nbase-devel\n\n%LICENSE%\nGPL\n\n";
        let rec = parse_desc(content);
        assert_eq!(rec.name, "pacman");
        assert_eq!(rec.version, "5.2.2-3");
        assert_eq!(rec.arch.as_deref(), Some("x86_64"));
        assert_eq!(rec.groups, vec!["base-devel"]);
        assert_eq!(rec.licenses, vec!["GPL"]);
        assert!(!rec.explicit);
    }

    #[test]
    fn test_parse_without_trailing_newline() {
        let rec = parse_desc("%NAME%\nfoo\n\n%VERSION%\n1.0.0\n\n%DESC%\nfoo");
        assert_eq!(rec.desc, "foo");
        assert!(rec.explicit);
    }

    #[test]
    fn test_parse_keeps_unknown_keys() {
        let fields = parse_stanza("%XDATA%\npkgtype=pkg\n");
        assert_eq!(fields["XDATA"], vec!["pkgtype=pkg"]);
    }
}
