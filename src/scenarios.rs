//! Built-in scenarios for the package-query tool
//!
//! Each scenario builds whatever fixtures it needs, drives the tool through
//! a [`Harness`] and leaves its mismatches in the harness. Databases are
//! dropped before the scenario returns.

use crate::assertions::Harness;
use crate::core::Result;
use crate::database::TestDatabase;
use crate::fixture::PackageFixture;

pub type ScenarioFn = fn(&mut Harness) -> Result<()>;

/// Every built-in scenario, in run order
pub const ALL: &[(&str, ScenarioFn)] = &[
    ("no_operation", no_operation),
    ("query_installed", query_installed),
    ("query_missing", query_missing),
    ("query_changelog", query_changelog),
    ("help_output", help_output),
];

pub fn find(name: &str) -> Option<ScenarioFn> {
    ALL.iter().find(|(n, _)| *n == name).map(|(_, f)| *f)
}

fn open(t: &Harness) -> Result<TestDatabase> {
    TestDatabase::open_with(t.settings())
}

/// No arguments at all is an error
pub fn no_operation(t: &mut Harness) -> Result<()> {
    let result = t.run::<&str>(&[])?;
    t.assert_returncode(&result, 1);
    t.assert_equals(
        result.stderr(),
        "Error: no operation specified (use -h for help)\n",
        "stderr mismatch",
    );
    Ok(())
}

/// An installed package is printed as `<name> <version>`
pub fn query_installed(t: &mut Harness) -> Result<()> {
    let mut db = open(t)?;
    db.create_package("foo", "1.0.0", "foo")?;

    let result = t.run_in(&db, &["-Q", "foo"])?;
    t.assert_returncode(&result, 0);
    t.assert_equals(result.stdout(), "foo 1.0.0\n", "Output mismatch");
    Ok(())
}

/// Querying a name with no fixture fails
pub fn query_missing(t: &mut Harness) -> Result<()> {
    let mut db = open(t)?;
    db.create_package("foo", "1.0.0", "foo")?;

    let result = t.run_in(&db, &["-Q", "bar"])?;
    t.assert_returncode(&result, 1);
    t.assert_equals(
        result.stderr(),
        "Error: package bar not found\n",
        "stderr mismatch",
    );
    Ok(())
}

/// Changelog entries come back under a per-package header
pub fn query_changelog(t: &mut Harness) -> Result<()> {
    let mut db = open(t)?;
    let pkg = PackageFixture::new("foo", "1.0.0")?
        .changelog("1.0.0", ["stable release"])
        .changelog("0.9.0", ["remove foo"]);
    db.add_package(pkg)?;

    let result = t.run_in(&db, &["-Q", "--changelog", "foo"])?;
    t.assert_returncode(&result, 0);
    t.assert_contains(result.stdout(), "Changelog for foo:", "");
    t.assert_contains(result.stdout(), "1.0.0:\nstable release", "");
    t.assert_contains(result.stdout(), "0.9.0:\nremove foo", "");
    Ok(())
}

/// Both help spellings print the usage banner and operation list
pub fn help_output(t: &mut Harness) -> Result<()> {
    let short = t.settings().profile.help_flag.clone();
    t.test_help_output(&short)?;
    t.test_help_output("--help")?;
    Ok(())
}
