//! Temporary local package database
//!
//! A [`TestDatabase`] owns a fresh temporary directory laid out the way the
//! tool-under-test expects to find an installed-package database:
//!
//! ```text
//! <tmp>/root/                  --root
//! <tmp>/root/db/               --dbpath
//! <tmp>/root/db/local/ALPM_DB_VERSION
//! <tmp>/root/db/local/<name>-<version>/desc
//! <tmp>/root/db/local/<name>-<version>/files       (if the fixture owns files)
//! <tmp>/root/db/local/<name>-<version>/changelog   (if the fixture has entries)
//! ```
//!
//! Fixtures are written as soon as they are added. The whole tree is removed
//! by [`TestDatabase::close`], which also runs on drop, so teardown happens on
//! every exit path including panics. Exits that skip destructors go through
//! [`close_open_databases`] instead.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tempfile::TempDir;
use tracing::{debug, instrument, warn};

use crate::config::HarnessSettings;
use crate::core::{EnvContext, FixtureError, HarnessError, Result};
use crate::fixture::PackageFixture;

pub const DB_VERSION_FILE: &str = "ALPM_DB_VERSION";

/// Temporary trees of every database still open in this process
static OPEN_ROOTS: Mutex<BTreeSet<PathBuf>> = Mutex::new(BTreeSet::new());

/// Remove every database this process still has open.
///
/// For exits that skip `Drop`, like [`Harness::report`](crate::assertions::Harness::report).
/// Handles still alive afterwards close without complaint.
pub fn close_open_databases() {
    let roots = std::mem::take(&mut *OPEN_ROOTS.lock());
    for path in roots {
        match fs::remove_dir_all(&path) {
            Ok(()) => debug!(path = %path.display(), "closed test database at exit"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "failed to remove test database"),
        }
    }
}

/// A package directory that is removed again unless the write completes
struct PendingDir<'a> {
    path: &'a Path,
    committed: bool,
}

impl<'a> PendingDir<'a> {
    fn new(path: &'a Path) -> Self {
        Self {
            path,
            committed: false,
        }
    }

    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for PendingDir<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Err(e) = fs::remove_dir_all(self.path) {
            warn!(dir = %self.path.display(), error = %e, "failed to remove partial package");
        }
    }
}

pub struct TestDatabase {
    temp: Option<TempDir>,
    root: PathBuf,
    db_path: PathBuf,
    packages: BTreeMap<String, PackageFixture>,
}

impl TestDatabase {
    /// Open a database with default settings
    pub fn open() -> Result<Self> {
        Self::open_with(&HarnessSettings::default())
    }

    /// Allocate a unique temporary root and build the `db/local` skeleton
    #[instrument(skip(settings), fields(prefix = %settings.temp_prefix))]
    pub fn open_with(settings: &HarnessSettings) -> Result<Self> {
        let temp = tempfile::Builder::new()
            .prefix(&settings.temp_prefix)
            .tempdir()
            .env_context(|| "allocating temporary directory")?;

        let root = temp.path().join("root");
        let db_path = root.join("db");
        let local = db_path.join("local");

        fs::create_dir_all(&local).env_context(|| format!("creating {}", local.display()))?;

        let marker = local.join(DB_VERSION_FILE);
        fs::write(&marker, format!("{}\n", settings.db_version))
            .env_context(|| format!("writing {}", marker.display()))?;

        OPEN_ROOTS.lock().insert(temp.path().to_path_buf());
        debug!(root = %root.display(), "opened test database");

        Ok(Self {
            temp: Some(temp),
            root,
            db_path,
            packages: BTreeMap::new(),
        })
    }

    /// Value for the tool's `--root`
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Value for the tool's `--dbpath`
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn local_dir(&self) -> PathBuf {
        self.db_path.join("local")
    }

    pub fn package_dir(&self, pkg: &PackageFixture) -> PathBuf {
        self.local_dir().join(pkg.key())
    }

    pub fn is_open(&self) -> bool {
        self.temp.is_some()
    }

    /// Register a fixture and write it to disk.
    ///
    /// A package name may only be registered once; use
    /// [`replace_package`](Self::replace_package) to overwrite on purpose.
    #[instrument(skip(self, pkg), fields(pkg = %pkg.key()))]
    pub fn add_package(&mut self, pkg: PackageFixture) -> Result<&PackageFixture> {
        if let Some(existing) = self.packages.get(pkg.name()) {
            return Err(FixtureError::DuplicatePackage {
                name: existing.name().to_string(),
                version: existing.version().to_string(),
            }
            .into());
        }

        self.write_package(&pkg)?;
        debug!("materialized package");
        Ok(self.packages.entry(pkg.name().to_string()).or_insert(pkg))
    }

    /// Build a fixture with a description and add it
    pub fn create_package(
        &mut self,
        name: &str,
        version: &str,
        description: &str,
    ) -> Result<&PackageFixture> {
        let pkg = PackageFixture::new(name, version)?.description(description);
        self.add_package(pkg)
    }

    /// Remove any package with the same name, then add this one.
    /// Returns the fixture that was replaced.
    pub fn replace_package(&mut self, pkg: PackageFixture) -> Result<Option<PackageFixture>> {
        let old = self.take_package(pkg.name())?;
        self.add_package(pkg)?;
        Ok(old)
    }

    pub fn get_package(&self, name: &str) -> Option<&PackageFixture> {
        self.packages.get(name)
    }

    pub fn packages(&self) -> impl Iterator<Item = &PackageFixture> {
        self.packages.values()
    }

    /// Remove a package's directory and registration.
    /// Returns `false` if no package of that name was registered.
    pub fn remove_package(&mut self, name: &str) -> Result<bool> {
        Ok(self.take_package(name)?.is_some())
    }

    #[instrument(skip(self))]
    fn take_package(&mut self, name: &str) -> Result<Option<PackageFixture>> {
        let Some(pkg) = self.packages.remove(name) else {
            return Ok(None);
        };

        let dir = self.package_dir(&pkg);
        match fs::remove_dir_all(&dir) {
            Ok(()) => debug!(dir = %dir.display(), "removed package"),
            // The tool-under-test may already have removed it
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(HarnessError::environment(
                    format!("removing {}", dir.display()),
                    e,
                ));
            }
        }
        Ok(Some(pkg))
    }

    fn write_package(&self, pkg: &PackageFixture) -> Result<()> {
        let dir = self.package_dir(pkg);
        fs::create_dir(&dir).env_context(|| format!("creating {}", dir.display()))?;
        let pending = PendingDir::new(&dir);

        let desc = dir.join("desc");
        fs::write(&desc, pkg.to_desc()).env_context(|| format!("writing {}", desc.display()))?;

        if let Some(files) = pkg.to_files() {
            let path = dir.join("files");
            fs::write(&path, files).env_context(|| format!("writing {}", path.display()))?;
        }

        if pkg.has_changelog() {
            let path = dir.join("changelog");
            fs::write(&path, pkg.changelog_text())
                .env_context(|| format!("writing {}", path.display()))?;
        }

        pending.commit();
        Ok(())
    }

    /// Delete the whole temporary tree. Safe to call more than once and
    /// tolerant of parts of the tree already being gone.
    pub fn close(&mut self) {
        let Some(temp) = self.temp.take() else {
            return;
        };
        let path = temp.path().to_path_buf();
        OPEN_ROOTS.lock().remove(&path);
        match temp.close() {
            Ok(()) => debug!(path = %path.display(), "closed test database"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "failed to remove test database"),
        }
        self.packages.clear();
    }
}

impl Drop for TestDatabase {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for TestDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestDatabase")
            .field("root", &self.root)
            .field("open", &self.is_open())
            .field("packages", &self.packages.keys().collect::<Vec<_>>())
            .finish()
    }
}
