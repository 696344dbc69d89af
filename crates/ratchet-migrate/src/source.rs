//! Migration source: enumerates `<version>.up.sql` units.
//!
//! Discovery is non-recursive and read-only. It never opens a unit's file;
//! content is loaded later through [`MigrationSource::read`] when the unit is
//! applied.

use crate::error::{MigrateError, MigrateResult};
use ratchet_core::Version;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};

/// File name suffix marking a forward SQL migration.
pub const UP_SUFFIX: &str = ".up.sql";

/// A discovered migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationUnit {
    /// File name minus [`UP_SUFFIX`]; the unique id and sort key
    pub version: Version,
    /// Where the SQL batch lives, resolved through the owning source
    pub location: PathBuf,
}

/// One entry directly under a source root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Anything addressable by path that can list and read migration files.
pub trait MigrationSource: Send + Sync {
    /// Root the unit locations are joined onto
    fn root(&self) -> &Path;

    /// Entries directly under the root, in any order
    fn entries(&self) -> io::Result<Vec<SourceEntry>>;

    /// Load the SQL batch at `location`
    fn read(&self, location: &Path) -> io::Result<String>;
}

/// Derive a version from a file name, or `None` if the name is not a
/// forward migration.
pub fn version_from_name(name: &str) -> Option<Version> {
    name.strip_suffix(UP_SUFFIX).and_then(Version::try_new)
}

/// List the migration units of `source`, sorted ascending by version.
///
/// Directories, files without the `.up.sql` suffix, and a file named exactly
/// `.up.sql` are skipped silently.
pub fn discover(source: &dyn MigrationSource) -> MigrateResult<Vec<MigrationUnit>> {
    let root = source.root();
    let entries = source.entries().map_err(|e| MigrateError::Discovery {
        root: root.display().to_string(),
        source: e,
    })?;

    let mut units: Vec<MigrationUnit> = entries
        .into_iter()
        .filter(|entry| !entry.is_dir)
        .filter_map(|entry| {
            let version = version_from_name(&entry.name)?;
            Some(MigrationUnit {
                version,
                location: root.join(&entry.name),
            })
        })
        .collect();
    units.sort_by(|a, b| a.version.cmp(&b.version));

    log::debug!(
        "Discovered {} migration(s) in {}",
        units.len(),
        root.display()
    );
    Ok(units)
}

/// A directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl MigrationSource for FsSource {
    fn root(&self) -> &Path {
        &self.root
    }

    fn entries(&self) -> io::Result<Vec<SourceEntry>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            // Non UTF-8 names can never carry a usable version.
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            entries.push(SourceEntry {
                name,
                is_dir: entry.file_type()?.is_dir(),
            });
        }
        Ok(entries)
    }

    fn read(&self, location: &Path) -> io::Result<String> {
        std::fs::read_to_string(location)
    }
}

/// Migrations held in memory, typically embedded with `include_str!`.
///
/// ```ignore
/// let source = EmbeddedSource::from_static(
///     "migrations",
///     &[("0001_init.up.sql", include_str!("../migrations/0001_init.up.sql"))],
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct EmbeddedSource {
    root: PathBuf,
    files: BTreeMap<String, String>,
    dirs: BTreeSet<String>,
}

impl EmbeddedSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Build from `(file name, sql)` pairs.
    pub fn from_static(root: impl Into<PathBuf>, files: &[(&str, &str)]) -> Self {
        files
            .iter()
            .fold(Self::new(root), |source, (name, sql)| {
                source.with_file(*name, *sql)
            })
    }

    /// Add or replace a file.
    pub fn with_file(mut self, name: impl Into<String>, sql: impl Into<String>) -> Self {
        self.files.insert(name.into(), sql.into());
        self
    }

    /// Add a directory entry. Discovery skips it.
    pub fn with_dir(mut self, name: impl Into<String>) -> Self {
        self.dirs.insert(name.into());
        self
    }
}

impl MigrationSource for EmbeddedSource {
    fn root(&self) -> &Path {
        &self.root
    }

    fn entries(&self) -> io::Result<Vec<SourceEntry>> {
        let files = self.files.keys().map(|name| SourceEntry {
            name: name.clone(),
            is_dir: false,
        });
        let dirs = self.dirs.iter().map(|name| SourceEntry {
            name: name.clone(),
            is_dir: true,
        });
        Ok(files.chain(dirs).collect())
    }

    fn read(&self, location: &Path) -> io::Result<String> {
        location
            .strip_prefix(&self.root)
            .ok()
            .and_then(Path::to_str)
            .and_then(|name| self.files.get(name))
            .cloned()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{} is not an embedded migration", location.display()),
                )
            })
    }
}

#[cfg(test)]
#[path = "source_test.rs"]
mod tests;
