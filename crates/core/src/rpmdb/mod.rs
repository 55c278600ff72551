//! Access to the RPM package database.
//!
//! The engine needs exactly two queries: the config files a package owns,
//! and the reverse lookup from a path to its owning package. They are
//! expressed as the [`PackageDatabase`] trait so the walker and the orphan
//! scanner can be exercised against a fake database in tests.

mod client;

pub use client::RpmClient;

use std::path::{Path, PathBuf};

use crate::errors::RpmError;

/// Narrow interface to the package database.
pub trait PackageDatabase {
    /// Paths marked as configuration by `package`, or by every installed
    /// package when `None`. Order follows the database.
    fn config_files(&self, package: Option<&str>) -> Result<Vec<PathBuf>, RpmError>;

    /// The package owning `path`, or `None` when no package claims it.
    fn owning_package(&self, path: &Path) -> Result<Option<String>, RpmError>;
}
