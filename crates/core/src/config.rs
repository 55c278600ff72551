//! Run configuration.
//!
//! Defaults may be set system-wide in an optional TOML file
//! (`/etc/rpmconf.toml`); command-line flags override it. The merged
//! result is one immutable [`RunConfig`] constructed at startup and passed
//! explicitly into every component — there is no other process-wide state.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::ConfigError;
use crate::merge::MergeFrontend;

/// Default location of the system-wide configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/rpmconf.toml";

// ---------------------------------------------------------------------------
// File configuration
// ---------------------------------------------------------------------------

/// Optional settings read from the TOML configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    /// Default merge frontend when none is given on the command line.
    #[serde(default)]
    pub frontend: Option<String>,

    /// Root directories the orphan scanner walks.
    #[serde(default = "default_scan_roots")]
    pub scan_roots: Vec<PathBuf>,

    /// Directories the orphan scanner skips entirely.
    #[serde(default = "default_skip_dirs")]
    pub skip_dirs: Vec<PathBuf>,
}

fn default_scan_roots() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/etc"),
        PathBuf::from("/var"),
        PathBuf::from("/usr"),
    ]
}

fn default_skip_dirs() -> Vec<PathBuf> {
    // /var/lib/mock holds throwaway build chroots full of stray variants.
    vec![PathBuf::from("/var/lib/mock")]
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            frontend: None,
            scan_roots: default_scan_roots(),
            skip_dirs: default_skip_dirs(),
        }
    }
}

impl FileConfig {
    /// Load the configuration file, treating a missing file as defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(err) => return Err(ConfigError::IoError(err)),
        };
        toml::from_str(&content).map_err(|err| ConfigError::ParseError(err.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Run configuration
// ---------------------------------------------------------------------------

/// The immutable configuration of one reconciliation run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Packages to reconcile; empty means every installed package.
    pub packages: Vec<String>,
    /// Scan for and clean orphaned variant files.
    pub clean: bool,
    /// Report intended actions without touching the filesystem.
    pub dry_run: bool,
    /// Show SELinux context columns in the pre-prompt file listing.
    pub selinux: bool,
    /// Non-interactive diff-audit mode for the package walk.
    pub diff_mode: bool,
    /// Selected merge frontend, if any.
    pub frontend: Option<MergeFrontend>,
    /// Root directories for the orphan scan.
    pub scan_roots: Vec<PathBuf>,
    /// Directories excluded from the orphan scan.
    pub skip_dirs: Vec<PathBuf>,
}

impl RunConfig {
    /// Merge command-line values over the file configuration.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        file: FileConfig,
        packages: Vec<String>,
        clean: bool,
        dry_run: bool,
        selinux: bool,
        diff_mode: bool,
        frontend: Option<MergeFrontend>,
    ) -> Result<Self, ConfigError> {
        let frontend = match frontend {
            Some(frontend) => Some(frontend),
            None => file
                .frontend
                .as_deref()
                .map(str::parse::<MergeFrontend>)
                .transpose()?,
        };

        Ok(Self {
            packages,
            clean,
            dry_run,
            selinux,
            diff_mode,
            frontend,
            scan_roots: file.scan_roots,
            skip_dirs: file.skip_dirs,
        })
    }
}
