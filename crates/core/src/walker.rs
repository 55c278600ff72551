//! Per-package reconciliation walk.
//!
//! Iterates the packages under consideration and, per package, the config
//! files they own, driving the resolution state machine (or, in diff-audit
//! mode, just showing diffs) for each variant found on disk.

use std::path::Path;

use tracing::{info, warn};

use crate::config::RunConfig;
use crate::diff;
use crate::errors::{CoreError, ResolveError, RpmError};
use crate::prompt::Prompter;
use crate::resolve::Resolver;
use crate::rpmdb::PackageDatabase;
use crate::transfer::FileTransfer;
use crate::variant::{Suffix, Variant, VariantKind};

/// Walks config files of the selected packages and reconciles their
/// variants.
pub struct PackageWalker<'a> {
    config: &'a RunConfig,
    db: &'a dyn PackageDatabase,
    transfer: &'a FileTransfer,
}

impl<'a> PackageWalker<'a> {
    pub fn new(
        config: &'a RunConfig,
        db: &'a dyn PackageDatabase,
        transfer: &'a FileTransfer,
    ) -> Self {
        Self {
            config,
            db,
            transfer,
        }
    }

    /// Run the walk. Per-file errors are logged and skipped; merge
    /// misconfiguration aborts the run.
    pub fn run(&self, prompter: &mut dyn Prompter) -> Result<(), CoreError> {
        let files = self.selected_config_files()?;
        info!(count = files.len(), "config files under consideration");

        for conf in &files {
            if self.config.diff_mode {
                self.audit(conf);
            } else {
                self.reconcile(conf, prompter)?;
            }
        }
        Ok(())
    }

    fn selected_config_files(&self) -> Result<Vec<std::path::PathBuf>, RpmError> {
        if self.config.packages.is_empty() {
            return self.db.config_files(None);
        }

        let mut files = Vec::new();
        for package in &self.config.packages {
            match self.db.config_files(Some(package)) {
                Ok(mut pkg_files) => files.append(&mut pkg_files),
                // A missing package should not abort the others.
                Err(RpmError::QueryFailed { stderr, .. }) => {
                    warn!(package, stderr = stderr.trim(), "skipping package");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(files)
    }

    /// Non-interactive audit: show a diff for every suffix file that
    /// exists, even when the contents happen to be identical.
    fn audit(&self, conf: &Path) {
        for suffix in Suffix::ALL {
            let variant = Variant::new(conf, suffix);
            if !variant.exists() {
                continue;
            }
            let result = match suffix.kind() {
                VariantKind::Offered => diff::show(conf, &variant.path),
                VariantKind::Backup => diff::show(&variant.path, conf),
            };
            if let Err(err) = result {
                warn!(variant = %variant.path.display(), %err, "could not show diff");
            }
        }
    }

    /// Interactive reconciliation of every variant of `conf`, offered
    /// updates first, then backups.
    fn reconcile(&self, conf: &Path, prompter: &mut dyn Prompter) -> Result<(), CoreError> {
        let resolver = Resolver::new(self.config, self.transfer);

        for suffix in Suffix::ALL {
            let variant = Variant::new(conf, suffix);
            if !variant.exists() {
                continue;
            }
            match resolver.resolve(prompter, &variant) {
                Ok(outcome) => {
                    info!(variant = %variant.path.display(), ?outcome, "pair resolved");
                }
                // A broken merge setup will fail identically for every
                // remaining pair; stop the whole run.
                Err(ResolveError::Merge(err)) if err.is_fatal() => {
                    return Err(CoreError::Merge(err));
                }
                Err(err) => {
                    warn!(variant = %variant.path.display(), %err,
                          "pair failed, continuing with remaining files");
                }
            }
        }
        Ok(())
    }
}
