//! Orphaned variant scanning and cleanup.
//!
//! Independent of any package walk, the scanner traverses a fixed set of
//! root directories looking for tagged variant files anywhere on the
//! filesystem. Each hit is classified: if the recovered base path is owned
//! by a package the pair needs a real merge and is only reported; if no
//! package claims it the variant is a leftover that can be deleted — but
//! only after one explicit batch confirmation.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::RunConfig;
use crate::errors::{CoreError, RpmError};
use crate::prompt::Prompter;
use crate::rpmdb::PackageDatabase;
use crate::transfer::FileTransfer;
use crate::variant::split_tagged;

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// A variant file whose base is still owned by a package; resolving it
/// needs the interactive path, never automatic deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeedsMerge {
    pub package: String,
    pub path: PathBuf,
}

/// Everything one scan found, partitioned. Every tagged file lands in
/// exactly one of the two lists.
#[derive(Debug, Default)]
pub struct OrphanReport {
    pub needs_merge: Vec<NeedsMerge>,
    pub delete_candidates: Vec<PathBuf>,
}

impl OrphanReport {
    pub fn is_empty(&self) -> bool {
        self.needs_merge.is_empty() && self.delete_candidates.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

/// Finds and (after confirmation) deletes orphaned variant files.
pub struct OrphanScanner<'a> {
    config: &'a RunConfig,
    db: &'a dyn PackageDatabase,
    transfer: &'a FileTransfer,
}

impl<'a> OrphanScanner<'a> {
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

    /// Walk the configured roots and classify every tagged file found.
    /// Pure reporting; nothing is touched.
    ///
    /// A missing `rpm` binary would fail the ownership lookup for every
    /// single hit, so it aborts the scan; per-file lookup failures only
    /// exclude that file from the report (it is never deleted).
    pub fn scan(&self) -> Result<OrphanReport, RpmError> {
        let mut report = OrphanReport::default();

        for root in &self.config.scan_roots {
            info!(root = %root.display(), "searching for stray variant files");
            let walker = WalkDir::new(root)
                .follow_links(true)
                .into_iter()
                .filter_entry(|entry| !self.is_skipped(entry.path()));

            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        debug!(%err, "skipping unreadable entry");
                        continue;
                    }
                };
                if !entry.file_type().is_file() {
                    continue;
                }
                let Some((base, _suffix)) = split_tagged(entry.path()) else {
                    continue;
                };
                self.classify(entry.path(), &base, &mut report)?;
            }
        }
        Ok(report)
    }

    fn classify(
        &self,
        tagged: &Path,
        base: &Path,
        report: &mut OrphanReport,
    ) -> Result<(), RpmError> {
        match self.db.owning_package(base) {
            Ok(Some(package)) => report.needs_merge.push(NeedsMerge {
                package,
                path: tagged.to_path_buf(),
            }),
            Ok(None) => report.delete_candidates.push(tagged.to_path_buf()),
            Err(err @ RpmError::BinaryNotFound(_)) => return Err(err),
            Err(err) => {
                warn!(path = %tagged.display(), %err, "ownership lookup failed, leaving file");
            }
        }
        Ok(())
    }

    fn is_skipped(&self, path: &Path) -> bool {
        self.config.skip_dirs.iter().any(|dir| path == dir)
    }

    /// Scan, report, and delete confirmed candidates.
    ///
    /// NeedsMerge entries are only handed off to the interactive path;
    /// the scanner never resolves them itself. Delete candidates are
    /// removed solely after an affirmative answer to one batch prompt
    /// (default yes; end of input counts as no).
    pub fn run(&self, prompter: &mut dyn Prompter) -> Result<(), CoreError> {
        let report = self.scan()?;

        if !report.needs_merge.is_empty() {
            println!("These files need merging - you may want to run 'rpmconf -a':");
            for entry in &report.needs_merge {
                println!("{}", needs_merge_line(entry));
            }
            println!("Skipping files above.\n");
        }

        if report.delete_candidates.is_empty() {
            println!("No orphaned .rpmnew, .rpmsave and .rpmorig files found.");
            return Ok(());
        }

        println!("Orphaned .rpmnew, .rpmsave and .rpmorig files:");
        for path in &report.delete_candidates {
            println!("{}", path.display());
        }

        if !self.confirm_deletion(prompter)? {
            info!("deletion declined, leaving all candidates in place");
            return Ok(());
        }

        for path in &report.delete_candidates {
            if let Err(err) = self.transfer.remove(path) {
                warn!(path = %path.display(), %err, "could not delete candidate");
            }
        }
        Ok(())
    }

    /// One yes/no covering the whole batch. Loops until the answer is
    /// `Y`, `N` or empty (= yes).
    fn confirm_deletion(&self, prompter: &mut dyn Prompter) -> Result<bool, CoreError> {
        loop {
            let answer = prompter
                .ask("Delete these files (Y/n): ")
                .map_err(crate::errors::ResolveError::Input)
                .map_err(CoreError::Resolve)?;
            match answer {
                Some(answer) => match answer.trim().to_uppercase().as_str() {
                    "Y" | "" => return Ok(true),
                    "N" => return Ok(false),
                    _ => continue,
                },
                // Unattended pipe ran dry: do not delete anything.
                None => return Ok(false),
            }
        }
    }
}

/// One report row: the owning package padded to a fixed column, then the
/// tagged path.
fn needs_merge_line(entry: &NeedsMerge) -> String {
    format!("{:<20}: {}", entry.package, entry.path.display())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileConfig;
    use crate::prompt::ScriptedPrompter;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    struct FakeDb {
        owners: HashMap<PathBuf, String>,
    }

    impl PackageDatabase for FakeDb {
        fn config_files(&self, _package: Option<&str>) -> Result<Vec<PathBuf>, RpmError> {
            Ok(vec![])
        }

        fn owning_package(&self, path: &Path) -> Result<Option<String>, RpmError> {
            Ok(self.owners.get(path).cloned())
        }
    }

    fn scanner_config(root: &Path, skip: Vec<PathBuf>) -> RunConfig {
        let mut config = RunConfig::from_parts(
            FileConfig::default(),
            vec![],
            true,
            false,
            false,
            false,
            None,
        )
        .unwrap();
        config.scan_roots = vec![root.to_path_buf()];
        config.skip_dirs = skip;
        config
    }

    #[test]
    fn test_scan_partitions_owned_and_unowned() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("owned.conf.rpmsave"), "x").unwrap();
        fs::write(dir.path().join("stray.conf.rpmnew"), "y").unwrap();
        fs::write(dir.path().join("plain.conf"), "z").unwrap();

        let db = FakeDb {
            owners: HashMap::from([(dir.path().join("owned.conf"), "bar-pkg".to_string())]),
        };
        let config = scanner_config(dir.path(), vec![]);
        let transfer = FileTransfer::new(false);

        let report = OrphanScanner::new(&config, &db, &transfer).scan().unwrap();

        assert_eq!(report.needs_merge.len(), 1);
        assert_eq!(report.needs_merge[0].package, "bar-pkg");
        assert_eq!(
            report.needs_merge[0].path,
            dir.path().join("owned.conf.rpmsave")
        );
        assert_eq!(
            report.delete_candidates,
            vec![dir.path().join("stray.conf.rpmnew")]
        );
    }

    #[test]
    fn test_scan_skips_configured_directories() {
        let dir = TempDir::new().unwrap();
        let noisy = dir.path().join("mock");
        fs::create_dir(&noisy).unwrap();
        fs::write(noisy.join("inner.conf.rpmnew"), "x").unwrap();
        fs::write(dir.path().join("outer.conf.rpmnew"), "y").unwrap();

        let db = FakeDb {
            owners: HashMap::new(),
        };
        let config = scanner_config(dir.path(), vec![noisy]);
        let transfer = FileTransfer::new(false);

        let report = OrphanScanner::new(&config, &db, &transfer).scan().unwrap();

        assert_eq!(
            report.delete_candidates,
            vec![dir.path().join("outer.conf.rpmnew")]
        );
    }

    #[test]
    fn test_missing_rpm_binary_aborts_the_scan() {
        struct BrokenDb;

        impl PackageDatabase for BrokenDb {
            fn config_files(&self, _package: Option<&str>) -> Result<Vec<PathBuf>, RpmError> {
                Ok(vec![])
            }

            fn owning_package(&self, _path: &Path) -> Result<Option<String>, RpmError> {
                Err(RpmError::BinaryNotFound("rpm".into()))
            }
        }

        let dir = TempDir::new().unwrap();
        let stray = dir.path().join("a.conf.rpmnew");
        fs::write(&stray, "x").unwrap();

        let db = BrokenDb;
        let config = scanner_config(dir.path(), vec![]);
        let transfer = FileTransfer::new(false);
        let scanner = OrphanScanner::new(&config, &db, &transfer);

        // The lookup would fail for every hit; the scan must surface the
        // error instead of reporting an empty filesystem.
        assert!(matches!(scanner.scan(), Err(RpmError::BinaryNotFound(_))));

        let mut prompter = ScriptedPrompter::new(["Y"]);
        let result = scanner.run(&mut prompter);
        assert!(matches!(
            result,
            Err(CoreError::Rpm(RpmError::BinaryNotFound(_)))
        ));
        assert!(stray.exists());
        assert_eq!(prompter.asked, 0);
    }

    #[test]
    fn test_per_file_lookup_failure_leaves_file_undeleted() {
        struct FlakyDb;

        impl PackageDatabase for FlakyDb {
            fn config_files(&self, _package: Option<&str>) -> Result<Vec<PathBuf>, RpmError> {
                Ok(vec![])
            }

            fn owning_package(&self, path: &Path) -> Result<Option<String>, RpmError> {
                if path.ends_with("flaky.conf") {
                    Err(RpmError::IoError(std::io::Error::other("lookup hiccup")))
                } else {
                    Ok(None)
                }
            }
        }

        let dir = TempDir::new().unwrap();
        let flaky = dir.path().join("flaky.conf.rpmsave");
        let stray = dir.path().join("stray.conf.rpmnew");
        fs::write(&flaky, "x").unwrap();
        fs::write(&stray, "y").unwrap();

        let db = FlakyDb;
        let config = scanner_config(dir.path(), vec![]);
        let transfer = FileTransfer::new(false);
        let scanner = OrphanScanner::new(&config, &db, &transfer);

        let report = scanner.scan().unwrap();
        assert_eq!(report.delete_candidates, vec![stray.clone()]);
        assert!(report.needs_merge.is_empty());

        // The file whose ownership is unknown must never be deleted.
        let mut prompter = ScriptedPrompter::new(["Y"]);
        scanner.run(&mut prompter).unwrap();
        assert!(flaky.exists());
        assert!(!stray.exists());
    }

    #[test]
    fn test_needs_merge_report_row_format() {
        let entry = NeedsMerge {
            package: "bar-pkg".to_string(),
            path: PathBuf::from("/etc/bar.conf.rpmsave"),
        };
        assert_eq!(
            needs_merge_line(&entry),
            "bar-pkg             : /etc/bar.conf.rpmsave"
        );
    }

    #[test]
    fn test_confirmed_deletion_removes_only_candidates() {
        let dir = TempDir::new().unwrap();
        let stray = dir.path().join("stray.conf.rpmnew");
        let owned = dir.path().join("owned.conf.rpmsave");
        fs::write(&stray, "x").unwrap();
        fs::write(&owned, "y").unwrap();

        let db = FakeDb {
            owners: HashMap::from([(dir.path().join("owned.conf"), "bar-pkg".to_string())]),
        };
        let config = scanner_config(dir.path(), vec![]);
        let transfer = FileTransfer::new(false);
        let mut prompter = ScriptedPrompter::new(["Y"]);

        OrphanScanner::new(&config, &db, &transfer)
            .run(&mut prompter)
            .unwrap();

        assert!(!stray.exists());
        // The owned pair is only reported, never deleted here.
        assert!(owned.exists());
    }

    #[test]
    fn test_empty_answer_defaults_to_deletion() {
        let dir = TempDir::new().unwrap();
        let stray = dir.path().join("stray.conf.rpmnew");
        fs::write(&stray, "x").unwrap();

        let db = FakeDb {
            owners: HashMap::new(),
        };
        let config = scanner_config(dir.path(), vec![]);
        let transfer = FileTransfer::new(false);
        let mut prompter = ScriptedPrompter::new([""]);

        OrphanScanner::new(&config, &db, &transfer)
            .run(&mut prompter)
            .unwrap();

        assert!(!stray.exists());
    }

    #[test]
    fn test_negative_answer_keeps_every_candidate() {
        let dir = TempDir::new().unwrap();
        let stray = dir.path().join("stray.conf.rpmnew");
        fs::write(&stray, "x").unwrap();

        let db = FakeDb {
            owners: HashMap::new(),
        };
        let config = scanner_config(dir.path(), vec![]);
        let transfer = FileTransfer::new(false);
        // Garbage answers re-ask; "n" finally declines.
        let mut prompter = ScriptedPrompter::new(["maybe", "n"]);

        OrphanScanner::new(&config, &db, &transfer)
            .run(&mut prompter)
            .unwrap();

        assert!(stray.exists());
        assert_eq!(prompter.asked, 2);
    }

    #[test]
    fn test_end_of_input_declines_deletion() {
        let dir = TempDir::new().unwrap();
        let stray = dir.path().join("stray.conf.rpmsave");
        fs::write(&stray, "x").unwrap();

        let db = FakeDb {
            owners: HashMap::new(),
        };
        let config = scanner_config(dir.path(), vec![]);
        let transfer = FileTransfer::new(false);
        let mut prompter = ScriptedPrompter::new(Vec::<String>::new());

        OrphanScanner::new(&config, &db, &transfer)
            .run(&mut prompter)
            .unwrap();

        assert!(stray.exists());
    }

    #[test]
    fn test_dry_run_never_deletes() {
        let dir = TempDir::new().unwrap();
        let stray = dir.path().join("stray.conf.rpmnew");
        fs::write(&stray, "x").unwrap();

        let db = FakeDb {
            owners: HashMap::new(),
        };
        let config = scanner_config(dir.path(), vec![]);
        let transfer = FileTransfer::new(true);
        let mut prompter = ScriptedPrompter::new(["Y"]);

        OrphanScanner::new(&config, &db, &transfer)
            .run(&mut prompter)
            .unwrap();

        assert!(stray.exists());
    }
}
