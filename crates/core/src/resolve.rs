//! The per-pair resolution state machine.
//!
//! For one (base file, variant) pair the engine loops on a prompt until a
//! terminal outcome is reached. The two variant polarities — an offered
//! update (`.rpmnew`) versus a backup of the administrator's file
//! (`.rpmsave`/`.rpmorig`) — share the same engine; the difference is a
//! pure mapping from choice to action plus an inverted default, captured
//! in [`action_for`].

use std::fs;
use std::path::Path;
use std::process::Command;

use tracing::{debug, info, warn};

use crate::config::RunConfig;
use crate::diff;
use crate::errors::ResolveError;
use crate::merge::{MergeDispatcher, MergeStatus};
use crate::prompt::Prompter;
use crate::transfer::FileTransfer;
use crate::variant::{Variant, VariantKind};

// ---------------------------------------------------------------------------
// Choices and actions
// ---------------------------------------------------------------------------

/// Which prompt template drives a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// Variant is an offered update; default is to keep the current file.
    Offered,
    /// Variant is the administrator's backup; default is to keep the
    /// packaged version the base file now holds.
    Backup,
}

impl From<VariantKind> for PromptKind {
    fn from(kind: VariantKind) -> Self {
        match kind {
            VariantKind::Offered => PromptKind::Offered,
            VariantKind::Backup => PromptKind::Backup,
        }
    }
}

/// A normalized answer to the resolution prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    /// `Y` / `I` — take the package maintainer's version.
    Install,
    /// `N` / `O` — keep (or return to) the administrator's version.
    Keep,
    /// `D` — show the differences, then ask again.
    Diff,
    /// `M` — run the merge frontend, then ask again.
    Merge,
    /// `Z` — suspend the whole process to examine the situation.
    Background,
    /// `S` — leave the pair for a future run.
    Skip,
}

impl Choice {
    /// Parse one line of input. Empty input maps to the template's
    /// default; unrecognized input yields `None` and the loop re-asks.
    pub fn parse(input: &str, kind: PromptKind) -> Option<Choice> {
        match input.trim().to_uppercase().as_str() {
            "" => Some(match kind {
                PromptKind::Offered => Choice::Keep,
                PromptKind::Backup => Choice::Install,
            }),
            "Y" | "I" => Some(Choice::Install),
            "N" | "O" => Some(Choice::Keep),
            "D" => Some(Choice::Diff),
            "M" => Some(Choice::Merge),
            "Z" => Some(Choice::Background),
            "S" => Some(Choice::Skip),
            _ => None,
        }
    }
}

/// What the engine does in response to a choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Overwrite the base file with the variant, consuming the variant.
    AdoptVariant,
    /// Remove the variant, leaving the base file untouched.
    RemoveVariant,
    /// Show the diff and ask again.
    ShowDiff,
    /// Run the merge frontend and ask again.
    RunMerge,
    /// Suspend the process and ask again on resume.
    Suspend,
    /// Terminal skip; nothing touched.
    Skip,
}

/// The pure transition table. The polarity inversion lives here: for an
/// offered update `Y` adopts the variant, while for a backup `Y` keeps
/// the packaged version already in place by dropping the backup.
pub fn action_for(kind: PromptKind, choice: Choice) -> Action {
    match (kind, choice) {
        (_, Choice::Diff) => Action::ShowDiff,
        (_, Choice::Merge) => Action::RunMerge,
        (_, Choice::Background) => Action::Suspend,
        (_, Choice::Skip) => Action::Skip,
        (PromptKind::Offered, Choice::Install) => Action::AdoptVariant,
        (PromptKind::Offered, Choice::Keep) => Action::RemoveVariant,
        (PromptKind::Backup, Choice::Install) => Action::RemoveVariant,
        (PromptKind::Backup, Choice::Keep) => Action::AdoptVariant,
    }
}

/// Terminal result of resolving one pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The variant's content replaced the base file; variant removed.
    Adopted,
    /// The base file was kept as-is; variant removed.
    KeptBase,
    /// An external merge tool consumed the variant; its side effects are
    /// authoritative.
    Merged,
    /// Nothing touched; the pair is left for a future run.
    Skipped,
}

// ---------------------------------------------------------------------------
// Prompt templates
// ---------------------------------------------------------------------------

const OFFERED_PROMPT: &str = r#" ==> Package distributor has shipped an updated version.
   What would you like to do about it ?  Your options are:
    Y or I  : install the package maintainer's version
    N or O  : keep your currently-installed version
      D     : show the differences between the versions
      M     : merge configuration files
      Z     : background this process to examine the situation
      S     : skip this file
 The default action is to keep your current version.
*** aliases (Y/I/N/O/D/M/Z/S) [default=N] ? "#;

const BACKUP_PROMPT: &str = r#" ==> Package distributor has shipped an updated version.
 ==> Maintainer forced upgrade. Your old version has been backed up.
   What would you like to do about it?  Your options are:
    Y or I  : install (keep) the package maintainer's version
    N or O  : return back to your original file
      D     : show the differences between the versions
      M     : merge configuration files
      Z     : background this process to examine the situation
      S     : skip this file
 The default action is to keep package maintainer's version.
*** aliases (Y/I/N/O/M/D/Z/S) [default=Y] ? "#;

fn prompt_text(kind: PromptKind) -> &'static str {
    match kind {
        PromptKind::Offered => OFFERED_PROMPT,
        PromptKind::Backup => BACKUP_PROMPT,
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Drives the resolution loop for (base, variant) pairs.
pub struct Resolver<'a> {
    config: &'a RunConfig,
    transfer: &'a FileTransfer,
}

impl<'a> Resolver<'a> {
    pub fn new(config: &'a RunConfig, transfer: &'a FileTransfer) -> Self {
        Self { config, transfer }
    }

    /// Resolve one pair to a terminal outcome.
    ///
    /// Byte-identical pairs are auto-resolved without a prompt. End of
    /// input is an explicit skip. The loop is otherwise unbounded.
    pub fn resolve(
        &self,
        prompter: &mut dyn Prompter,
        variant: &Variant,
    ) -> Result<Outcome, ResolveError> {
        let base = variant.base.as_path();
        let other = variant.path.as_path();

        if files_identical(base, other)? {
            info!(variant = %other.display(), "identical to base, removing without prompt");
            self.transfer.remove(other)?;
            return Ok(Outcome::KeptBase);
        }

        let kind = PromptKind::from(variant.suffix.kind());
        let mut merge_attempted = false;

        loop {
            // The variant may vanish mid-loop: a merge tool consumed it,
            // or an external agent beat us to it. Both are non-fatal.
            if !variant.exists() {
                return Ok(if merge_attempted {
                    info!(variant = %other.display(), "variant consumed by merge tool");
                    Outcome::Merged
                } else {
                    warn!(variant = %other.display(), "variant vanished, leaving pair alone");
                    Outcome::Skipped
                });
            }

            self.print_listing(base, other)?;
            println!("{}", prompt_text(kind));

            let Some(line) = prompter.ask("Your choice: ").map_err(ResolveError::Input)?
            else {
                // End of input: treat exactly like an explicit skip.
                debug!("input stream exhausted, skipping pair");
                return Ok(Outcome::Skipped);
            };
            let Some(choice) = Choice::parse(&line, kind) else {
                continue;
            };

            match action_for(kind, choice) {
                Action::ShowDiff => {
                    // Backups show the administrator's file as the "from"
                    // side; offered updates show the installed file first.
                    let (from, to) = match kind {
                        PromptKind::Offered => (base, other),
                        PromptKind::Backup => (other, base),
                    };
                    diff::show(from, to)?;
                }
                Action::RunMerge => {
                    merge_attempted = true;
                    let dispatcher = MergeDispatcher::new(self.config.frontend, self.transfer);
                    if dispatcher.invoke(base, other)? == MergeStatus::NotMerged {
                        println!("Files not merged.");
                    }
                }
                Action::Suspend => suspend(),
                Action::Skip => return Ok(Outcome::Skipped),
                Action::AdoptVariant => {
                    self.transfer.overwrite(other, base)?;
                    return Ok(Outcome::Adopted);
                }
                Action::RemoveVariant => {
                    self.transfer.remove(other)?;
                    return Ok(Outcome::KeptBase);
                }
            }
        }
    }

    /// Long listing of the two files, printed before every prompt so the
    /// administrator can compare timestamps, sizes and owners.
    fn print_listing(&self, conf: &Path, other: &Path) -> Result<(), ResolveError> {
        println!("Configuration file '{}'", conf.display());
        let mut cmd = Command::new("ls");
        cmd.arg("-ltrd");
        if self.config.selinux {
            cmd.arg("--lcontext");
        }
        cmd.arg(conf).arg(other);

        let output = cmd.output().map_err(ResolveError::Listing)?;
        print!("{}", String::from_utf8_lossy(&output.stdout));
        Ok(())
    }
}

fn files_identical(a: &Path, b: &Path) -> Result<bool, ResolveError> {
    let read = |path: &Path| {
        fs::read(path).map_err(|source| ResolveError::Compare {
            path: path.to_path_buf(),
            source,
        })
    };
    Ok(read(a)? == read(b)?)
}

/// Whole-process suspend, the `Z` choice. This is operating-system job
/// control: the process stops until the shell resumes it with `fg`, and
/// control returns to the exact same pending prompt.
#[cfg(unix)]
fn suspend() {
    println!("Run command 'fg' to continue");
    unsafe {
        libc::kill(libc::getpid(), libc::SIGSTOP);
    }
}

#[cfg(not(unix))]
fn suspend() {
    // No job-control signals on this platform; the prompt simply repeats.
    println!("Backgrounding is not supported on this platform.");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileConfig;
    use crate::prompt::ScriptedPrompter;
    use crate::variant::Suffix;
    use tempfile::TempDir;

    fn test_config(dry_run: bool) -> (RunConfig, FileTransfer) {
        let config = RunConfig::from_parts(
            FileConfig::default(),
            vec![],
            false,
            dry_run,
            false,
            false,
            None,
        )
        .unwrap();
        (config, FileTransfer::new(dry_run))
    }

    fn write_pair(dir: &TempDir, suffix: Suffix, base_text: &str, other_text: &str) -> Variant {
        let base = dir.path().join("app.conf");
        fs::write(&base, base_text).unwrap();
        let variant = Variant::new(&base, suffix);
        fs::write(&variant.path, other_text).unwrap();
        variant
    }

    #[test]
    fn test_choice_defaults_follow_polarity() {
        assert_eq!(Choice::parse("", PromptKind::Offered), Some(Choice::Keep));
        assert_eq!(Choice::parse("", PromptKind::Backup), Some(Choice::Install));
    }

    #[test]
    fn test_choice_aliases() {
        for input in ["y", "Y", "i", "I"] {
            assert_eq!(
                Choice::parse(input, PromptKind::Offered),
                Some(Choice::Install)
            );
        }
        for input in ["n", "o"] {
            assert_eq!(Choice::parse(input, PromptKind::Backup), Some(Choice::Keep));
        }
        assert_eq!(Choice::parse("d", PromptKind::Offered), Some(Choice::Diff));
        assert_eq!(Choice::parse("m", PromptKind::Offered), Some(Choice::Merge));
        assert_eq!(
            Choice::parse("z", PromptKind::Offered),
            Some(Choice::Background)
        );
        assert_eq!(Choice::parse("s", PromptKind::Offered), Some(Choice::Skip));
        assert_eq!(Choice::parse("x", PromptKind::Offered), None);
        assert_eq!(Choice::parse("yes", PromptKind::Offered), None);
    }

    #[test]
    fn test_transition_table_polarity() {
        assert_eq!(
            action_for(PromptKind::Offered, Choice::Install),
            Action::AdoptVariant
        );
        assert_eq!(
            action_for(PromptKind::Offered, Choice::Keep),
            Action::RemoveVariant
        );
        // Inverted for backups: Y drops the backup, N restores it.
        assert_eq!(
            action_for(PromptKind::Backup, Choice::Install),
            Action::RemoveVariant
        );
        assert_eq!(
            action_for(PromptKind::Backup, Choice::Keep),
            Action::AdoptVariant
        );
        // Kind-independent choices.
        for kind in [PromptKind::Offered, PromptKind::Backup] {
            assert_eq!(action_for(kind, Choice::Diff), Action::ShowDiff);
            assert_eq!(action_for(kind, Choice::Merge), Action::RunMerge);
            assert_eq!(action_for(kind, Choice::Background), Action::Suspend);
            assert_eq!(action_for(kind, Choice::Skip), Action::Skip);
        }
    }

    #[test]
    fn test_identical_pair_auto_resolves_without_prompt() {
        let dir = TempDir::new().unwrap();
        let variant = write_pair(&dir, Suffix::New, "same\n", "same\n");
        let (config, transfer) = test_config(false);
        let mut prompter = ScriptedPrompter::new(Vec::<String>::new());

        let outcome = Resolver::new(&config, &transfer)
            .resolve(&mut prompter, &variant)
            .unwrap();

        assert_eq!(outcome, Outcome::KeptBase);
        assert_eq!(prompter.asked, 0);
        assert!(!variant.exists());
        assert_eq!(fs::read_to_string(&variant.base).unwrap(), "same\n");
    }

    #[test]
    fn test_offered_keep_removes_variant_only() {
        let dir = TempDir::new().unwrap();
        let variant = write_pair(&dir, Suffix::New, "mine\n", "theirs\n");
        let (config, transfer) = test_config(false);
        let mut prompter = ScriptedPrompter::new(["N"]);

        let outcome = Resolver::new(&config, &transfer)
            .resolve(&mut prompter, &variant)
            .unwrap();

        assert_eq!(outcome, Outcome::KeptBase);
        assert!(!variant.exists());
        assert_eq!(fs::read_to_string(&variant.base).unwrap(), "mine\n");
    }

    #[test]
    fn test_offered_install_adopts_variant() {
        let dir = TempDir::new().unwrap();
        let variant = write_pair(&dir, Suffix::New, "mine\n", "theirs\n");
        let (config, transfer) = test_config(false);
        let mut prompter = ScriptedPrompter::new(["Y"]);

        let outcome = Resolver::new(&config, &transfer)
            .resolve(&mut prompter, &variant)
            .unwrap();

        assert_eq!(outcome, Outcome::Adopted);
        assert!(!variant.exists());
        assert_eq!(fs::read_to_string(&variant.base).unwrap(), "theirs\n");
    }

    #[test]
    fn test_offered_empty_input_defaults_to_keep() {
        let dir = TempDir::new().unwrap();
        let variant = write_pair(&dir, Suffix::New, "mine\n", "theirs\n");
        let (config, transfer) = test_config(false);
        let mut prompter = ScriptedPrompter::new([""]);

        let outcome = Resolver::new(&config, &transfer)
            .resolve(&mut prompter, &variant)
            .unwrap();

        assert_eq!(outcome, Outcome::KeptBase);
        assert_eq!(fs::read_to_string(&variant.base).unwrap(), "mine\n");
    }

    #[test]
    fn test_backup_install_keeps_packaged_version() {
        let dir = TempDir::new().unwrap();
        let variant = write_pair(&dir, Suffix::Save, "packaged\n", "admins\n");
        let (config, transfer) = test_config(false);
        let mut prompter = ScriptedPrompter::new(["Y"]);

        let outcome = Resolver::new(&config, &transfer)
            .resolve(&mut prompter, &variant)
            .unwrap();

        assert_eq!(outcome, Outcome::KeptBase);
        assert!(!variant.exists());
        assert_eq!(fs::read_to_string(&variant.base).unwrap(), "packaged\n");
    }

    #[test]
    fn test_backup_keep_restores_admin_version() {
        let dir = TempDir::new().unwrap();
        let variant = write_pair(&dir, Suffix::Save, "packaged\n", "admins\n");
        let (config, transfer) = test_config(false);
        let mut prompter = ScriptedPrompter::new(["N"]);

        let outcome = Resolver::new(&config, &transfer)
            .resolve(&mut prompter, &variant)
            .unwrap();

        assert_eq!(outcome, Outcome::Adopted);
        assert!(!variant.exists());
        assert_eq!(fs::read_to_string(&variant.base).unwrap(), "admins\n");
    }

    #[test]
    fn test_end_of_input_skips_and_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let variant = write_pair(&dir, Suffix::New, "mine\n", "theirs\n");
        let (config, transfer) = test_config(false);
        let mut prompter = ScriptedPrompter::new(Vec::<String>::new());

        let outcome = Resolver::new(&config, &transfer)
            .resolve(&mut prompter, &variant)
            .unwrap();

        assert_eq!(outcome, Outcome::Skipped);
        assert!(variant.exists());
        assert_eq!(fs::read_to_string(&variant.base).unwrap(), "mine\n");
        assert_eq!(fs::read_to_string(&variant.path).unwrap(), "theirs\n");
    }

    #[test]
    fn test_invalid_input_reloops_without_penalty() {
        let dir = TempDir::new().unwrap();
        let variant = write_pair(&dir, Suffix::New, "mine\n", "theirs\n");
        let (config, transfer) = test_config(false);
        let mut prompter = ScriptedPrompter::new(["bogus", "?", "S"]);

        let outcome = Resolver::new(&config, &transfer)
            .resolve(&mut prompter, &variant)
            .unwrap();

        assert_eq!(outcome, Outcome::Skipped);
        assert_eq!(prompter.asked, 3);
        assert!(variant.exists());
    }

    #[test]
    fn test_dry_run_reports_without_mutating() {
        let dir = TempDir::new().unwrap();
        let variant = write_pair(&dir, Suffix::New, "mine\n", "theirs\n");
        let (config, transfer) = test_config(true);
        let mut prompter = ScriptedPrompter::new(["Y"]);

        let outcome = Resolver::new(&config, &transfer)
            .resolve(&mut prompter, &variant)
            .unwrap();

        assert_eq!(outcome, Outcome::Adopted);
        assert!(variant.exists());
        assert_eq!(fs::read_to_string(&variant.base).unwrap(), "mine\n");
        assert_eq!(fs::read_to_string(&variant.path).unwrap(), "theirs\n");
    }

    #[test]
    fn test_missing_base_is_a_per_pair_error() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("gone.conf");
        let variant = Variant::new(&base, Suffix::New);
        fs::write(&variant.path, "theirs\n").unwrap();
        let (config, transfer) = test_config(false);
        let mut prompter = ScriptedPrompter::new(Vec::<String>::new());

        let result = Resolver::new(&config, &transfer).resolve(&mut prompter, &variant);
        assert!(matches!(result, Err(ResolveError::Compare { .. })));
        // The variant is left in place for a future run.
        assert!(variant.exists());
    }
}
