//! External merge tool dispatch.
//!
//! Maps a configured frontend to an external command invocation. Each
//! frontend's invocation shape, exit-status trustworthiness and post-merge
//! cleanup are data in a per-frontend [`FrontendSpec`], so adding a tool
//! is a table change rather than new control flow.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;

use tracing::{debug, info};

use crate::errors::{ConfigError, MergeError};
use crate::transfer::FileTransfer;

/// Environment variable consulted when no frontend is selected explicitly.
pub const MERGE_ENV: &str = "MERGE";

// ---------------------------------------------------------------------------
// Frontends
// ---------------------------------------------------------------------------

/// The recognized merge frontends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeFrontend {
    Vimdiff,
    Gvimdiff,
    Meld,
    Diffuse,
    Kdiff3,
    /// Command taken from the `MERGE` environment variable.
    Env,
}

/// How a frontend is invoked and how much its exit status means.
struct FrontendSpec {
    /// Executable name; `None` means "resolve from the environment".
    program: Option<&'static str>,
    /// Append `-o <conf>` so the tool writes the merged result itself.
    writes_output: bool,
    /// Whether a non-zero exit reliably means "not merged". The visual
    /// diff family returns 0 even when nothing was saved, so its status
    /// carries no signal.
    trusted_exit: bool,
    /// Whether a successful run consumed the variant and left a
    /// `<conf>.orig` backup that must be cleaned up.
    cleans_up: bool,
}

impl MergeFrontend {
    /// The dispatch table.
    fn spec(self) -> FrontendSpec {
        match self {
            MergeFrontend::Vimdiff => FrontendSpec {
                program: Some("vimdiff"),
                writes_output: false,
                trusted_exit: false,
                cleans_up: false,
            },
            MergeFrontend::Gvimdiff => FrontendSpec {
                program: Some("gvimdiff"),
                writes_output: false,
                trusted_exit: false,
                cleans_up: false,
            },
            MergeFrontend::Meld => FrontendSpec {
                program: Some("meld"),
                writes_output: false,
                trusted_exit: false,
                cleans_up: false,
            },
            MergeFrontend::Diffuse => FrontendSpec {
                program: Some("diffuse"),
                writes_output: false,
                trusted_exit: true,
                cleans_up: false,
            },
            MergeFrontend::Kdiff3 => FrontendSpec {
                program: Some("kdiff3"),
                writes_output: true,
                trusted_exit: true,
                cleans_up: true,
            },
            MergeFrontend::Env => FrontendSpec {
                program: None,
                writes_output: false,
                trusted_exit: false,
                cleans_up: false,
            },
        }
    }
}

impl FromStr for MergeFrontend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vimdiff" => Ok(MergeFrontend::Vimdiff),
            "gvimdiff" => Ok(MergeFrontend::Gvimdiff),
            "meld" => Ok(MergeFrontend::Meld),
            "diffuse" => Ok(MergeFrontend::Diffuse),
            "kdiff3" => Ok(MergeFrontend::Kdiff3),
            "env" => Ok(MergeFrontend::Env),
            other => Err(ConfigError::UnknownFrontend(other.to_string())),
        }
    }
}

impl fmt::Display for MergeFrontend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MergeFrontend::Vimdiff => "vimdiff",
            MergeFrontend::Gvimdiff => "gvimdiff",
            MergeFrontend::Meld => "meld",
            MergeFrontend::Diffuse => "diffuse",
            MergeFrontend::Kdiff3 => "kdiff3",
            MergeFrontend::Env => "env",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// What an invocation told us about the merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStatus {
    /// The tool reported success and the variant file was consumed.
    Merged,
    /// The tool reported a trustworthy non-zero status; nothing merged.
    NotMerged,
    /// The tool ran, but its exit status carries no merge signal.
    Indeterminate,
}

/// Invokes the configured merge frontend on a (base, variant) pair.
pub struct MergeDispatcher<'a> {
    frontend: Option<MergeFrontend>,
    transfer: &'a FileTransfer,
}

impl<'a> MergeDispatcher<'a> {
    pub fn new(frontend: Option<MergeFrontend>, transfer: &'a FileTransfer) -> Self {
        Self { frontend, transfer }
    }

    /// Run the merge tool as `tool conf other` (plus `-o conf` for tools
    /// that write the result themselves) and interpret the outcome.
    ///
    /// A missing executable or an unresolvable frontend is fatal for the
    /// whole run, since the condition would recur for every pair.
    pub fn invoke(&self, conf: &Path, other: &Path) -> Result<MergeStatus, MergeError> {
        let merge_env = std::env::var(MERGE_ENV).ok();
        self.invoke_with_env(conf, other, merge_env.as_deref())
    }

    fn invoke_with_env(
        &self,
        conf: &Path,
        other: &Path,
        merge_env: Option<&str>,
    ) -> Result<MergeStatus, MergeError> {
        // With no explicit frontend, a set MERGE variable selects the env
        // frontend implicitly.
        let frontend = match (self.frontend, merge_env) {
            (Some(frontend), _) => frontend,
            (None, Some(_)) => MergeFrontend::Env,
            (None, None) => return Err(MergeError::NoFrontend),
        };

        let spec = frontend.spec();
        let program: String = match spec.program {
            Some(name) => name.to_string(),
            None => merge_env
                .map(str::to_string)
                .ok_or(MergeError::NoFrontend)?,
        };

        let mut cmd = Command::new(&program);
        cmd.arg(conf).arg(other);
        if spec.writes_output {
            cmd.arg("-o").arg(conf);
        }

        info!(tool = %program, conf = %conf.display(), other = %other.display(),
              "launching merge tool");
        let status = cmd.status().map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                MergeError::ToolNotFound(program.clone())
            } else {
                MergeError::IoError(err)
            }
        })?;

        if !status.success() {
            debug!(tool = %program, code = status.code(), "merge tool exited non-zero");
            return Ok(if spec.trusted_exit {
                MergeStatus::NotMerged
            } else {
                MergeStatus::Indeterminate
            });
        }

        if spec.cleans_up {
            // kdiff3 wrote the result over `conf`; drop the variant and the
            // tool's backup file.
            self.transfer.remove(other)?;
            let backup = backup_path(conf);
            self.transfer.remove(&backup)?;
            return Ok(MergeStatus::Merged);
        }

        Ok(MergeStatus::Indeterminate)
    }
}

/// The `<conf>.orig` backup a three-way merge tool leaves behind.
fn backup_path(conf: &Path) -> PathBuf {
    let mut name = conf.as_os_str().to_os_string();
    name.push(".orig");
    PathBuf::from(name)
}
