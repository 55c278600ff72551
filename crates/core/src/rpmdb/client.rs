//! Synchronous RPM CLI client.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use super::PackageDatabase;
use crate::errors::RpmError;

/// Queries the RPM database by invoking the `rpm` binary.
#[derive(Debug, Clone, Default)]
pub struct RpmClient;

impl RpmClient {
    pub fn new() -> Self {
        Self
    }

    fn run_rpm<I, S>(&self, args: I) -> Result<String, RpmError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = Command::new("rpm")
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|err| {
                if err.kind() == std::io::ErrorKind::NotFound {
                    RpmError::BinaryNotFound("rpm".into())
                } else {
                    RpmError::IoError(err)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            let exit_code = output.status.code().unwrap_or(-1);
            debug!(exit_code, %stderr, "rpm query failed");
            return Err(RpmError::QueryFailed { exit_code, stderr });
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl PackageDatabase for RpmClient {
    fn config_files(&self, package: Option<&str>) -> Result<Vec<PathBuf>, RpmError> {
        let output = match package {
            Some(name) => self.run_rpm(["-qc", name])?,
            None => self.run_rpm(["-qca"])?,
        };

        let files: Vec<PathBuf> = output
            .lines()
            .map(str::trim)
            // Packages without config files print a parenthesized notice.
            .filter(|line| !line.is_empty() && line.starts_with('/'))
            .map(PathBuf::from)
            .collect();
        debug!(package = package.unwrap_or("<all>"), count = files.len(),
               "listed config files");
        Ok(files)
    }

    fn owning_package(&self, path: &Path) -> Result<Option<String>, RpmError> {
        match self.run_rpm([
            OsStr::new("-qf"),
            path.as_os_str(),
            OsStr::new("--qf"),
            OsStr::new("%{name}"),
        ]) {
            Ok(name) => {
                let name = name.trim().to_string();
                if name.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(name))
                }
            }
            // "file ... is not owned by any package" exits non-zero; that
            // is an answer, not a failure.
            Err(RpmError::QueryFailed { exit_code, .. }) => {
                debug!(path = %path.display(), exit_code, "path not owned by any package");
                Ok(None)
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "rpm reverse lookup failed");
                Err(err)
            }
        }
    }
}
