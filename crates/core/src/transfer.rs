//! The "replace A with B" and "delete" primitives.
//!
//! All filesystem mutation in the reconciliation engine goes through
//! [`FileTransfer`], which carries the run's dry-run flag. In dry-run mode
//! nothing is touched; the shell-equivalent command is printed instead so
//! the administrator can audit what a real run would do.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::errors::TransferError;

/// Performs (or, in dry-run mode, reports) file removal and replacement.
#[derive(Debug, Clone, Copy)]
pub struct FileTransfer {
    dry_run: bool,
}

impl FileTransfer {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Delete `path`. In dry-run mode only the intended action is printed.
    pub fn remove(&self, path: &Path) -> Result<(), TransferError> {
        if self.dry_run {
            println!("rm {}", path.display());
            return Ok(());
        }
        debug!(path = %path.display(), "removing file");
        fs::remove_file(path).map_err(|source| TransferError::Remove {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Make `dst` a copy of `src`, then remove `src`.
    ///
    /// Symlinks are preserved structurally: if `src` is a symlink, `dst`
    /// becomes a symlink with the identical target rather than a copy of
    /// the target's content. In dry-run mode only the intended copy is
    /// printed.
    pub fn overwrite(&self, src: &Path, dst: &Path) -> Result<(), TransferError> {
        if self.dry_run {
            println!("cp --no-dereference {} {}", src.display(), dst.display());
            return Ok(());
        }
        copy_preserving(src, dst)?;
        self.remove(src)
    }
}

/// Copy `src` to `dst`, keeping symlinks as symlinks and preserving file
/// permissions for regular files.
fn copy_preserving(src: &Path, dst: &Path) -> Result<(), TransferError> {
    let meta = fs::symlink_metadata(src).map_err(|source| TransferError::Copy {
        src: src.to_path_buf(),
        dst: dst.to_path_buf(),
        source,
    })?;

    if meta.file_type().is_symlink() {
        let target = fs::read_link(src).map_err(|source| TransferError::Copy {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
            source,
        })?;
        debug!(src = %src.display(), dst = %dst.display(), target = %target.display(),
               "recreating symlink");
        // The destination usually exists (it is the installed config file),
        // so replace it before linking.
        if fs::symlink_metadata(dst).is_ok() {
            fs::remove_file(dst).map_err(|source| TransferError::Symlink {
                dst: dst.to_path_buf(),
                source,
            })?;
        }
        make_symlink(&target, dst).map_err(|source| TransferError::Symlink {
            dst: dst.to_path_buf(),
            source,
        })
    } else {
        debug!(src = %src.display(), dst = %dst.display(), "copying file");
        // fs::copy preserves permissions; timestamps are best-effort only.
        fs::copy(src, dst)
            .map(|_| ())
            .map_err(|source| TransferError::Copy {
                src: src.to_path_buf(),
                dst: dst.to_path_buf(),
                source,
            })
    }
}

#[cfg(unix)]
fn make_symlink(target: &Path, dst: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, dst)
}

#[cfg(windows)]
fn make_symlink(target: &Path, dst: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_file(target, dst)
}
