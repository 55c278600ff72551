//! Error types for the rpmconf core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.
//!
//! Two merge errors are special: [`MergeError::NoFrontend`] and
//! [`MergeError::ToolNotFound`] indicate a misconfiguration that would
//! recur for every remaining file, so they abort the whole run (the CLI
//! maps them to distinct exit statuses). Everything else is fatal only
//! for the file it occurred on.

use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Rpm(#[from] RpmError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Diff(#[from] DiffError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Package database errors
// ---------------------------------------------------------------------------

/// Errors from querying the RPM database via the `rpm` CLI.
#[derive(Debug, Error)]
pub enum RpmError {
    /// The `rpm` binary was not found on `$PATH`.
    #[error("rpm binary not found: {0}")]
    BinaryNotFound(String),

    /// An `rpm` query exited with a non-zero status.
    #[error("rpm query failed (exit {exit_code}): {stderr}")]
    QueryFailed { exit_code: i32, stderr: String },

    /// Generic I/O wrapper.
    #[error("rpm I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// File transfer errors
// ---------------------------------------------------------------------------

/// Errors from removing or overwriting configuration files.
#[derive(Debug, Error)]
pub enum TransferError {
    /// A file could not be deleted.
    #[error("failed to remove '{path}': {source}")]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A file could not be copied over its destination.
    #[error("failed to copy '{src}' to '{dst}': {source}")]
    Copy {
        src: PathBuf,
        dst: PathBuf,
        source: std::io::Error,
    },

    /// A symlink could not be recreated at the destination.
    #[error("failed to recreate symlink at '{dst}': {source}")]
    Symlink {
        dst: PathBuf,
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Diff errors
// ---------------------------------------------------------------------------

/// Errors from rendering or paging diffs.
#[derive(Debug, Error)]
pub enum DiffError {
    /// One of the two files could not be read.
    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The external `diff` fallback could not be run.
    #[error("external diff failed: {0}")]
    External(std::io::Error),

    /// The external `diff` fallback reported trouble (exit status > 1).
    #[error("external diff exited with status {0}")]
    ExternalStatus(i32),
}

// ---------------------------------------------------------------------------
// Merge tool errors
// ---------------------------------------------------------------------------

/// Errors from dispatching an external merge tool.
#[derive(Debug, Error)]
pub enum MergeError {
    /// No merge frontend is configured and `$MERGE` is not set.
    #[error("no merge frontend selected")]
    NoFrontend,

    /// The merge tool executable could not be located or started.
    #[error("merge tool not found: {0}")]
    ToolNotFound(String),

    /// Post-merge cleanup failed.
    #[error(transparent)]
    Cleanup(#[from] TransferError),

    /// Generic I/O wrapper.
    #[error("merge tool I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl MergeError {
    /// `true` for misconfigurations that would recur on every file and
    /// therefore terminate the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::NoFrontend | Self::ToolNotFound(_))
    }
}

// ---------------------------------------------------------------------------
// Resolution errors
// ---------------------------------------------------------------------------

/// Errors from the interactive resolution loop for one (base, variant) pair.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The pre-prompt `ls` listing could not be produced.
    #[error("failed to list files: {0}")]
    Listing(std::io::Error),

    /// Reading the administrator's answer failed.
    #[error("failed to read input: {0}")]
    Input(std::io::Error),

    /// One of the pair's files could not be read for comparison.
    #[error("failed to read '{path}': {source}")]
    Compare {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Diff(#[from] DiffError),

    #[error(transparent)]
    Merge(#[from] MergeError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from loading the optional configuration file or CLI values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// An unrecognized merge frontend name.
    #[error(
        "unknown merge frontend '{0}' (expected vimdiff, gvimdiff, meld, diffuse, kdiff3 or env)"
    )]
    UnknownFrontend(String),

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
