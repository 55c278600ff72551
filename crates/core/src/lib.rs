//! rpmconf core library.
//!
//! This crate provides the decision logic for reconciling configuration
//! file variants an RPM transaction leaves behind: variant location, file
//! transfer, diff presentation, merge tool dispatch, the interactive
//! resolution state machine, the per-package walk, and the orphan scanner.

pub mod config;
pub mod diff;
pub mod errors;
pub mod merge;
pub mod orphan;
pub mod prompt;
pub mod resolve;
pub mod rpmdb;
pub mod transfer;
pub mod variant;
pub mod walker;

// Re-exports for convenience.
pub use config::{FileConfig, RunConfig};
pub use errors::CoreError;
pub use merge::MergeFrontend;
pub use orphan::OrphanScanner;
pub use prompt::{Prompter, StdinPrompter};
pub use transfer::FileTransfer;
pub use walker::PackageWalker;
