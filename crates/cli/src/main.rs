//! rpmconf command-line tool.
//!
//! Reconciles `.rpmnew`, `.rpmsave` and `.rpmorig` variants of
//! configuration files: interactively per package, in a non-interactive
//! diff-audit mode, or by scanning the filesystem for orphaned variants.

mod style;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use rpmconf_core::config::{FileConfig, RunConfig, DEFAULT_CONFIG_PATH};
use rpmconf_core::errors::{CoreError, MergeError};
use rpmconf_core::merge::MergeFrontend;
use rpmconf_core::rpmdb::RpmClient;
use rpmconf_core::{FileTransfer, OrphanScanner, PackageWalker, StdinPrompter};

// Distinct exit statuses for merge misconfiguration, matching the
// documented contract: 2 = no frontend selected, 4 = tool not found.
const EXIT_NO_FRONTEND: u8 = 2;
const EXIT_TOOL_NOT_FOUND: u8 = 4;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Handle rpmnew, rpmsave and rpmorig configuration file variants.
#[derive(Parser, Debug)]
#[command(name = "rpmconf", version, about)]
struct Cli {
    /// Check configuration files of all installed packages.
    #[arg(short, long)]
    all: bool,

    /// Check only configuration files of the given package (repeatable).
    #[arg(short = 'o', long = "owner", value_name = "PACKAGE")]
    packages: Vec<String>,

    /// Find and delete orphaned variant files.
    #[arg(short, long)]
    clean: bool,

    /// Non-interactive diff mode. Useful to audit configs.
    #[arg(short, long)]
    diff: bool,

    /// Dry run. Just show which files would be deleted or replaced.
    #[arg(long)]
    dry_run: bool,

    /// Display SELinux context of old and new file.
    #[arg(short = 'Z', long)]
    selinux: bool,

    /// Define which frontend should be used for merging.
    #[arg(short, long, value_name = "TOOL")]
    frontend: Option<String>,

    /// Path to the TOML configuration file.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .without_time()
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", style::error(&format!("{:#}", e)));
            exit_code_for(&e)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    if !cli.all && cli.packages.is_empty() && !cli.clean {
        anyhow::bail!("nothing to do: use --all, --owner <PACKAGE> or --clean");
    }

    let frontend = cli
        .frontend
        .as_deref()
        .map(str::parse::<MergeFrontend>)
        .transpose()
        .map_err(CoreError::Config)?;

    let file_config =
        FileConfig::load(&cli.config).context("failed to load configuration file")?;
    let config = RunConfig::from_parts(
        file_config,
        // --all means "no package filter".
        if cli.all { vec![] } else { cli.packages.clone() },
        cli.clean,
        cli.dry_run,
        cli.selinux,
        cli.diff,
        frontend,
    )
    .map_err(CoreError::Config)?;

    if cli.dry_run {
        println!("{}", style::warn("Dry run: no files will be changed."));
    }

    let db = RpmClient::new();
    let transfer = FileTransfer::new(config.dry_run);
    let mut prompter = StdinPrompter;

    if cli.all || !config.packages.is_empty() {
        PackageWalker::new(&config, &db, &transfer).run(&mut prompter)?;
    }

    if config.clean {
        OrphanScanner::new(&config, &db, &transfer).run(&mut prompter)?;
    }

    Ok(())
}

/// Map merge misconfiguration to its documented exit statuses; anything
/// else is a generic failure.
fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<CoreError>() {
        Some(CoreError::Merge(MergeError::NoFrontend)) => ExitCode::from(EXIT_NO_FRONTEND),
        Some(CoreError::Merge(MergeError::ToolNotFound(_))) => {
            ExitCode::from(EXIT_TOOL_NOT_FOUND)
        }
        _ => ExitCode::FAILURE,
    }
}
