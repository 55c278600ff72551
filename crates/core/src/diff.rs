//! Unified diff rendering and paging.
//!
//! Text files are diffed in-process with `diffy`; files that do not decode
//! as UTF-8 fall back to the external `diff -u` utility. The rendered text
//! is piped through a pager so long diffs do not scroll off-screen.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use chrono::{DateTime, Local};
use tracing::debug;

use crate::errors::DiffError;

/// Render the unified diff between `from` and `to` and page it.
pub fn show(from: &Path, to: &Path) -> Result<(), DiffError> {
    let text = render(from, to)?;
    page(&text);
    Ok(())
}

/// Produce unified-diff text between two files.
///
/// Headers carry each file's path and last-modification timestamp. When
/// either file is not valid UTF-8 the external `diff -u` output is
/// returned instead.
pub fn render(from: &Path, to: &Path) -> Result<String, DiffError> {
    let from_bytes = read(from)?;
    let to_bytes = read(to)?;

    match (String::from_utf8(from_bytes), String::from_utf8(to_bytes)) {
        (Ok(from_text), Ok(to_text)) => {
            Ok(unified(from, to, &from_text, &to_text))
        }
        _ => {
            debug!(from = %from.display(), to = %to.display(),
                   "content not text-decodable, falling back to external diff");
            external_diff(from, to)
        }
    }
}

fn read(path: &Path) -> Result<Vec<u8>, DiffError> {
    fs::read(path).map_err(|source| DiffError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn unified(from: &Path, to: &Path, from_text: &str, to_text: &str) -> String {
    let patch = diffy::create_patch(from_text, to_text);
    // diffy renders fixed "--- original" / "+++ modified" headers; replace
    // them with the real paths and mtimes.
    let body: String = patch
        .to_string()
        .lines()
        .skip(2)
        .flat_map(|line| [line, "\n"])
        .collect();
    format!(
        "--- {}\t{}\n+++ {}\t{}\n{}",
        from.display(),
        mtime_stamp(from),
        to.display(),
        mtime_stamp(to),
        body,
    )
}

/// ctime-style timestamp of a file's last modification, or a placeholder
/// when the metadata cannot be read.
fn mtime_stamp(path: &Path) -> String {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map(|mtime| {
            DateTime::<Local>::from(mtime)
                .format("%a %b %e %H:%M:%S %Y")
                .to_string()
        })
        .unwrap_or_else(|_| "?".to_string())
}

/// Line-diff fallback for binary content: `diff -u from to`.
///
/// `diff` exits 1 when the files differ; only statuses above 1 indicate
/// trouble.
fn external_diff(from: &Path, to: &Path) -> Result<String, DiffError> {
    let output = Command::new("diff")
        .arg("-u")
        .arg(from)
        .arg(to)
        .stderr(Stdio::null())
        .output()
        .map_err(DiffError::External)?;

    match output.status.code() {
        Some(0) | Some(1) => Ok(String::from_utf8_lossy(&output.stdout).into_owned()),
        code => Err(DiffError::ExternalStatus(code.unwrap_or(-1))),
    }
}

/// Send `text` through a pager (`$PAGER`, defaulting to `less`).
///
/// Falls back to plain stdout when no pager can be spawned. The pager
/// exiting before consuming everything (the user quit early) is fine.
pub fn page(text: &str) {
    let pager = std::env::var("PAGER").unwrap_or_else(|_| "less".to_string());
    let mut parts = pager.split_whitespace();
    let Some(program) = parts.next() else {
        print!("{text}");
        return;
    };

    let child = Command::new(program)
        .args(parts)
        .stdin(Stdio::piped())
        .spawn();

    match child {
        Ok(mut child) => {
            if let Some(mut stdin) = child.stdin.take() {
                let _ = stdin.write_all(text.as_bytes());
            }
            let _ = child.wait();
        }
        Err(err) => {
            debug!(%err, pager = program, "pager unavailable, printing directly");
            print!("{text}");
        }
    }
}
