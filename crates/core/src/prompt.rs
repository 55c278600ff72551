//! Line-oriented prompting.
//!
//! The resolution loop and the orphan scanner ask the administrator
//! questions through the [`Prompter`] trait, which keeps the engine
//! testable and lets unattended runs feed canned answers.

use std::io::{self, BufRead, Write};

/// A source of answers to interactive questions.
pub trait Prompter {
    /// Print `question` (no trailing newline is added) and read one line.
    ///
    /// Returns `Ok(None)` at end of input; callers treat that as an
    /// explicit skip, never as an error.
    fn ask(&mut self, question: &str) -> io::Result<Option<String>>;
}

/// Prompter backed by the controlling terminal.
///
/// Pending buffered input is discarded before each question so a stray
/// keypress made while an external tool was running cannot answer a
/// prompt by accident.
#[derive(Debug, Default)]
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn ask(&mut self, question: &str) -> io::Result<Option<String>> {
        flush_pending_input();
        print!("{question}");
        io::stdout().flush()?;

        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
    }
}

#[cfg(unix)]
fn flush_pending_input() {
    // tcflush fails with ENOTTY when stdin is a pipe; stale input cannot
    // accumulate there, so the failure is ignored.
    unsafe {
        libc::tcflush(libc::STDIN_FILENO, libc::TCIOFLUSH);
    }
}

#[cfg(not(unix))]
fn flush_pending_input() {}

/// Prompter that replays a fixed list of answers, then reports end of
/// input. Used by tests and by unattended runs driven from scripts.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: std::collections::VecDeque<String>,
    /// Number of questions asked so far.
    pub asked: usize,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: 0,
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&mut self, _question: &str) -> io::Result<Option<String>> {
        self.asked += 1;
        Ok(self.answers.pop_front())
    }
}
