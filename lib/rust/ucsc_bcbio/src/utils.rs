use anyhow::{anyhow, ensure, Result};
use itertools::Itertools;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// The message of an io::Error without its trailing " (os error N)".
fn describe_io_error(err: &std::io::Error) -> String {
    let message = err.to_string();
    match message.find(" (os error ") {
        Some(end) => message[..end].to_string(),
        None => message,
    }
}

/// Print an error and its causes to stderr.
pub fn print_error_chain(err: &anyhow::Error) {
    let message = match (err.downcast_ref::<std::io::Error>(), err.chain().len()) {
        (Some(io_err), 1) => describe_io_error(io_err),
        _ => err.chain().join("\n\tCaused by: "),
    };
    eprintln!("ERROR: {message}");
}

/// A command-line path to a file or directory that must already exist.
/// It is stored fully qualified, since bcbio runs from a different directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingPath(PathBuf);

impl FromStr for ExistingPath {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<ExistingPath> {
        Path::new(s)
            .canonicalize()
            .map(ExistingPath)
            .map_err(|err| anyhow!("{s}: {}", describe_io_error(&err)))
    }
}

impl From<ExistingPath> for PathBuf {
    fn from(path: ExistingPath) -> PathBuf {
        path.0
    }
}

impl Deref for ExistingPath {
    type Target = Path;

    fn deref(&self) -> &Path {
        &self.0
    }
}

/// Max allowed length of the --run_name argument
const MAX_RUN_NAME_LEN: usize = 64;

/// Parse and validate a run name, for use with Clap's value_parser.
/// The run name ends up in sample descriptions and batch names, so it is
/// restricted to letters, digits, underscores, and dashes.
pub fn validate_run_name(name: &str) -> Result<String> {
    ensure!(!name.is_empty(), "must not be empty.");
    ensure!(
        name.len() <= MAX_RUN_NAME_LEN,
        "must be {MAX_RUN_NAME_LEN} characters or less."
    );
    ensure!(
        name.chars()
            .all(|c| matches!(c, '0'..='9' | 'A'..='Z' | 'a'..='z' | '_' | '-')),
        "must contain only letters, digits, underscores, and dashes."
    );
    Ok(String::from(name))
}

/// Resolve `path` against `base` unless it is already absolute.
pub fn absolute_from(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// True if `dir` exists and contains at least one entry.
pub fn is_populated(dir: &Path) -> std::io::Result<bool> {
    if !dir.is_dir() {
        return Ok(false);
    }
    Ok(std::fs::read_dir(dir)?.next().is_some())
}
