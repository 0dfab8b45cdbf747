//! Run configuration.
//!
//! Options are gathered once (CLI flags, with interactive prompts filling
//! the gaps), validated, and then passed immutably into every component.
//! Nothing in the engine reads ambient global state.

use crate::console::Console;
use anyhow::Result;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("connection string must contain AccountName= and AccountKey=")]
    InvalidConnectionString,
    #[error("{0} is required in silent mode")]
    MissingValue(&'static str),
    #[error("thread count must be at least 1")]
    InvalidThreads,
}

/// Validated options for one sync run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub connection_string: String,
    pub container: String,
    pub local_path: PathBuf,
    pub threads: usize,
    pub silence: bool,
    pub keep_old: bool,
    pub compare_hash: bool,
}

/// Raw values as collected from the command line, before prompting and
/// validation.
#[derive(Debug, Clone, Default)]
pub struct RawOptions {
    pub connection_string: Option<String>,
    pub container: Option<String>,
    pub local_path: Option<PathBuf>,
    pub threads: usize,
    pub silence: bool,
    pub keep_old: bool,
    pub compare_hash: bool,
}

impl SyncOptions {
    /// Fill missing required values by prompting (fatal in silent mode),
    /// then validate the result.
    pub fn resolve(raw: RawOptions, console: &dyn Console) -> Result<Self> {
        let connection_string = required(
            raw.connection_string,
            raw.silence,
            "connection string",
            "Enter Azure Storage Account connection string",
            console,
        )?;
        let container = required(
            raw.container,
            raw.silence,
            "container name",
            "Enter container name",
            console,
        )?;
        let local_path = match raw.local_path {
            Some(p) => p,
            None if raw.silence => return Err(OptionsError::MissingValue("local path").into()),
            None => PathBuf::from(console.ask("Enter local path")),
        };

        if !connection_string.contains("AccountName=")
            || !connection_string.contains("AccountKey=")
        {
            return Err(OptionsError::InvalidConnectionString.into());
        }

        if raw.threads < 1 {
            return Err(OptionsError::InvalidThreads.into());
        }

        let local_path = if local_path.is_absolute() {
            local_path
        } else {
            std::env::current_dir()?.join(local_path)
        };

        Ok(Self {
            connection_string,
            container,
            local_path,
            threads: raw.threads,
            silence: raw.silence,
            keep_old: raw.keep_old,
            compare_hash: raw.compare_hash,
        })
    }
}

fn required(
    value: Option<String>,
    silence: bool,
    what: &'static str,
    prompt: &str,
    console: &dyn Console,
) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ if silence => Err(OptionsError::MissingValue(what).into()),
        _ => Ok(console.ask(prompt)),
    }
}
