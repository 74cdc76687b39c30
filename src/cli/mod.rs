//! CLI support for noteql
//!
//! Provides programmatic access to the `noteql` subcommands so other tools
//! can embed them without spawning a process.

mod check;
mod render;
mod run;

pub use check::{CheckOptions, CheckResult, execute_check};
pub use render::{RenderOptions, execute_render};
pub use run::{RunOptions, RunOutput, RunReport, execute_run};

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::{
    config::{ConfigError, EngineConfig},
    error::{QueryError, SyntaxError},
    note::NoteCollection,
};

/// Errors that can occur during CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    #[error("{0}")]
    Query(#[from] QueryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid notes file {path}: {source}")]
    Notes {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("No document provided. Pass a file or pipe markdown to stdin.")]
    NoInput,
}

/// Reads a JSON array of notes.
pub fn load_notes(path: impl AsRef<Path>) -> Result<NoteCollection, CliError> {
    let path = path.as_ref();
    let text = read_file(path)?;
    NoteCollection::from_json(&text).map_err(|source| CliError::Notes {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads the engine config, or the defaults when no file is given.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig, CliError> {
    match path {
        Some(path) => Ok(EngineConfig::from_json_file(path)?),
        None => Ok(EngineConfig::default()),
    }
}

pub fn read_file(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}
