use std::io;
use std::path::PathBuf;

use commission_scheduler_model::{ConfigurationError, RosterInconsistent, UnknownSolver};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OptimizerError {
    #[error("roster is inconsistent: {0}")]
    RosterInconsistent(#[from] RosterInconsistent),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigurationError),
    #[error(transparent)]
    UnknownSolver(#[from] UnknownSolver),
    #[error("failed to run solver {executable}: {source}")]
    Spawn {
        executable: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("solver file i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("malformed solution file: {0}")]
    MalformedSolution(String),
}
