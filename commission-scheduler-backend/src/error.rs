use std::path::PathBuf;

use commission_scheduler_database::DatabaseError;
use commission_scheduler_model::{ConfigurationError, RosterInconsistent};
use commission_scheduler_optimizer::OptimizerError;

/// Why a solve was not started. Nothing is recorded for any of these.
#[derive(thiserror::Error, Debug)]
pub enum SubmitError {
    #[error("a solve of this configuration is running or has failed")]
    AlreadyRunning,
    #[error("this configuration has already been solved")]
    AlreadySolved,
    #[error("roster is inconsistent: {0}")]
    RosterInconsistent(#[from] RosterInconsistent),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigurationError),
    #[error("the worker pool is shut down")]
    ShuttingDown,
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Failures of a single job. They end up as the error message of a failed
/// execution record.
#[derive(thiserror::Error, Debug)]
pub enum JobError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to start worker {executable}: {source}")]
    Spawn {
        executable: PathBuf,
        source: std::io::Error,
    },
    #[error("worker exited with {0} without a report")]
    WorkerCrashed(std::process::ExitStatus),
    #[error("join error: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("optimizer error: {0}")]
    Optimizer(#[from] OptimizerError),
    #[error("log tailing failed: {0}")]
    Tail(#[from] TailError),
}

impl JobError {
    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum TailError {
    #[error("cannot watch {path}: {source}")]
    Watch {
        path: PathBuf,
        source: notify::Error,
    },
    #[error("{0} does not name a file")]
    NotAFile(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("tailing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
