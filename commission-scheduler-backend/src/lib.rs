//! Runs commission solves as background jobs.
//!
//! The [`Orchestrator`] takes the run lock of a configuration and queues the
//! solve on a [`WorkerPool`]. Each job runs build, solve and extract in a
//! worker (a child process with [`ProcessRunner`]) while the [`LogTailer`]
//! follows its log. The outcome is recorded in the [`Store`].
//!
//! [`Store`]: commission_scheduler_database::Store

pub mod error;
pub mod job;
pub mod log_tailer;
pub mod orchestrator;
pub mod worker_pool;

pub use crate::error::{JobError, SubmitError, TailError};
pub use crate::job::{run_job, run_worker, SolveJob, WorkerReport};
pub use crate::log_tailer::{LogCapture, LogObserver, LogTailer, TailSubscription, TracingObserver};
pub use crate::orchestrator::{CandidateSummary, Orchestrator, ProfessorSummary, SlotView, Submission};
pub use crate::worker_pool::{
    execute_job, InlineRunner, JobOutcome, JobRunner, ProcessRunner, Reservation, WorkerPool,
};
