use core::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio_util::task::task_tracker::TaskTrackerToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info};

use crate::error::JobError;
use crate::job::{job_path, log_path, read_json, report_path, run_worker, SolveJob, WorkerReport};
use crate::log_tailer::{LogCapture, LogTailer, TracingObserver};

/// Executes a prepared job directory. `job.json` exists when this is called
/// and all output has to go to `job.log`.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self, job_dir: &Path) -> Result<WorkerReport, JobError>;
}

fn open_log(job_dir: &Path) -> Result<std::fs::File, JobError> {
    let path = log_path(job_dir);
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(JobError::io(path))
}

/// Runs every job in a child process, `<executable> worker --job … --report …`.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    executable: PathBuf,
}

impl ProcessRunner {
    #[must_use]
    pub const fn new(executable: PathBuf) -> Self {
        Self { executable }
    }

    /// Re-executes the running binary.
    pub fn current() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?))
    }
}

#[async_trait]
impl JobRunner for ProcessRunner {
    async fn run(&self, job_dir: &Path) -> Result<WorkerReport, JobError> {
        let stdout = open_log(job_dir)?;
        let stderr = stdout
            .try_clone()
            .map_err(JobError::io(log_path(job_dir)))?;
        let report = report_path(job_dir);

        let status = Command::new(&self.executable)
            .arg("worker")
            .arg("--job")
            .arg(job_path(job_dir))
            .arg("--report")
            .arg(&report)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|source| JobError::Spawn {
                executable: self.executable.clone(),
                source,
            })?;
        debug!(job_dir = %job_dir.display(), exit_code = ?status.code(), "worker exited");

        match read_json(&report) {
            Err(JobError::Io { .. }) if !status.success() => Err(JobError::WorkerCrashed(status)),
            result => result,
        }
    }
}

/// Runs jobs on the blocking thread pool of the current process.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineRunner;

#[async_trait]
impl JobRunner for InlineRunner {
    async fn run(&self, job_dir: &Path) -> Result<WorkerReport, JobError> {
        let job_dir = job_dir.to_owned();
        tokio::task::spawn_blocking(move || {
            let mut log = open_log(&job_dir)?;
            run_worker(&job_path(&job_dir), &report_path(&job_dir), &mut log)?;
            read_json(&report_path(&job_dir))
        })
        .await?
    }
}

/// What a finished job hands back, successful or not.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub report: WorkerReport,
    pub log: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

async fn prepare(job_dir: &Path, job: &SolveJob) -> Result<(), JobError> {
    tokio::fs::create_dir_all(job_dir)
        .await
        .map_err(JobError::io(job_dir))?;
    let path = job_path(job_dir);
    tokio::fs::write(&path, serde_json::to_vec_pretty(job)?)
        .await
        .map_err(JobError::io(path))?;
    let log = log_path(job_dir);
    tokio::fs::File::create(&log)
        .await
        .map_err(JobError::io(log))?;
    Ok(())
}

async fn run_tailed(
    runner: &dyn JobRunner,
    job_dir: &Path,
    job: &SolveJob,
    capture: LogCapture,
) -> Result<WorkerReport, JobError> {
    prepare(job_dir, job).await?;
    let tail = LogTailer::watch(
        &log_path(job_dir),
        vec![Box::new(capture), Box::new(TracingObserver::new(job.job_id))],
    )?;
    let result = runner.run(job_dir).await;
    let stopped = tail.stop().await;
    let report = result?;
    stopped?;
    Ok(report)
}

/// Runs one job in `work_dir/<job id>` while tailing its log. Never fails:
/// every error becomes a failed report carrying the error text.
pub async fn execute_job(runner: &dyn JobRunner, work_dir: &Path, job: &SolveJob) -> JobOutcome {
    let start_time = Utc::now();
    let job_dir = work_dir.join(job.job_id.to_string());
    let capture = LogCapture::new();
    info!(job_id = %job.job_id, job_dir = %job_dir.display(), "job started");

    let report = run_tailed(runner, &job_dir, job, capture.clone())
        .await
        .unwrap_or_else(|error| {
            error!(job_id = %job.job_id, %error, "job failed");
            WorkerReport::failure(error)
        });
    JobOutcome {
        report,
        log: capture.text(),
        start_time,
        end_time: Utc::now(),
    }
}

/// A place in a [`WorkerPool`], see [`WorkerPool::reserve`].
pub struct Reservation(TaskTrackerToken);

/// At most `max_workers` jobs run at once, the rest wait for a permit.
pub struct WorkerPool {
    work_dir: PathBuf,
    runner: Arc<dyn JobRunner>,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
}

impl WorkerPool {
    pub fn new(work_dir: PathBuf, max_workers: usize, runner: impl JobRunner + 'static) -> Self {
        Self {
            work_dir,
            runner: Arc::new(runner),
            permits: Arc::new(Semaphore::new(max_workers.max(1))),
            tracker: TaskTracker::new(),
        }
    }

    /// Holds a place for a job that is still being prepared, `None` once the
    /// pool is closed.
    ///
    /// [`Self::shutdown`] waits for outstanding reservations, so a job whose
    /// reservation was taken before the pool closed is still run and finished.
    #[must_use]
    pub fn reserve(&self) -> Option<Reservation> {
        // the token is counted before the check so `shutdown` cannot miss it
        let token = self.tracker.token();
        (!self.tracker.is_closed()).then_some(Reservation(token))
    }

    /// Queues `job` and returns immediately. `finish` receives the outcome.
    pub fn submit<F, Fut>(&self, reservation: Reservation, job: SolveJob, finish: F)
    where
        F: FnOnce(JobOutcome) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let runner = Arc::clone(&self.runner);
        let permits = Arc::clone(&self.permits);
        let work_dir = self.work_dir.clone();
        self.tracker.spawn(async move {
            let _reservation = reservation;
            let outcome = match permits.acquire_owned().await {
                Ok(_permit) => execute_job(runner.as_ref(), &work_dir, &job).await,
                Err(closed) => {
                    let now = Utc::now();
                    JobOutcome {
                        report: WorkerReport::failure(closed),
                        log: String::new(),
                        start_time: now,
                        end_time: now,
                    }
                }
            };
            finish(outcome).await;
        });
    }

    /// Stops accepting jobs and waits for the queued and running ones.
    pub async fn shutdown(&self) {
        self.tracker.close();
        info!(jobs = self.tracker.len(), "waiting for jobs to finish");
        self.tracker.wait().await;
    }
}
