//! The unit of work a worker executes and what it reports back.
//!
//! A job directory holds `job.json`, written by the pool, the solver's
//! scratch files, `job.log` and finally `report.json`, written by the
//! worker.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use commission_scheduler_config::{EngineKind, SolverConfig};
use commission_scheduler_model::{Commission, Configuration, Roster, SolutionSlot};
use commission_scheduler_optimizer::{
    optimize, EmbeddedEngine, ExternalEngine, Optimization, OptimizerError, SolverDriver,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::JobError;

pub const JOB_FILE: &str = "job.json";
pub const REPORT_FILE: &str = "report.json";
pub const LOG_FILE: &str = "job.log";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveJob {
    pub job_id: Uuid,
    pub commission: Commission,
    /// Snapshot taken when the run lock was acquired.
    pub configuration: Configuration,
    pub solver: SolverConfig,
}

impl SolveJob {
    fn driver(&self, job_dir: &Path) -> SolverDriver {
        match self.solver.engine {
            EngineKind::Embedded => SolverDriver::new(EmbeddedEngine),
            EngineKind::External => SolverDriver::new(
                ExternalEngine::new(job_dir).with_executables(self.solver.executables.clone()),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerReport {
    pub success: bool,
    pub reached_optimality: bool,
    pub hit_time_limit: bool,
    pub error_message: Option<String>,
    pub slots: Vec<SolutionSlot>,
}

impl WorkerReport {
    #[must_use]
    pub fn failure(message: impl core::fmt::Display) -> Self {
        Self {
            success: false,
            reached_optimality: false,
            hit_time_limit: false,
            error_message: Some(message.to_string()),
            slots: Vec::new(),
        }
    }
}

impl From<Optimization> for WorkerReport {
    fn from(optimization: Optimization) -> Self {
        let success = optimization.status.has_assignment();
        let error_message = if success {
            None
        } else {
            Some(optimization.message.clone().unwrap_or_else(|| {
                format!("solver finished with status {}", optimization.status)
            }))
        };
        Self {
            success,
            reached_optimality: optimization.reached_optimality(),
            hit_time_limit: optimization.hit_time_limit(),
            error_message,
            slots: optimization.slots,
        }
    }
}

pub fn job_path(job_dir: &Path) -> PathBuf {
    job_dir.join(JOB_FILE)
}

pub fn report_path(job_dir: &Path) -> PathBuf {
    job_dir.join(REPORT_FILE)
}

pub fn log_path(job_dir: &Path) -> PathBuf {
    job_dir.join(LOG_FILE)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), JobError> {
    let json = serde_json::to_vec_pretty(value)?;
    std::fs::write(path, json).map_err(JobError::io(path))
}

pub fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, JobError> {
    let json = std::fs::read(path).map_err(JobError::io(path))?;
    Ok(serde_json::from_slice(&json)?)
}

fn log_line(log: &mut dyn Write, message: &str) {
    if let Err(error) = writeln!(log, "{} {message}", Utc::now().format("%Y-%m-%d %H:%M:%S")) {
        warn!(%error, "failed to write job log");
    }
}

/// Exports the roster, builds and solves the model and extracts the slots.
///
/// Progress lines and the solver's own output go to `log`. Solver scratch
/// files end up in `job_dir`.
pub fn run_job(
    job: &SolveJob,
    job_dir: &Path,
    log: &mut dyn Write,
) -> Result<WorkerReport, JobError> {
    let configuration = &job.configuration;
    log_line(
        log,
        &format!(
            "job {} for configuration {} (version {})",
            job.job_id,
            configuration.id,
            configuration.version_hash()
        ),
    );
    let roster = Roster::export(&job.commission).map_err(OptimizerError::from)?;
    log_line(
        log,
        &format!(
            "roster with {} candidates and {} professors, solving with {}",
            roster.rows.len(),
            roster.professors.len(),
            configuration.solver
        ),
    );

    let optimization = optimize(&roster, configuration, &job.driver(job_dir), log)?;
    log_line(
        log,
        &format!(
            "solver finished with status {}, {} slots used",
            optimization.status,
            optimization.slots.len()
        ),
    );
    info!(job_id = %job.job_id, status = %optimization.status, "job finished");
    Ok(optimization.into())
}

/// The worker process side: reads the job, runs it and writes the report.
/// Every failure after the job was read ends up in the report.
pub fn run_worker(
    job_file: &Path,
    report_file: &Path,
    log: &mut dyn Write,
) -> Result<(), JobError> {
    let job: SolveJob = read_json(job_file)?;
    let job_dir = job_file
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let report = run_job(&job, job_dir, log).unwrap_or_else(|error| {
        log_line(log, &format!("job failed: {error}"));
        WorkerReport::failure(error)
    });
    write_json(report_file, &report)
}

#[cfg(test)]
mod tests {
    use commission_scheduler_model::{
        Availability, Candidate, CandidateId, CommissionId, ConfigurationId, DegreeLevel,
        Professor, ProfessorId, Role,
    };

    use super::*;

    fn job(supervisor: Option<ProfessorId>) -> SolveJob {
        let mut configuration = Configuration::new(ConfigurationId(1), CommissionId(1));
        configuration.max_morning_slots = 1;
        configuration.max_afternoon_slots = 0;
        SolveJob {
            job_id: Uuid::new_v4(),
            commission: Commission {
                id: CommissionId(1),
                title: String::new(),
                candidates: vec![Candidate {
                    id: CandidateId(1),
                    name: "Ada".to_owned(),
                    surname: "Lovelace".to_owned(),
                    degree_level: DegreeLevel::Masters,
                    supervisor,
                    counter_supervisor: None,
                    assistant_supervisor: None,
                }],
                professors: vec![Professor {
                    id: ProfessorId(1),
                    name: "Alan".to_owned(),
                    surname: "Turing".to_owned(),
                    role: Role::Associate,
                    availability: Availability::Morning,
                }],
            },
            configuration,
            solver: SolverConfig {
                engine: EngineKind::Embedded,
                ..SolverConfig::default()
            },
        }
    }

    #[test]
    fn worker_writes_a_report() {
        let dir = tempfile::tempdir().unwrap();
        write_json(&job_path(dir.path()), &job(Some(ProfessorId(1)))).unwrap();

        let mut log = Vec::new();
        run_worker(&job_path(dir.path()), &report_path(dir.path()), &mut log).unwrap();

        let report: WorkerReport = read_json(&report_path(dir.path())).unwrap();
        assert!(report.success);
        assert!(report.reached_optimality);
        assert_eq!(report.slots.len(), 1);
        assert_eq!(report.slots[0].duration, 20);
        let log = String::from_utf8(log).unwrap();
        assert!(log.contains("1 slots used"), "{log}");
    }

    #[test]
    fn pipeline_errors_become_failed_reports() {
        let dir = tempfile::tempdir().unwrap();
        write_json(&job_path(dir.path()), &job(None)).unwrap();

        run_worker(&job_path(dir.path()), &report_path(dir.path()), &mut Vec::new()).unwrap();

        let report: WorkerReport = read_json(&report_path(dir.path())).unwrap();
        assert!(!report.success);
        assert!(report.slots.is_empty());
        assert!(report
            .error_message
            .unwrap()
            .contains("candidate 1 has no supervisor"));
    }

    #[test]
    fn missing_job_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            run_worker(&job_path(dir.path()), &report_path(dir.path()), &mut Vec::new()),
            Err(JobError::Io { .. })
        ));
    }
}
