//! Guards solves of a configuration and records their outcome.
//!
//! A configuration moves from `Idle` to `Running` when a solve is submitted
//! and ends in `Completed` or `Failed` once the worker is done. Submitting
//! again is refused in every state but `Idle`, so each configuration is
//! solved at most once.

use std::sync::Arc;

use commission_scheduler_config::SolverConfig;
use commission_scheduler_database::{DatabaseError, LockAttempt, Store};
use commission_scheduler_model::{
    CandidateId, Commission, CommissionId, Configuration, ConfigurationId, DegreeLevel,
    ExecutionRecord, ProfessorId, Roster, RunState, SolutionSlot,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::SubmitError;
use crate::job::SolveJob;
use crate::worker_pool::{JobOutcome, WorkerPool};

/// Handed out as soon as a solve is queued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub version_hash: String,
    pub job_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfessorSummary {
    pub id: ProfessorId,
    pub full_name: String,
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub id: CandidateId,
    pub full_name: String,
    pub degree_level: DegreeLevel,
    pub duration: u32,
}

/// A solution slot with its members resolved for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotView {
    pub order: u32,
    pub morning: bool,
    pub duration: u32,
    pub version_hash: String,
    pub professors: Vec<ProfessorSummary>,
    pub candidates: Vec<CandidateSummary>,
}

impl SlotView {
    fn new(slot: SolutionSlot, commission: &Commission) -> Self {
        let professors = slot
            .professors
            .iter()
            .map(|id| {
                commission.professor(*id).map_or_else(
                    || ProfessorSummary {
                        id: *id,
                        full_name: String::new(),
                        role: None,
                    },
                    |professor| ProfessorSummary {
                        id: *id,
                        full_name: professor.full_name(),
                        role: professor.role.abbreviation().map(ToOwned::to_owned),
                    },
                )
            })
            .collect();
        let candidates = slot
            .candidates
            .iter()
            .filter_map(|id| commission.candidates.iter().find(|candidate| candidate.id == *id))
            .map(|candidate| CandidateSummary {
                id: candidate.id,
                full_name: candidate.full_name(),
                degree_level: candidate.degree_level,
                duration: candidate.duration(),
            })
            .collect();
        Self {
            order: slot.order,
            morning: slot.morning,
            duration: slot.duration,
            version_hash: slot.version_hash,
            professors,
            candidates,
        }
    }
}

const fn conflict(state: RunState) -> SubmitError {
    match state {
        RunState::Completed => SubmitError::AlreadySolved,
        RunState::Idle | RunState::Running | RunState::Failed => SubmitError::AlreadyRunning,
    }
}

fn locked(error: DatabaseError) -> SubmitError {
    match error {
        DatabaseError::Locked { state, .. } => conflict(state),
        error => error.into(),
    }
}

pub struct Orchestrator {
    store: Arc<dyn Store>,
    pool: WorkerPool,
    solver: SolverConfig,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn Store>, pool: WorkerPool, solver: SolverConfig) -> Self {
        Self {
            store,
            pool,
            solver,
        }
    }

    /// Queues a solve of `configuration_id` and returns without waiting for it.
    ///
    /// Roster and configuration problems are reported before the
    /// configuration is locked and leave it `Idle`.
    pub async fn submit_solve(
        &self,
        commission_id: CommissionId,
        configuration_id: ConfigurationId,
    ) -> Result<Submission, SubmitError> {
        let reservation = self.pool.reserve().ok_or(SubmitError::ShuttingDown)?;
        let configuration = self.store.configuration(configuration_id).await?;
        if configuration.run_state != RunState::Idle {
            return Err(conflict(configuration.run_state));
        }
        let commission = self.store.commission(commission_id).await?;
        configuration.validate()?;
        Roster::export(&commission)?;

        let configuration = match self.store.acquire_run_lock(configuration_id).await? {
            LockAttempt::Acquired(configuration) => configuration,
            LockAttempt::Held(state) => return Err(conflict(state)),
        };
        let submission = Submission {
            version_hash: configuration.version_hash(),
            job_id: Uuid::new_v4(),
        };
        info!(
            %configuration_id,
            job_id = %submission.job_id,
            version_hash = %submission.version_hash,
            "solve submitted"
        );

        let job = SolveJob {
            job_id: submission.job_id,
            commission,
            configuration,
            solver: self.solver.clone(),
        };
        let store = Arc::clone(&self.store);
        let queued = submission.clone();
        self.pool.submit(reservation, job, move |outcome| async move {
            record(store.as_ref(), configuration_id, queued, outcome).await;
        });
        Ok(submission)
    }

    /// Stores new solver parameters. Only an `Idle` configuration can change.
    pub async fn update_configuration(
        &self,
        mut configuration: Configuration,
    ) -> Result<(), SubmitError> {
        configuration.validate()?;
        configuration.clear_offline_bounds();
        self.store
            .update_configuration(&configuration)
            .await
            .map_err(locked)
    }

    pub async fn solution(
        &self,
        commission_id: CommissionId,
        configuration_id: ConfigurationId,
    ) -> Result<Vec<SlotView>, SubmitError> {
        let commission = self.store.commission(commission_id).await?;
        Ok(self
            .store
            .solution_slots(configuration_id)
            .await?
            .into_iter()
            .map(|slot| SlotView::new(slot, &commission))
            .collect())
    }

    pub async fn executions(
        &self,
        configuration_id: ConfigurationId,
    ) -> Result<Vec<ExecutionRecord>, SubmitError> {
        Ok(self.store.execution_records(configuration_id).await?)
    }

    pub async fn run_state(
        &self,
        configuration_id: ConfigurationId,
    ) -> Result<RunState, SubmitError> {
        Ok(self.store.run_state(configuration_id).await?)
    }

    /// Refuses new submissions and waits until every queued solve is recorded.
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }
}

async fn record(
    store: &dyn Store,
    configuration_id: ConfigurationId,
    submission: Submission,
    outcome: JobOutcome,
) {
    let JobOutcome {
        report,
        log,
        start_time,
        end_time,
    } = outcome;
    let mut error_message = report.error_message;
    if report.success && report.slots.is_empty() {
        warn!(%configuration_id, "solver succeeded without using a slot");
        error_message.get_or_insert_with(|| "the solution uses no slot".to_owned());
    }
    let record = ExecutionRecord {
        job_id: submission.job_id,
        version_hash: submission.version_hash,
        start_time,
        end_time,
        success: report.success && !report.slots.is_empty(),
        solver_reached_optimality: report.reached_optimality,
        solver_hit_time_limit: report.hit_time_limit,
        error_message,
        log,
    };
    match store
        .record_outcome(configuration_id, &record, &report.slots)
        .await
    {
        Ok(()) => info!(
            %configuration_id,
            success = record.success,
            slots = report.slots.len(),
            "solve recorded"
        ),
        Err(error) => {
            error!(%configuration_id, %error, "failed to record solve, configuration stays running");
        }
    }
}
