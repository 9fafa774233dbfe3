use async_trait::async_trait;
use commission_scheduler_model::{
    Commission, CommissionId, Configuration, ConfigurationId, ExecutionRecord, RunState,
    SolutionSlot,
};

use crate::error::DatabaseError;

/// Result of trying to move a configuration out of `Idle`.
#[derive(Debug, Clone, PartialEq)]
pub enum LockAttempt {
    /// The configuration is now `Running`; this is the snapshot to solve.
    Acquired(Configuration),
    /// Someone got there first. Carries the state that blocked the attempt.
    Held(RunState),
}

/// Durable state of commissions, configurations and their solve outcomes.
#[async_trait]
pub trait Store: Send + Sync {
    async fn commission(&self, id: CommissionId) -> Result<Commission, DatabaseError>;

    async fn configuration(&self, id: ConfigurationId) -> Result<Configuration, DatabaseError>;

    /// Writes the solver parameters of an `Idle` configuration. Fails with
    /// [`DatabaseError::Locked`] in any other state.
    async fn update_configuration(
        &self,
        configuration: &Configuration,
    ) -> Result<(), DatabaseError>;

    /// Atomic check-and-set from `Idle` to `Running`. A configuration that
    /// already has solution slots counts as `Completed`.
    async fn acquire_run_lock(&self, id: ConfigurationId) -> Result<LockAttempt, DatabaseError>;

    /// Appends the record, stores `slots` and moves the configuration to
    /// `Completed` when the record is a success, `Failed` otherwise. All or
    /// nothing.
    async fn record_outcome(
        &self,
        id: ConfigurationId,
        record: &ExecutionRecord,
        slots: &[SolutionSlot],
    ) -> Result<(), DatabaseError>;

    async fn solution_slots(&self, id: ConfigurationId)
        -> Result<Vec<SolutionSlot>, DatabaseError>;

    /// Oldest first.
    async fn execution_records(
        &self,
        id: ConfigurationId,
    ) -> Result<Vec<ExecutionRecord>, DatabaseError>;

    async fn run_state(&self, id: ConfigurationId) -> Result<RunState, DatabaseError>;
}

/// State a finished run leaves its configuration in.
#[must_use]
pub fn outcome_state(record: &ExecutionRecord, slots: &[SolutionSlot]) -> RunState {
    if record.success && !slots.is_empty() {
        RunState::Completed
    } else {
        RunState::Failed
    }
}
