use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use commission_scheduler_model::{
    CandidateId, Commission, CommissionId, Configuration, ConfigurationId, ExecutionRecord,
    ProfessorId, RunState, SolutionSlot,
};
use diesel::prelude::*;
use diesel_async::pooled_connection::deadpool::Pool;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::models::{
    slot_numbers, slot_unsigned, CandidateRow, CommissionRow, ConfigurationChanges,
    ConfigurationRow, ExecutionRecordRow, NewExecutionRecord, NewSolutionSlot, ProfessorRow,
    SlotCandidateRow, SlotProfessorRow, SolutionSlotRow,
};
use crate::schema::{
    candidates, commissions, execution_records, optimization_configurations, professors,
    solution_slot_candidates, solution_slot_professors, solution_slots,
};
use crate::store::{outcome_state, LockAttempt, Store};

/// A [`Store`] backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool<AsyncPgConnection>,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: Pool<AsyncPgConnection>) -> Self {
        Self { pool }
    }
}

async fn locked_run_state(
    connection: &mut AsyncPgConnection,
    id: ConfigurationId,
) -> Result<RunState, DatabaseError> {
    let state: String = optimization_configurations::table
        .find(id.0)
        .select(optimization_configurations::run_state)
        .for_update()
        .first(connection)
        .await
        .optional()?
        .ok_or(DatabaseError::ConfigurationNotFound(id))?;
    RunState::parse(&state).ok_or_else(|| DatabaseError::Corrupt(format!("run state {state}")))
}

async fn ensure_configuration(
    connection: &mut AsyncPgConnection,
    id: ConfigurationId,
) -> Result<(), DatabaseError> {
    let found: i64 = optimization_configurations::table
        .filter(optimization_configurations::id.eq(id.0))
        .count()
        .get_result(connection)
        .await?;
    if found == 0 {
        return Err(DatabaseError::ConfigurationNotFound(id));
    }
    Ok(())
}

async fn set_run_state(
    connection: &mut AsyncPgConnection,
    id: ConfigurationId,
    state: RunState,
) -> Result<(), DatabaseError> {
    diesel::update(optimization_configurations::table.find(id.0))
        .set(optimization_configurations::run_state.eq(state.as_str()))
        .execute(connection)
        .await?;
    Ok(())
}

async fn insert_slots(
    connection: &mut AsyncPgConnection,
    id: ConfigurationId,
    slots: &[SolutionSlot],
) -> Result<(), DatabaseError> {
    for slot in slots {
        let (slot_order, duration) = slot_numbers(slot.order, slot.duration)?;
        let slot_id: i32 = diesel::insert_into(solution_slots::table)
            .values(NewSolutionSlot {
                configuration_id: id.0,
                slot_order,
                morning: slot.morning,
                duration,
                version_hash: &slot.version_hash,
            })
            .returning(solution_slots::id)
            .get_result(connection)
            .await?;
        let professor_rows: Vec<_> = slot
            .professors
            .iter()
            .map(|professor| SlotProfessorRow {
                slot_id,
                professor_id: professor.0,
            })
            .collect();
        if !professor_rows.is_empty() {
            diesel::insert_into(solution_slot_professors::table)
                .values(&professor_rows)
                .execute(connection)
                .await?;
        }
        let candidate_rows: Vec<_> = slot
            .candidates
            .iter()
            .map(|candidate| SlotCandidateRow {
                slot_id,
                candidate_id: candidate.0,
            })
            .collect();
        if !candidate_rows.is_empty() {
            diesel::insert_into(solution_slot_candidates::table)
                .values(&candidate_rows)
                .execute(connection)
                .await?;
        }
    }
    Ok(())
}

#[async_trait]
impl Store for PgStore {
    async fn commission(&self, id: CommissionId) -> Result<Commission, DatabaseError> {
        let mut connection = self.pool.get().await?;
        let connection: &mut AsyncPgConnection = &mut connection;

        let commission = commissions::table
            .find(id.0)
            .select(CommissionRow::as_select())
            .first(connection)
            .await
            .optional()?
            .ok_or(DatabaseError::CommissionNotFound(id))?;
        let candidate_rows = candidates::table
            .filter(candidates::commission_id.eq(id.0))
            .order(candidates::id)
            .select(CandidateRow::as_select())
            .load(connection)
            .await?;

        let referenced: BTreeSet<i32> = candidate_rows
            .iter()
            .flat_map(|row| {
                [
                    row.supervisor_id,
                    row.counter_supervisor_id,
                    row.assistant_supervisor_id,
                ]
            })
            .flatten()
            .collect();
        let professor_rows = professors::table
            .filter(professors::id.eq_any(referenced))
            .order(professors::id)
            .select(ProfessorRow::as_select())
            .load(connection)
            .await?;

        Ok(Commission {
            id,
            title: commission.title,
            candidates: candidate_rows
                .into_iter()
                .map(TryInto::try_into)
                .collect::<Result<_, _>>()?,
            professors: professor_rows
                .into_iter()
                .map(TryInto::try_into)
                .collect::<Result<_, _>>()?,
        })
    }

    async fn configuration(&self, id: ConfigurationId) -> Result<Configuration, DatabaseError> {
        let mut connection = self.pool.get().await?;
        optimization_configurations::table
            .find(id.0)
            .select(ConfigurationRow::as_select())
            .first(&mut connection)
            .await
            .optional()?
            .ok_or(DatabaseError::ConfigurationNotFound(id))?
            .try_into()
    }

    async fn update_configuration(
        &self,
        configuration: &Configuration,
    ) -> Result<(), DatabaseError> {
        let changes = ConfigurationChanges::try_from(configuration)?;
        let id = configuration.id;
        let mut connection = self.pool.get().await?;
        let connection: &mut AsyncPgConnection = &mut connection;
        connection
            .transaction::<_, DatabaseError, _>(|connection| {
                async move {
                    let state = locked_run_state(connection, id).await?;
                    if state.is_locked() {
                        return Err(DatabaseError::Locked { id, state });
                    }
                    diesel::update(optimization_configurations::table.find(id.0))
                        .set(&changes)
                        .execute(connection)
                        .await?;
                    Ok(())
                }
                .scope_boxed()
            })
            .await
    }

    async fn acquire_run_lock(&self, id: ConfigurationId) -> Result<LockAttempt, DatabaseError> {
        let mut connection = self.pool.get().await?;
        let connection: &mut AsyncPgConnection = &mut connection;
        connection
            .transaction::<_, DatabaseError, _>(|connection| {
                async move {
                    let state = locked_run_state(connection, id).await?;
                    if state.is_locked() {
                        return Ok(LockAttempt::Held(state));
                    }
                    let existing: i64 = solution_slots::table
                        .filter(solution_slots::configuration_id.eq(id.0))
                        .count()
                        .get_result(connection)
                        .await?;
                    if existing > 0 {
                        return Ok(LockAttempt::Held(RunState::Completed));
                    }
                    set_run_state(connection, id, RunState::Running).await?;
                    let configuration: Configuration = optimization_configurations::table
                        .find(id.0)
                        .select(ConfigurationRow::as_select())
                        .first(connection)
                        .await?
                        .try_into()?;
                    debug!(configuration_id = %id, "run lock acquired");
                    Ok(LockAttempt::Acquired(configuration))
                }
                .scope_boxed()
            })
            .await
    }

    async fn record_outcome(
        &self,
        id: ConfigurationId,
        record: &ExecutionRecord,
        slots: &[SolutionSlot],
    ) -> Result<(), DatabaseError> {
        let state = outcome_state(record, slots);
        let mut connection = self.pool.get().await?;
        let connection: &mut AsyncPgConnection = &mut connection;
        connection
            .transaction::<_, DatabaseError, _>(|connection| {
                async move {
                    ensure_configuration(connection, id).await?;
                    diesel::insert_into(execution_records::table)
                        .values(NewExecutionRecord::new(id, record))
                        .execute(connection)
                        .await?;
                    if state == RunState::Completed {
                        insert_slots(connection, id, slots).await?;
                    }
                    set_run_state(connection, id, state).await
                }
                .scope_boxed()
            })
            .await?;
        info!(configuration_id = %id, job_id = %record.job_id, %state, slots = slots.len(), "outcome recorded");
        Ok(())
    }

    async fn solution_slots(
        &self,
        id: ConfigurationId,
    ) -> Result<Vec<SolutionSlot>, DatabaseError> {
        let mut connection = self.pool.get().await?;
        let connection: &mut AsyncPgConnection = &mut connection;
        ensure_configuration(connection, id).await?;

        let rows = solution_slots::table
            .filter(solution_slots::configuration_id.eq(id.0))
            .order(solution_slots::slot_order)
            .select(SolutionSlotRow::as_select())
            .load(connection)
            .await?;
        let slot_ids: Vec<i32> = rows.iter().map(|row| row.id).collect();

        let mut professors_by_slot: BTreeMap<i32, BTreeSet<ProfessorId>> = BTreeMap::new();
        for row in solution_slot_professors::table
            .filter(solution_slot_professors::slot_id.eq_any(&slot_ids))
            .select(SlotProfessorRow::as_select())
            .load(connection)
            .await?
        {
            professors_by_slot
                .entry(row.slot_id)
                .or_default()
                .insert(ProfessorId(row.professor_id));
        }
        let mut candidates_by_slot: BTreeMap<i32, BTreeSet<CandidateId>> = BTreeMap::new();
        for row in solution_slot_candidates::table
            .filter(solution_slot_candidates::slot_id.eq_any(&slot_ids))
            .select(SlotCandidateRow::as_select())
            .load(connection)
            .await?
        {
            candidates_by_slot
                .entry(row.slot_id)
                .or_default()
                .insert(CandidateId(row.candidate_id));
        }

        rows.into_iter()
            .map(|row| {
                Ok(SolutionSlot {
                    order: slot_unsigned("slot order", row.slot_order)?,
                    morning: row.morning,
                    duration: slot_unsigned("slot duration", row.duration)?,
                    professors: professors_by_slot.remove(&row.id).unwrap_or_default(),
                    candidates: candidates_by_slot.remove(&row.id).unwrap_or_default(),
                    version_hash: row.version_hash,
                })
            })
            .collect()
    }

    async fn execution_records(
        &self,
        id: ConfigurationId,
    ) -> Result<Vec<ExecutionRecord>, DatabaseError> {
        let mut connection = self.pool.get().await?;
        let connection: &mut AsyncPgConnection = &mut connection;
        ensure_configuration(connection, id).await?;
        Ok(execution_records::table
            .filter(execution_records::configuration_id.eq(id.0))
            .order(execution_records::id)
            .select(ExecutionRecordRow::as_select())
            .load(connection)
            .await?
            .into_iter()
            .map(ExecutionRecord::from)
            .collect())
    }

    async fn run_state(&self, id: ConfigurationId) -> Result<RunState, DatabaseError> {
        let mut connection = self.pool.get().await?;
        let state: String = optimization_configurations::table
            .find(id.0)
            .select(optimization_configurations::run_state)
            .first(&mut connection)
            .await
            .optional()?
            .ok_or(DatabaseError::ConfigurationNotFound(id))?;
        RunState::parse(&state).ok_or_else(|| DatabaseError::Corrupt(format!("run state {state}")))
    }
}
