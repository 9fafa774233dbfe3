use chrono::{DateTime, Utc};
use commission_scheduler_model::{
    Availability, Candidate, CandidateId, CommissionId, Configuration, ConfigurationId,
    DegreeLevel, ExecutionRecord, Professor, ProfessorId, Role, RunState,
};
use diesel::prelude::*;
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::schema::{
    candidates, commissions, execution_records, optimization_configurations, professors,
    solution_slot_candidates, solution_slot_professors, solution_slots,
};

fn corrupt(what: &str, value: impl core::fmt::Display) -> DatabaseError {
    DatabaseError::Corrupt(format!("unexpected {what} {value}"))
}

fn unsigned(what: &str, value: i32) -> Result<u32, DatabaseError> {
    u32::try_from(value).map_err(|_| corrupt(what, value))
}

fn signed(what: &str, value: u32) -> Result<i32, DatabaseError> {
    i32::try_from(value).map_err(|_| corrupt(what, value))
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = professors)]
pub struct ProfessorRow {
    pub id: i32,
    pub name: String,
    pub surname: String,
    pub role: String,
    pub availability: String,
}

impl TryFrom<ProfessorRow> for Professor {
    type Error = DatabaseError;

    fn try_from(row: ProfessorRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ProfessorId(row.id),
            role: Role::parse(&row.role).ok_or_else(|| corrupt("role", &row.role))?,
            availability: Availability::parse(&row.availability)
                .ok_or_else(|| corrupt("availability", &row.availability))?,
            name: row.name,
            surname: row.surname,
        })
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = commissions)]
pub struct CommissionRow {
    pub id: i32,
    pub title: String,
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = candidates)]
pub struct CandidateRow {
    pub id: i32,
    pub commission_id: i32,
    pub name: String,
    pub surname: String,
    pub degree_level: String,
    pub supervisor_id: Option<i32>,
    pub counter_supervisor_id: Option<i32>,
    pub assistant_supervisor_id: Option<i32>,
}

impl TryFrom<CandidateRow> for Candidate {
    type Error = DatabaseError;

    fn try_from(row: CandidateRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: CandidateId(row.id),
            degree_level: DegreeLevel::parse(&row.degree_level)
                .ok_or_else(|| corrupt("degree level", &row.degree_level))?,
            name: row.name,
            surname: row.surname,
            supervisor: row.supervisor_id.map(ProfessorId),
            counter_supervisor: row.counter_supervisor_id.map(ProfessorId),
            assistant_supervisor: row.assistant_supervisor_id.map(ProfessorId),
        })
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = optimization_configurations)]
pub struct ConfigurationRow {
    pub id: i32,
    pub commission_id: i32,
    pub title: String,
    pub max_slot_duration: i32,
    pub max_morning_slots: i32,
    pub max_afternoon_slots: i32,
    pub online_mode: bool,
    pub min_professors: Option<i32>,
    pub max_professors: Option<i32>,
    pub min_ordinary_professors_for_masters: Option<i32>,
    pub solver: String,
    pub time_limit_seconds: i32,
    pub relative_gap: f64,
    pub run_state: String,
}

impl TryFrom<ConfigurationRow> for Configuration {
    type Error = DatabaseError;

    fn try_from(row: ConfigurationRow) -> Result<Self, Self::Error> {
        let optional = |what: &str, value: Option<i32>| value.map(|value| unsigned(what, value)).transpose();
        Ok(Self {
            id: ConfigurationId(row.id),
            commission_id: CommissionId(row.commission_id),
            max_slot_duration: unsigned("max_slot_duration", row.max_slot_duration)?,
            max_morning_slots: unsigned("max_morning_slots", row.max_morning_slots)?,
            max_afternoon_slots: unsigned("max_afternoon_slots", row.max_afternoon_slots)?,
            online_mode: row.online_mode,
            min_professors: optional("min_professors", row.min_professors)?,
            max_professors: optional("max_professors", row.max_professors)?,
            min_ordinary_professors_for_masters: optional(
                "min_ordinary_professors_for_masters",
                row.min_ordinary_professors_for_masters,
            )?,
            solver: row
                .solver
                .parse()
                .map_err(|_| corrupt("solver", &row.solver))?,
            time_limit_seconds: unsigned("time_limit_seconds", row.time_limit_seconds)?,
            relative_gap: row.relative_gap,
            run_state: RunState::parse(&row.run_state)
                .ok_or_else(|| corrupt("run state", &row.run_state))?,
            title: row.title,
        })
    }
}

/// The solver parameters of a configuration. Identity and run state are
/// never written through this.
#[derive(AsChangeset)]
#[diesel(table_name = optimization_configurations, treat_none_as_null = true)]
pub struct ConfigurationChanges {
    pub title: String,
    pub max_slot_duration: i32,
    pub max_morning_slots: i32,
    pub max_afternoon_slots: i32,
    pub online_mode: bool,
    pub min_professors: Option<i32>,
    pub max_professors: Option<i32>,
    pub min_ordinary_professors_for_masters: Option<i32>,
    pub solver: String,
    pub time_limit_seconds: i32,
    pub relative_gap: f64,
}

impl TryFrom<&Configuration> for ConfigurationChanges {
    type Error = DatabaseError;

    fn try_from(configuration: &Configuration) -> Result<Self, Self::Error> {
        let optional = |what: &str, value: Option<u32>| value.map(|value| signed(what, value)).transpose();
        Ok(Self {
            title: configuration.title.clone(),
            max_slot_duration: signed("max_slot_duration", configuration.max_slot_duration)?,
            max_morning_slots: signed("max_morning_slots", configuration.max_morning_slots)?,
            max_afternoon_slots: signed("max_afternoon_slots", configuration.max_afternoon_slots)?,
            online_mode: configuration.online_mode,
            min_professors: optional("min_professors", configuration.min_professors)?,
            max_professors: optional("max_professors", configuration.max_professors)?,
            min_ordinary_professors_for_masters: optional(
                "min_ordinary_professors_for_masters",
                configuration.min_ordinary_professors_for_masters,
            )?,
            solver: configuration.solver.as_str().to_owned(),
            time_limit_seconds: signed("time_limit_seconds", configuration.time_limit_seconds)?,
            relative_gap: configuration.relative_gap,
        })
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = solution_slots)]
pub struct SolutionSlotRow {
    pub id: i32,
    pub configuration_id: i32,
    pub slot_order: i32,
    pub morning: bool,
    pub duration: i32,
    pub version_hash: String,
}

#[derive(Insertable)]
#[diesel(table_name = solution_slots)]
pub struct NewSolutionSlot<'a> {
    pub configuration_id: i32,
    pub slot_order: i32,
    pub morning: bool,
    pub duration: i32,
    pub version_hash: &'a str,
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = solution_slot_professors)]
pub struct SlotProfessorRow {
    pub slot_id: i32,
    pub professor_id: i32,
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = solution_slot_candidates)]
pub struct SlotCandidateRow {
    pub slot_id: i32,
    pub candidate_id: i32,
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = execution_records)]
pub struct ExecutionRecordRow {
    pub id: i32,
    pub configuration_id: i32,
    pub job_id: Uuid,
    pub version_hash: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub success: bool,
    pub solver_reached_optimality: bool,
    pub solver_hit_time_limit: bool,
    pub error_message: Option<String>,
    pub log: String,
}

impl From<ExecutionRecordRow> for ExecutionRecord {
    fn from(row: ExecutionRecordRow) -> Self {
        Self {
            job_id: row.job_id,
            version_hash: row.version_hash,
            start_time: row.start_time,
            end_time: row.end_time,
            success: row.success,
            solver_reached_optimality: row.solver_reached_optimality,
            solver_hit_time_limit: row.solver_hit_time_limit,
            error_message: row.error_message,
            log: row.log,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = execution_records)]
pub struct NewExecutionRecord<'a> {
    pub configuration_id: i32,
    pub job_id: Uuid,
    pub version_hash: &'a str,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub success: bool,
    pub solver_reached_optimality: bool,
    pub solver_hit_time_limit: bool,
    pub error_message: Option<&'a str>,
    pub log: &'a str,
}

impl<'a> NewExecutionRecord<'a> {
    #[must_use]
    pub fn new(configuration: ConfigurationId, record: &'a ExecutionRecord) -> Self {
        Self {
            configuration_id: configuration.0,
            job_id: record.job_id,
            version_hash: &record.version_hash,
            start_time: record.start_time,
            end_time: record.end_time,
            success: record.success,
            solver_reached_optimality: record.solver_reached_optimality,
            solver_hit_time_limit: record.solver_hit_time_limit,
            error_message: record.error_message.as_deref(),
            log: &record.log,
        }
    }
}

pub fn slot_numbers(order: u32, duration: u32) -> Result<(i32, i32), DatabaseError> {
    Ok((signed("slot order", order)?, signed("slot duration", duration)?))
}

pub fn slot_unsigned(what: &str, value: i32) -> Result<u32, DatabaseError> {
    unsigned(what, value)
}
