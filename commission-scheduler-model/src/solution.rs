use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::candidate::CandidateId;
use crate::professor::ProfessorId;

/// One used commission of a solve.
///
/// `order` ranks the used slots, morning slots first. It is only meant for
/// presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionSlot {
    pub order: u32,
    pub morning: bool,
    pub duration: u32,
    pub professors: BTreeSet<ProfessorId>,
    pub candidates: BTreeSet<CandidateId>,
    pub version_hash: String,
}

/// Outcome of one solve attempt. Records are only ever appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
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
