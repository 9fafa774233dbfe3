//! The per-candidate table the optimizer consumes.
//!
//! Every row resolves the candidate's supervisor and counter-supervisor to a
//! concrete morning/afternoon availability, which is where `Split`
//! professors get balanced across the two pools for display. The model
//! builder reads one availability per professor from their first row.

use std::collections::HashMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::candidate::{Candidate, CandidateId, DegreeLevel};
use crate::commission::Commission;
use crate::professor::{Availability, Professor, ProfessorId, Role};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RosterInconsistent {
    #[error("the commission has no candidates")]
    Empty,
    #[error("candidate {0} has no supervisor")]
    MissingSupervisor(CandidateId),
    #[error("candidate {candidate} references professor {professor} who is not part of the commission")]
    UnknownProfessor {
        candidate: CandidateId,
        professor: ProfessorId,
    },
    #[error("candidate {0} is listed more than once")]
    DuplicateCandidate(CandidateId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterProfessor {
    pub id: ProfessorId,
    pub full_name: String,
    pub role: Role,
    pub morning: bool,
    pub afternoon: bool,
}

impl RosterProfessor {
    fn new(professor: &Professor, morning: bool, afternoon: bool) -> Self {
        Self {
            id: professor.id,
            full_name: professor.full_name(),
            role: professor.role,
            morning,
            afternoon,
        }
    }

    /// Whether the professor may sit in a slot of the given pool.
    #[must_use]
    pub const fn available(&self, morning_slot: bool) -> bool {
        if morning_slot {
            self.morning
        } else {
            self.afternoon
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterRow {
    pub candidate: CandidateId,
    pub surname: String,
    pub name: String,
    pub degree_level: DegreeLevel,
    pub duration: u32,
    pub supervisor: RosterProfessor,
    pub counter_supervisor: Option<RosterProfessor>,
}

/// A professor that appears somewhere in the roster, once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterMember {
    pub id: ProfessorId,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    pub rows: Vec<RosterRow>,
    pub professors: Vec<RosterMember>,
}

impl Roster {
    pub fn export(commission: &Commission) -> Result<Self, RosterInconsistent> {
        if commission.candidates.is_empty() {
            return Err(RosterInconsistent::Empty);
        }
        if let Some(duplicate) = commission
            .candidates
            .iter()
            .map(|candidate| candidate.id)
            .duplicates()
            .next()
        {
            return Err(RosterInconsistent::DuplicateCandidate(duplicate));
        }

        let supervisors = commission
            .candidates
            .iter()
            .map(|candidate| {
                candidate
                    .supervisor
                    .ok_or(RosterInconsistent::MissingSupervisor(candidate.id))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let per_supervisor = supervisors.iter().copied().counts();
        let mut seen = HashMap::<ProfessorId, usize>::new();

        let rows = commission
            .candidates
            .iter()
            .zip(supervisors)
            .map(|(candidate, supervisor_id)| {
                let supervisor = lookup(commission, candidate, supervisor_id)?;
                let index = seen.entry(supervisor_id).or_default();
                let (morning, afternoon) = if supervisor.availability == Availability::Split {
                    let total = per_supervisor.get(&supervisor_id).copied().unwrap_or(1);
                    let morning = *index < total.div_ceil(2);
                    (morning, !morning)
                } else {
                    (
                        supervisor.availability.morning(),
                        supervisor.availability.afternoon(),
                    )
                };
                *index += 1;

                let counter_supervisor = candidate
                    .counter_supervisor
                    .map(|id| {
                        lookup(commission, candidate, id).map(|professor| {
                            RosterProfessor::new(
                                professor,
                                professor.availability.morning(),
                                professor.availability.afternoon(),
                            )
                        })
                    })
                    .transpose()?;

                Ok(RosterRow {
                    candidate: candidate.id,
                    surname: candidate.surname.clone(),
                    name: candidate.name.clone(),
                    degree_level: candidate.degree_level,
                    duration: candidate.duration(),
                    supervisor: RosterProfessor::new(supervisor, morning, afternoon),
                    counter_supervisor,
                })
            })
            .collect::<Result<Vec<_>, RosterInconsistent>>()?;

        let professors = rows
            .iter()
            .flat_map(|row| row.counter_supervisor.iter().chain([&row.supervisor]))
            .map(|professor| RosterMember {
                id: professor.id,
                role: professor.role,
            })
            .unique_by(|member| member.id)
            .sorted_by_key(|member| member.id)
            .collect();

        Ok(Self { rows, professors })
    }

    #[must_use]
    pub fn row(&self, candidate: CandidateId) -> Option<&RosterRow> {
        self.rows.iter().find(|row| row.candidate == candidate)
    }
}

fn lookup<'a>(
    commission: &'a Commission,
    candidate: &Candidate,
    professor: ProfessorId,
) -> Result<&'a Professor, RosterInconsistent> {
    commission
        .professor(professor)
        .ok_or(RosterInconsistent::UnknownProfessor {
            candidate: candidate.id,
            professor,
        })
}
