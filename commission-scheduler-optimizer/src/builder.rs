//! Turns a roster and a configuration into the assignment problem.
//!
//! Decision variables:
//! - `x_c{candidate}_s{slot}`: candidate sits in slot
//! - `y_s{slot}`: slot is used
//! - `z_p{professor}_s{slot}`: professor sits in slot
//! - `w`: duration of the shortest used slot, maximised to balance the day
//!
//! Online mode adds the per-slot professor count bounds `min_ord`, `max_ord`,
//! `min_doc`, `max_doc` and `m_s{slot}` (slot hosts a Masters candidate).

use alloc::collections::BTreeMap;
use core::ops::Range;

use commission_scheduler_model::{
    CandidateId, Configuration, DegreeLevel, ProfessorId, ProfessorQuota, Roster,
    RosterInconsistent, RosterProfessor, RosterRow,
};
use itertools::Itertools;
use tracing::debug;

use crate::error::OptimizerError;
use crate::milp::{Constraint, LinearExpr, Model, Sense, VarId, VarKind};

/// Relaxes the per-slot professor count lower bounds on unused slots.
const COUNT_RELAXATION: f64 = 50.0;

const BALANCE_WEIGHT: f64 = 10_000.0;
const ORDINARY_SPREAD_WEIGHT: f64 = 1_000.0;
const PROFESSOR_SPREAD_WEIGHT: f64 = 10.0;
const AFTERNOON_WEIGHT: f64 = 1.0;

/// Morning slots take the indices `0..morning`, afternoon slots follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotLayout {
    pub morning: usize,
    pub afternoon: usize,
}

impl SlotLayout {
    #[must_use]
    pub fn from_configuration(configuration: &Configuration) -> Self {
        Self {
            morning: configuration.max_morning_slots as usize,
            afternoon: configuration.max_afternoon_slots as usize,
        }
    }

    #[must_use]
    pub const fn len(self) -> usize {
        self.morning + self.afternoon
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub const fn is_morning(self, slot: usize) -> bool {
        slot < self.morning
    }

    #[must_use]
    pub const fn slots(self) -> Range<usize> {
        0..self.len()
    }

    #[must_use]
    pub const fn morning_slots(self) -> Range<usize> {
        0..self.morning
    }

    #[must_use]
    pub const fn afternoon_slots(self) -> Range<usize> {
        self.morning..self.len()
    }
}

#[derive(Debug, Clone)]
pub struct QuotaVariables {
    pub min_ordinary: VarId,
    pub max_ordinary: VarId,
    pub min_professors: VarId,
    pub max_professors: VarId,
    pub hosts_masters: Vec<VarId>,
}

/// The built model together with the handles needed to read an assignment back.
#[derive(Debug, Clone)]
pub struct CommissionModel {
    pub model: Model,
    pub layout: SlotLayout,
    pub used: Vec<VarId>,
    pub shortest: VarId,
    pub quota: Option<QuotaVariables>,
    assignment: BTreeMap<CandidateId, Vec<VarId>>,
    presence: BTreeMap<ProfessorId, Vec<VarId>>,
}

impl CommissionModel {
    #[must_use]
    pub fn assignment(&self, candidate: CandidateId, slot: usize) -> Option<VarId> {
        self.assignment.get(&candidate)?.get(slot).copied()
    }

    #[must_use]
    pub fn presence(&self, professor: ProfessorId, slot: usize) -> Option<VarId> {
        self.presence.get(&professor)?.get(slot).copied()
    }
}

pub struct ModelBuilder<'a> {
    roster: &'a Roster,
    configuration: &'a Configuration,
}

impl<'a> ModelBuilder<'a> {
    #[must_use]
    pub const fn new(roster: &'a Roster, configuration: &'a Configuration) -> Self {
        Self {
            roster,
            configuration,
        }
    }

    pub fn build(&self) -> Result<CommissionModel, OptimizerError> {
        self.configuration.validate()?;
        let quota = self.configuration.quota()?;
        let rows = &self.roster.rows;
        if rows.is_empty() {
            return Err(RosterInconsistent::Empty.into());
        }

        let layout = SlotLayout::from_configuration(self.configuration);
        let max_duration = f64::from(self.configuration.max_slot_duration);
        let mut model = Model::default();

        let assignment: BTreeMap<CandidateId, Vec<VarId>> = rows
            .iter()
            .map(|row| {
                let vars = layout
                    .slots()
                    .map(|slot| {
                        model.add_variable(
                            format!("x_c{}_s{slot}", row.candidate),
                            VarKind::Binary,
                        )
                    })
                    .collect();
                (row.candidate, vars)
            })
            .collect();
        let used: Vec<VarId> = layout
            .slots()
            .map(|slot| model.add_variable(format!("y_s{slot}"), VarKind::Binary))
            .collect();
        let presence: BTreeMap<ProfessorId, Vec<VarId>> = self
            .roster
            .professors
            .iter()
            .map(|member| {
                let vars = layout
                    .slots()
                    .map(|slot| {
                        model.add_variable(format!("z_p{}_s{slot}", member.id), VarKind::Binary)
                    })
                    .collect();
                (member.id, vars)
            })
            .collect();
        let shortest = model.add_variable("w", VarKind::Free);

        let quota_variables = quota.map(|_| QuotaVariables {
            min_ordinary: model.add_variable("min_ord", VarKind::Integer { min: 0.0 }),
            max_ordinary: model.add_variable("max_ord", VarKind::Integer { min: 0.0 }),
            min_professors: model.add_variable("min_doc", VarKind::Integer { min: 0.0 }),
            max_professors: model.add_variable("max_doc", VarKind::Integer { min: 0.0 }),
            hosts_masters: layout
                .slots()
                .map(|slot| model.add_variable(format!("m_s{slot}"), VarKind::Binary))
                .collect(),
        });

        let mut built = CommissionModel {
            model,
            layout,
            used,
            shortest,
            quota: quota_variables,
            assignment,
            presence,
        };
        built.assign_every_candidate(rows);
        built.cap_and_balance_durations(rows, max_duration);
        let availability = professor_availability(rows);
        for row in rows {
            built.require_professor(row, &availability, row.supervisor.id, "supervisor")?;
            if let Some(counter_supervisor) = &row.counter_supervisor {
                built.require_professor(row, &availability, counter_supervisor.id, "counter")?;
            }
        }
        built.attend_at_most_once();
        if let Some(quota) = quota {
            built.bound_professor_counts(rows, quota);
        }
        built.set_objective();

        debug!(
            candidates = rows.len(),
            professors = self.roster.professors.len(),
            slots = layout.len(),
            variables = built.model.variables().len(),
            constraints = built.model.constraints().len(),
            online = quota.is_some(),
            "built commission model"
        );
        Ok(built)
    }
}

/// One availability per professor, read from the first row that names them.
///
/// Rows naming a professor as supervisor win over counter-supervisor rows, so
/// a `Split` supervisor keeps the pool of their first candidate for every
/// slot. The per-row `Split` flags only matter for presenting the roster.
fn professor_availability(rows: &[RosterRow]) -> BTreeMap<ProfessorId, &RosterProfessor> {
    let mut availability = BTreeMap::new();
    for professor in rows
        .iter()
        .map(|row| &row.supervisor)
        .chain(rows.iter().filter_map(|row| row.counter_supervisor.as_ref()))
    {
        availability.entry(professor.id).or_insert(professor);
    }
    availability
}

impl CommissionModel {
    fn candidate_vars(&self, candidate: CandidateId) -> &[VarId] {
        self.assignment.get(&candidate).map_or(&[], Vec::as_slice)
    }

    fn assign_every_candidate(&mut self, rows: &[RosterRow]) {
        for row in rows {
            let slots = self
                .candidate_vars(row.candidate)
                .iter()
                .map(|var| LinearExpr::from(*var))
                .sum::<LinearExpr>();
            self.model.add_constraint(Constraint::new(
                format!("assign_c{}", row.candidate),
                slots,
                Sense::Equal,
                1.0,
            ));
        }
    }

    fn load(&self, rows: &[RosterRow], slot: usize) -> LinearExpr {
        rows.iter()
            .filter_map(|row| {
                self.assignment(row.candidate, slot)
                    .map(|var| f64::from(row.duration) * var)
            })
            .sum()
    }

    fn cap_and_balance_durations(&mut self, rows: &[RosterRow], max_duration: f64) {
        for slot in self.layout.slots() {
            let load = self.load(rows, slot);
            let used = self.used[slot];
            self.model.add_constraint(Constraint::new(
                format!("capacity_s{slot}"),
                load.clone(),
                Sense::LessEqual,
                max_duration * used,
            ));
            // an unused slot must not pull the shortest duration down
            self.model.add_constraint(Constraint::new(
                format!("balance_s{slot}"),
                load,
                Sense::GreaterEqual,
                LinearExpr::from(self.shortest) + max_duration * used - max_duration,
            ));
        }
    }

    fn require_professor(
        &mut self,
        row: &RosterRow,
        availability: &BTreeMap<ProfessorId, &RosterProfessor>,
        professor: ProfessorId,
        label: &str,
    ) -> Result<(), RosterInconsistent> {
        let unknown = RosterInconsistent::UnknownProfessor {
            candidate: row.candidate,
            professor,
        };
        let presence = self
            .presence
            .get(&professor)
            .cloned()
            .ok_or_else(|| unknown.clone())?;
        let professor = availability.get(&professor).copied().ok_or(unknown)?;
        let assignment = self.candidate_vars(row.candidate).to_vec();
        for (slot, (x, z)) in assignment.into_iter().zip(presence).enumerate() {
            let rhs = if professor.available(self.layout.is_morning(slot)) {
                LinearExpr::from(z)
            } else {
                LinearExpr::constant(0.0)
            };
            self.model.add_constraint(Constraint::new(
                format!("{label}_c{}_s{slot}", row.candidate),
                x,
                Sense::LessEqual,
                rhs,
            ));
        }
        Ok(())
    }

    fn attend_at_most_once(&mut self) {
        let constraints = self
            .presence
            .iter()
            .map(|(professor, vars)| {
                Constraint::new(
                    format!("attend_p{professor}"),
                    vars.iter().map(|var| LinearExpr::from(*var)).sum::<LinearExpr>(),
                    Sense::LessEqual,
                    1.0,
                )
            })
            .collect_vec();
        for constraint in constraints {
            self.model.add_constraint(constraint);
        }
    }

    fn professor_count(&self, rows: &[RosterRow], slot: usize, ordinary_only: bool) -> LinearExpr {
        // roles come from the rows so the count only covers professors with a candidate
        rows.iter()
            .flat_map(|row| row.counter_supervisor.iter().chain([&row.supervisor]))
            .filter(|professor| !ordinary_only || professor.role.is_ordinary())
            .map(|professor| professor.id)
            .unique()
            .filter_map(|professor| self.presence(professor, slot))
            .map(LinearExpr::from)
            .sum()
    }

    fn bound_professor_counts(&mut self, rows: &[RosterRow], quota: ProfessorQuota) {
        let Some(vars) = self.quota.clone() else {
            return;
        };
        let relaxation = COUNT_RELAXATION;
        let mut constraints = Vec::new();
        for slot in self.layout.slots() {
            let used = self.used[slot];
            let ordinary = self.professor_count(rows, slot, true);
            let everyone = self.professor_count(rows, slot, false);
            let hosts_masters = vars.hosts_masters[slot];

            constraints.push(Constraint::new(
                format!("ord_min_s{slot}"),
                ordinary.clone(),
                Sense::GreaterEqual,
                LinearExpr::from(vars.min_ordinary) + relaxation * used - relaxation,
            ));
            constraints.push(Constraint::new(
                format!("ord_max_s{slot}"),
                ordinary.clone(),
                Sense::LessEqual,
                vars.max_ordinary,
            ));
            constraints.push(Constraint::new(
                format!("doc_min_s{slot}"),
                everyone.clone(),
                Sense::GreaterEqual,
                LinearExpr::from(vars.min_professors) + relaxation * used - relaxation,
            ));
            constraints.push(Constraint::new(
                format!("doc_max_s{slot}"),
                everyone,
                Sense::LessEqual,
                vars.max_professors,
            ));

            for row in rows
                .iter()
                .filter(|row| row.degree_level == DegreeLevel::Masters)
            {
                if let Some(x) = self.assignment(row.candidate, slot) {
                    constraints.push(Constraint::new(
                        format!("masters_c{}_s{slot}", row.candidate),
                        x,
                        Sense::LessEqual,
                        hosts_masters,
                    ));
                }
            }
            constraints.push(Constraint::new(
                format!("masters_ord_s{slot}"),
                ordinary,
                Sense::GreaterEqual,
                f64::from(quota.min_ordinary_for_masters) * hosts_masters,
            ));
        }
        constraints.push(Constraint::new(
            "doc_floor",
            vars.min_professors,
            Sense::GreaterEqual,
            f64::from(quota.min_professors),
        ));
        constraints.push(Constraint::new(
            "doc_ceiling",
            vars.max_professors,
            Sense::LessEqual,
            f64::from(quota.max_professors),
        ));
        for constraint in constraints {
            self.model.add_constraint(constraint);
        }
    }

    fn set_objective(&mut self) {
        let mut objective = BALANCE_WEIGHT * self.shortest;
        if let Some(quota) = &self.quota {
            objective += (quota.max_ordinary - quota.min_ordinary) * -ORDINARY_SPREAD_WEIGHT;
            objective += (quota.max_professors - quota.min_professors) * -PROFESSOR_SPREAD_WEIGHT;
        }
        for slot in self.layout.afternoon_slots() {
            objective += -AFTERNOON_WEIGHT * self.used[slot];
        }
        self.model.set_objective(objective);
    }
}

#[cfg(test)]
mod tests {
    use commission_scheduler_model::{Availability, DegreeLevel, Role};

    use super::*;
    use crate::testing::{candidate, commission, configuration, professor};

    fn two_bachelors() -> Roster {
        Roster::export(&commission(
            vec![
                candidate(1, DegreeLevel::Bachelors, 1, None),
                candidate(2, DegreeLevel::Bachelors, 1, None),
            ],
            vec![professor(1, Role::Ordinary, Availability::Always)],
        ))
        .unwrap()
    }

    #[test]
    fn offline_model_has_core_variables_only() {
        let roster = two_bachelors();
        let built = ModelBuilder::new(&roster, &configuration(2, 1))
            .build()
            .unwrap();

        // 2 candidates x 3 slots, 3 slots, 1 professor x 3 slots, w
        assert_eq!(built.model.variables().len(), 6 + 3 + 3 + 1);
        assert!(built.quota.is_none());
        assert!(built.model.constraint("assign_c1").is_some());
        assert!(built.model.constraint("attend_p1").is_some());
        assert!(built.model.constraint("ord_min_s0").is_none());
        assert_eq!(built.model.variable(built.shortest).kind, VarKind::Free);
    }

    #[test]
    fn hand_made_schedule_satisfies_the_model() {
        let roster = two_bachelors();
        let built = ModelBuilder::new(&roster, &configuration(1, 0))
            .build()
            .unwrap();

        let mut values = vec![0.0; built.model.variables().len()];
        for candidate in [CandidateId(1), CandidateId(2)] {
            values[built.assignment(candidate, 0).unwrap().index()] = 1.0;
        }
        values[built.used[0].index()] = 1.0;
        values[built.presence(ProfessorId(1), 0).unwrap().index()] = 1.0;
        values[built.shortest.index()] = 30.0;
        assert_eq!(built.model.violated_constraint(&values), None);

        values[built.shortest.index()] = 31.0;
        assert_eq!(built.model.violated_constraint(&values), Some("balance_s0"));
    }

    #[test]
    fn unavailable_supervisor_forbids_the_slot() {
        let roster = Roster::export(&commission(
            vec![candidate(1, DegreeLevel::Masters, 1, None)],
            vec![professor(1, Role::Associate, Availability::Morning)],
        ))
        .unwrap();
        let built = ModelBuilder::new(&roster, &configuration(1, 1))
            .build()
            .unwrap();

        let afternoon = built.model.constraint("supervisor_c1_s1").unwrap();
        assert_eq!(afternoon.lhs.terms().count(), 1);
        assert!(afternoon.rhs.abs() < f64::EPSILON);
        let morning = built.model.constraint("supervisor_c1_s0").unwrap();
        assert_eq!(morning.lhs.terms().count(), 2);
    }

    #[test]
    fn split_supervisor_keeps_the_pool_of_their_first_candidate() {
        let roster = Roster::export(&commission(
            vec![
                candidate(1, DegreeLevel::Bachelors, 1, None),
                candidate(2, DegreeLevel::Bachelors, 1, None),
            ],
            vec![professor(1, Role::Associate, Availability::Split)],
        ))
        .unwrap();
        assert!(!roster.rows[1].supervisor.morning);
        let built = ModelBuilder::new(&roster, &configuration(1, 1))
            .build()
            .unwrap();

        // both candidates may join the supervisor in the morning slot
        for candidate in [1, 2] {
            let morning = built
                .model
                .constraint(&format!("supervisor_c{candidate}_s0"))
                .unwrap();
            assert_eq!(morning.lhs.terms().count(), 2);
            let afternoon = built
                .model
                .constraint(&format!("supervisor_c{candidate}_s1"))
                .unwrap();
            assert_eq!(afternoon.lhs.terms().count(), 1);
        }
    }

    #[test]
    fn online_mode_adds_quota_constraints() {
        let roster = Roster::export(&commission(
            vec![
                candidate(1, DegreeLevel::Masters, 1, Some(2)),
                candidate(2, DegreeLevel::Bachelors, 2, None),
            ],
            vec![
                professor(1, Role::Ordinary, Availability::Always),
                professor(2, Role::Researcher, Availability::Always),
            ],
        ))
        .unwrap();
        let mut online = configuration(2, 0);
        online.online_mode = true;
        online.min_professors = Some(1);
        online.max_professors = Some(3);
        online.min_ordinary_professors_for_masters = Some(1);

        let built = ModelBuilder::new(&roster, &online).build().unwrap();
        let quota = built.quota.as_ref().unwrap();
        assert_eq!(quota.hosts_masters.len(), 2);
        for name in [
            "ord_min_s0",
            "ord_max_s1",
            "doc_min_s0",
            "doc_max_s1",
            "masters_c1_s0",
            "masters_ord_s1",
            "doc_floor",
            "doc_ceiling",
            "counter_c1_s1",
        ] {
            assert!(built.model.constraint(name).is_some(), "missing {name}");
        }
        assert!(built.model.constraint("masters_c2_s0").is_none());

        // the Masters slot must count the ordinary professor
        let ordinary = built.model.constraint("masters_ord_s0").unwrap();
        let z = built.presence(ProfessorId(1), 0).unwrap();
        assert!(ordinary.lhs.terms().any(|(var, _)| var == z));
        let researcher = built.presence(ProfessorId(2), 0).unwrap();
        assert!(!ordinary.lhs.terms().any(|(var, _)| var == researcher));
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let roster = two_bachelors();
        let mut online = configuration(1, 1);
        online.online_mode = true;
        assert!(matches!(
            ModelBuilder::new(&roster, &online).build(),
            Err(OptimizerError::InvalidConfiguration(_))
        ));

        let empty = Roster {
            rows: vec![],
            professors: vec![],
        };
        assert!(matches!(
            ModelBuilder::new(&empty, &configuration(1, 1)).build(),
            Err(OptimizerError::RosterInconsistent(RosterInconsistent::Empty))
        ));

        let mut orphan = two_bachelors();
        orphan.professors.clear();
        assert!(matches!(
            ModelBuilder::new(&orphan, &configuration(1, 1)).build(),
            Err(OptimizerError::RosterInconsistent(
                RosterInconsistent::UnknownProfessor { .. }
            ))
        ));
    }
}
