use alloc::collections::BTreeSet;

use commission_scheduler_model::{Roster, SolutionSlot};

use crate::builder::CommissionModel;
use crate::solver::Assignment;

/// Reads the used slots out of a solved model, morning pool first.
///
/// Slots without candidates are dropped and `order` counts the remaining
/// ones from 0, so the first afternoon slot comes right after the last used
/// morning slot.
#[must_use]
pub fn extract(
    assignment: &Assignment,
    model: &CommissionModel,
    roster: &Roster,
    version_hash: &str,
) -> Vec<SolutionSlot> {
    let layout = model.layout;
    layout
        .morning_slots()
        .chain(layout.afternoon_slots())
        .filter_map(|slot| {
            let rows = roster
                .rows
                .iter()
                .filter(|row| {
                    model
                        .assignment(row.candidate, slot)
                        .is_some_and(|var| assignment.is_set(var))
                })
                .collect::<Vec<_>>();
            let duration: u32 = rows.iter().map(|row| row.duration).sum();
            if duration == 0 {
                return None;
            }
            let professors = roster
                .professors
                .iter()
                .filter(|member| {
                    model
                        .presence(member.id, slot)
                        .is_some_and(|var| assignment.is_set(var))
                })
                .map(|member| member.id)
                .collect::<BTreeSet<_>>();
            Some(SolutionSlot {
                order: 0,
                morning: layout.is_morning(slot),
                duration,
                professors,
                candidates: rows.iter().map(|row| row.candidate).collect(),
                version_hash: version_hash.to_owned(),
            })
        })
        .zip(0..)
        .map(|(slot, order)| SolutionSlot { order, ..slot })
        .collect()
}

#[cfg(test)]
mod tests {
    use commission_scheduler_model::{Availability, CandidateId, DegreeLevel, ProfessorId, Role};

    use super::*;
    use crate::builder::ModelBuilder;
    use crate::testing::{candidate, commission, configuration, professor};

    #[test]
    fn afternoon_slots_follow_used_morning_slots() {
        let roster = Roster::export(&commission(
            vec![
                candidate(1, DegreeLevel::Bachelors, 1, None),
                candidate(2, DegreeLevel::Masters, 2, Some(3)),
                candidate(3, DegreeLevel::Bachelors, 4, None),
            ],
            vec![
                professor(1, Role::Ordinary, Availability::Always),
                professor(2, Role::Associate, Availability::Always),
                professor(3, Role::Researcher, Availability::Always),
                professor(4, Role::Ordinary, Availability::Afternoon),
            ],
        ))
        .unwrap();
        let built = ModelBuilder::new(&roster, &configuration(3, 3))
            .build()
            .unwrap();

        // c1 in morning slot 1, c2 in afternoon slot 4, c3 in afternoon slot 5
        let mut values = vec![0.0; built.model.variables().len()];
        let mut set = |var: Option<crate::milp::VarId>| values[var.unwrap().index()] = 1.0;
        set(built.assignment(CandidateId(1), 1));
        set(built.assignment(CandidateId(2), 4));
        set(built.assignment(CandidateId(3), 5));
        set(built.presence(ProfessorId(1), 1));
        set(built.presence(ProfessorId(2), 4));
        set(built.presence(ProfessorId(3), 4));
        set(built.presence(ProfessorId(4), 5));

        let slots = extract(&Assignment::new(values), &built, &roster, "abc");
        assert_eq!(slots.len(), 3);
        assert_eq!(
            slots
                .iter()
                .map(|slot| (slot.order, slot.morning, slot.duration))
                .collect::<Vec<_>>(),
            vec![(0, true, 15), (1, false, 30), (2, false, 15)]
        );
        assert_eq!(
            slots[1].professors,
            BTreeSet::from([ProfessorId(2), ProfessorId(3)])
        );
        assert_eq!(slots[1].candidates, BTreeSet::from([CandidateId(2)]));
        assert!(slots.iter().all(|slot| slot.version_hash == "abc"));
    }

    #[test]
    fn values_at_or_below_threshold_are_ignored() {
        let roster = Roster::export(&commission(
            vec![candidate(1, DegreeLevel::Bachelors, 1, None)],
            vec![professor(1, Role::Ordinary, Availability::Always)],
        ))
        .unwrap();
        let built = ModelBuilder::new(&roster, &configuration(2, 0))
            .build()
            .unwrap();

        let mut values = vec![0.0; built.model.variables().len()];
        values[built.assignment(CandidateId(1), 0).unwrap().index()] = 0.8;
        values[built.assignment(CandidateId(1), 1).unwrap().index()] = 0.99;
        values[built.presence(ProfessorId(1), 1).unwrap().index()] = 1.0;

        let slots = extract(&Assignment::new(values), &built, &roster, "h");
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].order, 0);
        assert_eq!(slots[0].professors, BTreeSet::from([ProfessorId(1)]));
    }
}
