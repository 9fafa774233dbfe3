use core::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::professor::ProfessorId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(pub i32);

impl Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DegreeLevel {
    Bachelors,
    Masters,
}

impl DegreeLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bachelors => "bachelors",
            Self::Masters => "masters",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        [Self::Bachelors, Self::Masters]
            .into_iter()
            .find(|level| level.as_str() == value)
    }
}

/// A graduating student and the professors tied to their thesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    pub surname: String,
    pub degree_level: DegreeLevel,
    pub supervisor: Option<ProfessorId>,
    #[serde(default)]
    pub counter_supervisor: Option<ProfessorId>,
    #[serde(default)]
    pub assistant_supervisor: Option<ProfessorId>,
}

impl Candidate {
    /// Minutes the candidate occupies in a commission.
    #[must_use]
    pub const fn duration(&self) -> u32 {
        match (self.degree_level, self.counter_supervisor) {
            (DegreeLevel::Bachelors, _) => 15,
            (DegreeLevel::Masters, None) => 20,
            (DegreeLevel::Masters, Some(_)) => 30,
        }
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.surname, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(degree_level: DegreeLevel, counter_supervisor: Option<ProfessorId>) -> Candidate {
        Candidate {
            id: CandidateId(1),
            name: "Ada".to_owned(),
            surname: "Lovelace".to_owned(),
            degree_level,
            supervisor: Some(ProfessorId(1)),
            counter_supervisor,
            assistant_supervisor: None,
        }
    }

    #[test]
    fn duration_follows_degree_and_counter_supervisor() {
        assert_eq!(candidate(DegreeLevel::Bachelors, None).duration(), 15);
        assert_eq!(
            candidate(DegreeLevel::Bachelors, Some(ProfessorId(2))).duration(),
            15
        );
        assert_eq!(candidate(DegreeLevel::Masters, None).duration(), 20);
        assert_eq!(
            candidate(DegreeLevel::Masters, Some(ProfessorId(2))).duration(),
            30
        );
    }
}
