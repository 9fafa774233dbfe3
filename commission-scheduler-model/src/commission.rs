use core::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::candidate::Candidate;
use crate::professor::{Professor, ProfessorId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommissionId(pub i32);

impl Display for CommissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// A graduation session: the candidates to examine and every professor they
/// reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commission {
    pub id: CommissionId,
    pub title: String,
    pub candidates: Vec<Candidate>,
    pub professors: Vec<Professor>,
}

impl Commission {
    #[must_use]
    pub fn professor(&self, id: ProfessorId) -> Option<&Professor> {
        self.professors.iter().find(|professor| professor.id == id)
    }
}
