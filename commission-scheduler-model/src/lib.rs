//! Domain types shared by the optimizer, the store and the orchestrator.

pub mod candidate;
pub mod commission;
pub mod configuration;
pub mod professor;
pub mod roster;
pub mod solution;

pub use candidate::{Candidate, CandidateId, DegreeLevel};
pub use commission::{Commission, CommissionId};
pub use configuration::{
    Configuration, ConfigurationError, ConfigurationId, ProfessorQuota, RunState, SolverKind,
    UnknownSolver,
};
pub use professor::{Availability, Professor, ProfessorId, Role};
pub use roster::{Roster, RosterInconsistent, RosterMember, RosterProfessor, RosterRow};
pub use solution::{ExecutionRecord, SolutionSlot};
