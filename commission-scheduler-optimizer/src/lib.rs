//! Commission scheduling as a mixed-integer program.
//!
//! [`builder::ModelBuilder`] turns a roster into a [`milp::Model`],
//! [`solver::SolverDriver`] solves it with a pluggable engine and
//! [`extract::extract`] turns the assignment back into solution slots.

extern crate alloc;

pub mod builder;
pub mod error;
pub mod extract;
pub mod milp;
pub mod solver;
#[cfg(test)]
mod testing;

use std::io::Write;

use commission_scheduler_model::{Configuration, Roster, SolutionSlot};
use tracing::info;

pub use crate::builder::{CommissionModel, ModelBuilder, SlotLayout};
pub use crate::error::OptimizerError;
pub use crate::extract::extract;
pub use crate::solver::{
    Assignment, EmbeddedEngine, ExternalEngine, MilpEngine, SolveOutcome, SolveRequest,
    SolverDriver, SolverOptions, Status,
};

/// What one build, solve and extract round produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Optimization {
    pub status: Status,
    pub slots: Vec<SolutionSlot>,
    pub message: Option<String>,
}

impl Optimization {
    #[must_use]
    pub const fn reached_optimality(&self) -> bool {
        matches!(self.status, Status::Optimal)
    }

    #[must_use]
    pub const fn hit_time_limit(&self) -> bool {
        matches!(self.status, Status::TimeLimitReached)
    }
}

pub fn optimize(
    roster: &Roster,
    configuration: &Configuration,
    driver: &SolverDriver,
    log: &mut dyn Write,
) -> Result<Optimization, OptimizerError> {
    let built = ModelBuilder::new(roster, configuration).build()?;
    let request = SolveRequest::from_configuration(configuration);
    let outcome = driver.solve(&built.model, &request, log)?;
    let slots = outcome
        .assignment
        .as_ref()
        .map(|assignment| {
            extract(
                assignment,
                &built,
                roster,
                &configuration.version_hash(),
            )
        })
        .unwrap_or_default();
    info!(status = %outcome.status, slots = slots.len(), "optimization finished");
    Ok(Optimization {
        status: outcome.status,
        slots,
        message: outcome.message,
    })
}
