//! Solver-neutral invocation of a MILP engine.

pub mod embedded;
pub mod external;
mod lp_format;
mod solution_file;

use core::fmt::{self, Display};
use core::time::Duration;
use std::io::Write;

use commission_scheduler_model::{Configuration, SolverKind};
use tracing::{info, warn};

pub use self::embedded::EmbeddedEngine;
pub use self::external::ExternalEngine;
use crate::error::OptimizerError;
use crate::milp::{Model, VarId};

/// A binary variable counts as set above this value.
pub const BINARY_THRESHOLD: f64 = 0.8;

/// How a solver kind spells its options and where it lives by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverOptions {
    pub kind: SolverKind,
    pub time_limit_key: &'static str,
    pub gap_key: &'static str,
    pub default_executable: &'static str,
}

impl SolverOptions {
    #[must_use]
    pub const fn for_kind(kind: SolverKind) -> Self {
        let (time_limit_key, gap_key, default_executable) = match kind {
            SolverKind::Cplex => (
                "timelimit",
                "mip_tolerances_mipgap",
                "/opt/ibm/ILOG/CPLEX_Studio128/cplex/bin/x86-64_linux/cplex",
            ),
            SolverKind::Glpk => ("tmlim", "mipgap", "glpsol"),
            SolverKind::Gurobi => ("TimeLimit", "MIPGap", "gurobi_cl"),
        };
        Self {
            kind,
            time_limit_key,
            gap_key,
            default_executable,
        }
    }

    pub fn by_name(name: &str) -> Result<Self, OptimizerError> {
        Ok(Self::for_kind(name.parse()?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Optimal,
    TimeLimitReached,
    Infeasible,
    SolverError,
}

impl Status {
    /// Only these statuses come with a usable assignment.
    #[must_use]
    pub const fn has_assignment(self) -> bool {
        matches!(self, Self::Optimal | Self::TimeLimitReached)
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Optimal => "optimal",
            Self::TimeLimitReached => "time limit reached",
            Self::Infeasible => "infeasible",
            Self::SolverError => "solver error",
        })
    }
}

/// Variable values indexed by [`VarId`].
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    values: Vec<f64>,
}

impl Assignment {
    #[must_use]
    pub const fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    #[must_use]
    pub fn value(&self, var: VarId) -> f64 {
        self.values.get(var.index()).copied().unwrap_or(0.0)
    }

    #[must_use]
    pub fn is_set(&self, var: VarId) -> bool {
        self.value(var) > BINARY_THRESHOLD
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    pub status: Status,
    pub assignment: Option<Assignment>,
    /// Why the engine could not produce an assignment, when it knows.
    pub message: Option<String>,
}

impl SolveOutcome {
    #[must_use]
    pub const fn solved(status: Status, assignment: Assignment) -> Self {
        Self {
            status,
            assignment: Some(assignment),
            message: None,
        }
    }

    pub fn failed(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            assignment: None,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveRequest {
    pub kind: SolverKind,
    pub time_limit: Duration,
    pub relative_gap: f64,
}

impl SolveRequest {
    #[must_use]
    pub fn from_configuration(configuration: &Configuration) -> Self {
        Self {
            kind: configuration.solver,
            time_limit: Duration::from_secs(u64::from(configuration.time_limit_seconds)),
            relative_gap: configuration.relative_gap,
        }
    }

    #[must_use]
    pub const fn options(&self) -> SolverOptions {
        SolverOptions::for_kind(self.kind)
    }
}

pub trait MilpEngine: Send + Sync {
    /// Solves synchronously, writing the engine's progress output to `log`.
    fn solve(
        &self,
        model: &Model,
        request: &SolveRequest,
        log: &mut dyn Write,
    ) -> Result<SolveOutcome, OptimizerError>;
}

pub struct SolverDriver {
    engine: Box<dyn MilpEngine>,
}

impl SolverDriver {
    pub fn new(engine: impl MilpEngine + 'static) -> Self {
        Self {
            engine: Box::new(engine),
        }
    }

    pub fn solve(
        &self,
        model: &Model,
        request: &SolveRequest,
        log: &mut dyn Write,
    ) -> Result<SolveOutcome, OptimizerError> {
        info!(
            solver = %request.kind,
            time_limit_seconds = request.time_limit.as_secs(),
            relative_gap = request.relative_gap,
            variables = model.variables().len(),
            "solving commission model"
        );
        let mut outcome = self.engine.solve(model, request, log)?;
        if !outcome.status.has_assignment() {
            outcome.assignment = None;
        }
        if outcome.status.has_assignment() && outcome.assignment.is_none() {
            warn!(status = %outcome.status, "solver reported success without values");
            outcome = SolveOutcome::failed(Status::SolverError, "solver returned no values");
        }
        info!(status = %outcome.status, "solver finished");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_table_is_fixed() {
        let cplex = SolverOptions::for_kind(SolverKind::Cplex);
        assert_eq!(cplex.time_limit_key, "timelimit");
        assert_eq!(cplex.gap_key, "mip_tolerances_mipgap");

        let glpk = SolverOptions::by_name("glpk").unwrap();
        assert_eq!((glpk.time_limit_key, glpk.gap_key), ("tmlim", "mipgap"));
        assert_eq!(glpk.default_executable, "glpsol");

        let gurobi = SolverOptions::by_name("gurobi").unwrap();
        assert_eq!((gurobi.time_limit_key, gurobi.gap_key), ("TimeLimit", "MIPGap"));
    }

    #[test]
    fn unknown_solver_names_are_rejected() {
        assert!(matches!(
            SolverOptions::by_name("scip"),
            Err(OptimizerError::UnknownSolver(_))
        ));
    }

    #[test]
    fn binaries_use_the_threshold() {
        let assignment = Assignment::new(vec![0.81, 0.8, 0.0]);
        let mut model = Model::default();
        let vars: Vec<VarId> = (0..3)
            .map(|index| model.add_variable(format!("v{index}"), crate::milp::VarKind::Binary))
            .collect();
        assert!(assignment.is_set(vars[0]));
        assert!(!assignment.is_set(vars[1]));
        assert!(!assignment.is_set(vars[2]));
    }

    struct Broken;

    impl MilpEngine for Broken {
        fn solve(
            &self,
            _model: &Model,
            _request: &SolveRequest,
            _log: &mut dyn Write,
        ) -> Result<SolveOutcome, OptimizerError> {
            Ok(SolveOutcome {
                status: Status::Infeasible,
                assignment: Some(Assignment::new(vec![1.0])),
                message: None,
            })
        }
    }

    #[test]
    fn failed_statuses_never_carry_values() {
        let request = SolveRequest {
            kind: SolverKind::Glpk,
            time_limit: Duration::from_secs(1),
            relative_gap: 0.0,
        };
        let outcome = SolverDriver::new(Broken)
            .solve(&Model::default(), &request, &mut Vec::new())
            .unwrap();
        assert_eq!(outcome.status, Status::Infeasible);
        assert!(outcome.assignment.is_none());
    }
}
