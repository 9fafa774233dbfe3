//! In-process solving through `good_lp`.
//!
//! The bundled backend has no time limit or gap setting, both are only
//! reported in the log.

use std::io::Write;

use good_lp::constraint::{eq, geq, leq};
use good_lp::solvers::ObjectiveDirection::Maximisation;
use good_lp::{
    default_solver, variable, Expression, ProblemVariables, ResolutionError, Solution,
    SolverModel, Variable,
};
use tracing::debug;

use super::{Assignment, MilpEngine, SolveOutcome, SolveRequest, Status};
use crate::error::OptimizerError;
use crate::milp::{LinearExpr, Model, Sense, VarKind};

#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedEngine;

fn lower(expr: &LinearExpr, handles: &[Variable]) -> Expression {
    let mut lowered = Expression::from(expr.constant_term());
    for (var, coefficient) in expr.terms() {
        lowered += coefficient * handles[var.index()];
    }
    lowered
}

impl MilpEngine for EmbeddedEngine {
    fn solve(
        &self,
        model: &Model,
        request: &SolveRequest,
        log: &mut dyn Write,
    ) -> Result<SolveOutcome, OptimizerError> {
        writeln!(
            log,
            "embedded solver: {} variables, {} constraints, requested time limit {}s and gap {} \
             are not enforced",
            model.variables().len(),
            model.constraints().len(),
            request.time_limit.as_secs(),
            request.relative_gap,
        )?;

        let mut variables = ProblemVariables::new();
        let handles: Vec<Variable> = model
            .variables()
            .iter()
            .map(|definition| {
                let handle = variable().name(definition.name.clone());
                variables.add(match definition.kind {
                    VarKind::Binary => handle.binary(),
                    VarKind::Integer { min } => handle.integer().min(min),
                    VarKind::Free => handle,
                })
            })
            .collect();

        let objective = lower(model.objective(), &handles);
        let mut problem = variables
            .optimise(Maximisation, objective)
            .using(default_solver);
        for constraint in model.constraints() {
            let lhs = lower(&constraint.lhs, &handles);
            let rhs = Expression::from(constraint.rhs);
            problem = problem.with(match constraint.sense {
                Sense::LessEqual => leq(lhs, rhs),
                Sense::GreaterEqual => geq(lhs, rhs),
                Sense::Equal => eq(lhs, rhs),
            });
        }

        let outcome = match problem.solve() {
            Ok(solution) => {
                let values = handles
                    .iter()
                    .map(|handle| solution.value(*handle))
                    .collect();
                SolveOutcome::solved(Status::Optimal, Assignment::new(values))
            }
            Err(ResolutionError::Infeasible) => {
                SolveOutcome::failed(Status::Infeasible, "the model is infeasible")
            }
            Err(error) => SolveOutcome::failed(Status::SolverError, error.to_string()),
        };
        debug!(status = %outcome.status, "embedded solver done");
        writeln!(log, "embedded solver: {}", outcome.status)?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use core::time::Duration;

    use commission_scheduler_model::SolverKind;

    use super::*;
    use crate::milp::Constraint;

    fn request() -> SolveRequest {
        SolveRequest {
            kind: SolverKind::Cplex,
            time_limit: Duration::from_secs(5),
            relative_gap: 0.0,
        }
    }

    #[test]
    fn solves_a_small_knapsack() {
        let mut model = Model::default();
        let a = model.add_variable("a", VarKind::Binary);
        let b = model.add_variable("b", VarKind::Binary);
        let c = model.add_variable("c", VarKind::Binary);
        model.add_constraint(Constraint::new(
            "weight",
            3.0 * a + 4.0 * b + 2.0 * c,
            Sense::LessEqual,
            6.0,
        ));
        model.set_objective(5.0 * a + 6.0 * b + 3.0 * c);

        let mut log = Vec::new();
        let outcome = EmbeddedEngine.solve(&model, &request(), &mut log).unwrap();
        assert_eq!(outcome.status, Status::Optimal);
        let assignment = outcome.assignment.unwrap();
        assert!(!assignment.is_set(a));
        assert!(assignment.is_set(b));
        assert!(assignment.is_set(c));
        assert!(String::from_utf8(log).unwrap().contains("not enforced"));
    }

    #[test]
    fn reports_infeasibility() {
        let mut model = Model::default();
        let a = model.add_variable("a", VarKind::Binary);
        model.add_constraint(Constraint::new("low", a, Sense::GreaterEqual, 2.0));
        model.set_objective(LinearExpr::from(a));

        let outcome = EmbeddedEngine
            .solve(&model, &request(), &mut Vec::new())
            .unwrap();
        assert_eq!(outcome.status, Status::Infeasible);
        assert!(outcome.assignment.is_none());
    }
}
