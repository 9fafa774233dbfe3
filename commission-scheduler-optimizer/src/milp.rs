//! A small, solver-neutral mixed-integer model.
//!
//! Engines lower a [`Model`] onto whatever they talk to; nothing in here knows
//! about a concrete backend.

use alloc::collections::BTreeMap;
use core::fmt::{self, Display};
use core::iter::Sum;
use core::ops::{Add, AddAssign, Mul, Neg, Sub};

const TOLERANCE: f64 = 1e-6;

/// Index of a variable inside its [`Model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(usize);

impl VarId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VarKind {
    Binary,
    /// Integer with a lower bound and no upper bound.
    Integer { min: f64 },
    /// Unbounded continuous.
    Free,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub kind: VarKind,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    terms: BTreeMap<VarId, f64>,
    constant: f64,
}

impl LinearExpr {
    #[must_use]
    pub fn constant(value: f64) -> Self {
        Self {
            terms: BTreeMap::new(),
            constant: value,
        }
    }

    pub fn add_term(&mut self, var: VarId, coefficient: f64) {
        *self.terms.entry(var).or_default() += coefficient;
    }

    /// Non-zero terms in variable order.
    pub fn terms(&self) -> impl Iterator<Item = (VarId, f64)> + '_ {
        self.terms
            .iter()
            .filter(|(_, coefficient)| **coefficient != 0.0)
            .map(|(var, coefficient)| (*var, *coefficient))
    }

    #[must_use]
    pub const fn constant_term(&self) -> f64 {
        self.constant
    }

    #[must_use]
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms()
            .map(|(var, coefficient)| coefficient * values.get(var.0).copied().unwrap_or(0.0))
            .sum::<f64>()
            + self.constant
    }
}

impl From<VarId> for LinearExpr {
    fn from(var: VarId) -> Self {
        let mut expr = Self::default();
        expr.add_term(var, 1.0);
        expr
    }
}

impl From<f64> for LinearExpr {
    fn from(value: f64) -> Self {
        Self::constant(value)
    }
}

impl<T: Into<Self>> AddAssign<T> for LinearExpr {
    fn add_assign(&mut self, rhs: T) {
        let rhs: Self = rhs.into();
        for (var, coefficient) in rhs.terms {
            self.add_term(var, coefficient);
        }
        self.constant += rhs.constant;
    }
}

impl<T: Into<Self>> Add<T> for LinearExpr {
    type Output = Self;

    fn add(mut self, rhs: T) -> Self {
        self += rhs;
        self
    }
}

impl<T: Into<Self>> Sub<T> for LinearExpr {
    type Output = Self;

    fn sub(mut self, rhs: T) -> Self {
        let rhs: Self = rhs.into();
        self += -rhs;
        self
    }
}

impl Neg for LinearExpr {
    type Output = Self;

    fn neg(self) -> Self {
        self * -1.0
    }
}

impl Mul<f64> for LinearExpr {
    type Output = Self;

    fn mul(mut self, rhs: f64) -> Self {
        for coefficient in self.terms.values_mut() {
            *coefficient *= rhs;
        }
        self.constant *= rhs;
        self
    }
}

impl Mul<VarId> for f64 {
    type Output = LinearExpr;

    fn mul(self, rhs: VarId) -> LinearExpr {
        let mut expr = LinearExpr::default();
        expr.add_term(rhs, self);
        expr
    }
}

impl Sub<VarId> for VarId {
    type Output = LinearExpr;

    fn sub(self, rhs: VarId) -> LinearExpr {
        LinearExpr::from(self) - rhs
    }
}

impl Sum for LinearExpr {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, expr| acc + expr)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    LessEqual,
    GreaterEqual,
    Equal,
}

impl Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LessEqual => "<=",
            Self::GreaterEqual => ">=",
            Self::Equal => "=",
        })
    }
}

/// `lhs sense rhs` with every variable on the left and the constant on the right.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub name: String,
    pub lhs: LinearExpr,
    pub sense: Sense,
    pub rhs: f64,
}

impl Constraint {
    pub fn new(
        name: impl Into<String>,
        lhs: impl Into<LinearExpr>,
        sense: Sense,
        rhs: impl Into<LinearExpr>,
    ) -> Self {
        let lhs: LinearExpr = lhs.into();
        let rhs: LinearExpr = rhs.into();
        let mut lhs = lhs - rhs;
        let rhs = -lhs.constant;
        lhs.constant = 0.0;
        Self {
            name: name.into(),
            lhs,
            sense,
            rhs,
        }
    }

    #[must_use]
    pub fn is_satisfied(&self, values: &[f64]) -> bool {
        let lhs = self.lhs.evaluate(values);
        match self.sense {
            Sense::LessEqual => lhs <= self.rhs + TOLERANCE,
            Sense::GreaterEqual => lhs >= self.rhs - TOLERANCE,
            Sense::Equal => (lhs - self.rhs).abs() <= TOLERANCE,
        }
    }
}

/// A maximisation problem.
#[derive(Debug, Clone, Default)]
pub struct Model {
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
    objective: LinearExpr,
}

impl Model {
    pub fn add_variable(&mut self, name: impl Into<String>, kind: VarKind) -> VarId {
        self.variables.push(Variable {
            name: name.into(),
            kind,
        });
        VarId(self.variables.len() - 1)
    }

    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn set_objective(&mut self, objective: LinearExpr) {
        self.objective = objective;
    }

    #[must_use]
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable_ids(&self) -> impl Iterator<Item = VarId> {
        (0..self.variables.len()).map(VarId)
    }

    #[must_use]
    pub fn variable(&self, var: VarId) -> &Variable {
        &self.variables[var.0]
    }

    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    #[must_use]
    pub fn constraint(&self, name: &str) -> Option<&Constraint> {
        self.constraints
            .iter()
            .find(|constraint| constraint.name == name)
    }

    #[must_use]
    pub const fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    /// Name of the first constraint `values` violates, if any.
    #[must_use]
    pub fn violated_constraint(&self, values: &[f64]) -> Option<&str> {
        self.constraints
            .iter()
            .find(|constraint| !constraint.is_satisfied(values))
            .map(|constraint| constraint.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraints_move_constants_to_the_right() {
        let mut model = Model::default();
        let x = model.add_variable("x", VarKind::Binary);
        let y = model.add_variable("y", VarKind::Binary);

        // 3x >= 2y - 5 + 1
        let constraint = Constraint::new(
            "c",
            3.0 * x,
            Sense::GreaterEqual,
            2.0 * y - 5.0 + LinearExpr::constant(1.0),
        );
        assert_eq!(
            constraint.lhs.terms().collect::<Vec<_>>(),
            vec![(x, 3.0), (y, -2.0)]
        );
        assert!((constraint.rhs + 4.0).abs() < f64::EPSILON);
        assert!(constraint.is_satisfied(&[0.0, 1.0]));
    }

    #[test]
    fn cancelled_terms_are_skipped() {
        let mut model = Model::default();
        let x = model.add_variable("x", VarKind::Free);
        let expr = LinearExpr::from(x) - x + 2.0;
        assert_eq!(expr.terms().count(), 0);
        assert!((expr.evaluate(&[10.0]) - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn violated_constraint_is_reported_by_name() {
        let mut model = Model::default();
        let x = model.add_variable("x", VarKind::Integer { min: 0.0 });
        model.add_constraint(Constraint::new("cap", x, Sense::LessEqual, 3.0));
        model.add_constraint(Constraint::new("pin", x, Sense::Equal, 2.0));

        assert_eq!(model.violated_constraint(&[2.0]), None);
        assert_eq!(model.violated_constraint(&[4.0]), Some("cap"));
        assert_eq!(model.violated_constraint(&[1.0]), Some("pin"));
    }
}
