//! CPLEX LP writer, understood by all three external solvers.
//!
//! The objective names every variable, zero coefficients included, so readers
//! that number columns by first appearance (glpsol) number them in `VarId`
//! order.

use core::fmt::Write as _;

use itertools::Itertools;

use crate::milp::{LinearExpr, Model, VarKind};

const TERMS_PER_LINE: usize = 8;

fn number(value: f64) -> String {
    if value == 0.0 {
        "0".to_owned()
    } else {
        format!("{value}")
    }
}

fn terms(model: &Model, terms: impl Iterator<Item = (String, f64)>) -> String {
    let rendered = terms
        .enumerate()
        .map(|(position, (name, coefficient))| {
            let sign = if coefficient < 0.0 { "-" } else { "+" };
            let magnitude = number(coefficient.abs());
            if position == 0 && coefficient >= 0.0 {
                format!("{magnitude} {name}")
            } else {
                format!("{sign} {magnitude} {name}")
            }
        })
        .chunks(TERMS_PER_LINE)
        .into_iter()
        .map(|mut chunk| chunk.join(" "))
        .join("\n   ");
    if rendered.is_empty() {
        // an empty row still needs a variable to be valid LP
        model
            .variables()
            .first()
            .map(|variable| format!("0 {}", variable.name))
            .unwrap_or_default()
    } else {
        rendered
    }
}

fn row(model: &Model, expr: &LinearExpr) -> String {
    terms(
        model,
        expr.terms()
            .map(|(var, coefficient)| (model.variable(var).name.clone(), coefficient)),
    )
}

pub fn write(model: &Model) -> String {
    let mut out = String::new();
    let objective = model.objective();
    let objective_terms = model.variable_ids().map(|var| {
        let coefficient = objective
            .terms()
            .find(|(candidate, _)| *candidate == var)
            .map_or(0.0, |(_, coefficient)| coefficient);
        (model.variable(var).name.clone(), coefficient)
    });

    let _ = writeln!(out, "\\ commission schedule");
    let _ = writeln!(out, "Maximize");
    let _ = writeln!(out, " obj: {}", terms(model, objective_terms));
    let _ = writeln!(out, "Subject To");
    for constraint in model.constraints() {
        let _ = writeln!(
            out,
            " {}: {} {} {}",
            constraint.name,
            row(model, &constraint.lhs),
            constraint.sense,
            number(constraint.rhs)
        );
    }

    let _ = writeln!(out, "Bounds");
    for variable in model.variables() {
        match variable.kind {
            VarKind::Free => {
                let _ = writeln!(out, " {} free", variable.name);
            }
            VarKind::Integer { min } => {
                let _ = writeln!(out, " {} >= {}", variable.name, number(min));
            }
            VarKind::Binary => {}
        }
    }

    let generals = model
        .variables()
        .iter()
        .filter(|variable| matches!(variable.kind, VarKind::Integer { .. }))
        .map(|variable| variable.name.as_str())
        .collect_vec();
    if !generals.is_empty() {
        let _ = writeln!(out, "Generals");
        let _ = writeln!(out, " {}", generals.join(" "));
    }

    let binaries = model
        .variables()
        .iter()
        .filter(|variable| variable.kind == VarKind::Binary)
        .map(|variable| variable.name.as_str())
        .chunks(TERMS_PER_LINE)
        .into_iter()
        .map(|mut chunk| chunk.join(" "))
        .collect_vec();
    if !binaries.is_empty() {
        let _ = writeln!(out, "Binaries");
        for line in binaries {
            let _ = writeln!(out, " {line}");
        }
    }
    let _ = writeln!(out, "End");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::milp::{Constraint, Sense};

    #[test]
    fn writes_sections_in_order() {
        let mut model = Model::default();
        let x = model.add_variable("x_c1_s0", VarKind::Binary);
        let y = model.add_variable("y_s0", VarKind::Binary);
        let w = model.add_variable("w", VarKind::Free);
        let n = model.add_variable("min_doc", VarKind::Integer { min: 0.0 });
        model.add_constraint(Constraint::new(
            "capacity_s0",
            30.0 * x,
            Sense::LessEqual,
            210.0 * y,
        ));
        model.add_constraint(Constraint::new("doc_floor", n, Sense::GreaterEqual, 2.0));
        model.set_objective(10_000.0 * w - y);

        let lp = write(&model);
        let expected = "\\ commission schedule
Maximize
 obj: 0 x_c1_s0 - 1 y_s0 + 10000 w + 0 min_doc
Subject To
 capacity_s0: 30 x_c1_s0 - 210 y_s0 <= 0
 doc_floor: 1 min_doc >= 2
Bounds
 w free
 min_doc >= 0
Generals
 min_doc
Binaries
 x_c1_s0 y_s0
End
";
        assert_eq!(lp, expected);
    }

    #[test]
    fn long_rows_are_wrapped() {
        let mut model = Model::default();
        let vars = (0..10)
            .map(|index| model.add_variable(format!("v{index}"), VarKind::Binary))
            .collect_vec();
        let sum = vars
            .iter()
            .map(|var| LinearExpr::from(*var))
            .sum::<LinearExpr>();
        model.add_constraint(Constraint::new("sum", sum, Sense::Equal, 1.0));

        let lp = write(&model);
        assert!(lp.contains(" sum: 1 v0 + 1 v1"));
        assert!(lp.contains("+ 1 v7\n   + 1 v8 + 1 v9 = 1"));
    }
}
