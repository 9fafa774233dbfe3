//! Readers for the solution files the external solvers write.

use std::collections::HashMap;

use super::Status;
use crate::error::OptimizerError;

/// Values keyed by variable name or by 1-based column number.
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    Named(HashMap<String, f64>),
    Columns(Vec<f64>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSolution {
    /// Status read from the file itself. Gurobi does not write one.
    pub status: Option<Status>,
    pub values: Values,
}

fn attribute<'a>(tag: &'a str, key: &str) -> Option<&'a str> {
    let needle = format!("{key}=\"");
    let start = tag
        .match_indices(&needle)
        .find(|(position, _)| {
            tag[..*position]
                .chars()
                .next_back()
                .is_some_and(char::is_whitespace)
        })
        .map(|(position, _)| position + needle.len())?;
    let end = tag[start..].find('"')?;
    Some(&tag[start..start + end])
}

/// The bodies of every `<name ...>` element, without the leading `<`.
fn elements<'a>(content: &'a str, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    content.split('<').filter(move |tag| {
        tag.strip_prefix(name)
            .and_then(|rest| rest.chars().next())
            .is_some_and(|next| next.is_whitespace() || next == '/' || next == '>')
    })
}

fn number(value: &str, context: &str) -> Result<f64, OptimizerError> {
    value
        .trim()
        .parse()
        .map_err(|_| OptimizerError::MalformedSolution(format!("{context}: {value:?} is not a number")))
}

/// `<CPLEXSolution>` XML as written by `write <file> sol`.
pub fn parse_cplex(content: &str) -> Result<ParsedSolution, OptimizerError> {
    let header = elements(content, "header")
        .next()
        .ok_or_else(|| OptimizerError::MalformedSolution("missing CPLEX header".to_owned()))?;
    let status_value = attribute(header, "solutionStatusValue").ok_or_else(|| {
        OptimizerError::MalformedSolution("missing solutionStatusValue".to_owned())
    })?;
    let status = match status_value {
        // optimal, integer optimal, optimal within tolerance
        "1" | "101" | "102" => Status::Optimal,
        // time limit exceeded with an integer solution
        "11" | "107" => Status::TimeLimitReached,
        "3" | "103" => Status::Infeasible,
        _ => Status::SolverError,
    };

    let mut values = HashMap::new();
    for tag in elements(content, "variable") {
        let (Some(name), Some(value)) = (attribute(tag, "name"), attribute(tag, "value")) else {
            return Err(OptimizerError::MalformedSolution(format!(
                "incomplete variable element <{}",
                tag.trim()
            )));
        };
        values.insert(name.to_owned(), number(value, name)?);
    }
    Ok(ParsedSolution {
        status: Some(status),
        values: Values::Named(values),
    })
}

/// glpsol raw MIP solution (`-w`). `transcript` is glpsol's console output,
/// needed to tell a time limit from a gap stop.
pub fn parse_glpk(content: &str, transcript: &str) -> Result<ParsedSolution, OptimizerError> {
    let mut status = None;
    let mut columns = Vec::new();
    for line in content.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.as_slice() {
            ["s", "mip", _rows, _cols, flag, ..] => {
                status = Some(match *flag {
                    "o" => Status::Optimal,
                    "f" if transcript.contains("TIME LIMIT EXCEEDED") => Status::TimeLimitReached,
                    "f" => Status::Optimal,
                    "n" => Status::Infeasible,
                    _ => Status::SolverError,
                });
            }
            ["s", kind, ..] => {
                return Err(OptimizerError::MalformedSolution(format!(
                    "expected a mip solution, found {kind}"
                )));
            }
            ["j", column, value] => {
                let column: usize = column.parse().map_err(|_| {
                    OptimizerError::MalformedSolution(format!("bad column number {column:?}"))
                })?;
                if column == 0 {
                    return Err(OptimizerError::MalformedSolution(
                        "column numbers start at 1".to_owned(),
                    ));
                }
                if columns.len() < column {
                    columns.resize(column, 0.0);
                }
                columns[column - 1] = number(value, "column value")?;
            }
            _ => {}
        }
    }
    let status =
        status.ok_or_else(|| OptimizerError::MalformedSolution("missing status line".to_owned()))?;
    Ok(ParsedSolution {
        status: Some(status),
        values: Values::Columns(columns),
    })
}

/// Gurobi `.sol`: comment lines starting with `#`, then `name value` pairs.
pub fn parse_gurobi(content: &str) -> Result<ParsedSolution, OptimizerError> {
    let mut values = HashMap::new();
    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((name, value)) = line.split_once(char::is_whitespace) else {
            return Err(OptimizerError::MalformedSolution(format!(
                "unexpected line {line:?}"
            )));
        };
        values.insert(name.to_owned(), number(value, name)?);
    }
    Ok(ParsedSolution {
        status: None,
        values: Values::Named(values),
    })
}

/// Termination status from a Gurobi console transcript.
pub fn gurobi_status(transcript: &str) -> Option<Status> {
    if transcript.contains("Optimal solution found") {
        Some(Status::Optimal)
    } else if transcript.contains("Time limit reached") {
        Some(Status::TimeLimitReached)
    } else if transcript.contains("Model is infeasible") || transcript.contains("Infeasible model")
    {
        Some(Status::Infeasible)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CPLEX: &str = r#"<?xml version = "1.0" encoding="UTF-8" standalone="yes"?>
<CPLEXSolution version="1.2">
 <header
   problemName="model.lp"
   solutionName="incumbent"
   objectiveValue="299999"
   solutionTypeValue="3"
   solutionStatusValue="101"
   solutionStatusString="integer optimal solution"
   MIPNodes="0"/>
 <variables>
  <variable name="x_c1_s0" index="0" value="1"/>
  <variable name="y_s1" index="1" value="-0"/>
  <variable name="w" index="2" value="30"/>
 </variables>
</CPLEXSolution>
"#;

    #[test]
    fn reads_cplex_xml() {
        let parsed = parse_cplex(CPLEX).unwrap();
        assert_eq!(parsed.status, Some(Status::Optimal));
        let Values::Named(values) = parsed.values else {
            panic!("cplex values are named");
        };
        assert_eq!(values.get("x_c1_s0"), Some(&1.0));
        assert_eq!(values.get("w"), Some(&30.0));
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn cplex_time_limit_and_infeasible_codes() {
        let time_limit = CPLEX.replace("\"101\"", "\"107\"");
        assert_eq!(
            parse_cplex(&time_limit).unwrap().status,
            Some(Status::TimeLimitReached)
        );
        let infeasible = CPLEX.replace("\"101\"", "\"103\"");
        assert_eq!(
            parse_cplex(&infeasible).unwrap().status,
            Some(Status::Infeasible)
        );
        assert!(parse_cplex("<CPLEXSolution/>").is_err());
    }

    const GLPK: &str = "c Problem:    \n\
                        c Rows:       2\n\
                        s mip 2 3 f 30\n\
                        i 1 30\n\
                        i 2 0\n\
                        j 1 1\n\
                        j 2 0\n\
                        j 3 30\n\
                        e o f\n";

    #[test]
    fn reads_glpk_raw_columns() {
        let parsed = parse_glpk(GLPK, "INTEGER OPTIMAL SOLUTION FOUND").unwrap();
        assert_eq!(parsed.status, Some(Status::Optimal));
        assert_eq!(parsed.values, Values::Columns(vec![1.0, 0.0, 30.0]));

        let limited = parse_glpk(GLPK, "TIME LIMIT EXCEEDED; SEARCH TERMINATED").unwrap();
        assert_eq!(limited.status, Some(Status::TimeLimitReached));

        let infeasible = GLPK.replace("s mip 2 3 f 30", "s mip 2 3 n 0");
        assert_eq!(
            parse_glpk(&infeasible, "").unwrap().status,
            Some(Status::Infeasible)
        );
    }

    #[test]
    fn rejects_glpk_lp_solutions() {
        assert!(parse_glpk("s bas 2 3 f f 30\n", "").is_err());
        assert!(parse_glpk("j 1 1\n", "").is_err());
    }

    #[test]
    fn reads_gurobi_sol_and_transcript() {
        let parsed = parse_gurobi("# Objective value = 299999\nx_c1_s0 1\nw 30\n\n").unwrap();
        assert_eq!(parsed.status, None);
        let Values::Named(values) = parsed.values else {
            panic!("gurobi values are named");
        };
        assert_eq!(values.get("w"), Some(&30.0));

        assert_eq!(
            gurobi_status("Explored 1 nodes\nOptimal solution found (tolerance 5.00e-03)"),
            Some(Status::Optimal)
        );
        assert_eq!(
            gurobi_status("Time limit reached\nBest objective 2.9e+05"),
            Some(Status::TimeLimitReached)
        );
        assert_eq!(gurobi_status("Model is infeasible"), Some(Status::Infeasible));
        assert_eq!(gurobi_status("Segmentation fault"), None);
    }
}
