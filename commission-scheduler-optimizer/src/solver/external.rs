//! Runs CPLEX, glpsol or Gurobi as a child process on an LP file.

use alloc::collections::BTreeMap;
use std::fs;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use commission_scheduler_model::SolverKind;
use tracing::{debug, warn};

use super::solution_file::{self, ParsedSolution, Values};
use super::{lp_format, Assignment, MilpEngine, SolveOutcome, SolveRequest, SolverOptions, Status};
use crate::error::OptimizerError;
use crate::milp::Model;

#[derive(Debug, Clone)]
pub struct ExternalEngine {
    work_dir: PathBuf,
    executables: BTreeMap<SolverKind, PathBuf>,
}

impl ExternalEngine {
    /// Model and solution files are written into `work_dir`.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            executables: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_executable(mut self, kind: SolverKind, executable: impl Into<PathBuf>) -> Self {
        self.executables.insert(kind, executable.into());
        self
    }

    #[must_use]
    pub fn with_executables(mut self, executables: BTreeMap<SolverKind, PathBuf>) -> Self {
        self.executables.extend(executables);
        self
    }

    #[must_use]
    pub fn executable(&self, kind: SolverKind) -> PathBuf {
        self.executables
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| PathBuf::from(SolverOptions::for_kind(kind).default_executable))
    }

    fn solution_path(&self, kind: SolverKind) -> PathBuf {
        self.work_dir.join(match kind {
            SolverKind::Cplex => "solution.xml",
            SolverKind::Glpk => "solution.txt",
            SolverKind::Gurobi => "solution.sol",
        })
    }

    /// The full command line for one solve, in the kind's own option syntax.
    #[must_use]
    pub fn command(&self, request: &SolveRequest, model_path: &Path) -> Command {
        let options = request.options();
        let solution_path = self.solution_path(request.kind);
        let time_limit = request.time_limit.as_secs();
        let gap = request.relative_gap;
        let mut command = Command::new(self.executable(request.kind));
        match request.kind {
            SolverKind::Cplex => {
                command.arg("-c").args([
                    format!("read {}", model_path.display()),
                    format!("set {} {time_limit}", options.time_limit_key.replace('_', " ")),
                    format!("set {} {gap}", options.gap_key.replace('_', " ")),
                    "optimize".to_owned(),
                    format!("write {} sol", solution_path.display()),
                    "quit".to_owned(),
                ]);
            }
            SolverKind::Glpk => {
                command
                    .arg("--lp")
                    .arg(model_path)
                    .arg(format!("--{}", options.time_limit_key))
                    .arg(time_limit.to_string())
                    .arg(format!("--{}", options.gap_key))
                    .arg(gap.to_string())
                    .arg("-w")
                    .arg(&solution_path);
            }
            SolverKind::Gurobi => {
                command
                    .arg(format!("{}={time_limit}", options.time_limit_key))
                    .arg(format!("{}={gap}", options.gap_key))
                    .arg(format!("ResultFile={}", solution_path.display()))
                    .arg(model_path);
            }
        }
        command
    }

    /// Runs `command`, copying its output into `log` as it arrives.
    ///
    /// Returns the exit success and everything the solver printed.
    fn run(command: &mut Command, log: &mut dyn Write) -> Result<(bool, String), OptimizerError> {
        let executable = PathBuf::from(command.get_program());
        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| OptimizerError::Spawn { executable, source })?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let mut transcript = String::new();
        let errors = thread::scope(|scope| -> io::Result<String> {
            let errors = scope.spawn(move || {
                let mut errors = String::new();
                if let Some(mut stderr) = stderr {
                    stderr.read_to_string(&mut errors)?;
                }
                Ok::<_, io::Error>(errors)
            });
            if let Some(stdout) = stdout {
                let mut reader = BufReader::new(stdout);
                let mut line = String::new();
                while reader.read_line(&mut line)? > 0 {
                    log.write_all(line.as_bytes())?;
                    transcript.push_str(&line);
                    line.clear();
                }
            }
            errors
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("stderr reader panicked")))
        })?;
        if !errors.is_empty() {
            log.write_all(errors.as_bytes())?;
            transcript.push_str(&errors);
        }
        log.flush()?;

        let status = child.wait()?;
        debug!(%status, "solver process exited");
        Ok((status.success(), transcript))
    }

    fn read_solution(
        &self,
        model: &Model,
        kind: SolverKind,
        transcript: &str,
    ) -> Result<Option<(Status, Assignment)>, OptimizerError> {
        let path = self.solution_path(kind);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error.into()),
        };
        let ParsedSolution { status, values } = match kind {
            SolverKind::Cplex => solution_file::parse_cplex(&content)?,
            SolverKind::Glpk => solution_file::parse_glpk(&content, transcript)?,
            SolverKind::Gurobi => solution_file::parse_gurobi(&content)?,
        };
        let status = status
            .or_else(|| solution_file::gurobi_status(transcript))
            .unwrap_or(Status::Optimal);

        let values = match values {
            Values::Named(named) => model
                .variables()
                .iter()
                .map(|variable| named.get(&variable.name).copied().unwrap_or(0.0))
                .collect(),
            Values::Columns(columns) => {
                if columns.len() != model.variables().len() {
                    return Err(OptimizerError::MalformedSolution(format!(
                        "expected {} columns, found {}",
                        model.variables().len(),
                        columns.len()
                    )));
                }
                columns
            }
        };
        Ok(Some((status, Assignment::new(values))))
    }
}

/// Status when the solver left no solution file behind.
fn status_without_solution(kind: SolverKind, transcript: &str) -> Status {
    let infeasible = match kind {
        SolverKind::Cplex => transcript.to_ascii_lowercase().contains("infeasible"),
        SolverKind::Glpk => transcript.contains("PROBLEM HAS NO"),
        SolverKind::Gurobi => {
            solution_file::gurobi_status(transcript) == Some(Status::Infeasible)
        }
    };
    if infeasible {
        Status::Infeasible
    } else {
        Status::SolverError
    }
}

impl MilpEngine for ExternalEngine {
    fn solve(
        &self,
        model: &Model,
        request: &SolveRequest,
        log: &mut dyn Write,
    ) -> Result<SolveOutcome, OptimizerError> {
        fs::create_dir_all(&self.work_dir)?;
        let model_path = self.work_dir.join("model.lp");
        fs::write(&model_path, lp_format::write(model))?;
        let solution_path = self.solution_path(request.kind);
        if solution_path.exists() {
            fs::remove_file(&solution_path)?;
        }

        let mut command = self.command(request, &model_path);
        debug!(?command, "starting external solver");
        let (success, transcript) = Self::run(&mut command, log)?;

        match self.read_solution(model, request.kind, &transcript)? {
            Some((status, assignment)) if status.has_assignment() => {
                if !success {
                    warn!(%status, "solver exited unsuccessfully after writing a solution");
                }
                Ok(SolveOutcome::solved(status, assignment))
            }
            Some((status, _)) => Ok(SolveOutcome::failed(
                status,
                format!("{} finished with status {status}", request.kind),
            )),
            None => {
                let status = status_without_solution(request.kind, &transcript);
                let message = if success {
                    format!("{} wrote no solution ({status})", request.kind)
                } else {
                    format!("{} failed without writing a solution ({status})", request.kind)
                };
                Ok(SolveOutcome::failed(status, message))
            }
        }
    }
}
