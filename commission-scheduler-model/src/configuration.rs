use core::fmt::{self, Display};
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::commission::CommissionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigurationId(pub i32);

impl Display for ConfigurationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown solver {0:?}, expected one of cplex, glpk, gurobi")]
pub struct UnknownSolver(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    #[default]
    Cplex,
    Glpk,
    Gurobi,
}

impl SolverKind {
    pub const ALL: [Self; 3] = [Self::Cplex, Self::Glpk, Self::Gurobi];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cplex => "cplex",
            Self::Glpk => "glpk",
            Self::Gurobi => "gurobi",
        }
    }
}

impl Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SolverKind {
    type Err = UnknownSolver;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| UnknownSolver(value.to_owned()))
    }
}

/// Where a configuration is in its solve lifecycle.
///
/// Leaving `Idle` is the run-lock: it happens once, under an atomic
/// check-and-set, and nothing in this workspace moves a configuration back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

impl RunState {
    #[must_use]
    pub const fn is_locked(self) -> bool {
        !matches!(self, Self::Idle)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        [Self::Idle, Self::Running, Self::Completed, Self::Failed]
            .into_iter()
            .find(|state| state.as_str() == value)
    }
}

impl Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error(
        "online mode needs min_professors, max_professors and \
         min_ordinary_professors_for_masters"
    )]
    MissingOnlineBounds,
    #[error("min_professors ({min}) must not exceed max_professors ({max})")]
    ProfessorBounds { min: u32, max: u32 },
    #[error(
        "min_ordinary_professors_for_masters ({min}) must not exceed max_professors ({max})"
    )]
    OrdinaryBounds { min: u32, max: u32 },
    #[error("at least one morning or afternoon slot is needed")]
    NoSlots,
    #[error("max_slot_duration must be positive")]
    ZeroDuration,
    #[error("relative gap {0} is outside of [0, 1]")]
    Gap(f64),
}

/// Professor-count bounds, only present in online mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfessorQuota {
    pub min_professors: u32,
    pub max_professors: u32,
    pub min_ordinary_for_masters: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub id: ConfigurationId,
    pub commission_id: CommissionId,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_max_slot_duration")]
    pub max_slot_duration: u32,
    #[serde(default = "default_slot_pool")]
    pub max_morning_slots: u32,
    #[serde(default = "default_slot_pool")]
    pub max_afternoon_slots: u32,
    #[serde(default)]
    pub online_mode: bool,
    #[serde(default)]
    pub min_professors: Option<u32>,
    #[serde(default)]
    pub max_professors: Option<u32>,
    #[serde(default)]
    pub min_ordinary_professors_for_masters: Option<u32>,
    #[serde(default)]
    pub solver: SolverKind,
    #[serde(default = "default_time_limit")]
    pub time_limit_seconds: u32,
    #[serde(default = "default_relative_gap")]
    pub relative_gap: f64,
    #[serde(default)]
    pub run_state: RunState,
}

const fn default_max_slot_duration() -> u32 {
    210
}

const fn default_slot_pool() -> u32 {
    6
}

const fn default_time_limit() -> u32 {
    60
}

const fn default_relative_gap() -> f64 {
    0.005
}

impl Configuration {
    #[must_use]
    pub fn new(id: ConfigurationId, commission_id: CommissionId) -> Self {
        Self {
            id,
            commission_id,
            title: String::new(),
            max_slot_duration: default_max_slot_duration(),
            max_morning_slots: default_slot_pool(),
            max_afternoon_slots: default_slot_pool(),
            online_mode: false,
            min_professors: None,
            max_professors: None,
            min_ordinary_professors_for_masters: None,
            solver: SolverKind::default(),
            time_limit_seconds: default_time_limit(),
            relative_gap: default_relative_gap(),
            run_state: RunState::Idle,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_morning_slots == 0 && self.max_afternoon_slots == 0 {
            return Err(ConfigurationError::NoSlots);
        }
        if self.max_slot_duration == 0 {
            return Err(ConfigurationError::ZeroDuration);
        }
        if !(0.0..=1.0).contains(&self.relative_gap) {
            return Err(ConfigurationError::Gap(self.relative_gap));
        }
        self.quota().map(|_| ())
    }

    /// The online-mode bounds, `None` offline.
    pub fn quota(&self) -> Result<Option<ProfessorQuota>, ConfigurationError> {
        if !self.online_mode {
            return Ok(None);
        }
        let (Some(min), Some(max), Some(ordinary)) = (
            self.min_professors,
            self.max_professors,
            self.min_ordinary_professors_for_masters,
        ) else {
            return Err(ConfigurationError::MissingOnlineBounds);
        };
        if min > max {
            return Err(ConfigurationError::ProfessorBounds { min, max });
        }
        if ordinary > max {
            return Err(ConfigurationError::OrdinaryBounds { min: ordinary, max });
        }
        Ok(Some(ProfessorQuota {
            min_professors: min,
            max_professors: max,
            min_ordinary_for_masters: ordinary,
        }))
    }

    /// Offline configurations carry no quota bounds.
    pub fn clear_offline_bounds(&mut self) {
        if !self.online_mode {
            self.min_professors = None;
            self.max_professors = None;
            self.min_ordinary_professors_for_masters = None;
        }
    }

    #[must_use]
    pub const fn slot_count(&self) -> u32 {
        self.max_morning_slots + self.max_afternoon_slots
    }

    /// Hex SHA-256 over every field that changes what the solver computes.
    ///
    /// The id, title and run state are left out so renaming a configuration
    /// or locking it does not change its provenance.
    #[must_use]
    pub fn version_hash(&self) -> String {
        let canonical = format!(
            "commission={};max_slot_duration={};morning={};afternoon={};online={};\
             min_professors={:?};max_professors={:?};min_ordinary_masters={:?};solver={};\
             time_limit={};gap={:?}",
            self.commission_id,
            self.max_slot_duration,
            self.max_morning_slots,
            self.max_afternoon_slots,
            self.online_mode,
            self.min_professors,
            self.max_professors,
            self.min_ordinary_professors_for_masters,
            self.solver,
            self.time_limit_seconds,
            self.relative_gap,
        );
        format!("{:x}", Sha256::digest(canonical.as_bytes()))
    }
}
