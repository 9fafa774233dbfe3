//! Service configuration, layered with figment.

extern crate alloc;

use alloc::collections::BTreeMap;
use core::fmt::{Debug, Display};
use std::path::{Path, PathBuf};

use commission_scheduler_model::SolverKind;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "commission-scheduler.toml";
pub const ENV_PREFIX: &str = "CS_";

/// Which MILP engine the workers solve with.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// CPLEX, glpsol or Gurobi as a child process, picked per configuration.
    #[default]
    External,
    /// The solver bundled into the binary. Ignores time limit and gap.
    Embedded,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SolverConfig {
    #[serde(default)]
    pub engine: EngineKind,
    /// Overrides the default executable of a solver kind.
    #[serde(default)]
    pub executables: BTreeMap<SolverKind, PathBuf>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub database_url: Option<String>,
    /// Job directories are created below this one.
    pub work_dir: PathBuf,
    pub max_workers: usize,
    pub log_filter: String,
    #[serde(default)]
    pub solver: SolverConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            work_dir: PathBuf::from(".temp"),
            max_workers: 4,
            log_filter: "info".to_owned(),
            solver: SolverConfig::default(),
        }
    }
}

#[derive(thiserror::Error)]
pub enum ConfigError {
    #[error("config error: {0}")]
    Figment(#[from] figment::Error),
    #[error("max_workers must be at least 1")]
    NoWorkers,
    #[error("database_url is not configured")]
    MissingDatabaseUrl,
}

impl Debug for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Config {
    /// Defaults, then the TOML file, then `CS_` environment variables.
    /// Nested keys use `__`, as in `CS_SOLVER__ENGINE=embedded`.
    #[must_use]
    pub fn figment(file: &Path) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        if config.max_workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        Ok(config)
    }

    pub fn database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or(ConfigError::MissingDatabaseUrl)
    }
}

pub fn get_config() -> Result<Config, ConfigError> {
    Config::from_figment(&Config::figment(Path::new(CONFIG_FILE)))
}
