use std::env::VarError;

use commission_scheduler_model::{CommissionId, ConfigurationId, RunState};
use diesel_async::pooled_connection::deadpool;
use thiserror::Error;

#[allow(clippy::module_name_repetitions)]
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database url not set in env variable DATABASE_URL")]
    DatabaseEnvUrl(#[from] VarError),
    #[error("Failed to create database pool {0}")]
    PoolBuild(#[from] deadpool::BuildError),
    #[error("Database pool failed {0}")]
    Pool(#[from] deadpool::PoolError),
    #[error("Database query failed {0}")]
    Database(#[from] diesel::result::Error),
    #[error("commission {0} does not exist")]
    CommissionNotFound(CommissionId),
    #[error("configuration {0} does not exist")]
    ConfigurationNotFound(ConfigurationId),
    #[error("configuration {id} is {state} and can no longer be changed")]
    Locked { id: ConfigurationId, state: RunState },
    #[error("stored data is corrupt: {0}")]
    Corrupt(String),
}
