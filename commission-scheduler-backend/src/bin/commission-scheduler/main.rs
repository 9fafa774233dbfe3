use core::fmt::{Debug, Display};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use commission_scheduler_backend::{
    run_worker, InlineRunner, JobError, Orchestrator, ProcessRunner, SlotView, SubmitError,
    Submission, WorkerPool,
};
use commission_scheduler_config::{get_config, Config, ConfigError};
use commission_scheduler_database::{
    get_database_connection, DatabaseError, MemoryStore, PgStore, Store,
};
use commission_scheduler_model::{
    Commission, CommissionId, Configuration, ConfigurationId, ExecutionRecord, RunState,
};
use commission_scheduler_telemetry::{setup_tracing, TelemetryError};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "commission-scheduler")]
#[command(version)]
#[command(about = "Schedules graduation commissions with a MILP solver")]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a single job. Started by the worker pool, not by hand.
    Worker {
        #[arg(long)]
        job: PathBuf,
        #[arg(long)]
        report: PathBuf,
    },

    /// Solve a commission read from a JSON file and print the result
    Solve {
        /// JSON object with `commission` and `configuration`
        #[arg(long)]
        input: PathBuf,
        /// Solve inside this process instead of a worker process
        #[arg(long)]
        inline: bool,
    },

    /// Solve a configuration stored in the database and wait for it
    Submit {
        #[arg(long)]
        commission: i32,
        #[arg(long)]
        configuration: i32,
    },
}

#[derive(Deserialize)]
struct SolveInput {
    commission: Commission,
    configuration: Configuration,
}

#[derive(Serialize)]
struct SolveOutput {
    submission: Submission,
    run_state: RunState,
    slots: Vec<SlotView>,
    executions: Vec<ExecutionRecord>,
}

#[derive(thiserror::Error)]
enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Telemetry(#[from] TelemetryError),
    #[error("{0}")]
    Job(#[from] JobError),
    #[error("{0}")]
    Submit(#[from] SubmitError),
    #[error("{0}")]
    Database(#[from] DatabaseError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Debug for CliError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        Display::fmt(self, f)
    }
}

async fn solve_and_wait(
    config: Config,
    store: Arc<dyn Store>,
    inline: bool,
    commission_id: CommissionId,
    configuration_id: ConfigurationId,
) -> Result<SolveOutput, CliError> {
    let pool = if inline {
        WorkerPool::new(config.work_dir, config.max_workers, InlineRunner)
    } else {
        WorkerPool::new(config.work_dir, config.max_workers, ProcessRunner::current()?)
    };
    let orchestrator = Orchestrator::new(store, pool, config.solver);

    let submission = orchestrator
        .submit_solve(commission_id, configuration_id)
        .await?;
    info!(job_id = %submission.job_id, "waiting for the solve to finish");
    orchestrator.shutdown().await;

    Ok(SolveOutput {
        submission,
        run_state: orchestrator.run_state(configuration_id).await?,
        slots: orchestrator.solution(commission_id, configuration_id).await?,
        executions: orchestrator.executions(configuration_id).await?,
    })
}

fn main() -> Result<(), CliError> {
    let args = Args::parse();
    let config = get_config()?;
    setup_tracing(&config.log_filter)?;

    match args.command {
        Commands::Worker { job, report } => {
            run_worker(&job, &report, &mut std::io::stdout().lock())?;
        }
        Commands::Solve { input, inline } => {
            let SolveInput {
                commission,
                configuration,
            } = serde_json::from_slice(&std::fs::read(input)?)?;
            let (commission_id, configuration_id) = (commission.id, configuration.id);
            let store = MemoryStore::new()
                .with_commission(commission)
                .with_configuration(configuration);
            let output = tokio::runtime::Runtime::new()?.block_on(solve_and_wait(
                config,
                Arc::new(store),
                inline,
                commission_id,
                configuration_id,
            ))?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Submit {
            commission,
            configuration,
        } => {
            let pool = get_database_connection(config.database_url()?)?;
            let output = tokio::runtime::Runtime::new()?.block_on(solve_and_wait(
                config,
                Arc::new(PgStore::new(pool)),
                false,
                CommissionId(commission),
                ConfigurationId(configuration),
            ))?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}
