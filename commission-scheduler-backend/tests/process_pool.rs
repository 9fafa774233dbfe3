use std::path::PathBuf;
use std::sync::Arc;

use commission_scheduler_backend::{Orchestrator, ProcessRunner, WorkerPool};
use commission_scheduler_config::{EngineKind, SolverConfig};
use commission_scheduler_database::MemoryStore;
use commission_scheduler_model::{
    Availability, Candidate, CandidateId, Commission, CommissionId, Configuration,
    ConfigurationId, DegreeLevel, Professor, ProfessorId, Role, RunState,
};

const COMMISSION: CommissionId = CommissionId(4);
const CONFIGURATION: ConfigurationId = ConfigurationId(9);

fn store() -> MemoryStore {
    let candidates = (1..=3)
        .map(|id| Candidate {
            id: CandidateId(id),
            name: format!("Student{id}"),
            surname: format!("Surname{id}"),
            degree_level: DegreeLevel::Masters,
            supervisor: Some(ProfessorId(id)),
            counter_supervisor: None,
            assistant_supervisor: None,
        })
        .collect();
    let professors = (1..=3)
        .map(|id| Professor {
            id: ProfessorId(id),
            name: format!("Name{id}"),
            surname: format!("Surname{id}"),
            role: Role::Associate,
            availability: Availability::Always,
        })
        .collect();
    let mut configuration = Configuration::new(CONFIGURATION, COMMISSION);
    configuration.max_morning_slots = 2;
    configuration.max_afternoon_slots = 1;
    MemoryStore::new()
        .with_commission(Commission {
            id: COMMISSION,
            title: "September".to_owned(),
            candidates,
            professors,
        })
        .with_configuration(configuration)
}

fn orchestrator(executable: PathBuf, work_dir: &tempfile::TempDir) -> Orchestrator {
    let pool = WorkerPool::new(
        work_dir.path().to_owned(),
        1,
        ProcessRunner::new(executable),
    );
    let solver = SolverConfig {
        engine: EngineKind::Embedded,
        ..SolverConfig::default()
    };
    Orchestrator::new(Arc::new(store()), pool, solver)
}

#[tokio::test]
async fn solves_in_a_worker_process() {
    let work_dir = tempfile::tempdir().unwrap();
    let orchestrator = orchestrator(
        PathBuf::from(env!("CARGO_BIN_EXE_commission-scheduler")),
        &work_dir,
    );

    let submission = orchestrator
        .submit_solve(COMMISSION, CONFIGURATION)
        .await
        .unwrap();
    orchestrator.shutdown().await;

    assert_eq!(
        orchestrator.run_state(CONFIGURATION).await.unwrap(),
        RunState::Completed
    );
    let slots = orchestrator.solution(COMMISSION, CONFIGURATION).await.unwrap();
    let scheduled: usize = slots.iter().map(|slot| slot.candidates.len()).sum();
    assert_eq!(scheduled, 3);
    assert!(slots.iter().all(|slot| slot.duration <= 210));

    let record = &orchestrator.executions(CONFIGURATION).await.unwrap()[0];
    assert_eq!(record.job_id, submission.job_id);
    assert!(record.success);
    assert!(record.log.contains("slots used"), "{}", record.log);
    assert!(work_dir
        .path()
        .join(submission.job_id.to_string())
        .join("report.json")
        .exists());
}

#[tokio::test]
async fn missing_worker_executable_fails_the_job() {
    let work_dir = tempfile::tempdir().unwrap();
    let orchestrator = orchestrator(work_dir.path().join("no-such-worker"), &work_dir);

    orchestrator
        .submit_solve(COMMISSION, CONFIGURATION)
        .await
        .unwrap();
    orchestrator.shutdown().await;

    assert_eq!(
        orchestrator.run_state(CONFIGURATION).await.unwrap(),
        RunState::Failed
    );
    let record = &orchestrator.executions(CONFIGURATION).await.unwrap()[0];
    assert!(!record.success);
    assert!(record
        .error_message
        .as_deref()
        .unwrap()
        .contains("failed to start worker"));
}

#[cfg(unix)]
#[tokio::test]
async fn crashing_worker_fails_the_job() {
    let work_dir = tempfile::tempdir().unwrap();
    let orchestrator = orchestrator(PathBuf::from("false"), &work_dir);

    orchestrator
        .submit_solve(COMMISSION, CONFIGURATION)
        .await
        .unwrap();
    orchestrator.shutdown().await;

    assert_eq!(
        orchestrator.run_state(CONFIGURATION).await.unwrap(),
        RunState::Failed
    );
    let record = &orchestrator.executions(CONFIGURATION).await.unwrap()[0];
    assert!(!record.success);
    assert!(record
        .error_message
        .as_deref()
        .unwrap()
        .contains("without a report"));
}
