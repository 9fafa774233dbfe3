use std::collections::BTreeSet;

use chrono::Utc;
use commission_scheduler_database::{DatabaseError, LockAttempt, MemoryStore, Store};
use commission_scheduler_model::{
    Availability, Candidate, CandidateId, Commission, CommissionId, Configuration,
    ConfigurationId, DegreeLevel, ExecutionRecord, Professor, ProfessorId, Role, RunState,
    SolutionSlot,
};
use uuid::Uuid;

const CONFIGURATION: ConfigurationId = ConfigurationId(7);

fn store() -> MemoryStore {
    let commission = Commission {
        id: CommissionId(1),
        title: "July session".to_owned(),
        candidates: vec![Candidate {
            id: CandidateId(1),
            name: "Ada".to_owned(),
            surname: "Lovelace".to_owned(),
            degree_level: DegreeLevel::Bachelors,
            supervisor: Some(ProfessorId(1)),
            counter_supervisor: None,
            assistant_supervisor: None,
        }],
        professors: vec![Professor {
            id: ProfessorId(1),
            name: "Alan".to_owned(),
            surname: "Turing".to_owned(),
            role: Role::Ordinary,
            availability: Availability::Always,
        }],
    };
    MemoryStore::new()
        .with_commission(commission)
        .with_configuration(Configuration::new(CONFIGURATION, CommissionId(1)))
}

fn record(success: bool) -> ExecutionRecord {
    let now = Utc::now();
    ExecutionRecord {
        job_id: Uuid::new_v4(),
        version_hash: "abc".to_owned(),
        start_time: now,
        end_time: now,
        success,
        solver_reached_optimality: success,
        solver_hit_time_limit: false,
        error_message: (!success).then(|| "solver failed".to_owned()),
        log: String::new(),
    }
}

fn slot() -> SolutionSlot {
    SolutionSlot {
        order: 0,
        morning: true,
        duration: 15,
        professors: BTreeSet::from([ProfessorId(1)]),
        candidates: BTreeSet::from([CandidateId(1)]),
        version_hash: "abc".to_owned(),
    }
}

#[tokio::test]
async fn unknown_ids_are_reported() {
    let store = store();
    assert!(matches!(
        store.commission(CommissionId(2)).await,
        Err(DatabaseError::CommissionNotFound(CommissionId(2)))
    ));
    assert!(matches!(
        store.run_state(ConfigurationId(8)).await,
        Err(DatabaseError::ConfigurationNotFound(ConfigurationId(8)))
    ));
}

#[tokio::test]
async fn run_lock_is_taken_once() {
    let store = store();
    let first = store.acquire_run_lock(CONFIGURATION).await.unwrap();
    let LockAttempt::Acquired(configuration) = first else {
        panic!("expected the lock, got {first:?}");
    };
    assert_eq!(configuration.run_state, RunState::Running);
    assert_eq!(
        store.acquire_run_lock(CONFIGURATION).await.unwrap(),
        LockAttempt::Held(RunState::Running)
    );
}

#[tokio::test]
async fn successful_outcome_completes() {
    let store = store();
    store.acquire_run_lock(CONFIGURATION).await.unwrap();
    let record = record(true);
    store
        .record_outcome(CONFIGURATION, &record, &[slot()])
        .await
        .unwrap();

    assert_eq!(store.run_state(CONFIGURATION).await.unwrap(), RunState::Completed);
    assert_eq!(store.solution_slots(CONFIGURATION).await.unwrap(), vec![slot()]);
    assert_eq!(
        store.execution_records(CONFIGURATION).await.unwrap(),
        vec![record]
    );
    assert_eq!(
        store.acquire_run_lock(CONFIGURATION).await.unwrap(),
        LockAttempt::Held(RunState::Completed)
    );
}

#[tokio::test]
async fn failed_outcome_keeps_no_slots() {
    let store = store();
    store.acquire_run_lock(CONFIGURATION).await.unwrap();
    store
        .record_outcome(CONFIGURATION, &record(false), &[slot()])
        .await
        .unwrap();

    assert_eq!(store.run_state(CONFIGURATION).await.unwrap(), RunState::Failed);
    assert!(store.solution_slots(CONFIGURATION).await.unwrap().is_empty());
    assert_eq!(
        store.acquire_run_lock(CONFIGURATION).await.unwrap(),
        LockAttempt::Held(RunState::Failed)
    );
}

#[tokio::test]
async fn success_without_slots_fails() {
    let store = store();
    store.acquire_run_lock(CONFIGURATION).await.unwrap();
    store
        .record_outcome(CONFIGURATION, &record(true), &[])
        .await
        .unwrap();
    assert_eq!(store.run_state(CONFIGURATION).await.unwrap(), RunState::Failed);
}

#[tokio::test]
async fn configuration_updates_only_while_idle() {
    let store = store();
    let mut configuration = store.configuration(CONFIGURATION).await.unwrap();
    configuration.max_slot_duration = 180;
    configuration.run_state = RunState::Completed;
    store.update_configuration(&configuration).await.unwrap();

    let stored = store.configuration(CONFIGURATION).await.unwrap();
    assert_eq!(stored.max_slot_duration, 180);
    assert_eq!(stored.run_state, RunState::Idle);

    store.acquire_run_lock(CONFIGURATION).await.unwrap();
    assert!(matches!(
        store.update_configuration(&configuration).await,
        Err(DatabaseError::Locked {
            state: RunState::Running,
            ..
        })
    ));
}
