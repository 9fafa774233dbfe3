use std::collections::BTreeMap;

use async_trait::async_trait;
use commission_scheduler_model::{
    Commission, CommissionId, Configuration, ConfigurationId, ExecutionRecord, RunState,
    SolutionSlot,
};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::DatabaseError;
use crate::store::{outcome_state, LockAttempt, Store};

#[derive(Default)]
struct Inner {
    commissions: BTreeMap<CommissionId, Commission>,
    configurations: BTreeMap<ConfigurationId, Configuration>,
    slots: BTreeMap<ConfigurationId, Vec<SolutionSlot>>,
    records: BTreeMap<ConfigurationId, Vec<ExecutionRecord>>,
}

impl Inner {
    fn configuration_mut(
        &mut self,
        id: ConfigurationId,
    ) -> Result<&mut Configuration, DatabaseError> {
        self.configurations
            .get_mut(&id)
            .ok_or(DatabaseError::ConfigurationNotFound(id))
    }
}

/// A [`Store`] that lives in process memory, for tests and one-shot solves.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_commission(mut self, commission: Commission) -> Self {
        self.inner
            .get_mut()
            .commissions
            .insert(commission.id, commission);
        self
    }

    #[must_use]
    pub fn with_configuration(mut self, configuration: Configuration) -> Self {
        self.inner
            .get_mut()
            .configurations
            .insert(configuration.id, configuration);
        self
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn commission(&self, id: CommissionId) -> Result<Commission, DatabaseError> {
        self.inner
            .lock()
            .await
            .commissions
            .get(&id)
            .cloned()
            .ok_or(DatabaseError::CommissionNotFound(id))
    }

    async fn configuration(&self, id: ConfigurationId) -> Result<Configuration, DatabaseError> {
        self.inner
            .lock()
            .await
            .configurations
            .get(&id)
            .cloned()
            .ok_or(DatabaseError::ConfigurationNotFound(id))
    }

    async fn update_configuration(
        &self,
        configuration: &Configuration,
    ) -> Result<(), DatabaseError> {
        let mut inner = self.inner.lock().await;
        let stored = inner.configuration_mut(configuration.id)?;
        if stored.run_state.is_locked() {
            return Err(DatabaseError::Locked {
                id: stored.id,
                state: stored.run_state,
            });
        }
        *stored = Configuration {
            id: stored.id,
            commission_id: stored.commission_id,
            run_state: stored.run_state,
            ..configuration.clone()
        };
        Ok(())
    }

    async fn acquire_run_lock(&self, id: ConfigurationId) -> Result<LockAttempt, DatabaseError> {
        let mut inner = self.inner.lock().await;
        let has_slots = inner.slots.get(&id).is_some_and(|slots| !slots.is_empty());
        let configuration = inner.configuration_mut(id)?;
        if configuration.run_state.is_locked() {
            return Ok(LockAttempt::Held(configuration.run_state));
        }
        if has_slots {
            return Ok(LockAttempt::Held(RunState::Completed));
        }
        configuration.run_state = RunState::Running;
        debug!(configuration_id = %id, "run lock acquired");
        Ok(LockAttempt::Acquired(configuration.clone()))
    }

    async fn record_outcome(
        &self,
        id: ConfigurationId,
        record: &ExecutionRecord,
        slots: &[SolutionSlot],
    ) -> Result<(), DatabaseError> {
        let mut inner = self.inner.lock().await;
        let state = outcome_state(record, slots);
        inner.configuration_mut(id)?.run_state = state;
        inner.records.entry(id).or_default().push(record.clone());
        if state == RunState::Completed {
            inner.slots.insert(id, slots.to_vec());
        }
        Ok(())
    }

    async fn solution_slots(
        &self,
        id: ConfigurationId,
    ) -> Result<Vec<SolutionSlot>, DatabaseError> {
        let inner = self.inner.lock().await;
        if !inner.configurations.contains_key(&id) {
            return Err(DatabaseError::ConfigurationNotFound(id));
        }
        Ok(inner.slots.get(&id).cloned().unwrap_or_default())
    }

    async fn execution_records(
        &self,
        id: ConfigurationId,
    ) -> Result<Vec<ExecutionRecord>, DatabaseError> {
        let inner = self.inner.lock().await;
        if !inner.configurations.contains_key(&id) {
            return Err(DatabaseError::ConfigurationNotFound(id));
        }
        Ok(inner.records.get(&id).cloned().unwrap_or_default())
    }

    async fn run_state(&self, id: ConfigurationId) -> Result<RunState, DatabaseError> {
        self.inner
            .lock()
            .await
            .configurations
            .get(&id)
            .map(|configuration| configuration.run_state)
            .ok_or(DatabaseError::ConfigurationNotFound(id))
    }
}
