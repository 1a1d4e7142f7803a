//! Memoized Steps
//!
//! A step's JSON output is stored under `(run_id, step_name)` the first time it
//! succeeds. A retried run gets the stored output back without re-executing.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::WorkflowError;

/// Durable storage for step outputs.
#[async_trait]
pub trait StepStore: Send + Sync {
    async fn load(&self, run_id: Uuid, step: &str) -> Result<Option<Value>, WorkflowError>;
    async fn save(&self, run_id: Uuid, step: &str, output: &Value) -> Result<(), WorkflowError>;
}

/// Step outputs in the `workflow_steps` table.
#[derive(Clone)]
pub struct PgStepStore {
    pool: PgPool,
}

impl PgStepStore {
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StepStore for PgStepStore {
    async fn load(&self, run_id: Uuid, step: &str) -> Result<Option<Value>, WorkflowError> {
        let row: Option<(Value,)> = sqlx::query_as(
            "SELECT output FROM workflow_steps WHERE run_id = $1 AND step_name = $2",
        )
        .bind(run_id)
        .bind(step)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.0))
    }

    async fn save(&self, run_id: Uuid, step: &str, output: &Value) -> Result<(), WorkflowError> {
        sqlx::query(
            r"
            INSERT INTO workflow_steps (run_id, step_name, output)
            VALUES ($1, $2, $3)
            ON CONFLICT (run_id, step_name) DO NOTHING
            ",
        )
        .bind(run_id)
        .bind(step)
        .bind(output)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Process-local step outputs.
#[derive(Default)]
pub struct MemoryStepStore {
    outputs: Mutex<HashMap<(Uuid, String), Value>>,
}

impl MemoryStepStore {
    #[must_use]
    pub fn len(&self) -> usize {
        self.outputs.lock().map(|m| m.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StepStore for MemoryStepStore {
    async fn load(&self, run_id: Uuid, step: &str) -> Result<Option<Value>, WorkflowError> {
        let outputs = self
            .outputs
            .lock()
            .map_err(|_| WorkflowError::Step("step store poisoned".into()))?;
        Ok(outputs.get(&(run_id, step.to_string())).cloned())
    }

    async fn save(&self, run_id: Uuid, step: &str, output: &Value) -> Result<(), WorkflowError> {
        let mut outputs = self
            .outputs
            .lock()
            .map_err(|_| WorkflowError::Step("step store poisoned".into()))?;
        outputs
            .entry((run_id, step.to_string()))
            .or_insert_with(|| output.clone());
        Ok(())
    }
}

/// Step runner bound to one run.
#[derive(Clone)]
pub struct Steps {
    run_id: Uuid,
    store: Arc<dyn StepStore>,
}

impl Steps {
    pub fn new(run_id: Uuid, store: Arc<dyn StepStore>) -> Self {
        Self { run_id, store }
    }

    /// Run `f` once per run; later calls return the stored output.
    pub async fn run<T, F, Fut>(&self, name: &str, f: F) -> Result<T, WorkflowError>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, WorkflowError>> + Send,
    {
        if let Some(stored) = self.store.load(self.run_id, name).await? {
            debug!(run_id = %self.run_id, step = name, "Step already completed, reusing output");
            return Ok(serde_json::from_value(stored)?);
        }

        let output = f().await?;
        self.store
            .save(self.run_id, name, &serde_json::to_value(&output)?)
            .await?;
        debug!(run_id = %self.run_id, step = name, "Step completed");
        Ok(output)
    }
}
