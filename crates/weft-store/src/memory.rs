use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{ExecutionRecord, StepRecord, Store, StoreError};

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
  executions: RwLock<HashMap<String, ExecutionRecord>>,
  steps: RwLock<HashMap<String, Vec<StepRecord>>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn upsert_execution(&self, execution: &ExecutionRecord) -> Result<(), StoreError> {
    self
      .executions
      .write()
      .await
      .insert(execution.execution_id.clone(), execution.clone());
    Ok(())
  }

  async fn get_execution(&self, execution_id: &str) -> Result<ExecutionRecord, StoreError> {
    self
      .executions
      .read()
      .await
      .get(execution_id)
      .cloned()
      .ok_or_else(|| StoreError::NotFound(execution_id.to_string()))
  }

  async fn list_executions(&self, workflow_id: &str) -> Result<Vec<ExecutionRecord>, StoreError> {
    let mut found: Vec<_> = self
      .executions
      .read()
      .await
      .values()
      .filter(|e| e.workflow_id == workflow_id)
      .cloned()
      .collect();
    found.sort_by(|a, b| b.started_at.cmp(&a.started_at));
    Ok(found)
  }

  async fn upsert_step(&self, step: &StepRecord) -> Result<(), StoreError> {
    let mut steps = self.steps.write().await;
    let records = steps.entry(step.execution_id.clone()).or_default();
    match records.iter_mut().find(|s| s.node_id == step.node_id) {
      Some(existing) => *existing = step.clone(),
      None => records.push(step.clone()),
    }
    Ok(())
  }

  async fn list_steps(&self, execution_id: &str) -> Result<Vec<StepRecord>, StoreError> {
    let mut records = self
      .steps
      .read()
      .await
      .get(execution_id)
      .cloned()
      .unwrap_or_default();
    records.sort_by_key(|s| s.step_order);
    Ok(records)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{ExecutionStatus, StepStatus};
  use serde_json::json;

  #[tokio::test]
  async fn test_upsert_replaces() {
    let store = MemoryStore::new();
    let mut record = ExecutionRecord::pending("e1", "wf", json!({}));
    store.upsert_execution(&record).await.unwrap();
    record.status = ExecutionStatus::Running;
    store.upsert_execution(&record).await.unwrap();

    let loaded = store.get_execution("e1").await.unwrap();
    assert_eq!(loaded.status, ExecutionStatus::Running);
    assert_eq!(store.list_executions("wf").await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn test_steps_keyed_by_node() {
    let store = MemoryStore::new();
    let mut b = StepRecord::running("e1", "b", "B", "action", 1);
    let a = StepRecord::running("e1", "a", "A", "trigger", 0);
    store.upsert_step(&b).await.unwrap();
    store.upsert_step(&a).await.unwrap();
    b.finish(StepStatus::Completed, Some("{}".into()), None);
    store.upsert_step(&b).await.unwrap();

    let steps = store.list_steps("e1").await.unwrap();
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].node_id, "a");
    assert_eq!(steps[1].status, StepStatus::Completed);
  }

  #[tokio::test]
  async fn test_missing_execution() {
    let store = MemoryStore::new();
    assert!(matches!(
      store.get_execution("nope").await,
      Err(StoreError::NotFound(_))
    ));
  }
}
