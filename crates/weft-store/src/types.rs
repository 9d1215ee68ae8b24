use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

/// Status of a workflow execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ExecutionStatus {
  Pending,
  Running,
  Completed,
  Failed,
}

impl ExecutionStatus {
  pub fn is_terminal(&self) -> bool {
    matches!(self, ExecutionStatus::Completed | ExecutionStatus::Failed)
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      ExecutionStatus::Pending => "pending",
      ExecutionStatus::Running => "running",
      ExecutionStatus::Completed => "completed",
      ExecutionStatus::Failed => "failed",
    }
  }
}

/// Status of a single step within an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum StepStatus {
  Pending,
  Running,
  Completed,
  Failed,
  Skipped,
}

impl StepStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      StepStatus::Pending => "pending",
      StepStatus::Running => "running",
      StepStatus::Completed => "completed",
      StepStatus::Failed => "failed",
      StepStatus::Skipped => "skipped",
    }
  }
}

/// A workflow execution as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
  pub execution_id: String,
  pub workflow_id: String,
  pub user_id: Option<String>,
  pub status: ExecutionStatus,
  pub trigger_data: Json<serde_json::Value>,
  pub started_at: DateTime<Utc>,
  pub completed_at: Option<DateTime<Utc>>,
  pub duration_ms: Option<i64>,
  pub error: Option<String>,
}

impl ExecutionRecord {
  /// A fresh `pending` record starting now.
  pub fn pending(
    execution_id: impl Into<String>,
    workflow_id: impl Into<String>,
    trigger_data: serde_json::Value,
  ) -> Self {
    Self {
      execution_id: execution_id.into(),
      workflow_id: workflow_id.into(),
      user_id: None,
      status: ExecutionStatus::Pending,
      trigger_data: Json(trigger_data),
      started_at: Utc::now(),
      completed_at: None,
      duration_ms: None,
      error: None,
    }
  }

  /// Move to a terminal status, stamping completion time and duration.
  pub fn finish(&mut self, status: ExecutionStatus, error: Option<String>) {
    let now = Utc::now();
    self.status = status;
    self.completed_at = Some(now);
    self.duration_ms = Some((now - self.started_at).num_milliseconds().max(0));
    self.error = error;
  }
}

/// One step (node execution) as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
  pub execution_id: String,
  pub node_id: String,
  pub name: String,
  pub node_type: String,
  pub status: StepStatus,
  pub step_order: i64,
  pub started_at: DateTime<Utc>,
  pub completed_at: Option<DateTime<Utc>>,
  pub duration_ms: Option<i64>,
  pub output_summary: Option<String>,
  pub error: Option<String>,
}

impl StepRecord {
  /// A `running` record starting now.
  pub fn running(
    execution_id: impl Into<String>,
    node_id: impl Into<String>,
    name: impl Into<String>,
    node_type: impl Into<String>,
    step_order: i64,
  ) -> Self {
    Self {
      execution_id: execution_id.into(),
      node_id: node_id.into(),
      name: name.into(),
      node_type: node_type.into(),
      status: StepStatus::Running,
      step_order,
      started_at: Utc::now(),
      completed_at: None,
      duration_ms: None,
      output_summary: None,
      error: None,
    }
  }

  pub fn finish(
    &mut self,
    status: StepStatus,
    output_summary: Option<String>,
    error: Option<String>,
  ) {
    let now = Utc::now();
    self.status = status;
    self.completed_at = Some(now);
    self.duration_ms = Some((now - self.started_at).num_milliseconds().max(0));
    self.output_summary = output_summary;
    self.error = error;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_execution_finish() {
    let mut record = ExecutionRecord::pending("e1", "wf", json!({}));
    assert!(!record.status.is_terminal());
    record.finish(ExecutionStatus::Failed, Some("boom".into()));
    assert!(record.status.is_terminal());
    assert!(record.completed_at.is_some());
    assert!(record.duration_ms.unwrap() >= 0);
  }

  #[test]
  fn test_status_serializes_snake_case() {
    assert_eq!(serde_json::to_value(StepStatus::Skipped).unwrap(), json!("skipped"));
    assert_eq!(StepStatus::Skipped.as_str(), "skipped");
  }
}
