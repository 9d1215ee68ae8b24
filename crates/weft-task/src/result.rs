//! Node execution result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Outcome of running one node.
///
/// Serialized with camelCase keys; that serialized form is what
/// `$node.<id>` and `$steps.<slug>` expressions walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeExecutionResult {
  pub success: bool,
  pub output: serde_json::Value,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  /// Wall-clock duration in milliseconds.
  #[serde(rename = "duration")]
  pub duration_ms: u64,
  pub started_at: DateTime<Utc>,
  pub completed_at: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub node_label: Option<String>,
}

impl NodeExecutionResult {
  pub fn success(output: serde_json::Value) -> Self {
    let now = Utc::now();
    Self {
      success: true,
      output,
      error: None,
      duration_ms: 0,
      started_at: now,
      completed_at: now,
      node_label: None,
    }
  }

  pub fn failure(error: impl Into<String>) -> Self {
    Self::failure_with_output(error, serde_json::Value::Null)
  }

  pub fn failure_with_output(error: impl Into<String>, output: serde_json::Value) -> Self {
    Self {
      success: false,
      error: Some(error.into()),
      ..Self::success(output)
    }
  }

  /// A successful no-op result for a node that was not executed.
  pub fn skipped(reason: impl Into<String>) -> Self {
    Self::success(json!({ "skipped": true, "reason": reason.into() }))
  }

  pub fn is_skipped(&self) -> bool {
    self.success && self.output.get("skipped").and_then(|v| v.as_bool()) == Some(true)
  }

  pub fn with_timing(mut self, started_at: DateTime<Utc>, completed_at: DateTime<Utc>) -> Self {
    self.started_at = started_at;
    self.completed_at = completed_at;
    self.duration_ms = (completed_at - started_at).num_milliseconds().max(0) as u64;
    self
  }

  pub fn with_label(mut self, label: impl Into<String>) -> Self {
    self.node_label = Some(label.into());
    self
  }

  pub fn error_message(&self) -> &str {
    self.error.as_deref().unwrap_or("unknown error")
  }
}
