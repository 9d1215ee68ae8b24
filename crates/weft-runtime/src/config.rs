use serde::{Deserialize, Serialize};
use weft_task::RetryPolicy;

/// Configuration for the workflow runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeConfig {
  /// Backoff applied to each step's handler call.
  pub retry_policy: RetryPolicy,
  /// Maximum characters of serialized output kept on a step record.
  pub output_summary_limit: usize,
}

impl Default for RuntimeConfig {
  fn default() -> Self {
    Self {
      retry_policy: RetryPolicy::default(),
      output_summary_limit: 4096,
    }
  }
}
