use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use weft_task::{ExecutionContext, Handler, NodeExecutionResult, TaskError};
use weft_workflow::Node;

use crate::compare::evaluate;
use crate::finish;

/// Routes on `value` by matching it against `cases[].value`.
///
/// A case's branch name is its `branch`, else `label`, else its value as
/// text. Unmatched values take `default` (or `"default"`).
///
/// The chosen `branch` is informational only. Branch skipping follows
/// `condition` nodes, so every node downstream of a switch still runs.
pub struct SwitchHandler;

#[async_trait]
impl Handler for SwitchHandler {
  async fn execute(
    &self,
    _node: &Node,
    _context: &ExecutionContext,
    config: &Value,
  ) -> NodeExecutionResult {
    let started_at = Utc::now();
    finish(started_at, route(config))
  }
}

fn route(config: &Value) -> Result<Value, TaskError> {
  let value = config.get("value").ok_or_else(|| TaskError::MissingInput {
    field: "value".to_string(),
  })?;
  let cases = config
    .get("cases")
    .and_then(Value::as_array)
    .map(Vec::as_slice)
    .unwrap_or_default();

  for case in cases {
    let expected = case.get("value").unwrap_or(&Value::Null);
    if evaluate(value, "equals", expected)? {
      let branch = case
        .get("branch")
        .or_else(|| case.get("label"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| match expected {
          Value::String(s) => s.clone(),
          other => other.to_string(),
        });
      return Ok(json!({ "branch": branch, "matched": true, "value": value }));
    }
  }

  let fallback = config
    .get("default")
    .and_then(Value::as_str)
    .unwrap_or("default");
  Ok(json!({ "branch": fallback, "matched": false, "value": value }))
}
