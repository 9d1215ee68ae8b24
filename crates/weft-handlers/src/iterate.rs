use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use weft_task::{ExecutionContext, Handler, NodeExecutionResult, TaskError};
use weft_workflow::Node;

use crate::finish;

const DEFAULT_MAX_ITERATIONS: u64 = 100;

/// Prepares a bounded list of items for downstream steps.
///
/// Steps run sequentially, so the loop node does not fan out itself. It
/// caps `items` at `maxIterations` and reports whether it truncated.
pub struct LoopHandler;

#[async_trait]
impl Handler for LoopHandler {
  async fn execute(
    &self,
    _node: &Node,
    _context: &ExecutionContext,
    config: &Value,
  ) -> NodeExecutionResult {
    let started_at = Utc::now();
    finish(started_at, iterate(config))
  }
}

fn iterate(config: &Value) -> Result<Value, TaskError> {
  let items = match config.get("items") {
    Some(Value::Array(items)) => items,
    Some(_) => {
      return Err(TaskError::InvalidInput {
        field: "items".to_string(),
        message: "expected an array".to_string(),
      });
    }
    None => {
      return Err(TaskError::MissingInput {
        field: "items".to_string(),
      });
    }
  };
  let max = config
    .get("maxIterations")
    .and_then(Value::as_u64)
    .unwrap_or(DEFAULT_MAX_ITERATIONS) as usize;

  let kept: Vec<Value> = items.iter().take(max).cloned().collect();
  Ok(json!({
    "count": kept.len(),
    "truncated": items.len() > max,
    "items": kept,
  }))
}
