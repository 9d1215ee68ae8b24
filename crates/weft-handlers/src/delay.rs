use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use tracing::debug;
use weft_task::{ExecutionContext, Handler, NodeExecutionResult, TaskError};
use weft_workflow::Node;

use crate::finish;

/// Sleeps for `duration` x `unit` without blocking other runs.
pub struct DelayHandler;

#[async_trait]
impl Handler for DelayHandler {
  async fn execute(
    &self,
    node: &Node,
    _context: &ExecutionContext,
    config: &Value,
  ) -> NodeExecutionResult {
    let started_at = Utc::now();
    let outcome = match delay_ms(config) {
      Ok(ms) => {
        debug!(node_id = %node.id, delay_ms = ms, "delaying");
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(json!({ "delayedMs": ms }))
      }
      Err(e) => Err(e),
    };
    finish(started_at, outcome)
  }
}

fn delay_ms(config: &Value) -> Result<u64, TaskError> {
  let duration = match config.get("duration") {
    Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
    Some(Value::String(s)) => s.trim().parse::<f64>().map_err(|_| TaskError::InvalidInput {
      field: "duration".to_string(),
      message: format!("'{s}' is not a number"),
    })?,
    Some(_) => {
      return Err(TaskError::InvalidInput {
        field: "duration".to_string(),
        message: "expected a number".to_string(),
      });
    }
    None => {
      return Err(TaskError::MissingInput {
        field: "duration".to_string(),
      });
    }
  };
  if duration < 0.0 {
    return Err(TaskError::InvalidInput {
      field: "duration".to_string(),
      message: "must not be negative".to_string(),
    });
  }

  let unit = config.get("unit").and_then(Value::as_str).unwrap_or("seconds");
  let factor = match unit {
    "ms" | "millisecond" | "milliseconds" => 1.0,
    "s" | "second" | "seconds" => 1_000.0,
    "m" | "minute" | "minutes" => 60_000.0,
    "h" | "hour" | "hours" => 3_600_000.0,
    other => {
      return Err(TaskError::InvalidInput {
        field: "unit".to_string(),
        message: format!("unknown unit '{other}'"),
      });
    }
  };
  Ok((duration * factor).round() as u64)
}

#[cfg(test)]
mod tests {
  use super::*;
  use weft_workflow::NodeType;

  #[tokio::test(start_paused = true)]
  async fn test_delay_sleeps() {
    let node = Node::new("d", NodeType::Delay, "Wait");
    let ctx = ExecutionContext::new("wf", "ex", json!({}));
    let start = tokio::time::Instant::now();

    let result = DelayHandler
      .execute(&node, &ctx, &json!({ "duration": 2, "unit": "minutes" }))
      .await;

    assert!(result.success);
    assert_eq!(result.output["delayedMs"], 120_000);
    assert!(start.elapsed() >= Duration::from_secs(120));
  }

  #[test]
  fn test_units() {
    assert_eq!(delay_ms(&json!({ "duration": 5 })).unwrap(), 5_000);
    assert_eq!(delay_ms(&json!({ "duration": "250", "unit": "ms" })).unwrap(), 250);
    assert!(delay_ms(&json!({ "duration": 1, "unit": "fortnights" })).is_err());
    assert!(delay_ms(&json!({ "duration": -1 })).is_err());
    assert!(delay_ms(&json!({})).is_err());
  }
}
