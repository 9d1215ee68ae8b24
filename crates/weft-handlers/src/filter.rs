use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use weft_task::{ExecutionContext, Handler, NodeExecutionResult, TaskError};
use weft_workflow::Node;

use crate::compare::{evaluate, lookup_path};
use crate::finish;

/// Keeps the elements of `items` whose `field` satisfies `operator`/`value`.
pub struct FilterHandler;

#[async_trait]
impl Handler for FilterHandler {
  async fn execute(
    &self,
    _node: &Node,
    _context: &ExecutionContext,
    config: &Value,
  ) -> NodeExecutionResult {
    let started_at = Utc::now();
    finish(started_at, filter(config))
  }
}

fn filter(config: &Value) -> Result<Value, TaskError> {
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
  let field = config.get("field").and_then(Value::as_str).unwrap_or("");
  let operator = config
    .get("operator")
    .and_then(Value::as_str)
    .unwrap_or("is_not_empty");
  let expected = config.get("value").unwrap_or(&Value::Null);

  let mut kept = Vec::new();
  for item in items {
    let actual = lookup_path(item, field).unwrap_or(&Value::Null);
    if evaluate(actual, operator, expected)? {
      kept.push(item.clone());
    }
  }

  Ok(json!({
    "count": kept.len(),
    "originalCount": items.len(),
    "items": kept,
  }))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_filter_by_field() {
    let out = filter(&json!({
      "items": [
        { "name": "a", "total": 50 },
        { "name": "b", "total": 700 },
        { "name": "c", "total": "900" },
      ],
      "field": "total",
      "operator": "greater_than",
      "value": 500,
    }))
    .unwrap();
    assert_eq!(out["count"], 2);
    assert_eq!(out["originalCount"], 3);
    assert_eq!(out["items"][0]["name"], "b");
  }

  #[test]
  fn test_default_drops_empty() {
    let out = filter(&json!({ "items": ["x", "", null, "y"] })).unwrap();
    assert_eq!(out["items"], json!(["x", "y"]));
  }

  #[test]
  fn test_items_must_be_array() {
    assert!(filter(&json!({ "items": "nope" })).is_err());
  }
}
