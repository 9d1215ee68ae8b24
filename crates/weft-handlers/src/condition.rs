use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use weft_task::{ExecutionContext, Handler, NodeExecutionResult, TaskError};
use weft_workflow::Node;

use crate::compare::evaluate;
use crate::finish;

/// Evaluates one or more comparisons and reports the branch taken.
///
/// Config is either a `conditions` array combined by `logic` (`and` by
/// default, or `or`) or a single top-level `left`/`operator`/`right`.
/// `field`/`value` are accepted in place of `left`/`right`.
pub struct ConditionHandler;

#[async_trait]
impl Handler for ConditionHandler {
  async fn execute(
    &self,
    _node: &Node,
    _context: &ExecutionContext,
    config: &Value,
  ) -> NodeExecutionResult {
    let started_at = Utc::now();
    finish(started_at, evaluate_config(config))
  }
}

fn evaluate_config(config: &Value) -> Result<Value, TaskError> {
  let result = match config.get("conditions").and_then(Value::as_array) {
    Some(conditions) if !conditions.is_empty() => {
      let any = config
        .get("logic")
        .and_then(Value::as_str)
        .is_some_and(|l| l.eq_ignore_ascii_case("or"));
      let mut outcomes = conditions.iter().map(evaluate_one);
      if any {
        outcomes.try_fold(false, |acc, r| r.map(|v| acc || v))?
      } else {
        outcomes.try_fold(true, |acc, r| r.map(|v| acc && v))?
      }
    }
    _ => {
      if config.get("left").is_none() && config.get("field").is_none() {
        return Err(TaskError::MissingInput {
          field: "conditions".to_string(),
        });
      }
      evaluate_one(config)?
    }
  };

  Ok(json!({
    "result": result,
    "branch": if result { "yes" } else { "no" },
  }))
}

fn evaluate_one(condition: &Value) -> Result<bool, TaskError> {
  let left = condition
    .get("left")
    .or_else(|| condition.get("field"))
    .unwrap_or(&Value::Null);
  let right = condition
    .get("right")
    .or_else(|| condition.get("value"))
    .unwrap_or(&Value::Null);
  let operator = condition
    .get("operator")
    .and_then(Value::as_str)
    .unwrap_or("equals");
  evaluate(left, operator, right)
}
