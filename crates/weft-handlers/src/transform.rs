use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use weft_task::{ExecutionContext, Handler, NodeExecutionResult};
use weft_workflow::Node;

/// Config keys that describe the node rather than its output.
const BOOKKEEPING_KEYS: &[&str] = &["label", "description", "icon", "nodeType"];

/// Emits an already-resolved value.
///
/// The output is the `output` config value, else `data`, else the whole
/// config minus bookkeeping keys.
pub struct TransformHandler;

#[async_trait]
impl Handler for TransformHandler {
  async fn execute(
    &self,
    _node: &Node,
    _context: &ExecutionContext,
    config: &Value,
  ) -> NodeExecutionResult {
    let started_at = Utc::now();
    let output = config
      .get("output")
      .or_else(|| config.get("data"))
      .cloned()
      .unwrap_or_else(|| match config {
        Value::Object(map) => Value::Object(
          map
            .iter()
            .filter(|(k, _)| !BOOKKEEPING_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        ),
        other => other.clone(),
      });
    NodeExecutionResult::success(output).with_timing(started_at, Utc::now())
  }
}
