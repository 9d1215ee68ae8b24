use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use weft_task::{ExecutionContext, Handler, NodeExecutionResult};
use weft_workflow::Node;

/// Passes the trigger payload through as the node's output.
pub struct TriggerHandler;

#[async_trait]
impl Handler for TriggerHandler {
  async fn execute(
    &self,
    _node: &Node,
    context: &ExecutionContext,
    _config: &Value,
  ) -> NodeExecutionResult {
    let now = Utc::now();
    NodeExecutionResult::success(context.trigger_data.clone()).with_timing(now, now)
  }
}
