//! Per-execution context shared with handlers.

use std::collections::HashMap;

use serde_json::Value;
use weft_workflow::label_slug;

use crate::result::NodeExecutionResult;

/// Mutable state for a single workflow run.
///
/// Results are recorded once per node under both the node id and the slug of
/// its label. A recorded result is never overwritten.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
  pub workflow_id: String,
  pub execution_id: String,
  pub user_id: Option<String>,
  pub trigger_data: Value,
  pub variables: HashMap<String, Value>,
  pub current_step: usize,
  results: HashMap<String, NodeExecutionResult>,
  results_by_slug: HashMap<String, NodeExecutionResult>,
  /// Node ids in the order their results were recorded.
  order: Vec<String>,
}

impl ExecutionContext {
  pub fn new(
    workflow_id: impl Into<String>,
    execution_id: impl Into<String>,
    trigger_data: Value,
  ) -> Self {
    Self {
      workflow_id: workflow_id.into(),
      execution_id: execution_id.into(),
      user_id: None,
      trigger_data,
      variables: HashMap::new(),
      current_step: 0,
      results: HashMap::new(),
      results_by_slug: HashMap::new(),
      order: Vec::new(),
    }
  }

  pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
    self.user_id = Some(user_id.into());
    self
  }

  pub fn with_variables(mut self, variables: HashMap<String, Value>) -> Self {
    self.variables = variables;
    self
  }

  pub fn set_variable(&mut self, name: impl Into<String>, value: Value) {
    self.variables.insert(name.into(), value);
  }

  /// Record a node's result. Returns `false` if the node already had one.
  pub fn record(&mut self, node_id: &str, label: &str, result: NodeExecutionResult) -> bool {
    if self.results.contains_key(node_id) {
      return false;
    }
    let slug = label_slug(label);
    if !slug.is_empty() {
      self.results_by_slug.entry(slug).or_insert_with(|| result.clone());
    }
    self.results.insert(node_id.to_string(), result);
    self.order.push(node_id.to_string());
    true
  }

  pub fn result(&self, node_id: &str) -> Option<&NodeExecutionResult> {
    self.results.get(node_id)
  }

  /// Look up a result by label slug.
  ///
  /// Falls back to recomputing the slug of every recorded result's label, so
  /// results recorded without a label still resolve if one was set later.
  pub fn result_by_slug(&self, slug: &str) -> Option<&NodeExecutionResult> {
    if let Some(result) = self.results_by_slug.get(slug) {
      return Some(result);
    }
    self
      .order
      .iter()
      .filter_map(|id| self.results.get(id))
      .find(|r| r.node_label.as_deref().map(label_slug).as_deref() == Some(slug))
  }

  /// Recorded results in recording order.
  pub fn results(&self) -> impl Iterator<Item = (&str, &NodeExecutionResult)> {
    self
      .order
      .iter()
      .filter_map(|id| self.results.get(id).map(|r| (id.as_str(), r)))
  }

  pub fn result_count(&self) -> usize {
    self.results.len()
  }
}
