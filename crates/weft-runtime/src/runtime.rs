//! Workflow runtime.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use weft_config::WorkflowDef;
use weft_resolver::VariableResolver;
use weft_store::{ExecutionStatus, Store};
use weft_task::{ExecutionContext, HandlerRegistry, NodeExecutionResult};
use weft_workflow::{ExecutionPlan, ExecutionPlanner, ValidationErrors, WorkflowError};

use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::execution::WorkflowExecution;

/// Everything needed to start one run.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
  pub workflow: WorkflowDef,
  pub trigger_data: Value,
  pub user_id: Option<String>,
  pub variables: HashMap<String, Value>,
  /// Caller-chosen execution id. A v4 uuid is generated when absent.
  pub execution_id: Option<String>,
}

impl ExecutionRequest {
  pub fn new(workflow: WorkflowDef, trigger_data: Value) -> Self {
    Self {
      workflow,
      trigger_data,
      user_id: None,
      variables: HashMap::new(),
      execution_id: None,
    }
  }

  pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
    self.user_id = Some(user_id.into());
    self
  }

  pub fn with_variable(mut self, name: impl Into<String>, value: Value) -> Self {
    self.variables.insert(name.into(), value);
    self
  }

  pub fn with_execution_id(mut self, execution_id: impl Into<String>) -> Self {
    self.execution_id = Some(execution_id.into());
    self
  }
}

/// Outcome of a completed run.
#[derive(Debug)]
pub struct ExecutionResult {
  pub execution_id: String,
  pub workflow_id: String,
  pub status: ExecutionStatus,
  pub duration_ms: i64,
  /// Node ids that were skipped, in plan order.
  pub skipped: Vec<String>,
  /// The final context, holding every recorded result.
  pub context: ExecutionContext,
}

impl ExecutionResult {
  pub fn result(&self, node_id: &str) -> Option<&NodeExecutionResult> {
    self.context.result(node_id)
  }

  pub fn is_skipped(&self, node_id: &str) -> bool {
    self.skipped.iter().any(|id| id == node_id)
  }
}

/// The workflow runtime.
///
/// Holds the read-only collaborators shared by every run: the handler
/// registry, the variable resolver, the record store and configuration.
/// Each call to [`execute`](Self::execute) owns its own context, so one
/// runtime can drive many runs concurrently.
pub struct WorkflowRuntime {
  pub(crate) registry: HandlerRegistry,
  pub(crate) resolver: VariableResolver,
  pub(crate) store: Arc<dyn Store>,
  pub(crate) config: RuntimeConfig,
}

impl WorkflowRuntime {
  pub fn new(registry: HandlerRegistry, store: Arc<dyn Store>, config: RuntimeConfig) -> Self {
    Self {
      registry,
      resolver: VariableResolver::new(),
      store,
      config,
    }
  }

  pub fn with_resolver(mut self, resolver: VariableResolver) -> Self {
    self.resolver = resolver;
    self
  }

  /// Check a workflow without running it. Every problem is reported.
  pub fn validate(&self, workflow: &WorkflowDef) -> Result<(), ValidationErrors> {
    ExecutionPlanner::validate(workflow)
  }

  /// Build the execution plan for a workflow.
  pub fn plan(&self, workflow: &WorkflowDef) -> Result<ExecutionPlan, WorkflowError> {
    ExecutionPlanner::plan(workflow)
  }

  /// Run a workflow to completion.
  ///
  /// Steps run strictly in plan order. The first failed step ends the run;
  /// earlier side effects are not rolled back.
  pub async fn execute(
    &self,
    request: ExecutionRequest,
    cancel: CancellationToken,
  ) -> Result<ExecutionResult, RuntimeError> {
    let execution_id = request
      .execution_id
      .clone()
      .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    WorkflowExecution::new(self, execution_id, request, cancel)
      .run()
      .await
  }

  pub fn registry(&self) -> &HandlerRegistry {
    &self.registry
  }

  pub fn store(&self) -> &Arc<dyn Store> {
    &self.store
  }

  pub fn config(&self) -> &RuntimeConfig {
    &self.config
  }
}
