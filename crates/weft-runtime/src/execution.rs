//! Workflow execution.

use std::collections::HashSet;
use std::fmt;

use chrono::Utc;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use weft_store::{ExecutionRecord, ExecutionStatus, StepRecord, StepStatus, Store};
use weft_task::{
  ErrorClassification, ExecutionContext, Handler, NodeExecutionResult, TaskError, classify_error,
  determine_handler_type, with_retry_until,
};
use weft_workflow::{ExecutionPlanner, Node, NodeType, Step};

use crate::error::RuntimeError;
use crate::normalize::normalize_config;
use crate::runtime::{ExecutionRequest, ExecutionResult, WorkflowRuntime};
use crate::skip::mark_untaken_branches;

const BRANCH_NOT_TAKEN: &str = "Conditional branch not taken";

/// What a single step produced.
struct StepOutcome {
  result: NodeExecutionResult,
  status: StepStatus,
  classification: Option<ErrorClassification>,
}

/// Why a handler attempt did not succeed.
enum Attempt {
  Failed {
    result: NodeExecutionResult,
    classification: ErrorClassification,
  },
  Cancelled,
}

impl fmt::Display for Attempt {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Attempt::Failed {
        result,
        classification,
      } => write!(f, "{} ({})", result.error_message(), classification.kind),
      Attempt::Cancelled => f.write_str("cancelled"),
    }
  }
}

/// A single run of a workflow.
pub(crate) struct WorkflowExecution<'a> {
  runtime: &'a WorkflowRuntime,
  execution_id: String,
  request: ExecutionRequest,
  cancel: CancellationToken,
}

impl<'a> WorkflowExecution<'a> {
  pub(crate) fn new(
    runtime: &'a WorkflowRuntime,
    execution_id: String,
    request: ExecutionRequest,
    cancel: CancellationToken,
  ) -> Self {
    Self {
      runtime,
      execution_id,
      request,
      cancel,
    }
  }

  fn store(&self) -> &dyn Store {
    self.runtime.store.as_ref()
  }

  /// Plan the workflow and drive every step in order.
  #[instrument(
    name = "workflow_execute",
    skip(self),
    fields(
      workflow_id = %self.request.workflow.workflow_id,
      execution_id = %self.execution_id,
    )
  )]
  pub(crate) async fn run(self) -> Result<ExecutionResult, RuntimeError> {
    let workflow_id = self.request.workflow.workflow_id.clone();
    let mut record = ExecutionRecord::pending(
      self.execution_id.clone(),
      workflow_id.clone(),
      self.request.trigger_data.clone(),
    );
    record.user_id = self.request.user_id.clone();
    self.store().upsert_execution(&record).await?;

    info!(
      execution_id = %self.execution_id,
      workflow_id = %workflow_id,
      trigger_payload = %self.request.trigger_data,
      "workflow_started"
    );

    let plan = match ExecutionPlanner::plan(&self.request.workflow) {
      Ok(plan) => plan,
      Err(e) => return Err(self.fail(&mut record, e.into()).await),
    };

    record.status = ExecutionStatus::Running;
    self.store().upsert_execution(&record).await?;

    let mut context = ExecutionContext::new(
      workflow_id.clone(),
      self.execution_id.clone(),
      self.request.trigger_data.clone(),
    )
    .with_variables(self.request.variables.clone());
    if let Some(user_id) = &self.request.user_id {
      context = context.with_user(user_id.clone());
    }
    let mut skipped: HashSet<String> = HashSet::new();

    for step in plan.iter() {
      if self.cancel.is_cancelled() {
        warn!(execution_id = %self.execution_id, "workflow cancelled");
        return Err(self.fail(&mut record, RuntimeError::Cancelled).await);
      }
      context.current_step = step.step_order;

      let outcome = match self.run_step(step, &context, &skipped).await {
        Ok(outcome) => outcome,
        Err(e) => return Err(self.fail(&mut record, e).await),
      };

      let branch = outcome
        .result
        .output
        .get("branch")
        .and_then(Value::as_str)
        .map(str::to_string);
      let failure = (!outcome.result.success).then(|| outcome.result.error_message().to_string());
      context.record(&step.node_id, &step.node.label, outcome.result);

      if let Some(message) = failure {
        let classification = outcome
          .classification
          .unwrap_or_else(|| classify_error(&message));
        let err = RuntimeError::StepFailed {
          node_id: step.node_id.clone(),
          label: step.node.label.clone(),
          error: message,
          classification,
        };
        return Err(self.fail(&mut record, err).await);
      }

      if step.node.node_type == NodeType::Condition && outcome.status == StepStatus::Completed {
        if let Some(branch) = branch {
          let newly = mark_untaken_branches(&plan, &step.node_id, &branch, &mut skipped);
          if !newly.is_empty() {
            info!(
              execution_id = %self.execution_id,
              node_id = %step.node_id,
              branch = %branch,
              skipped = ?newly,
              "branch taken, skipping untaken nodes"
            );
          }
        }
      }
    }

    record.finish(ExecutionStatus::Completed, None);
    self.store().upsert_execution(&record).await?;

    info!(
      execution_id = %self.execution_id,
      duration_ms = record.duration_ms.unwrap_or_default(),
      skipped = skipped.len(),
      "workflow_completed"
    );

    Ok(ExecutionResult {
      execution_id: self.execution_id.clone(),
      workflow_id,
      status: record.status,
      duration_ms: record.duration_ms.unwrap_or_default(),
      skipped: plan
        .iter()
        .filter(|s| skipped.contains(&s.node_id))
        .map(|s| s.node_id.clone())
        .collect(),
      context,
    })
  }

  /// Mark the run failed and hand the error back.
  async fn fail(&self, record: &mut ExecutionRecord, err: RuntimeError) -> RuntimeError {
    error!(
      execution_id = %self.execution_id,
      error = %err,
      "workflow_failed"
    );
    record.finish(ExecutionStatus::Failed, Some(err.record_message()));
    if let Err(store_err) = self.store().upsert_execution(record).await {
      error!(
        execution_id = %self.execution_id,
        error = %store_err,
        "failed to persist execution failure"
      );
    }
    err
  }

  /// Run one step: skip, or normalize, resolve, dispatch and record it.
  #[instrument(
    name = "step_execute",
    skip(self, step, context, skipped),
    fields(
      execution_id = %self.execution_id,
      node_id = %step.node_id,
      step_order = step.step_order,
    )
  )]
  async fn run_step(
    &self,
    step: &Step,
    context: &ExecutionContext,
    skipped: &HashSet<String>,
  ) -> Result<StepOutcome, RuntimeError> {
    let node = &step.node;
    let record = StepRecord::running(
      self.execution_id.clone(),
      node.id.clone(),
      node.label.clone(),
      node.node_type.as_str(),
      step.step_order as i64,
    );

    if skipped.contains(&node.id) {
      info!(node_id = %node.id, "step skipped, branch not taken");
      let result = NodeExecutionResult::skipped(BRANCH_NOT_TAKEN).with_label(node.label.clone());
      return self.finish_step(record, result, StepStatus::Skipped, None).await;
    }

    self.store().upsert_step(&record).await?;
    let started_at = Utc::now();
    let handler_type = determine_handler_type(node);

    let Some(handler) = self.runtime.registry.get(&handler_type) else {
      warn!(node_id = %node.id, handler = %handler_type, "no handler registered, skipping step");
      let result = NodeExecutionResult::skipped(format!("No handler registered for '{handler_type}'"))
        .with_label(node.label.clone());
      return self.finish_step(record, result, StepStatus::Skipped, None).await;
    };

    if !handler.validate(node) {
      let err = TaskError::Configuration {
        message: format!("node '{}' is not set up for {}", node.label, handler_type),
      };
      let classification = err.classification();
      let result = NodeExecutionResult::failure(err.to_string())
        .with_label(node.label.clone())
        .with_timing(started_at, Utc::now());
      return self
        .finish_step(record, result, StepStatus::Failed, Some(classification))
        .await;
    }

    let config = normalize_config(&handler_type, &node.config);
    let missing = self.runtime.resolver.unresolved_variables(&config, context);
    if !missing.is_empty() {
      warn!(node_id = %node.id, missing = ?missing, "step config references unresolved variables");
    }
    let config = self.runtime.resolver.resolve_value(&config, context);

    info!(node_id = %node.id, handler = %handler_type, "step_started");

    match self.invoke(handler.as_ref(), node, context, &config).await {
      Ok(result) => {
        let result = result
          .with_label(node.label.clone())
          .with_timing(started_at, Utc::now());
        self.finish_step(record, result, StepStatus::Completed, None).await
      }
      Err(Attempt::Failed {
        result,
        classification,
      }) => {
        error!(
          node_id = %node.id,
          error = %result.error_message(),
          kind = %classification.kind,
          retryable = classification.retryable,
          "step_failed"
        );
        let result = result
          .with_label(node.label.clone())
          .with_timing(started_at, Utc::now());
        self
          .finish_step(record, result, StepStatus::Failed, Some(classification))
          .await
      }
      Err(Attempt::Cancelled) => {
        let mut record = record;
        record.finish(StepStatus::Failed, None, Some("execution cancelled".to_string()));
        self.store().upsert_step(&record).await?;
        Err(RuntimeError::Cancelled)
      }
    }
  }

  /// Call the handler under the retry policy, racing cancellation.
  ///
  /// Only failures classified as retryable get another attempt. Cancellation
  /// wins over a handler that is ready at the same moment and ends any
  /// pending backoff.
  async fn invoke(
    &self,
    handler: &dyn Handler,
    node: &Node,
    context: &ExecutionContext,
    config: &Value,
  ) -> Result<NodeExecutionResult, Attempt> {
    let cancel = &self.cancel;
    let outcome = with_retry_until(
      &self.runtime.config.retry_policy,
      cancel,
      |attempt: &Attempt| {
        matches!(attempt, Attempt::Failed { classification, .. } if classification.retryable)
      },
      move |attempt| async move {
        debug!(node_id = %node.id, attempt, "invoking handler");
        tokio::select! {
          biased;
          _ = cancel.cancelled() => Err(Attempt::Cancelled),
          result = handler.execute(node, context, config) => {
            if result.success {
              Ok(result)
            } else {
              let classification = classify_error(result.error_message());
              Err(Attempt::Failed { result, classification })
            }
          }
        }
      },
    )
    .await;

    match outcome {
      Err(Attempt::Failed { .. }) if cancel.is_cancelled() => Err(Attempt::Cancelled),
      other => other,
    }
  }

  async fn finish_step(
    &self,
    mut record: StepRecord,
    result: NodeExecutionResult,
    status: StepStatus,
    classification: Option<ErrorClassification>,
  ) -> Result<StepOutcome, RuntimeError> {
    let summary = summarize(&result.output, self.runtime.config.output_summary_limit);
    record.finish(status, Some(summary), result.error.clone());
    self.store().upsert_step(&record).await?;

    info!(
      node_id = %record.node_id,
      status = status.as_str(),
      duration_ms = result.duration_ms,
      "step_completed"
    );

    Ok(StepOutcome {
      result,
      status,
      classification,
    })
  }
}

/// Serialized output, cut to at most `limit` characters.
fn summarize(output: &Value, limit: usize) -> String {
  let text = output.to_string();
  if text.chars().count() <= limit {
    text
  } else {
    text.chars().take(limit).collect()
  }
}
