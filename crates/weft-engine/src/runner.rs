//! Workflow runner with channel-based triggering.
//!
//! The `WorkflowRunner` owns an mpsc channel for receiving triggers and runs
//! each one as its own execution on the shared `WorkflowRuntime`.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use weft_config::WorkflowDef;
use weft_runtime::{ExecutionRequest, ExecutionResult, RuntimeError, WorkflowRuntime};

const DEFAULT_BUFFER_SIZE: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
  #[error("workflow runner channel closed")]
  ChannelClosed,
}

/// One request to run the workflow.
#[derive(Debug, Clone, Default)]
pub struct Trigger {
  pub payload: Value,
  pub user_id: Option<String>,
  pub variables: HashMap<String, Value>,
}

impl Trigger {
  pub fn new(payload: Value) -> Self {
    Self {
      payload,
      ..Self::default()
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
}

impl From<Value> for Trigger {
  fn from(payload: Value) -> Self {
    Self::new(payload)
  }
}

/// Runs one workflow in response to triggers.
///
/// Every trigger becomes an independent execution with its own context, so a
/// slow run (a long delay, a hanging API) never holds up the next one.
///
/// # Usage
///
/// ```ignore
/// let runner = WorkflowRunner::new(runtime, workflow);
///
/// // Get sender for external triggers (webhooks, schedulers, etc.)
/// let sender = runner.sender();
///
/// // Start the execution loop
/// let cancel = CancellationToken::new();
/// runner.start(cancel).await?;
/// ```
pub struct WorkflowRunner {
  sender: mpsc::Sender<Trigger>,
  receiver: mpsc::Receiver<Trigger>,
  runtime: Arc<WorkflowRuntime>,
  workflow: Arc<WorkflowDef>,
}

impl WorkflowRunner {
  pub fn new(runtime: Arc<WorkflowRuntime>, workflow: WorkflowDef) -> Self {
    Self::with_buffer_size(runtime, workflow, DEFAULT_BUFFER_SIZE)
  }

  pub fn with_buffer_size(
    runtime: Arc<WorkflowRuntime>,
    workflow: WorkflowDef,
    buffer_size: usize,
  ) -> Self {
    let (sender, receiver) = mpsc::channel(buffer_size);
    Self {
      sender,
      receiver,
      runtime,
      workflow: Arc::new(workflow),
    }
  }

  /// A sender handle for triggering executions.
  ///
  /// The loop started by [`start`](Self::start) ends once every sender
  /// handed out here has been dropped.
  pub fn sender(&self) -> mpsc::Sender<Trigger> {
    self.sender.clone()
  }

  /// Queue an execution.
  pub async fn run(&self, trigger: impl Into<Trigger>) -> Result<(), EngineError> {
    self
      .sender
      .send(trigger.into())
      .await
      .map_err(|_| EngineError::ChannelClosed)
  }

  /// Start the execution loop.
  ///
  /// Each received trigger is spawned on its own task with a child of
  /// `cancel`. The loop returns when `cancel` fires (in-flight runs are
  /// cancelled and awaited) or when every sender is gone (in-flight runs
  /// are awaited).
  pub async fn start(self, cancel: CancellationToken) -> Result<(), EngineError> {
    let Self {
      sender,
      mut receiver,
      runtime,
      workflow,
    } = self;
    // only external senders keep the loop alive
    drop(sender);

    let workflow_id = workflow.workflow_id.clone();
    info!(
      workflow_id = %workflow_id,
      workflow_name = %workflow.name,
      "starting workflow runner"
    );

    let mut runs = JoinSet::new();
    loop {
      tokio::select! {
        _ = cancel.cancelled() => {
          info!(workflow_id = %workflow_id, in_flight = runs.len(), "workflow runner cancelled");
          break;
        }
        Some(joined) = runs.join_next(), if !runs.is_empty() => {
          if let Err(e) = joined {
            error!(workflow_id = %workflow_id, error = %e, "workflow execution task panicked");
          }
        }
        trigger = receiver.recv() => {
          let Some(trigger) = trigger else {
            info!(workflow_id = %workflow_id, "workflow runner channel closed");
            break;
          };
          let runtime = runtime.clone();
          let request = request_for(&workflow, trigger);
          let exec_cancel = cancel.child_token();
          info!(workflow_id = %workflow_id, "triggering workflow execution");
          runs.spawn(async move {
            let outcome = runtime.execute(request, exec_cancel).await;
            log_outcome(outcome);
          });
        }
      }
    }

    while let Some(joined) = runs.join_next().await {
      if let Err(e) = joined {
        error!(workflow_id = %workflow_id, error = %e, "workflow execution task panicked");
      }
    }
    Ok(())
  }

  /// Run the workflow once, without the loop.
  pub async fn execute_once(
    &self,
    trigger: impl Into<Trigger>,
    cancel: CancellationToken,
  ) -> Result<ExecutionResult, RuntimeError> {
    let request = request_for(&self.workflow, trigger.into());
    self.runtime.execute(request, cancel).await
  }

  pub fn runtime(&self) -> &WorkflowRuntime {
    &self.runtime
  }

  pub fn workflow(&self) -> &WorkflowDef {
    &self.workflow
  }
}

fn request_for(workflow: &WorkflowDef, trigger: Trigger) -> ExecutionRequest {
  let mut request = ExecutionRequest::new(workflow.clone(), trigger.payload);
  request.user_id = trigger.user_id;
  request.variables = trigger.variables;
  request
}

fn log_outcome(outcome: Result<ExecutionResult, RuntimeError>) {
  match outcome {
    Ok(result) => info!(
      workflow_id = %result.workflow_id,
      execution_id = %result.execution_id,
      steps = result.context.result_count(),
      skipped = result.skipped.len(),
      "workflow execution completed"
    ),
    Err(RuntimeError::Cancelled) => warn!("workflow execution cancelled"),
    Err(e) => error!(error = %e, "workflow execution failed"),
  }
}
