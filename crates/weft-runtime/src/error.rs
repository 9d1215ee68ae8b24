//! Runtime error types.

use weft_store::StoreError;
use weft_task::ErrorClassification;
use weft_workflow::{ValidationErrors, WorkflowError};

/// Errors that end a workflow run.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
  /// Execution was cancelled.
  #[error("execution cancelled")]
  Cancelled,

  /// The workflow could not be planned (validation failure or cycle).
  #[error(transparent)]
  Plan(#[from] WorkflowError),

  /// A step returned an unsuccessful result.
  #[error("step '{label}' ({node_id}) failed: {error}")]
  StepFailed {
    node_id: String,
    label: String,
    error: String,
    classification: ErrorClassification,
  },

  /// Persisting an execution or step record failed.
  #[error("store error: {0}")]
  Store(#[from] StoreError),
}

impl From<ValidationErrors> for RuntimeError {
  fn from(errors: ValidationErrors) -> Self {
    RuntimeError::Plan(WorkflowError::Validation(errors))
  }
}

impl RuntimeError {
  /// The message recorded on the failed execution.
  pub fn record_message(&self) -> String {
    match self {
      RuntimeError::StepFailed { error, .. } => error.clone(),
      other => other.to_string(),
    }
  }
}
