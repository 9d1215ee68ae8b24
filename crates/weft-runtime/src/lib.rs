//! Workflow runtime for weft.
//!
//! Drives a single run of a workflow from trigger payload to terminal state.
//!
//! # Architecture
//!
//! ```text
//! WorkflowRuntime
//! ├── new(registry, store, config)
//! ├── plan(workflow) / validate(workflow)
//! └── execute(request, cancel) -> ExecutionResult
//!
//! per step, in plan order:
//!   skipped? -> record {skipped: true}
//!   normalize_config -> VariableResolver -> HandlerRegistry -> Handler
//!   (retried while the failure classifies as retryable)
//!   condition node? -> mark_untaken_branches
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use weft_runtime::{ExecutionRequest, RuntimeConfig, WorkflowRuntime};
//!
//! let runtime = WorkflowRuntime::new(registry, store, RuntimeConfig::default());
//! let result = runtime
//!   .execute(ExecutionRequest::new(workflow, payload), cancel)
//!   .await?;
//! ```

mod config;
mod error;
mod execution;
mod normalize;
mod runtime;
mod skip;

pub use config::RuntimeConfig;
pub use error::RuntimeError;
pub use normalize::{FieldType, canonical_operator, coerce, normalize_config};
pub use runtime::{ExecutionRequest, ExecutionResult, WorkflowRuntime};
pub use skip::{mark_branch_for_skipping, mark_untaken_branches};
