//! Weft Task
//!
//! The contract between the orchestrator and the per-node handlers:
//!
//! - [`ExecutionContext`]: per-run state a handler can read
//! - [`NodeExecutionResult`]: what a handler hands back
//! - [`Handler`]: the trait every handler implements
//! - [`HandlerType`] / [`determine_handler_type`]: which handler a node needs
//! - [`HandlerRegistry`]: handler-type to handler lookup
//! - [`classify_error`] / [`TaskError`]: the fixed failure taxonomy
//! - [`RetryPolicy`] / [`with_retry`]: exponential backoff around fallible work

mod context;
mod error;
mod handler;
mod registry;
mod result;
mod retry;

pub use context::ExecutionContext;
pub use error::{ErrorClassification, ErrorKind, TaskError, classify_error, should_retry};
pub use handler::{Handler, HandlerType, SERVICE_KEYWORDS, determine_handler_type};
pub use registry::HandlerRegistry;
pub use result::NodeExecutionResult;
pub use retry::{RetryPolicy, with_retry, with_retry_if, with_retry_until};
